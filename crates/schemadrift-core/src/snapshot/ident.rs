//! Object identity within a snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Qualified name identifying an object within its kind.
///
/// Every object in a snapshot is uniquely identified by `(schema, name)`
/// within its kind; the derived `Ord` gives the deterministic ordering used
/// throughout diffing and step scheduling.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectName {
    /// Schema (namespace) the object lives in.
    pub schema: String,
    /// Object name within the schema.
    pub name: String,
}

impl ObjectName {
    /// Create a qualified name.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Kind of schema object.
///
/// The derived `Ord` is the first component of the tie-break key used by the
/// topological sort, so variant order is part of the engine's determinism
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Base table.
    Table,
    /// View.
    View,
    /// Stored procedure or function.
    Routine,
    /// Secondary index.
    Index,
    /// Primary key, foreign key, or other table constraint.
    Constraint,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Table => write!(f, "table"),
            ObjectKind::View => write!(f, "view"),
            ObjectKind::Routine => write!(f, "routine"),
            ObjectKind::Index => write!(f, "index"),
            ObjectKind::Constraint => write!(f, "constraint"),
        }
    }
}
