//! View definitions.

use super::ident::ObjectName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A view: its defining query text, resolved output columns, and the set of
/// objects the definition references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    /// Qualified view name.
    pub name: ObjectName,
    /// Defining query (the `SELECT ...` body, without the `CREATE VIEW`
    /// preamble).
    pub definition: String,
    /// Resolved output column names.
    pub columns: Vec<String>,
    /// Objects referenced by the definition, used for ordering and
    /// impact analysis.
    pub dependencies: BTreeSet<ObjectName>,
}

impl View {
    /// Create a view definition.
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            name: ObjectName::new(schema, name),
            definition: definition.into(),
            columns: Vec::new(),
            dependencies: BTreeSet::new(),
        }
    }

    /// Set the resolved output columns.
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Record a referenced object.
    pub fn with_dependency(mut self, dependency: ObjectName) -> Self {
        self.dependencies.insert(dependency);
        self
    }
}
