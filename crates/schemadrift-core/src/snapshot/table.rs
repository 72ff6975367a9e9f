//! Table, column, and table-attached constraint definitions.

use super::ident::ObjectName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A base table: columns, primary key, foreign keys, and indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Qualified table name.
    pub name: ObjectName,
    /// Columns in ordinal order.
    pub columns: Vec<Column>,
    /// Primary key, if any.
    pub primary_key: Option<PrimaryKey>,
    /// Foreign keys owned by this table.
    pub foreign_keys: Vec<ForeignKey>,
    /// Secondary indexes.
    pub indexes: Vec<Index>,
    /// Estimated row count, informational only; never participates in
    /// diffing.
    pub row_count: Option<u64>,
}

impl Table {
    /// Create an empty table definition.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: ObjectName::new(schema, name),
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            row_count: None,
        }
    }

    /// Append a column; its ordinal is assigned from the current position.
    pub fn with_column(mut self, column: Column) -> Self {
        let mut column = column;
        column.ordinal = self.columns.len() as u32 + 1;
        self.columns.push(column);
        self
    }

    /// Set the primary key.
    pub fn with_primary_key(mut self, pk: PrimaryKey) -> Self {
        self.primary_key = Some(pk);
        self
    }

    /// Add a foreign key.
    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Add an index.
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Set the row-count estimate.
    pub fn with_row_count(mut self, rows: u64) -> Self {
        self.row_count = Some(rows);
        self
    }

    /// Look up a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up an index by name.
    pub fn get_index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Look up a foreign key by constraint name.
    pub fn get_foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.name == name)
    }
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Declared data type, verbatim from the catalog (`VARCHAR(200)`,
    /// `BIGINT`, ...).
    pub data_type: String,
    /// Whether NULL is permitted.
    pub nullable: bool,
    /// Default expression, if any.
    pub default: Option<String>,
    /// Identity / auto-increment flag.
    pub identity: bool,
    /// 1-based ordinal position.
    pub ordinal: u32,
}

impl Column {
    /// Create a non-nullable column. The ordinal is assigned when the column
    /// is attached to a table.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: false,
            default: None,
            identity: false,
            ordinal: 0,
        }
    }

    /// Create a nullable column.
    pub fn nullable(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let mut column = Self::new(name, data_type);
        column.nullable = true;
        column
    }

    /// Set the default expression.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark as identity / auto-increment.
    pub fn with_identity(mut self) -> Self {
        self.identity = true;
        self
    }
}

/// Primary key: an ordered column list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Constraint name, if the catalog reported one.
    pub name: Option<String>,
    /// Key columns in order.
    pub columns: Vec<String>,
}

impl PrimaryKey {
    /// Create a primary key over the given columns.
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the constraint name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Referential action on delete or update of a referenced row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    /// No action (default).
    NoAction,
    /// Restrict.
    Restrict,
    /// Cascade the operation.
    Cascade,
    /// Set referencing columns to NULL.
    SetNull,
    /// Set referencing columns to their defaults.
    SetDefault,
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferentialAction::NoAction => write!(f, "NO ACTION"),
            ReferentialAction::Restrict => write!(f, "RESTRICT"),
            ReferentialAction::Cascade => write!(f, "CASCADE"),
            ReferentialAction::SetNull => write!(f, "SET NULL"),
            ReferentialAction::SetDefault => write!(f, "SET DEFAULT"),
        }
    }
}

/// Foreign key constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Referencing columns, in order.
    pub columns: Vec<String>,
    /// Referenced table.
    pub referenced_table: ObjectName,
    /// Referenced columns, positionally matching `columns`.
    pub referenced_columns: Vec<String>,
    /// Action on delete of a referenced row.
    pub on_delete: ReferentialAction,
    /// Action on update of a referenced key.
    pub on_update: ReferentialAction,
}

impl ForeignKey {
    /// Create a single-column foreign key with default actions.
    pub fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        referenced_table: ObjectName,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: vec![column.into()],
            referenced_table,
            referenced_columns: vec![referenced_column.into()],
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
        }
    }

    /// Set the on-delete action.
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Set the on-update action.
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }
}

/// Secondary index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,
    /// Indexed columns, in key order.
    pub columns: Vec<String>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

impl Index {
    /// Create a non-unique index.
    pub fn new(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Mark the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}
