//! Schema snapshot - immutable point-in-time description of a database's
//! structure.

use super::ident::{ObjectKind, ObjectName};
use super::routine::Routine;
use super::table::Table;
use super::types::Dialect;
use super::view::View;
use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A point-in-time structural description of one database schema.
///
/// Objects are keyed by qualified name, so identity uniqueness within a kind
/// is structural and iteration order is deterministic. Snapshots are built
/// once via the `with_*` methods and never mutated afterwards; the engine
/// only ever borrows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    dialect: Dialect,
    tables: BTreeMap<ObjectName, Table>,
    views: BTreeMap<ObjectName, View>,
    routines: BTreeMap<ObjectName, Routine>,
}

impl SchemaSnapshot {
    /// Create an empty snapshot for the given dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            tables: BTreeMap::new(),
            views: BTreeMap::new(),
            routines: BTreeMap::new(),
        }
    }

    /// Add a table.
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Add a view.
    pub fn with_view(mut self, view: View) -> Self {
        self.views.insert(view.name.clone(), view);
        self
    }

    /// Add a routine.
    pub fn with_routine(mut self, routine: Routine) -> Self {
        self.routines.insert(routine.name.clone(), routine);
        self
    }

    /// The snapshot's dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Tables, keyed by qualified name.
    pub fn tables(&self) -> &BTreeMap<ObjectName, Table> {
        &self.tables
    }

    /// Views, keyed by qualified name.
    pub fn views(&self) -> &BTreeMap<ObjectName, View> {
        &self.views
    }

    /// Routines, keyed by qualified name.
    pub fn routines(&self) -> &BTreeMap<ObjectName, Routine> {
        &self.routines
    }

    /// Look up a table.
    pub fn get_table(&self, name: &ObjectName) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Look up a view.
    pub fn get_view(&self, name: &ObjectName) -> Option<&View> {
        self.views.get(name)
    }

    /// Look up a routine.
    pub fn get_routine(&self, name: &ObjectName) -> Option<&Routine> {
        self.routines.get(name)
    }

    /// Kind of the object with the given name, if it exists in any kind.
    /// Tables win over views over routines when kinds collide on a name.
    pub fn object_kind(&self, name: &ObjectName) -> Option<ObjectKind> {
        if self.tables.contains_key(name) {
            Some(ObjectKind::Table)
        } else if self.views.contains_key(name) {
            Some(ObjectKind::View)
        } else if self.routines.contains_key(name) {
            Some(ObjectKind::Routine)
        } else {
            None
        }
    }

    /// Validate internal consistency.
    ///
    /// Fails fast with the first inconsistency found: duplicate column
    /// names, key/index columns that do not exist, or foreign keys whose
    /// target table or columns are missing. View and routine dependency
    /// entries are *not* required to resolve; introspection may legitimately
    /// record references to objects outside the snapshot.
    pub fn validate(&self) -> Result<(), PlanError> {
        for table in self.tables.values() {
            self.validate_table(table)?;
        }
        Ok(())
    }

    fn validate_table(&self, table: &Table) -> Result<(), PlanError> {
        let invalid = |reason: String| PlanError::InvalidSnapshot {
            object: table.name.clone(),
            reason,
        };

        let mut seen = std::collections::BTreeSet::new();
        for column in &table.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(invalid(format!("duplicate column '{}'", column.name)));
            }
        }

        if let Some(pk) = &table.primary_key {
            for column in &pk.columns {
                if table.get_column(column).is_none() {
                    return Err(invalid(format!(
                        "primary key references missing column '{}'",
                        column
                    )));
                }
            }
        }

        for index in &table.indexes {
            for column in &index.columns {
                if table.get_column(column).is_none() {
                    return Err(invalid(format!(
                        "index '{}' references missing column '{}'",
                        index.name, column
                    )));
                }
            }
        }

        for fk in &table.foreign_keys {
            for column in &fk.columns {
                if table.get_column(column).is_none() {
                    return Err(invalid(format!(
                        "foreign key '{}' references missing column '{}'",
                        fk.name, column
                    )));
                }
            }
            let Some(referenced) = self.tables.get(&fk.referenced_table) else {
                return Err(invalid(format!(
                    "foreign key '{}' references missing table '{}'",
                    fk.name, fk.referenced_table
                )));
            };
            if fk.columns.len() != fk.referenced_columns.len() {
                return Err(invalid(format!(
                    "foreign key '{}' has {} columns but references {}",
                    fk.name,
                    fk.columns.len(),
                    fk.referenced_columns.len()
                )));
            }
            for column in &fk.referenced_columns {
                if referenced.get_column(column).is_none() {
                    return Err(invalid(format!(
                        "foreign key '{}' references missing column '{}.{}'",
                        fk.name, fk.referenced_table, column
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Column, ForeignKey, Index, PrimaryKey};

    fn orders_table() -> Table {
        Table::new("public", "orders")
            .with_column(Column::new("id", "INT").with_identity())
            .with_column(Column::new("total", "DECIMAL(10,2)"))
            .with_primary_key(PrimaryKey::new(["id"]))
    }

    #[test]
    fn test_snapshot_builder_and_lookup() {
        let snapshot = SchemaSnapshot::new(Dialect::Postgres).with_table(orders_table());

        let name = ObjectName::new("public", "orders");
        assert!(snapshot.get_table(&name).is_some());
        assert_eq!(snapshot.object_kind(&name), Some(ObjectKind::Table));
        assert_eq!(snapshot.dialect(), Dialect::Postgres);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_column() {
        let table = Table::new("public", "orders")
            .with_column(Column::new("id", "INT"))
            .with_column(Column::new("id", "BIGINT"));
        let snapshot = SchemaSnapshot::new(Dialect::Postgres).with_table(table);

        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, PlanError::InvalidSnapshot { .. }));
        assert!(err.to_string().contains("duplicate column 'id'"));
    }

    #[test]
    fn test_validate_rejects_dangling_foreign_key() {
        let table = orders_table().with_foreign_key(ForeignKey::new(
            "fk_orders_customer",
            "id",
            ObjectName::new("public", "customers"),
            "id",
        ));
        let snapshot = SchemaSnapshot::new(Dialect::Postgres).with_table(table);

        let err = snapshot.validate().unwrap_err();
        assert!(err.to_string().contains("missing table 'public.customers'"));
    }

    #[test]
    fn test_validate_rejects_index_on_missing_column() {
        let table = orders_table().with_index(Index::new("ix_orders_status", ["status"]));
        let snapshot = SchemaSnapshot::new(Dialect::Postgres).with_table(table);

        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_duplicate_name_replaces() {
        let snapshot = SchemaSnapshot::new(Dialect::Postgres)
            .with_table(orders_table())
            .with_table(orders_table());
        assert_eq!(snapshot.tables().len(), 1);
    }
}
