//! Schema diffing.
//!
//! Compares two snapshots and produces a structured set of typed changes.
//! Objects are matched by qualified name within their kind; an object present
//! only in the target is `Added`, only in the source is `Removed`, and
//! present in both with differing structure is `Modified` with one field
//! diff per changed attribute.
//!
//! A column rename is indistinguishable from a drop+add at the structural
//! level and is always reported as drop+add; the engine never guesses rename
//! intent. View and routine definitions are compared after whitespace
//! normalization, so formatting-only edits do not register as changes;
//! any token-level change is a single `DefinitionChanged` diff rather than a
//! statement-level diff.

use crate::error::PlanError;
use crate::snapshot::{
    Column, ForeignKey, Index, ObjectKind, ObjectName, PrimaryKey, Routine, SchemaSnapshot, Table,
    View,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete diff between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDiff {
    /// All detected changes: tables first, then views, then routines, each
    /// group in name order. Final execution order is imposed later by the
    /// topological sort.
    pub changes: Vec<SchemaChange>,
}

impl SchemaDiff {
    /// Compute the diff between two snapshots.
    ///
    /// Both snapshots are validated first; inconsistent input fails fast
    /// with [`PlanError::InvalidSnapshot`], and snapshots for different
    /// dialects are rejected.
    pub fn compute(
        source: &SchemaSnapshot,
        target: &SchemaSnapshot,
    ) -> Result<Self, PlanError> {
        source.validate()?;
        target.validate()?;
        if source.dialect() != target.dialect() {
            return Err(PlanError::DialectMismatch {
                source: source.dialect(),
                target: target.dialect(),
            });
        }

        let mut changes = Vec::new();
        diff_tables(source.tables(), target.tables(), &mut changes);
        diff_views(source.views(), target.views(), &mut changes);
        diff_routines(source.routines(), target.routines(), &mut changes);

        tracing::debug!(changes = changes.len(), "schema diff computed");
        Ok(SchemaDiff { changes })
    }

    /// Check if there are any changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Total number of changes.
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }
}

/// One schema object carried inside a change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaObject {
    /// A table.
    Table(Table),
    /// A view.
    View(View),
    /// A routine.
    Routine(Routine),
}

impl SchemaObject {
    /// The object's kind.
    pub fn kind(&self) -> ObjectKind {
        match self {
            SchemaObject::Table(_) => ObjectKind::Table,
            SchemaObject::View(_) => ObjectKind::View,
            SchemaObject::Routine(_) => ObjectKind::Routine,
        }
    }

    /// The object's qualified name.
    pub fn name(&self) -> &ObjectName {
        match self {
            SchemaObject::Table(t) => &t.name,
            SchemaObject::View(v) => &v.name,
            SchemaObject::Routine(r) => &r.name,
        }
    }
}

/// One detected change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaChange {
    /// Object present only in the target.
    Added(SchemaObject),
    /// Object present only in the source.
    Removed(SchemaObject),
    /// Object present in both with structural differences.
    Modified(ModifiedObject),
}

impl SchemaChange {
    /// Kind of the changed object.
    pub fn kind(&self) -> ObjectKind {
        match self {
            SchemaChange::Added(o) | SchemaChange::Removed(o) => o.kind(),
            SchemaChange::Modified(m) => m.kind,
        }
    }

    /// Qualified name of the changed object.
    pub fn object_name(&self) -> &ObjectName {
        match self {
            SchemaChange::Added(o) | SchemaChange::Removed(o) => o.name(),
            SchemaChange::Modified(m) => &m.id,
        }
    }

    /// Short human-readable description.
    pub fn description(&self) -> String {
        match self {
            SchemaChange::Added(o) => format!("add {} '{}'", o.kind(), o.name()),
            SchemaChange::Removed(o) => format!("remove {} '{}'", o.kind(), o.name()),
            SchemaChange::Modified(m) => format!("modify {} '{}'", m.kind, m.id),
        }
    }
}

/// A modification of an object present in both snapshots.
///
/// Invariant: for tables, `field_diffs` always enumerates the column-level
/// sub-changes; a table is never reported as a blanket "changed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedObject {
    /// Kind of the object.
    pub kind: ObjectKind,
    /// Qualified name.
    pub id: ObjectName,
    /// Structure in the source snapshot.
    pub before: SchemaObject,
    /// Structure in the target snapshot.
    pub after: SchemaObject,
    /// One entry per changed attribute.
    pub field_diffs: Vec<FieldDiff>,
}

/// One changed attribute within a modified object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldDiff {
    /// Column present only in the target.
    ColumnAdded(Column),
    /// Column present only in the source.
    ColumnRemoved(Column),
    /// Declared type changed.
    ColumnTypeChanged {
        /// Column name.
        column: String,
        /// Source declared type.
        from: String,
        /// Target declared type.
        to: String,
    },
    /// Nullability changed.
    ColumnNullabilityChanged {
        /// Column name.
        column: String,
        /// Nullable in the source.
        from: bool,
        /// Nullable in the target.
        to: bool,
        /// Whether the target column carries a default expression.
        has_default: bool,
    },
    /// Default expression changed.
    ColumnDefaultChanged {
        /// Column name.
        column: String,
        /// Source default.
        from: Option<String>,
        /// Target default.
        to: Option<String>,
    },
    /// Identity / auto-increment flag changed.
    ColumnIdentityChanged {
        /// Column name.
        column: String,
        /// Identity in the source.
        from: bool,
        /// Identity in the target.
        to: bool,
    },
    /// Ordinal position changed. Reported for completeness; neither
    /// supported dialect can reorder columns in place, so no migration step
    /// is generated for this diff.
    ColumnPositionChanged {
        /// Column name.
        column: String,
        /// Source ordinal.
        from: u32,
        /// Target ordinal.
        to: u32,
    },
    /// Primary key added, removed, or redefined (compared by column list).
    PrimaryKeyChanged {
        /// Source primary key.
        from: Option<PrimaryKey>,
        /// Target primary key.
        to: Option<PrimaryKey>,
    },
    /// Foreign key present only in the target. A redefined foreign key is
    /// reported as `ForeignKeyRemoved` + `ForeignKeyAdded`.
    ForeignKeyAdded(ForeignKey),
    /// Foreign key present only in the source.
    ForeignKeyRemoved(ForeignKey),
    /// Index present only in the target. A redefined index is reported as
    /// `IndexRemoved` + `IndexAdded`.
    IndexAdded(Index),
    /// Index present only in the source.
    IndexRemoved(Index),
    /// View or routine definition changed (whole-definition granularity).
    DefinitionChanged,
}

/// Collapse whitespace runs to a single space and trim.
///
/// The comparison policy for view/routine definition text: formatting-only
/// edits do not count as changes, comment or token edits do.
pub(crate) fn normalize_definition(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn diff_tables(
    source: &BTreeMap<ObjectName, Table>,
    target: &BTreeMap<ObjectName, Table>,
    changes: &mut Vec<SchemaChange>,
) {
    for (name, table) in target {
        if !source.contains_key(name) {
            changes.push(SchemaChange::Added(SchemaObject::Table(table.clone())));
        }
    }
    for (name, table) in source {
        if !target.contains_key(name) {
            changes.push(SchemaChange::Removed(SchemaObject::Table(table.clone())));
        }
    }
    for (name, before) in source {
        let Some(after) = target.get(name) else {
            continue;
        };
        let field_diffs = diff_table_fields(before, after);
        if !field_diffs.is_empty() {
            changes.push(SchemaChange::Modified(ModifiedObject {
                kind: ObjectKind::Table,
                id: name.clone(),
                before: SchemaObject::Table(before.clone()),
                after: SchemaObject::Table(after.clone()),
                field_diffs,
            }));
        }
    }
}

fn diff_table_fields(before: &Table, after: &Table) -> Vec<FieldDiff> {
    let mut diffs = Vec::new();

    // Columns, matched by name.
    for column in &after.columns {
        if before.get_column(&column.name).is_none() {
            diffs.push(FieldDiff::ColumnAdded(column.clone()));
        }
    }
    for column in &before.columns {
        if after.get_column(&column.name).is_none() {
            diffs.push(FieldDiff::ColumnRemoved(column.clone()));
        }
    }
    for from in &before.columns {
        let Some(to) = after.get_column(&from.name) else {
            continue;
        };
        if normalize_definition(&from.data_type).to_ascii_uppercase()
            != normalize_definition(&to.data_type).to_ascii_uppercase()
        {
            diffs.push(FieldDiff::ColumnTypeChanged {
                column: from.name.clone(),
                from: from.data_type.clone(),
                to: to.data_type.clone(),
            });
        }
        if from.nullable != to.nullable {
            diffs.push(FieldDiff::ColumnNullabilityChanged {
                column: from.name.clone(),
                from: from.nullable,
                to: to.nullable,
                has_default: to.default.is_some(),
            });
        }
        if from.default != to.default {
            diffs.push(FieldDiff::ColumnDefaultChanged {
                column: from.name.clone(),
                from: from.default.clone(),
                to: to.default.clone(),
            });
        }
        if from.identity != to.identity {
            diffs.push(FieldDiff::ColumnIdentityChanged {
                column: from.name.clone(),
                from: from.identity,
                to: to.identity,
            });
        }
        if from.ordinal != to.ordinal {
            diffs.push(FieldDiff::ColumnPositionChanged {
                column: from.name.clone(),
                from: from.ordinal,
                to: to.ordinal,
            });
        }
    }

    // Primary key, compared by column list; constraint names are cosmetic.
    let pk_before = before.primary_key.as_ref().map(|pk| &pk.columns);
    let pk_after = after.primary_key.as_ref().map(|pk| &pk.columns);
    if pk_before != pk_after {
        diffs.push(FieldDiff::PrimaryKeyChanged {
            from: before.primary_key.clone(),
            to: after.primary_key.clone(),
        });
    }

    // Foreign keys, matched by constraint name; a changed definition is a
    // remove+add pair.
    for fk in &after.foreign_keys {
        match before.get_foreign_key(&fk.name) {
            None => diffs.push(FieldDiff::ForeignKeyAdded(fk.clone())),
            Some(old) if old != fk => {
                diffs.push(FieldDiff::ForeignKeyRemoved(old.clone()));
                diffs.push(FieldDiff::ForeignKeyAdded(fk.clone()));
            }
            Some(_) => {}
        }
    }
    for fk in &before.foreign_keys {
        if after.get_foreign_key(&fk.name).is_none() {
            diffs.push(FieldDiff::ForeignKeyRemoved(fk.clone()));
        }
    }

    // Indexes, matched by name, same remove+add treatment.
    for index in &after.indexes {
        match before.get_index(&index.name) {
            None => diffs.push(FieldDiff::IndexAdded(index.clone())),
            Some(old) if old != index => {
                diffs.push(FieldDiff::IndexRemoved(old.clone()));
                diffs.push(FieldDiff::IndexAdded(index.clone()));
            }
            Some(_) => {}
        }
    }
    for index in &before.indexes {
        if after.get_index(&index.name).is_none() {
            diffs.push(FieldDiff::IndexRemoved(index.clone()));
        }
    }

    diffs
}

fn diff_views(
    source: &BTreeMap<ObjectName, View>,
    target: &BTreeMap<ObjectName, View>,
    changes: &mut Vec<SchemaChange>,
) {
    for (name, view) in target {
        if !source.contains_key(name) {
            changes.push(SchemaChange::Added(SchemaObject::View(view.clone())));
        }
    }
    for (name, view) in source {
        if !target.contains_key(name) {
            changes.push(SchemaChange::Removed(SchemaObject::View(view.clone())));
        }
    }
    for (name, before) in source {
        let Some(after) = target.get(name) else {
            continue;
        };
        let changed = normalize_definition(&before.definition)
            != normalize_definition(&after.definition)
            || before.columns != after.columns;
        if changed {
            changes.push(SchemaChange::Modified(ModifiedObject {
                kind: ObjectKind::View,
                id: name.clone(),
                before: SchemaObject::View(before.clone()),
                after: SchemaObject::View(after.clone()),
                field_diffs: vec![FieldDiff::DefinitionChanged],
            }));
        }
    }
}

fn diff_routines(
    source: &BTreeMap<ObjectName, Routine>,
    target: &BTreeMap<ObjectName, Routine>,
    changes: &mut Vec<SchemaChange>,
) {
    for (name, routine) in target {
        if !source.contains_key(name) {
            changes.push(SchemaChange::Added(SchemaObject::Routine(routine.clone())));
        }
    }
    for (name, routine) in source {
        if !target.contains_key(name) {
            changes.push(SchemaChange::Removed(SchemaObject::Routine(
                routine.clone(),
            )));
        }
    }
    for (name, before) in source {
        let Some(after) = target.get(name) else {
            continue;
        };
        let changed = normalize_definition(&before.definition)
            != normalize_definition(&after.definition)
            || before.parameters != after.parameters
            || before.return_type != after.return_type
            || before.kind != after.kind;
        if changed {
            changes.push(SchemaChange::Modified(ModifiedObject {
                kind: ObjectKind::Routine,
                id: name.clone(),
                before: SchemaObject::Routine(before.clone()),
                after: SchemaObject::Routine(after.clone()),
                field_diffs: vec![FieldDiff::DefinitionChanged],
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Dialect;

    fn orders() -> Table {
        Table::new("public", "orders")
            .with_column(Column::new("id", "INT").with_identity())
            .with_column(Column::new("total", "DECIMAL(10,2)"))
            .with_primary_key(PrimaryKey::new(["id"]).named("pk_orders"))
    }

    fn products() -> Table {
        Table::new("public", "products")
            .with_column(Column::new("id", "INT").with_identity())
            .with_column(Column::new("name", "VARCHAR(100)"))
            .with_primary_key(PrimaryKey::new(["id"]))
    }

    fn snapshot(tables: Vec<Table>) -> SchemaSnapshot {
        tables
            .into_iter()
            .fold(SchemaSnapshot::new(Dialect::Postgres), |s, t| s.with_table(t))
    }

    #[test]
    fn test_diff_identical_is_empty() {
        let a = snapshot(vec![orders(), products()]);
        let diff = SchemaDiff::compute(&a, &a).unwrap();
        assert!(diff.is_empty());
        assert_eq!(diff.change_count(), 0);
    }

    #[test]
    fn test_diff_added_table() {
        let source = snapshot(vec![orders()]);
        let target = snapshot(vec![orders(), products()]);

        let diff = SchemaDiff::compute(&source, &target).unwrap();
        assert_eq!(diff.change_count(), 1);
        match &diff.changes[0] {
            SchemaChange::Added(SchemaObject::Table(t)) => {
                assert_eq!(t.name, ObjectName::new("public", "products"));
            }
            other => panic!("expected Added table, got {other:?}"),
        }
    }

    #[test]
    fn test_diff_symmetry() {
        let a = snapshot(vec![orders()]);
        let b = snapshot(vec![orders(), products()]);

        let forward = SchemaDiff::compute(&a, &b).unwrap();
        let backward = SchemaDiff::compute(&b, &a).unwrap();

        match (&forward.changes[0], &backward.changes[0]) {
            (SchemaChange::Added(x), SchemaChange::Removed(y)) => assert_eq!(x, y),
            other => panic!("expected Added/Removed mirror, got {other:?}"),
        }
    }

    #[test]
    fn test_diff_modified_swaps_before_after() {
        let mut narrowed = orders();
        narrowed.columns[1].data_type = "DECIMAL(6,2)".to_string();
        let a = snapshot(vec![orders()]);
        let b = snapshot(vec![narrowed]);

        let forward = SchemaDiff::compute(&a, &b).unwrap();
        let backward = SchemaDiff::compute(&b, &a).unwrap();

        let (fwd, bwd) = match (&forward.changes[0], &backward.changes[0]) {
            (SchemaChange::Modified(f), SchemaChange::Modified(b)) => (f, b),
            other => panic!("expected Modified pair, got {other:?}"),
        };
        assert_eq!(fwd.before, bwd.after);
        assert_eq!(fwd.after, bwd.before);
    }

    #[test]
    fn test_diff_column_add_remove_and_attributes() {
        let before = orders();
        let after = Table::new("public", "orders")
            .with_column(Column::new("id", "INT").with_identity())
            .with_column(
                Column::nullable("total", "DECIMAL(10,2)").with_default("0"),
            )
            .with_column(Column::new("status", "VARCHAR(20)").with_default("'pending'"))
            .with_primary_key(PrimaryKey::new(["id"]));

        let diff = SchemaDiff::compute(&snapshot(vec![before]), &snapshot(vec![after])).unwrap();
        assert_eq!(diff.change_count(), 1);
        let modified = match &diff.changes[0] {
            SchemaChange::Modified(m) => m,
            other => panic!("expected Modified, got {other:?}"),
        };

        assert!(modified
            .field_diffs
            .iter()
            .any(|d| matches!(d, FieldDiff::ColumnAdded(c) if c.name == "status")));
        assert!(modified.field_diffs.iter().any(|d| matches!(
            d,
            FieldDiff::ColumnNullabilityChanged { column, from: false, to: true, .. }
                if column == "total"
        )));
        assert!(modified.field_diffs.iter().any(|d| matches!(
            d,
            FieldDiff::ColumnDefaultChanged { column, .. } if column == "total"
        )));
    }

    #[test]
    fn test_diff_type_case_is_not_a_change() {
        let mut recased = orders();
        recased.columns[0].data_type = "int".to_string();
        let diff =
            SchemaDiff::compute(&snapshot(vec![orders()]), &snapshot(vec![recased])).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_redefined_index_is_remove_add() {
        let before = orders().with_index(Index::new("ix_orders_total", ["total"]));
        let after = orders().with_index(Index::new("ix_orders_total", ["total"]).unique());

        let diff = SchemaDiff::compute(&snapshot(vec![before]), &snapshot(vec![after])).unwrap();
        let modified = match &diff.changes[0] {
            SchemaChange::Modified(m) => m,
            other => panic!("expected Modified, got {other:?}"),
        };
        assert!(modified
            .field_diffs
            .iter()
            .any(|d| matches!(d, FieldDiff::IndexRemoved(_))));
        assert!(modified
            .field_diffs
            .iter()
            .any(|d| matches!(d, FieldDiff::IndexAdded(i) if i.unique)));
    }

    #[test]
    fn test_diff_view_whitespace_only_is_not_a_change() {
        let a = SchemaSnapshot::new(Dialect::Postgres)
            .with_table(orders())
            .with_view(
                View::new("public", "order_totals", "SELECT id,  total\nFROM orders")
                    .with_dependency(ObjectName::new("public", "orders")),
            );
        let b = SchemaSnapshot::new(Dialect::Postgres)
            .with_table(orders())
            .with_view(
                View::new("public", "order_totals", "SELECT id, total FROM orders")
                    .with_dependency(ObjectName::new("public", "orders")),
            );

        let diff = SchemaDiff::compute(&a, &b).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_view_token_change_is_definition_changed() {
        let a = SchemaSnapshot::new(Dialect::Postgres)
            .with_table(orders())
            .with_view(View::new("public", "order_totals", "SELECT id FROM orders"));
        let b = SchemaSnapshot::new(Dialect::Postgres)
            .with_table(orders())
            .with_view(View::new(
                "public",
                "order_totals",
                "SELECT id, total FROM orders",
            ));

        let diff = SchemaDiff::compute(&a, &b).unwrap();
        assert_eq!(diff.change_count(), 1);
        match &diff.changes[0] {
            SchemaChange::Modified(m) => {
                assert_eq!(m.kind, ObjectKind::View);
                assert_eq!(m.field_diffs, vec![FieldDiff::DefinitionChanged]);
            }
            other => panic!("expected Modified view, got {other:?}"),
        }
    }

    #[test]
    fn test_diff_dialect_mismatch() {
        let a = SchemaSnapshot::new(Dialect::Postgres);
        let b = SchemaSnapshot::new(Dialect::SqlServer);
        let err = SchemaDiff::compute(&a, &b).unwrap_err();
        assert!(matches!(err, PlanError::DialectMismatch { .. }));
    }
}
