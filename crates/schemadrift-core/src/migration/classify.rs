//! Breaking-change classification.
//!
//! A rule-based pass over the diff that labels each change with a severity
//! and a data-loss-risk flag. Rules are evaluated in a fixed precedence
//! order and the first match wins per change, so reclassification of the
//! same diff is always bit-identical.

use super::deps::DependencyIndex;
use super::diff::{FieldDiff, SchemaChange, SchemaDiff, SchemaObject};
use crate::error::Severity;
use crate::snapshot::{ObjectKind, ObjectName, SchemaSnapshot, SqlType};
use serde::{Deserialize, Serialize};

/// A change flagged as breaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakingChange {
    /// How bad it is.
    pub severity: Severity,
    /// Whether applying the change can permanently destroy stored values.
    pub data_loss_risk: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Transitive dependents of the changed object (views and routines in
    /// the target snapshot whose definitions reference it).
    pub affected_objects: Vec<ObjectName>,
}

/// Classification result, keyed by change index: `per_change[i]` describes
/// `diff.changes[i]`, with `None` for additive/informational changes that
/// are not surfaced as breaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// One entry per diff change.
    pub per_change: Vec<Option<BreakingChange>>,
}

impl Classification {
    /// All breaking entries, in change order.
    pub fn breaking(&self) -> impl Iterator<Item = &BreakingChange> {
        self.per_change.iter().flatten()
    }

    /// Whether any change risks data loss.
    pub fn has_data_loss_risk(&self) -> bool {
        self.breaking().any(|b| b.data_loss_risk)
    }

    /// Whether any change is critical.
    pub fn has_critical(&self) -> bool {
        self.breaking().any(|b| b.severity == Severity::Critical)
    }
}

/// Classifies diffs for breakage and data-loss risk.
pub struct ChangeClassifier;

impl ChangeClassifier {
    /// Classify every change in the diff against the target snapshot.
    ///
    /// The dependency index must be built from the *target* snapshot; it is
    /// consulted to fill `affected_objects`.
    pub fn classify(
        diff: &SchemaDiff,
        _target: &SchemaSnapshot,
        index: &DependencyIndex,
    ) -> Classification {
        let per_change = diff
            .changes
            .iter()
            .map(|change| {
                Self::classify_change(change).map(|(severity, data_loss_risk, reason)| {
                    BreakingChange {
                        severity,
                        data_loss_risk,
                        reason,
                        affected_objects: index
                            .transitive_dependents_of(change.object_name())
                            .into_iter()
                            .collect(),
                    }
                })
            })
            .collect();
        Classification { per_change }
    }

    /// Rule table, first match wins. Returns `None` for changes that are
    /// informational only.
    fn classify_change(change: &SchemaChange) -> Option<(Severity, bool, String)> {
        match change {
            SchemaChange::Removed(SchemaObject::Table(table)) => Some((
                Severity::Critical,
                true,
                format!("table '{}' is removed; its rows are destroyed", table.name),
            )),

            SchemaChange::Removed(object) => Some((
                Severity::Warning,
                false,
                format!(
                    "{} '{}' is removed; dependent callers break",
                    object.kind(),
                    object.name()
                ),
            )),

            SchemaChange::Modified(modified) if modified.kind == ObjectKind::Table => {
                Self::classify_table_modification(&modified.id, &modified.field_diffs)
            }

            SchemaChange::Modified(modified) => Some((
                Severity::Warning,
                false,
                format!("{} '{}' definition changed", modified.kind, modified.id),
            )),

            SchemaChange::Added(_) => None,
        }
    }

    fn classify_table_modification(
        table: &ObjectName,
        diffs: &[FieldDiff],
    ) -> Option<(Severity, bool, String)> {
        // Rule 1: column removed.
        if let Some(FieldDiff::ColumnRemoved(column)) = diffs
            .iter()
            .find(|d| matches!(d, FieldDiff::ColumnRemoved(_)))
        {
            return Some((
                Severity::Critical,
                true,
                format!(
                    "column '{}.{}' is removed; stored values are destroyed",
                    table, column.name
                ),
            ));
        }

        // Rule 2: column type narrowed.
        for diff in diffs {
            if let FieldDiff::ColumnTypeChanged { column, from, to } = diff {
                if SqlType::parse(from).narrows(&SqlType::parse(to)) {
                    return Some((
                        Severity::Critical,
                        true,
                        format!(
                            "column '{}.{}' narrows from {} to {}; values may be truncated",
                            table, column, from, to
                        ),
                    ));
                }
            }
        }

        // Rule 3: made non-nullable without a default.
        for diff in diffs {
            if let FieldDiff::ColumnNullabilityChanged {
                column,
                to: false,
                has_default: false,
                ..
            } = diff
            {
                return Some((
                    Severity::Critical,
                    true,
                    format!(
                        "column '{}.{}' becomes NOT NULL without a default; existing NULLs violate it",
                        table, column
                    ),
                ));
            }
        }

        // Rule 4: constraint added that existing data may violate.
        for diff in diffs {
            let violation = match diff {
                FieldDiff::ColumnAdded(column)
                    if !column.nullable && column.default.is_none() =>
                {
                    Some(format!(
                        "column '{}.{}' is added NOT NULL without a default; existing rows cannot satisfy it",
                        table, column.name
                    ))
                }
                FieldDiff::ColumnNullabilityChanged {
                    column,
                    to: false,
                    has_default: true,
                    ..
                } => Some(format!(
                    "column '{}.{}' becomes NOT NULL; existing NULLs must be backfilled",
                    table, column
                )),
                FieldDiff::IndexAdded(index) if index.unique => Some(format!(
                    "unique index '{}' on '{}' may be violated by existing rows",
                    index.name, table
                )),
                FieldDiff::ForeignKeyAdded(fk) => Some(format!(
                    "foreign key '{}' on '{}' may be violated by existing rows",
                    fk.name, table
                )),
                FieldDiff::PrimaryKeyChanged { to: Some(_), .. } => Some(format!(
                    "primary key of '{}' is redefined; existing rows must satisfy it",
                    table
                )),
                _ => None,
            };
            if let Some(reason) = violation {
                return Some((Severity::Warning, true, reason));
            }
        }

        // Rule 5: index removed.
        if let Some(FieldDiff::IndexRemoved(index)) = diffs
            .iter()
            .find(|d| matches!(d, FieldDiff::IndexRemoved(_)))
        {
            return Some((
                Severity::Warning,
                false,
                format!("index '{}' on '{}' is removed", index.name, table),
            ));
        }

        // Everything else (additions, default changes, position changes,
        // widenings) is informational.
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Column, Dialect, Index, PrimaryKey, Table, View};

    fn orders() -> Table {
        Table::new("public", "orders")
            .with_column(Column::new("id", "INT").with_identity())
            .with_column(Column::new("total", "DECIMAL(10,2)"))
            .with_primary_key(PrimaryKey::new(["id"]))
    }

    fn classify_pair(source: SchemaSnapshot, target: SchemaSnapshot) -> Classification {
        let diff = SchemaDiff::compute(&source, &target).unwrap();
        let index = DependencyIndex::build(&target);
        ChangeClassifier::classify(&diff, &target, &index)
    }

    #[test]
    fn test_table_removed_is_critical() {
        let source = SchemaSnapshot::new(Dialect::Postgres).with_table(orders());
        let target = SchemaSnapshot::new(Dialect::Postgres);

        let classification = classify_pair(source, target);
        let breaking = classification.per_change[0].as_ref().unwrap();
        assert_eq!(breaking.severity, Severity::Critical);
        assert!(breaking.data_loss_risk);
        assert!(classification.has_critical());
    }

    #[test]
    fn test_column_removed_is_critical() {
        let mut trimmed = orders();
        trimmed.columns.pop();
        let source = SchemaSnapshot::new(Dialect::Postgres).with_table(orders());
        let target = SchemaSnapshot::new(Dialect::Postgres).with_table(trimmed);

        let classification = classify_pair(source, target);
        let breaking = classification.per_change[0].as_ref().unwrap();
        assert_eq!(breaking.severity, Severity::Critical);
        assert!(breaking.data_loss_risk);
        assert!(breaking.reason.contains("public.orders.total"));
    }

    #[test]
    fn test_type_narrowing_is_critical_widening_is_not() {
        let mut narrowed = orders();
        narrowed.columns[1].data_type = "DECIMAL(6,2)".to_string();
        let source = SchemaSnapshot::new(Dialect::Postgres).with_table(orders());
        let target = SchemaSnapshot::new(Dialect::Postgres).with_table(narrowed);

        let classification = classify_pair(source.clone(), target);
        let breaking = classification.per_change[0].as_ref().unwrap();
        assert_eq!(breaking.severity, Severity::Critical);
        assert!(breaking.data_loss_risk);

        let mut widened = orders();
        widened.columns[1].data_type = "DECIMAL(18,2)".to_string();
        let target = SchemaSnapshot::new(Dialect::Postgres).with_table(widened);
        let classification = classify_pair(source, target);
        assert!(classification.per_change[0].is_none());
    }

    #[test]
    fn test_not_null_without_default_outranks_unique_index() {
        // One modification carrying both a new NOT NULL (no default) and a
        // new unique index; precedence picks the critical rule.
        let before = Table::new("public", "orders")
            .with_column(Column::new("id", "INT"))
            .with_column(Column::nullable("email", "VARCHAR(200)"));
        let after = Table::new("public", "orders")
            .with_column(Column::new("id", "INT"))
            .with_column(Column::new("email", "VARCHAR(200)"))
            .with_index(Index::new("ux_orders_email", ["email"]).unique());

        let source = SchemaSnapshot::new(Dialect::Postgres).with_table(before);
        let target = SchemaSnapshot::new(Dialect::Postgres).with_table(after);

        let classification = classify_pair(source, target);
        let breaking = classification.per_change[0].as_ref().unwrap();
        assert_eq!(breaking.severity, Severity::Critical);
        assert!(breaking.reason.contains("NOT NULL"));
    }

    #[test]
    fn test_added_column_with_default_is_not_breaking() {
        let extended = orders().with_column(
            Column::new("status", "VARCHAR(20)").with_default("'pending'"),
        );
        let source = SchemaSnapshot::new(Dialect::Postgres).with_table(orders());
        let target = SchemaSnapshot::new(Dialect::Postgres).with_table(extended);

        let classification = classify_pair(source, target);
        assert!(classification.per_change[0].is_none());
        assert!(!classification.has_data_loss_risk());
    }

    #[test]
    fn test_index_removed_is_warning() {
        let before = orders().with_index(Index::new("ix_orders_total", ["total"]));
        let source = SchemaSnapshot::new(Dialect::Postgres).with_table(before);
        let target = SchemaSnapshot::new(Dialect::Postgres).with_table(orders());

        let classification = classify_pair(source, target);
        let breaking = classification.per_change[0].as_ref().unwrap();
        assert_eq!(breaking.severity, Severity::Warning);
        assert!(!breaking.data_loss_risk);
    }

    #[test]
    fn test_affected_objects_lists_transitive_dependents() {
        let totals = View::new("public", "order_totals", "SELECT id, total FROM orders")
            .with_dependency(ObjectName::new("public", "orders"));
        let summary = View::new("public", "order_summary", "SELECT * FROM order_totals")
            .with_dependency(ObjectName::new("public", "order_totals"));

        let mut trimmed = orders();
        trimmed.columns.pop();

        let source = SchemaSnapshot::new(Dialect::Postgres)
            .with_table(orders())
            .with_view(totals.clone())
            .with_view(summary.clone());
        let target = SchemaSnapshot::new(Dialect::Postgres)
            .with_table(trimmed)
            .with_view(totals)
            .with_view(summary);

        let classification = classify_pair(source, target);
        let breaking = classification.per_change[0].as_ref().unwrap();
        assert_eq!(
            breaking.affected_objects,
            vec![
                ObjectName::new("public", "order_summary"),
                ObjectName::new("public", "order_totals"),
            ]
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let mut narrowed = orders();
        narrowed.columns[1].data_type = "DECIMAL(6,2)".to_string();
        let source = SchemaSnapshot::new(Dialect::Postgres).with_table(orders());
        let target = SchemaSnapshot::new(Dialect::Postgres).with_table(narrowed);

        let first = classify_pair(source.clone(), target.clone());
        let second = classify_pair(source, target);
        assert_eq!(first, second);
    }
}
