//! Dependency discovery and the reverse-dependency index.
//!
//! Views and routines carry a `dependencies` set of object identifiers.
//! Introspection tools usually populate it from catalog metadata; when they
//! cannot, [`RegexExtractor`] recovers references heuristically from the
//! definition text. The extraction mechanism sits behind the
//! [`DependencyExtractor`] trait so diffing and ordering stay agnostic of
//! how dependencies were discovered.

use crate::snapshot::{ObjectName, Routine, SchemaSnapshot, View};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Capability interface for discovering object references in definition
/// text.
pub trait DependencyExtractor {
    /// Extract the set of objects referenced by `definition`.
    fn extract(&self, definition: &str) -> BTreeSet<ObjectName>;
}

/// Heuristic extractor: scans table-position keywords (`FROM`, `JOIN`,
/// `INTO`, `UPDATE`, `EXEC`, `CALL`) for a following identifier, optionally
/// schema-qualified and quoted in either dialect's style.
///
/// Unqualified references are resolved against a default schema. The
/// heuristic deliberately over-approximates; dangling references are
/// tolerated downstream.
pub struct RegexExtractor {
    pattern: Regex,
    default_schema: String,
}

impl RegexExtractor {
    /// Create an extractor resolving unqualified names against
    /// `default_schema`.
    pub fn new(default_schema: impl Into<String>) -> Self {
        let ident = r#"(?:"[^"]+"|\[[^\]]+\]|[A-Za-z_][A-Za-z0-9_]*)"#;
        let pattern = format!(
            r"(?i)\b(?:FROM|JOIN|INTO|UPDATE|EXEC(?:UTE)?|CALL)\s+({ident}(?:\.{ident})?)"
        );
        Self {
            // The pattern is assembled from literals above.
            pattern: Regex::new(&pattern).expect("reference pattern compiles"),
            default_schema: default_schema.into(),
        }
    }

    fn unquote(part: &str) -> &str {
        part.trim_matches(|c| c == '"' || c == '[' || c == ']')
    }
}

impl DependencyExtractor for RegexExtractor {
    fn extract(&self, definition: &str) -> BTreeSet<ObjectName> {
        let mut found = BTreeSet::new();
        for capture in self.pattern.captures_iter(definition) {
            let reference = &capture[1];
            let name = match reference.split_once('.') {
                Some((schema, name)) => {
                    ObjectName::new(Self::unquote(schema), Self::unquote(name))
                }
                None => ObjectName::new(&self.default_schema, Self::unquote(reference)),
            };
            found.insert(name);
        }
        found
    }
}

/// A view's recorded dependencies, falling back to heuristic extraction when
/// introspection left the set empty.
pub fn view_dependencies(view: &View) -> BTreeSet<ObjectName> {
    if view.dependencies.is_empty() {
        RegexExtractor::new(&view.name.schema).extract(&view.definition)
    } else {
        view.dependencies.clone()
    }
}

/// A routine's recorded dependencies, falling back to heuristic extraction
/// when introspection left the set empty.
pub fn routine_dependencies(routine: &Routine) -> BTreeSet<ObjectName> {
    if routine.dependencies.is_empty() {
        RegexExtractor::new(&routine.name.schema).extract(&routine.definition)
    } else {
        routine.dependencies.clone()
    }
}

/// Reverse adjacency over view/routine dependency sets: for each object, the
/// set of objects whose definitions reference it.
///
/// Built once per target snapshot; classification consumes it for impact
/// analysis and the scheduler for drop ordering.
#[derive(Debug, Clone)]
pub struct DependencyIndex {
    dependents: BTreeMap<ObjectName, BTreeSet<ObjectName>>,
}

impl DependencyIndex {
    /// Build the index from a snapshot's view and routine dependency sets
    /// (heuristically extracted where empty).
    pub fn build(snapshot: &SchemaSnapshot) -> Self {
        let mut dependents: BTreeMap<ObjectName, BTreeSet<ObjectName>> = BTreeMap::new();
        for view in snapshot.views().values() {
            for dependency in view_dependencies(view) {
                dependents
                    .entry(dependency)
                    .or_default()
                    .insert(view.name.clone());
            }
        }
        for routine in snapshot.routines().values() {
            for dependency in routine_dependencies(routine) {
                dependents
                    .entry(dependency)
                    .or_default()
                    .insert(routine.name.clone());
            }
        }
        Self { dependents }
    }

    /// Objects directly referencing `name`.
    pub fn dependents_of(&self, name: &ObjectName) -> impl Iterator<Item = &ObjectName> {
        self.dependents.get(name).into_iter().flatten()
    }

    /// Transitive closure of dependents of `name`, in name order.
    pub fn transitive_dependents_of(&self, name: &ObjectName) -> BTreeSet<ObjectName> {
        let mut closure = BTreeSet::new();
        let mut queue: VecDeque<&ObjectName> = self.dependents_of(name).collect();
        while let Some(current) = queue.pop_front() {
            if closure.insert(current.clone()) {
                queue.extend(self.dependents_of(current));
            }
        }
        closure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Column, Dialect, Table, View};

    #[test]
    fn test_extract_qualified_and_bare_references() {
        let extractor = RegexExtractor::new("public");
        let refs = extractor.extract(
            "SELECT o.id, c.name FROM sales.orders o JOIN customers c ON c.id = o.customer_id",
        );

        assert!(refs.contains(&ObjectName::new("sales", "orders")));
        assert!(refs.contains(&ObjectName::new("public", "customers")));
    }

    #[test]
    fn test_extract_quoted_references() {
        let extractor = RegexExtractor::new("dbo");
        let refs = extractor
            .extract("UPDATE [dbo].[Order Lines] SET qty = 0; EXEC \"audit\".\"log_change\"");

        assert!(refs.contains(&ObjectName::new("dbo", "Order Lines")));
        assert!(refs.contains(&ObjectName::new("audit", "log_change")));
    }

    #[test]
    fn test_transitive_dependents() {
        let orders = Table::new("public", "orders").with_column(Column::new("id", "INT"));
        let totals = View::new("public", "order_totals", "SELECT id FROM orders")
            .with_dependency(ObjectName::new("public", "orders"));
        let summary = View::new("public", "order_summary", "SELECT * FROM order_totals")
            .with_dependency(ObjectName::new("public", "order_totals"));

        let snapshot = SchemaSnapshot::new(Dialect::Postgres)
            .with_table(orders)
            .with_view(totals)
            .with_view(summary);

        let index = DependencyIndex::build(&snapshot);
        let closure = index.transitive_dependents_of(&ObjectName::new("public", "orders"));

        assert!(closure.contains(&ObjectName::new("public", "order_totals")));
        assert!(closure.contains(&ObjectName::new("public", "order_summary")));
        assert_eq!(closure.len(), 2);
    }

    #[test]
    fn test_index_falls_back_to_extraction_for_empty_sets() {
        // Introspection did not populate the dependency set; the index
        // recovers the reference from the definition text.
        let orders = Table::new("public", "orders").with_column(Column::new("id", "INT"));
        let view = View::new("public", "order_totals", "SELECT id FROM orders");
        assert!(view.dependencies.is_empty());

        let snapshot = SchemaSnapshot::new(Dialect::Postgres)
            .with_table(orders)
            .with_view(view);
        let index = DependencyIndex::build(&snapshot);

        let dependents: Vec<_> = index
            .dependents_of(&ObjectName::new("public", "orders"))
            .collect();
        assert_eq!(dependents, vec![&ObjectName::new("public", "order_totals")]);
    }

    #[test]
    fn test_no_dependents() {
        let snapshot = SchemaSnapshot::new(Dialect::Postgres);
        let index = DependencyIndex::build(&snapshot);
        assert!(index
            .transitive_dependents_of(&ObjectName::new("public", "orders"))
            .is_empty());
    }
}
