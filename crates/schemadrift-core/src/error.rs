//! Engine error types.
//!
//! Every failure the engine can produce is deterministic for a given input
//! pair, so tests may assert exact error identity.

use crate::snapshot::{Dialect, ObjectName};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity of a breaking change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// May break callers or require validation; does not destroy data by
    /// itself.
    Warning,
    /// Destroys data or is guaranteed to break existing callers.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Errors produced while diffing snapshots or building a migration plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A snapshot is internally inconsistent.
    #[error("invalid snapshot: {object}: {reason}")]
    InvalidSnapshot {
        /// The offending object.
        object: ObjectName,
        /// What is wrong with it.
        reason: String,
    },

    /// The two snapshots target different dialects.
    #[error("dialect mismatch: source is {source}, target is {target}")]
    DialectMismatch {
        /// Source snapshot dialect.
        source: Dialect,
        /// Target snapshot dialect.
        target: Dialect,
    },

    /// No valid execution order exists for the change set.
    #[error("cyclic dependency: {}", format_cycle(.cycle))]
    CyclicDependency {
        /// The minimal cycle, as object identifiers in traversal order.
        cycle: Vec<ObjectName>,
    },

    /// A change has no script-generation rule for the requested dialect.
    #[error("unsupported change for {dialect}: {change}")]
    UnsupportedChange {
        /// Description of the change.
        change: String,
        /// Dialect it could not be rendered for.
        dialect: Dialect,
    },
}

fn format_cycle(cycle: &[ObjectName]) -> String {
    cycle
        .iter()
        .map(|name| name.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Warning < Severity::Critical);
    }

    #[test]
    fn test_cycle_display() {
        let err = PlanError::CyclicDependency {
            cycle: vec![
                ObjectName::new("public", "a"),
                ObjectName::new("public", "b"),
            ],
        };
        assert_eq!(err.to_string(), "cyclic dependency: public.a -> public.b");
    }

    #[test]
    fn test_invalid_snapshot_display() {
        let err = PlanError::InvalidSnapshot {
            object: ObjectName::new("public", "orders"),
            reason: "foreign key 'fk_x' references missing table".to_string(),
        };
        assert!(err.to_string().contains("public.orders"));
    }
}
