//! Migration engine for schemadrift.
//!
//! This module turns two schema snapshots into an executable migration plan:
//! - Structural diffing into typed changes
//! - Rule-based breaking-change classification with data-loss flags
//! - Dependency-safe step ordering (Kahn's algorithm over an explicit graph)
//! - Dialect-specific forward and rollback script generation
//! - Plan assembly with downtime, duration, and checksum summary
//!
//! # Pipeline
//!
//! | Stage | Entry point | Output |
//! |-------|-------------|--------|
//! | Diff | [`SchemaDiff::compute`] | typed change set |
//! | Classify | [`ChangeClassifier::classify`] | severities + data-loss flags |
//! | Order | [`order`] | dependency-safe steps |
//! | Render | [`ScriptGenerator::render`] | forward/rollback DDL |
//! | Assemble | [`MigrationPlan::assemble`] | final plan artifact |
//!
//! # Example
//!
//! ```
//! use schemadrift_core::migration::MigrationPlan;
//! use schemadrift_core::snapshot::{Column, Dialect, SchemaSnapshot, Table};
//!
//! let source = SchemaSnapshot::new(Dialect::Postgres)
//!     .with_table(Table::new("public", "orders").with_column(Column::new("id", "INT")));
//! let target = SchemaSnapshot::new(Dialect::Postgres).with_table(
//!     Table::new("public", "orders")
//!         .with_column(Column::new("id", "INT"))
//!         .with_column(Column::new("status", "VARCHAR(20)").with_default("'pending'")),
//! );
//!
//! let plan = MigrationPlan::generate(&source, &target)?;
//! assert_eq!(plan.step_count(), 1);
//! # Ok::<(), schemadrift_core::PlanError>(())
//! ```

pub mod classify;
pub mod deps;
pub mod diff;
pub mod graph;
pub mod plan;
pub mod script;

// Diff types
pub use diff::{FieldDiff, ModifiedObject, SchemaChange, SchemaDiff, SchemaObject};

// Classifier types
pub use classify::{BreakingChange, ChangeClassifier, Classification};

// Dependency discovery
pub use deps::{
    routine_dependencies, view_dependencies, DependencyExtractor, DependencyIndex, RegexExtractor,
};

// Ordering
pub use graph::order;

// Script generation
pub use script::{RenderedScripts, ScriptGenerator};

// Plan types
pub use plan::{MigrationPlan, MigrationStep, StepAction, StepId};
