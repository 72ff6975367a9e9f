//! Schemadrift Core - schema diffing, breaking-change analysis, and
//! migration planning.
//!
//! The engine is a pure, synchronous library: it consumes two immutable
//! [`snapshot::SchemaSnapshot`] values built by an external introspection
//! layer and produces a [`migration::MigrationPlan`] for an external
//! executor to apply. It performs no I/O, holds no global state, and yields
//! identical output for identical input, including the plan checksum used
//! for drift detection.

pub mod error;
pub mod migration;
pub mod snapshot;

pub use error::{PlanError, Severity};
pub use migration::{
    BreakingChange, ChangeClassifier, Classification, DependencyExtractor, DependencyIndex,
    FieldDiff, MigrationPlan, MigrationStep, ModifiedObject, RegexExtractor, RenderedScripts,
    SchemaChange, SchemaDiff, SchemaObject, ScriptGenerator, StepAction, StepId,
};
pub use snapshot::{
    Column, Dialect, ForeignKey, Index, ObjectKind, ObjectName, ParamDirection, Parameter,
    PrimaryKey, ReferentialAction, Routine, RoutineKind, SchemaSnapshot, SqlType, Table, View,
};
