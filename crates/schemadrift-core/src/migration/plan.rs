//! Migration plan generation and assembly.
//!
//! `MigrationPlan::generate` runs the whole pipeline: validate and diff the
//! snapshots, build the dependency index, classify breakage, lower changes
//! to ordered steps, render scripts, and assemble the final artifact. The
//! individual stages are public for callers that need to intervene between
//! them.

use super::classify::{BreakingChange, ChangeClassifier, Classification};
use super::deps::DependencyIndex;
use super::diff::{SchemaChange, SchemaDiff, SchemaObject};
use super::graph;
use super::script::ScriptGenerator;
use crate::error::PlanError;
use crate::snapshot::{
    Column, ForeignKey, Index, ObjectKind, ObjectName, PrimaryKey, Routine, SchemaSnapshot, Table,
    View,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Identifier of a step within one plan. Ids are dense and assigned in
/// execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepId(pub u32);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The executable unit a step performs.
///
/// One `SchemaChange` may lower to several actions; most importantly a new
/// table's foreign keys are split into separate `AddForeignKey` actions so
/// mutually-referencing tables can both be created before either constraint
/// is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepAction {
    /// Create a table (foreign keys are attached by separate steps).
    CreateTable {
        /// Table to create.
        table: Table,
    },
    /// Drop a table.
    DropTable {
        /// Table being dropped, kept for rollback rendering.
        table: Table,
    },
    /// Add a column to an existing table.
    AddColumn {
        /// Owning table.
        table: ObjectName,
        /// Column to add.
        column: Column,
    },
    /// Drop a column.
    DropColumn {
        /// Owning table.
        table: ObjectName,
        /// Column being dropped, kept for rollback rendering.
        column: Column,
    },
    /// Change a column's type, nullability, default, or identity property.
    AlterColumn {
        /// Owning table.
        table: ObjectName,
        /// Column as it exists in the source.
        before: Column,
        /// Column as it should exist in the target.
        after: Column,
    },
    /// Add a primary key constraint.
    AddPrimaryKey {
        /// Owning table.
        table: ObjectName,
        /// Key definition.
        pk: PrimaryKey,
    },
    /// Drop a primary key constraint.
    DropPrimaryKey {
        /// Owning table.
        table: ObjectName,
        /// Key being dropped.
        pk: PrimaryKey,
    },
    /// Add a foreign key constraint.
    AddForeignKey {
        /// Owning table.
        table: ObjectName,
        /// Constraint definition.
        fk: ForeignKey,
    },
    /// Drop a foreign key constraint.
    DropForeignKey {
        /// Owning table.
        table: ObjectName,
        /// Constraint being dropped.
        fk: ForeignKey,
    },
    /// Create an index.
    CreateIndex {
        /// Owning table.
        table: ObjectName,
        /// Index definition.
        index: Index,
        /// Whether the build must run online (table pre-exists). Online
        /// builds cannot run inside a transaction.
        online: bool,
    },
    /// Drop an index.
    DropIndex {
        /// Owning table.
        table: ObjectName,
        /// Index being dropped.
        index: Index,
    },
    /// Create a view.
    CreateView {
        /// View to create.
        view: View,
    },
    /// Replace a view definition.
    AlterView {
        /// Definition in the source.
        before: View,
        /// Definition in the target.
        after: View,
    },
    /// Drop a view.
    DropView {
        /// View being dropped.
        view: View,
    },
    /// Create a routine.
    CreateRoutine {
        /// Routine to create.
        routine: Routine,
    },
    /// Replace a routine definition.
    AlterRoutine {
        /// Definition in the source.
        before: Routine,
        /// Definition in the target.
        after: Routine,
    },
    /// Drop a routine.
    DropRoutine {
        /// Routine being dropped.
        routine: Routine,
    },
}

impl StepAction {
    /// Name of the table/view/routine the action operates on.
    pub fn object_name(&self) -> &ObjectName {
        match self {
            StepAction::CreateTable { table } | StepAction::DropTable { table } => &table.name,
            StepAction::AddColumn { table, .. }
            | StepAction::DropColumn { table, .. }
            | StepAction::AlterColumn { table, .. }
            | StepAction::AddPrimaryKey { table, .. }
            | StepAction::DropPrimaryKey { table, .. }
            | StepAction::AddForeignKey { table, .. }
            | StepAction::DropForeignKey { table, .. }
            | StepAction::CreateIndex { table, .. }
            | StepAction::DropIndex { table, .. } => table,
            StepAction::CreateView { view } | StepAction::DropView { view } => &view.name,
            StepAction::AlterView { after, .. } => &after.name,
            StepAction::CreateRoutine { routine } | StepAction::DropRoutine { routine } => {
                &routine.name
            }
            StepAction::AlterRoutine { after, .. } => &after.name,
        }
    }

    /// Kind used as the leading component of the deterministic tie-break
    /// key.
    pub fn kind(&self) -> ObjectKind {
        match self {
            StepAction::CreateTable { .. }
            | StepAction::DropTable { .. }
            | StepAction::AddColumn { .. }
            | StepAction::DropColumn { .. }
            | StepAction::AlterColumn { .. } => ObjectKind::Table,
            StepAction::CreateIndex { .. } | StepAction::DropIndex { .. } => ObjectKind::Index,
            StepAction::AddPrimaryKey { .. }
            | StepAction::DropPrimaryKey { .. }
            | StepAction::AddForeignKey { .. }
            | StepAction::DropForeignKey { .. } => ObjectKind::Constraint,
            StepAction::CreateView { .. }
            | StepAction::AlterView { .. }
            | StepAction::DropView { .. } => ObjectKind::View,
            StepAction::CreateRoutine { .. }
            | StepAction::AlterRoutine { .. }
            | StepAction::DropRoutine { .. } => ObjectKind::Routine,
        }
    }

    /// Short human-readable description.
    pub fn description(&self) -> String {
        match self {
            StepAction::CreateTable { table } => format!("create table '{}'", table.name),
            StepAction::DropTable { table } => format!("drop table '{}'", table.name),
            StepAction::AddColumn { table, column } => {
                format!("add column '{}.{}'", table, column.name)
            }
            StepAction::DropColumn { table, column } => {
                format!("drop column '{}.{}'", table, column.name)
            }
            StepAction::AlterColumn { table, after, .. } => {
                format!("alter column '{}.{}'", table, after.name)
            }
            StepAction::AddPrimaryKey { table, .. } => {
                format!("add primary key on '{}'", table)
            }
            StepAction::DropPrimaryKey { table, .. } => {
                format!("drop primary key on '{}'", table)
            }
            StepAction::AddForeignKey { table, fk } => {
                format!("add foreign key '{}' on '{}'", fk.name, table)
            }
            StepAction::DropForeignKey { table, fk } => {
                format!("drop foreign key '{}' on '{}'", fk.name, table)
            }
            StepAction::CreateIndex { table, index, .. } => {
                format!("create index '{}' on '{}'", index.name, table)
            }
            StepAction::DropIndex { table, index } => {
                format!("drop index '{}' on '{}'", index.name, table)
            }
            StepAction::CreateView { view } => format!("create view '{}'", view.name),
            StepAction::AlterView { after, .. } => format!("alter view '{}'", after.name),
            StepAction::DropView { view } => format!("drop view '{}'", view.name),
            StepAction::CreateRoutine { routine } => {
                format!("create routine '{}'", routine.name)
            }
            StepAction::AlterRoutine { after, .. } => {
                format!("alter routine '{}'", after.name)
            }
            StepAction::DropRoutine { routine } => format!("drop routine '{}'", routine.name),
        }
    }

    /// Whether the action takes an exclusive table lock for the duration of
    /// a potential table rewrite.
    pub fn locks_exclusively(&self) -> bool {
        matches!(
            self,
            StepAction::AlterColumn { before, after, .. }
                if before.data_type != after.data_type
        )
    }
}

/// One ordered, executable unit of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationStep {
    /// Step identifier, dense in execution order.
    pub id: StepId,
    /// The originating change.
    pub change: SchemaChange,
    /// What the step does.
    pub action: StepAction,
    /// Steps that must run before this one.
    pub depends_on: BTreeSet<StepId>,
    /// Whether the step may run inside a transaction. Online index builds
    /// cannot.
    pub transactional: bool,
    /// Forward DDL.
    pub forward_script: String,
    /// Inverse DDL. For data-destroying forwards this restores structure
    /// only and says so in a leading comment.
    pub rollback_script: String,
}

/// The final planning artifact: ordered steps, risk summary, and
/// drift-detection checksum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Steps in execution order.
    pub steps: Vec<MigrationStep>,
    /// All breaking changes, in change order.
    pub breaking_changes: Vec<BreakingChange>,
    /// True when any step is non-transactional or takes an exclusive table
    /// lock.
    pub requires_downtime: bool,
    /// Hex-encoded BLAKE3 hash over the ordered forward scripts. Two plans
    /// with identical forward DDL in identical order share a checksum.
    pub checksum: String,
    /// Deterministic duration heuristic over all steps.
    pub estimated_duration: Duration,
}

impl MigrationPlan {
    /// Run the full planning pipeline over two snapshots.
    pub fn generate(
        source: &SchemaSnapshot,
        target: &SchemaSnapshot,
    ) -> Result<Self, PlanError> {
        let diff = SchemaDiff::compute(source, target)?;
        let index = DependencyIndex::build(target);
        let classification = ChangeClassifier::classify(&diff, target, &index);

        let mut steps = graph::order(&diff, source, target)?;
        for step in &mut steps {
            let scripts = ScriptGenerator::render(step, target.dialect())?;
            step.forward_script = scripts.forward;
            step.rollback_script = scripts.rollback;
        }

        let plan = Self::assemble(steps, &classification);
        tracing::info!(
            steps = plan.steps.len(),
            breaking = plan.breaking_changes.len(),
            requires_downtime = plan.requires_downtime,
            "migration plan assembled"
        );
        Ok(plan)
    }

    /// Assemble a plan from ordered, rendered steps and a classification.
    pub fn assemble(steps: Vec<MigrationStep>, classification: &Classification) -> Self {
        let requires_downtime = steps
            .iter()
            .any(|s| !s.transactional || s.action.locks_exclusively());

        let mut hasher = blake3::Hasher::new();
        for step in &steps {
            hasher.update(step.forward_script.as_bytes());
            hasher.update(b"\n");
        }
        let checksum = hex::encode(hasher.finalize().as_bytes());

        let estimated_duration = steps.iter().map(estimate_step).sum();

        MigrationPlan {
            steps,
            breaking_changes: classification.breaking().cloned().collect(),
            requires_downtime,
            checksum,
            estimated_duration,
        }
    }

    /// Whether the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Whether any breaking change risks data loss.
    pub fn has_data_loss_risk(&self) -> bool {
        self.breaking_changes.iter().any(|b| b.data_loss_risk)
    }
}

/// Per-step duration heuristic: a flat cost per DDL statement plus a
/// row-scaled component for index builds and column rewrites.
fn estimate_step(step: &MigrationStep) -> Duration {
    const BASE: Duration = Duration::from_millis(100);
    const ROWS_PER_MILLI: u64 = 1_000;

    let row_scaled = match &step.action {
        StepAction::CreateIndex { .. } => change_row_count(&step.change),
        StepAction::AlterColumn { before, after, .. }
            if before.data_type != after.data_type =>
        {
            change_row_count(&step.change)
        }
        _ => 0,
    };

    BASE + Duration::from_millis(row_scaled / ROWS_PER_MILLI)
}

fn change_row_count(change: &SchemaChange) -> u64 {
    let object = match change {
        SchemaChange::Added(o) | SchemaChange::Removed(o) => o,
        SchemaChange::Modified(m) => &m.after,
    };
    match object {
        SchemaObject::Table(table) => table.row_count.unwrap_or(0),
        _ => 0,
    }
}
