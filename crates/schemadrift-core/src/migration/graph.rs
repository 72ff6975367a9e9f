//! Step lowering, dependency graph construction, and topological ordering.
//!
//! Changes are lowered to fine-grained step actions, a directed dependency
//! graph is built over them as an explicit arena (node and edge arrays, no
//! object references), and Kahn's algorithm emits a deterministic execution
//! order. Ties among ready nodes break by `(object kind, schema, name)` with
//! an action rank as the final disambiguator.
//!
//! Foreign keys are never part of table-creation steps: tables are created
//! first and constraints attached in a second pass, so two
//! mutually-referencing tables can both be created without a cycle. Drops
//! run in the reverse direction: a drop of X waits for the removal or
//! rewrite of everything that depends on X.

use super::deps::{self, DependencyIndex};
use super::diff::{FieldDiff, SchemaChange, SchemaDiff, SchemaObject};
use super::plan::{MigrationStep, StepAction, StepId};
use crate::error::PlanError;
use crate::snapshot::{ObjectName, SchemaSnapshot, Table};
use std::collections::{BTreeMap, BTreeSet};

struct Node {
    action: StepAction,
    change_index: usize,
}

/// Order the diff's changes into a dependency-safe step sequence.
///
/// Fails with [`PlanError::CyclicDependency`] carrying the minimal cycle
/// when no valid order exists. Scripts are left empty; the generator stage
/// fills them.
pub fn order(
    diff: &SchemaDiff,
    source: &SchemaSnapshot,
    _target: &SchemaSnapshot,
) -> Result<Vec<MigrationStep>, PlanError> {
    let nodes = lower(diff, source);
    let preds = build_edges(&nodes, source);
    let sequence = kahn_sort(&nodes, &preds)?;

    let mut position = vec![0u32; nodes.len()];
    for (pos, &idx) in sequence.iter().enumerate() {
        position[idx] = pos as u32;
    }

    let steps: Vec<MigrationStep> = sequence
        .iter()
        .map(|&idx| {
            let node = &nodes[idx];
            let transactional = !matches!(
                node.action,
                StepAction::CreateIndex { online: true, .. }
            );
            MigrationStep {
                id: StepId(position[idx]),
                change: diff.changes[node.change_index].clone(),
                action: node.action.clone(),
                depends_on: preds[idx].iter().map(|&p| StepId(position[p])).collect(),
                transactional,
                forward_script: String::new(),
                rollback_script: String::new(),
            }
        })
        .collect();

    tracing::debug!(steps = steps.len(), "changes ordered");
    Ok(steps)
}

/// Lower changes to step actions. One change may yield several steps.
fn lower(diff: &SchemaDiff, source: &SchemaSnapshot) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut push = |action: StepAction, change_index: usize| {
        nodes.push(Node {
            action,
            change_index,
        })
    };

    for (change_index, change) in diff.changes.iter().enumerate() {
        match change {
            SchemaChange::Added(SchemaObject::Table(table)) => {
                push(
                    StepAction::CreateTable {
                        table: table.clone(),
                    },
                    change_index,
                );
                for index in &table.indexes {
                    push(
                        StepAction::CreateIndex {
                            table: table.name.clone(),
                            index: index.clone(),
                            online: false,
                        },
                        change_index,
                    );
                }
                for fk in &table.foreign_keys {
                    push(
                        StepAction::AddForeignKey {
                            table: table.name.clone(),
                            fk: fk.clone(),
                        },
                        change_index,
                    );
                }
            }

            SchemaChange::Removed(SchemaObject::Table(table)) => {
                // Constraints first; indexes die with the table.
                for fk in &table.foreign_keys {
                    push(
                        StepAction::DropForeignKey {
                            table: table.name.clone(),
                            fk: fk.clone(),
                        },
                        change_index,
                    );
                }
                push(
                    StepAction::DropTable {
                        table: table.clone(),
                    },
                    change_index,
                );
            }

            SchemaChange::Added(SchemaObject::View(view)) => {
                push(StepAction::CreateView { view: view.clone() }, change_index);
            }
            SchemaChange::Removed(SchemaObject::View(view)) => {
                push(StepAction::DropView { view: view.clone() }, change_index);
            }
            SchemaChange::Added(SchemaObject::Routine(routine)) => {
                push(
                    StepAction::CreateRoutine {
                        routine: routine.clone(),
                    },
                    change_index,
                );
            }
            SchemaChange::Removed(SchemaObject::Routine(routine)) => {
                push(
                    StepAction::DropRoutine {
                        routine: routine.clone(),
                    },
                    change_index,
                );
            }

            SchemaChange::Modified(modified) => match (&modified.before, &modified.after) {
                (SchemaObject::Table(before), SchemaObject::Table(after)) => {
                    lower_table_modification(
                        modified.field_diffs.as_slice(),
                        before,
                        after,
                        source,
                        change_index,
                        &mut push,
                    );
                }
                (SchemaObject::View(before), SchemaObject::View(after)) => {
                    push(
                        StepAction::AlterView {
                            before: before.clone(),
                            after: after.clone(),
                        },
                        change_index,
                    );
                }
                (SchemaObject::Routine(before), SchemaObject::Routine(after)) => {
                    push(
                        StepAction::AlterRoutine {
                            before: before.clone(),
                            after: after.clone(),
                        },
                        change_index,
                    );
                }
                // Kinds never change within a Modified entry; the diff keys
                // objects by kind.
                _ => {}
            },
        }
    }

    nodes
}

fn lower_table_modification(
    diffs: &[FieldDiff],
    before: &Table,
    after: &Table,
    source: &SchemaSnapshot,
    change_index: usize,
    push: &mut impl FnMut(StepAction, usize),
) {
    let table = after.name.clone();
    // An index added to a table that pre-exists must be built online.
    let online = source.get_table(&table).is_some();

    let mut altered_columns = BTreeSet::new();

    for diff in diffs {
        match diff {
            FieldDiff::ColumnAdded(column) => push(
                StepAction::AddColumn {
                    table: table.clone(),
                    column: column.clone(),
                },
                change_index,
            ),
            FieldDiff::ColumnRemoved(column) => push(
                StepAction::DropColumn {
                    table: table.clone(),
                    column: column.clone(),
                },
                change_index,
            ),
            FieldDiff::ColumnTypeChanged { column, .. }
            | FieldDiff::ColumnNullabilityChanged { column, .. }
            | FieldDiff::ColumnDefaultChanged { column, .. }
            | FieldDiff::ColumnIdentityChanged { column, .. } => {
                altered_columns.insert(column.clone());
            }
            // Not executable; neither dialect reorders columns in place.
            FieldDiff::ColumnPositionChanged { .. } => {}
            FieldDiff::PrimaryKeyChanged { from, to } => {
                if let Some(pk) = from {
                    push(
                        StepAction::DropPrimaryKey {
                            table: table.clone(),
                            pk: pk.clone(),
                        },
                        change_index,
                    );
                }
                if let Some(pk) = to {
                    push(
                        StepAction::AddPrimaryKey {
                            table: table.clone(),
                            pk: pk.clone(),
                        },
                        change_index,
                    );
                }
            }
            FieldDiff::ForeignKeyAdded(fk) => push(
                StepAction::AddForeignKey {
                    table: table.clone(),
                    fk: fk.clone(),
                },
                change_index,
            ),
            FieldDiff::ForeignKeyRemoved(fk) => push(
                StepAction::DropForeignKey {
                    table: table.clone(),
                    fk: fk.clone(),
                },
                change_index,
            ),
            FieldDiff::IndexAdded(index) => push(
                StepAction::CreateIndex {
                    table: table.clone(),
                    index: index.clone(),
                    online,
                },
                change_index,
            ),
            FieldDiff::IndexRemoved(index) => push(
                StepAction::DropIndex {
                    table: table.clone(),
                    index: index.clone(),
                },
                change_index,
            ),
            FieldDiff::DefinitionChanged => {}
        }
    }

    // One AlterColumn step per column, aggregating all its attribute diffs.
    for column in altered_columns {
        if let (Some(from), Some(to)) = (before.get_column(&column), after.get_column(&column)) {
            push(
                StepAction::AlterColumn {
                    table: table.clone(),
                    before: from.clone(),
                    after: to.clone(),
                },
                change_index,
            );
        }
    }
}

/// Build predecessor sets for every node.
fn build_edges(nodes: &[Node], source: &SchemaSnapshot) -> Vec<BTreeSet<usize>> {
    let mut preds: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];

    // Lookup maps over the step set.
    let mut create_table: BTreeMap<ObjectName, usize> = BTreeMap::new();
    let mut add_column: BTreeMap<(ObjectName, String), usize> = BTreeMap::new();
    let mut drop_fk: BTreeMap<(ObjectName, String), usize> = BTreeMap::new();
    let mut drop_index: BTreeMap<(ObjectName, String), usize> = BTreeMap::new();
    let mut drop_pk: BTreeMap<ObjectName, usize> = BTreeMap::new();
    let mut create_modify: BTreeMap<ObjectName, Vec<usize>> = BTreeMap::new();
    let mut drop_rewrite: BTreeMap<ObjectName, Vec<usize>> = BTreeMap::new();

    for (idx, node) in nodes.iter().enumerate() {
        match &node.action {
            StepAction::CreateTable { table } => {
                create_table.insert(table.name.clone(), idx);
                create_modify.entry(table.name.clone()).or_default().push(idx);
            }
            StepAction::AddColumn { table, column } => {
                add_column.insert((table.clone(), column.name.clone()), idx);
                create_modify.entry(table.clone()).or_default().push(idx);
            }
            StepAction::AlterColumn { table, .. } => {
                create_modify.entry(table.clone()).or_default().push(idx);
            }
            StepAction::DropForeignKey { table, fk } => {
                drop_fk.insert((table.clone(), fk.name.clone()), idx);
            }
            StepAction::DropIndex { table, index } => {
                drop_index.insert((table.clone(), index.name.clone()), idx);
            }
            StepAction::DropPrimaryKey { table, .. } => {
                drop_pk.insert(table.clone(), idx);
            }
            StepAction::CreateView { view } => {
                create_modify.entry(view.name.clone()).or_default().push(idx);
            }
            StepAction::AlterView { after, .. } => {
                create_modify.entry(after.name.clone()).or_default().push(idx);
                drop_rewrite.entry(after.name.clone()).or_default().push(idx);
            }
            StepAction::CreateRoutine { routine } => {
                create_modify
                    .entry(routine.name.clone())
                    .or_default()
                    .push(idx);
            }
            StepAction::AlterRoutine { after, .. } => {
                create_modify.entry(after.name.clone()).or_default().push(idx);
                drop_rewrite.entry(after.name.clone()).or_default().push(idx);
            }
            StepAction::DropView { view } => {
                drop_rewrite.entry(view.name.clone()).or_default().push(idx);
            }
            StepAction::DropRoutine { routine } => {
                drop_rewrite
                    .entry(routine.name.clone())
                    .or_default()
                    .push(idx);
            }
            _ => {}
        }
    }

    // Creation ordering among new tables referenced by foreign keys. A
    // mutual (transitive) reference suppresses the edge on both sides; the
    // FK-addition split makes it safe, and adding it would manufacture the
    // very cycle the split exists to avoid.
    let mut table_refs: BTreeMap<ObjectName, BTreeSet<ObjectName>> = BTreeMap::new();
    for node in nodes {
        if let StepAction::CreateTable { table } = &node.action {
            let refs = table
                .foreign_keys
                .iter()
                .filter(|fk| {
                    fk.referenced_table != table.name
                        && create_table.contains_key(&fk.referenced_table)
                })
                .map(|fk| fk.referenced_table.clone())
                .collect();
            table_refs.insert(table.name.clone(), refs);
        }
    }
    for (table, refs) in &table_refs {
        for referenced in refs {
            if !references_transitively(&table_refs, referenced, table) {
                preds[create_table[table]].insert(create_table[referenced]);
            }
        }
    }

    // Dependents of objects as they exist before the migration, for drop
    // ordering.
    let source_index = DependencyIndex::build(source);

    for (idx, node) in nodes.iter().enumerate() {
        let mut incoming = std::mem::take(&mut preds[idx]);
        match &node.action {
            StepAction::AddForeignKey { table, fk } => {
                if let Some(&dep) = create_table.get(table) {
                    incoming.insert(dep);
                }
                if let Some(&dep) = create_table.get(&fk.referenced_table) {
                    incoming.insert(dep);
                }
                for column in &fk.columns {
                    if let Some(&dep) = add_column.get(&(table.clone(), column.clone())) {
                        incoming.insert(dep);
                    }
                }
                for column in &fk.referenced_columns {
                    if let Some(&dep) =
                        add_column.get(&(fk.referenced_table.clone(), column.clone()))
                    {
                        incoming.insert(dep);
                    }
                }
                // A redefined constraint drops before it is re-added.
                if let Some(&dep) = drop_fk.get(&(table.clone(), fk.name.clone())) {
                    incoming.insert(dep);
                }
            }

            StepAction::AddColumn { table, .. } => {
                if let Some(&dep) = create_table.get(table) {
                    incoming.insert(dep);
                }
            }

            StepAction::AddPrimaryKey { table, pk } => {
                if let Some(&dep) = create_table.get(table) {
                    incoming.insert(dep);
                }
                for column in &pk.columns {
                    if let Some(&dep) = add_column.get(&(table.clone(), column.clone())) {
                        incoming.insert(dep);
                    }
                }
                if let Some(&dep) = drop_pk.get(table) {
                    incoming.insert(dep);
                }
            }

            StepAction::CreateIndex { table, index, .. } => {
                if let Some(&dep) = create_table.get(table) {
                    incoming.insert(dep);
                }
                for column in &index.columns {
                    if let Some(&dep) = add_column.get(&(table.clone(), column.clone())) {
                        incoming.insert(dep);
                    }
                }
                if let Some(&dep) = drop_index.get(&(table.clone(), index.name.clone())) {
                    incoming.insert(dep);
                }
            }

            StepAction::CreateView { view } | StepAction::AlterView { after: view, .. } => {
                for dependency in deps::view_dependencies(view) {
                    if let Some(steps) = create_modify.get(&dependency) {
                        incoming.extend(steps.iter().copied().filter(|&s| s != idx));
                    }
                }
            }
            StepAction::CreateRoutine { routine }
            | StepAction::AlterRoutine { after: routine, .. } => {
                for dependency in deps::routine_dependencies(routine) {
                    if let Some(steps) = create_modify.get(&dependency) {
                        incoming.extend(steps.iter().copied().filter(|&s| s != idx));
                    }
                }
            }

            StepAction::DropTable { table } => {
                // Every foreign key pointing at the table goes first.
                for (jdx, other) in nodes.iter().enumerate() {
                    if let StepAction::DropForeignKey { fk, .. } = &other.action {
                        if fk.referenced_table == table.name {
                            incoming.insert(jdx);
                        }
                    }
                }
                dependent_rewrite_steps(&source_index, &drop_rewrite, &table.name, &mut incoming);
            }

            StepAction::DropColumn { table, column } => {
                // Indexes and constraints built on the column go first.
                for (jdx, other) in nodes.iter().enumerate() {
                    match &other.action {
                        StepAction::DropIndex {
                            table: index_table,
                            index,
                        } if index_table == table && index.columns.contains(&column.name) => {
                            incoming.insert(jdx);
                        }
                        StepAction::DropForeignKey {
                            table: fk_table,
                            fk,
                        } if (fk_table == table && fk.columns.contains(&column.name))
                            || (fk.referenced_table == *table
                                && fk.referenced_columns.contains(&column.name)) =>
                        {
                            incoming.insert(jdx);
                        }
                        StepAction::DropPrimaryKey {
                            table: pk_table,
                            pk,
                        } if pk_table == table && pk.columns.contains(&column.name) => {
                            incoming.insert(jdx);
                        }
                        _ => {}
                    }
                }
                dependent_rewrite_steps(&source_index, &drop_rewrite, table, &mut incoming);
            }

            StepAction::DropView { view } => {
                dependent_rewrite_steps(&source_index, &drop_rewrite, &view.name, &mut incoming);
            }
            StepAction::DropRoutine { routine } => {
                dependent_rewrite_steps(
                    &source_index,
                    &drop_rewrite,
                    &routine.name,
                    &mut incoming,
                );
            }

            _ => {}
        }
        incoming.remove(&idx);
        preds[idx] = incoming;
    }

    preds
}

/// Steps that remove or rewrite the dependents of `name`; they must run
/// before `name` itself is dropped or trimmed.
fn dependent_rewrite_steps(
    source_index: &DependencyIndex,
    drop_rewrite: &BTreeMap<ObjectName, Vec<usize>>,
    name: &ObjectName,
    incoming: &mut BTreeSet<usize>,
) {
    for dependent in source_index.dependents_of(name) {
        if let Some(steps) = drop_rewrite.get(dependent) {
            incoming.extend(steps.iter().copied());
        }
    }
}

fn references_transitively(
    refs: &BTreeMap<ObjectName, BTreeSet<ObjectName>>,
    from: &ObjectName,
    to: &ObjectName,
) -> bool {
    let mut visited = BTreeSet::new();
    let mut stack = vec![from];
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(next) = refs.get(current) {
            stack.extend(next.iter());
        }
    }
    false
}

/// Kahn's algorithm with a deterministic ready set.
fn kahn_sort(nodes: &[Node], preds: &[BTreeSet<usize>]) -> Result<Vec<usize>, PlanError> {
    let n = nodes.len();
    let mut succs: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree = vec![0usize; n];
    for (to, incoming) in preds.iter().enumerate() {
        indegree[to] = incoming.len();
        for &from in incoming {
            succs[from].push(to);
        }
    }

    let sort_key = |idx: usize| {
        let action = &nodes[idx].action;
        let name = action.object_name();
        (
            action.kind(),
            name.schema.clone(),
            name.name.clone(),
            action_rank(action),
        )
    };

    let mut ready: BTreeSet<_> = (0..n)
        .filter(|&idx| indegree[idx] == 0)
        .map(|idx| (sort_key(idx), idx))
        .collect();

    let mut sequence = Vec::with_capacity(n);
    while let Some(entry) = ready.iter().next().cloned() {
        ready.remove(&entry);
        let idx = entry.1;
        sequence.push(idx);
        for &succ in &succs[idx] {
            indegree[succ] -= 1;
            if indegree[succ] == 0 {
                ready.insert((sort_key(succ), succ));
            }
        }
    }

    if sequence.len() < n {
        let remaining: BTreeSet<usize> = (0..n).filter(|&idx| indegree[idx] > 0).collect();
        return Err(PlanError::CyclicDependency {
            cycle: find_cycle(nodes, &succs, &remaining),
        });
    }
    Ok(sequence)
}

/// Recover a minimal cycle among the remaining nodes via DFS back-edge
/// detection.
fn find_cycle(nodes: &[Node], succs: &[Vec<usize>], remaining: &BTreeSet<usize>) -> Vec<ObjectName> {
    let mut color = vec![0u8; nodes.len()];
    let mut stack = Vec::new();

    for &start in remaining {
        if color[start] == 0 {
            if let Some(cycle) = dfs_cycle(start, succs, remaining, &mut color, &mut stack) {
                let mut names: Vec<ObjectName> = cycle
                    .iter()
                    .map(|&idx| nodes[idx].action.object_name().clone())
                    .collect();
                names.dedup();
                return names;
            }
        }
    }
    Vec::new()
}

fn dfs_cycle(
    node: usize,
    succs: &[Vec<usize>],
    remaining: &BTreeSet<usize>,
    color: &mut Vec<u8>,
    stack: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    color[node] = 1;
    stack.push(node);
    for &succ in &succs[node] {
        if !remaining.contains(&succ) {
            continue;
        }
        if color[succ] == 0 {
            if let Some(cycle) = dfs_cycle(succ, succs, remaining, color, stack) {
                return Some(cycle);
            }
        } else if color[succ] == 1 {
            // Back edge: the cycle is the stack suffix from succ.
            let from = stack.iter().position(|&x| x == succ).unwrap_or(0);
            return Some(stack[from..].to_vec());
        }
    }
    stack.pop();
    color[node] = 2;
    None
}

fn action_rank(action: &StepAction) -> u8 {
    match action {
        StepAction::DropForeignKey { .. } => 0,
        StepAction::DropIndex { .. } => 1,
        StepAction::DropPrimaryKey { .. } => 2,
        StepAction::DropView { .. } => 3,
        StepAction::DropRoutine { .. } => 4,
        StepAction::DropColumn { .. } => 5,
        StepAction::DropTable { .. } => 6,
        StepAction::CreateTable { .. } => 7,
        StepAction::AddColumn { .. } => 8,
        StepAction::AlterColumn { .. } => 9,
        StepAction::AddPrimaryKey { .. } => 10,
        StepAction::CreateIndex { .. } => 11,
        StepAction::AddForeignKey { .. } => 12,
        StepAction::CreateView { .. } => 13,
        StepAction::AlterView { .. } => 14,
        StepAction::CreateRoutine { .. } => 15,
        StepAction::AlterRoutine { .. } => 16,
    }
}
