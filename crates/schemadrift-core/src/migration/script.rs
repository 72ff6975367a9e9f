//! Dialect-specific DDL rendering.
//!
//! Renders each step's forward script and its semantic inverse. Forward
//! changes that destroy data (dropped tables and columns, narrowing type
//! changes) still get a structure-restoring rollback, but the script opens
//! with a comment stating that the lost values are unrecoverable. Emitting
//! that comment is part of the generator's contract, not cosmetics.
//!
//! Constructs with no rendering rule for the requested dialect fail with
//! [`PlanError::UnsupportedChange`] instead of producing wrong DDL.

use super::plan::{MigrationStep, StepAction};
use crate::error::PlanError;
use crate::snapshot::{
    Column, Dialect, ForeignKey, Index, ObjectName, ParamDirection, PrimaryKey, ReferentialAction,
    Routine, RoutineKind, SqlType, Table, View,
};

/// Forward and rollback DDL for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedScripts {
    /// DDL applying the change.
    pub forward: String,
    /// DDL reverting the change.
    pub rollback: String,
}

/// Renders steps into dialect-appropriate DDL.
pub struct ScriptGenerator;

impl ScriptGenerator {
    /// Render the forward and rollback scripts for a step.
    pub fn render(step: &MigrationStep, dialect: Dialect) -> Result<RenderedScripts, PlanError> {
        match &step.action {
            StepAction::CreateTable { table } => Ok(RenderedScripts {
                forward: create_table_ddl(dialect, table),
                rollback: drop_table_ddl(dialect, &table.name),
            }),

            StepAction::DropTable { table } => {
                let mut rollback = vec![format!(
                    "-- Data loss: rows previously stored in {} cannot be restored.",
                    quote_object(dialect, &table.name)
                )];
                rollback.push(create_table_ddl(dialect, table));
                for index in &table.indexes {
                    rollback.push(create_index_ddl(dialect, &table.name, index, false));
                }
                Ok(RenderedScripts {
                    forward: drop_table_ddl(dialect, &table.name),
                    rollback: rollback.join("\n"),
                })
            }

            StepAction::AddColumn { table, column } => Ok(RenderedScripts {
                forward: add_column_ddl(dialect, table, column),
                rollback: drop_column_ddl(dialect, table, &column.name),
            }),

            StepAction::DropColumn { table, column } => Ok(RenderedScripts {
                forward: drop_column_ddl(dialect, table, &column.name),
                rollback: format!(
                    "-- Data loss: values previously stored in {}.{} cannot be restored.\n{}",
                    quote_object(dialect, table),
                    quote_ident(dialect, &column.name),
                    add_column_ddl(dialect, table, column)
                ),
            }),

            StepAction::AlterColumn {
                table,
                before,
                after,
            } => render_alter_column(step, dialect, table, before, after),

            StepAction::AddPrimaryKey { table, pk } => Ok(RenderedScripts {
                forward: add_primary_key_ddl(dialect, table, pk),
                rollback: drop_primary_key_ddl(dialect, table, pk),
            }),

            StepAction::DropPrimaryKey { table, pk } => Ok(RenderedScripts {
                forward: drop_primary_key_ddl(dialect, table, pk),
                rollback: add_primary_key_ddl(dialect, table, pk),
            }),

            StepAction::AddForeignKey { table, fk } => Ok(RenderedScripts {
                forward: add_foreign_key_ddl(dialect, table, fk),
                rollback: drop_constraint_ddl(dialect, table, &fk.name),
            }),

            StepAction::DropForeignKey { table, fk } => Ok(RenderedScripts {
                forward: drop_constraint_ddl(dialect, table, &fk.name),
                rollback: add_foreign_key_ddl(dialect, table, fk),
            }),

            StepAction::CreateIndex {
                table,
                index,
                online,
            } => Ok(RenderedScripts {
                forward: create_index_ddl(dialect, table, index, *online),
                rollback: drop_index_ddl(dialect, table, &index.name),
            }),

            StepAction::DropIndex { table, index } => Ok(RenderedScripts {
                forward: drop_index_ddl(dialect, table, &index.name),
                rollback: create_index_ddl(dialect, table, index, false),
            }),

            StepAction::CreateView { view } => Ok(RenderedScripts {
                forward: create_view_ddl(dialect, view, false),
                rollback: drop_view_ddl(dialect, &view.name),
            }),

            StepAction::AlterView { before, after } => Ok(RenderedScripts {
                forward: create_view_ddl(dialect, after, true),
                rollback: create_view_ddl(dialect, before, true),
            }),

            StepAction::DropView { view } => Ok(RenderedScripts {
                forward: drop_view_ddl(dialect, &view.name),
                rollback: create_view_ddl(dialect, view, false),
            }),

            StepAction::CreateRoutine { routine } => Ok(RenderedScripts {
                forward: routine_definition_ddl(routine),
                rollback: drop_routine_ddl(dialect, routine),
            }),

            StepAction::AlterRoutine { before, after } => Ok(RenderedScripts {
                forward: format!(
                    "{}\n{}",
                    drop_routine_ddl(dialect, before),
                    routine_definition_ddl(after)
                ),
                rollback: format!(
                    "{}\n{}",
                    drop_routine_ddl(dialect, after),
                    routine_definition_ddl(before)
                ),
            }),

            StepAction::DropRoutine { routine } => Ok(RenderedScripts {
                forward: drop_routine_ddl(dialect, routine),
                rollback: routine_definition_ddl(routine),
            }),
        }
    }
}

fn render_alter_column(
    step: &MigrationStep,
    dialect: Dialect,
    table: &ObjectName,
    before: &Column,
    after: &Column,
) -> Result<RenderedScripts, PlanError> {
    if before.identity != after.identity && dialect == Dialect::SqlServer {
        // SQL Server cannot toggle the identity property of an existing
        // column.
        return Err(PlanError::UnsupportedChange {
            change: step.action.description(),
            dialect,
        });
    }

    let forward = alter_column_statements(dialect, table, before, after).join("\n");
    let mut rollback = alter_column_statements(dialect, table, after, before).join("\n");

    if SqlType::parse(&before.data_type).narrows(&SqlType::parse(&after.data_type)) {
        rollback = format!(
            "-- Data loss: values truncated by the forward type change cannot be restored.\n{}",
            rollback
        );
    }

    Ok(RenderedScripts { forward, rollback })
}

/// Statements converting `from` into `to`.
fn alter_column_statements(
    dialect: Dialect,
    table: &ObjectName,
    from: &Column,
    to: &Column,
) -> Vec<String> {
    let table_name = quote_object(dialect, table);
    let column = quote_ident(dialect, &to.name);
    let mut statements = Vec::new();

    match dialect {
        Dialect::Postgres => {
            if from.data_type != to.data_type {
                statements.push(format!(
                    "ALTER TABLE {table_name} ALTER COLUMN {column} TYPE {};",
                    to.data_type
                ));
            }
            if from.nullable != to.nullable {
                let clause = if to.nullable {
                    "DROP NOT NULL"
                } else {
                    "SET NOT NULL"
                };
                statements.push(format!(
                    "ALTER TABLE {table_name} ALTER COLUMN {column} {clause};"
                ));
            }
            if from.default != to.default {
                let clause = match &to.default {
                    Some(default) => format!("SET DEFAULT {default}"),
                    None => "DROP DEFAULT".to_string(),
                };
                statements.push(format!(
                    "ALTER TABLE {table_name} ALTER COLUMN {column} {clause};"
                ));
            }
            if from.identity != to.identity {
                let clause = if to.identity {
                    "ADD GENERATED BY DEFAULT AS IDENTITY"
                } else {
                    "DROP IDENTITY IF EXISTS"
                };
                statements.push(format!(
                    "ALTER TABLE {table_name} ALTER COLUMN {column} {clause};"
                ));
            }
        }
        Dialect::SqlServer => {
            if from.data_type != to.data_type || from.nullable != to.nullable {
                let nullability = if to.nullable { "NULL" } else { "NOT NULL" };
                statements.push(format!(
                    "ALTER TABLE {table_name} ALTER COLUMN {column} {} {nullability};",
                    to.data_type
                ));
            }
            if from.default != to.default {
                let constraint = default_constraint_name(table, &to.name);
                if from.default.is_some() {
                    statements.push(format!(
                        "ALTER TABLE {table_name} DROP CONSTRAINT {};",
                        quote_ident(dialect, &constraint)
                    ));
                }
                if let Some(default) = &to.default {
                    statements.push(format!(
                        "ALTER TABLE {table_name} ADD CONSTRAINT {} DEFAULT {default} FOR {column};",
                        quote_ident(dialect, &constraint)
                    ));
                }
            }
        }
    }

    statements
}

fn quote_ident(dialect: Dialect, ident: &str) -> String {
    match dialect {
        Dialect::Postgres => format!("\"{}\"", ident),
        Dialect::SqlServer => format!("[{}]", ident),
    }
}

fn quote_object(dialect: Dialect, name: &ObjectName) -> String {
    format!(
        "{}.{}",
        quote_ident(dialect, &name.schema),
        quote_ident(dialect, &name.name)
    )
}

fn column_ddl(dialect: Dialect, column: &Column) -> String {
    let mut ddl = format!(
        "{} {}",
        quote_ident(dialect, &column.name),
        column.data_type
    );
    if column.identity {
        match dialect {
            Dialect::Postgres => ddl.push_str(" GENERATED BY DEFAULT AS IDENTITY"),
            Dialect::SqlServer => ddl.push_str(" IDENTITY(1,1)"),
        }
    }
    ddl.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
    if let Some(default) = &column.default {
        ddl.push_str(&format!(" DEFAULT {default}"));
    }
    ddl
}

fn create_table_ddl(dialect: Dialect, table: &Table) -> String {
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("    {}", column_ddl(dialect, c)))
        .collect();

    if let Some(pk) = &table.primary_key {
        let columns = quoted_list(dialect, &pk.columns);
        let constraint = match &pk.name {
            Some(name) => format!(
                "    CONSTRAINT {} PRIMARY KEY ({columns})",
                quote_ident(dialect, name)
            ),
            None => format!("    PRIMARY KEY ({columns})"),
        };
        lines.push(constraint);
    }

    format!(
        "CREATE TABLE {} (\n{}\n);",
        quote_object(dialect, &table.name),
        lines.join(",\n")
    )
}

fn drop_table_ddl(dialect: Dialect, table: &ObjectName) -> String {
    format!("DROP TABLE {};", quote_object(dialect, table))
}

fn add_column_ddl(dialect: Dialect, table: &ObjectName, column: &Column) -> String {
    let keyword = match dialect {
        Dialect::Postgres => "ADD COLUMN",
        Dialect::SqlServer => "ADD",
    };
    format!(
        "ALTER TABLE {} {keyword} {};",
        quote_object(dialect, table),
        column_ddl(dialect, column)
    )
}

fn drop_column_ddl(dialect: Dialect, table: &ObjectName, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {};",
        quote_object(dialect, table),
        quote_ident(dialect, column)
    )
}

fn primary_key_name(table: &ObjectName, pk: &PrimaryKey) -> String {
    pk.name
        .clone()
        .unwrap_or_else(|| format!("pk_{}", table.name))
}

fn add_primary_key_ddl(dialect: Dialect, table: &ObjectName, pk: &PrimaryKey) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({});",
        quote_object(dialect, table),
        quote_ident(dialect, &primary_key_name(table, pk)),
        quoted_list(dialect, &pk.columns)
    )
}

fn drop_primary_key_ddl(dialect: Dialect, table: &ObjectName, pk: &PrimaryKey) -> String {
    drop_constraint_ddl(dialect, table, &primary_key_name(table, pk))
}

fn add_foreign_key_ddl(dialect: Dialect, table: &ObjectName, fk: &ForeignKey) -> String {
    let mut ddl = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_object(dialect, table),
        quote_ident(dialect, &fk.name),
        quoted_list(dialect, &fk.columns),
        quote_object(dialect, &fk.referenced_table),
        quoted_list(dialect, &fk.referenced_columns)
    );
    if fk.on_delete != ReferentialAction::NoAction {
        ddl.push_str(&format!(" ON DELETE {}", fk.on_delete));
    }
    if fk.on_update != ReferentialAction::NoAction {
        ddl.push_str(&format!(" ON UPDATE {}", fk.on_update));
    }
    ddl.push(';');
    ddl
}

fn drop_constraint_ddl(dialect: Dialect, table: &ObjectName, constraint: &str) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT {};",
        quote_object(dialect, table),
        quote_ident(dialect, constraint)
    )
}

fn create_index_ddl(dialect: Dialect, table: &ObjectName, index: &Index, online: bool) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    let columns = quoted_list(dialect, &index.columns);
    match dialect {
        Dialect::Postgres => {
            let concurrently = if online { "CONCURRENTLY " } else { "" };
            format!(
                "CREATE {unique}INDEX {concurrently}{} ON {} ({columns});",
                quote_ident(dialect, &index.name),
                quote_object(dialect, table)
            )
        }
        Dialect::SqlServer => {
            let with_online = if online { " WITH (ONLINE = ON)" } else { "" };
            format!(
                "CREATE {unique}INDEX {} ON {} ({columns}){with_online};",
                quote_ident(dialect, &index.name),
                quote_object(dialect, table)
            )
        }
    }
}

fn drop_index_ddl(dialect: Dialect, table: &ObjectName, index: &str) -> String {
    match dialect {
        // Postgres indexes live in the table's schema.
        Dialect::Postgres => format!(
            "DROP INDEX {}.{};",
            quote_ident(dialect, &table.schema),
            quote_ident(dialect, index)
        ),
        Dialect::SqlServer => format!(
            "DROP INDEX {} ON {};",
            quote_ident(dialect, index),
            quote_object(dialect, table)
        ),
    }
}

fn create_view_ddl(dialect: Dialect, view: &View, replace: bool) -> String {
    let verb = match (dialect, replace) {
        (_, false) => "CREATE VIEW",
        (Dialect::Postgres, true) => "CREATE OR REPLACE VIEW",
        (Dialect::SqlServer, true) => "CREATE OR ALTER VIEW",
    };
    format!(
        "{verb} {} AS\n{};",
        quote_object(dialect, &view.name),
        view.definition.trim_end().trim_end_matches(';')
    )
}

fn drop_view_ddl(dialect: Dialect, view: &ObjectName) -> String {
    format!("DROP VIEW {};", quote_object(dialect, view))
}

fn routine_definition_ddl(routine: &Routine) -> String {
    let definition = routine.definition.trim_end();
    if definition.ends_with(';') {
        definition.to_string()
    } else {
        format!("{definition};")
    }
}

fn drop_routine_ddl(dialect: Dialect, routine: &Routine) -> String {
    let keyword = match routine.kind {
        RoutineKind::Procedure => "PROCEDURE",
        RoutineKind::Function => "FUNCTION",
    };
    match dialect {
        // Postgres identifies a routine by its input signature.
        Dialect::Postgres => {
            let signature = routine
                .parameters
                .iter()
                .filter(|p| p.direction != ParamDirection::Out)
                .map(|p| p.data_type.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "DROP {keyword} {}({signature});",
                quote_object(dialect, &routine.name)
            )
        }
        Dialect::SqlServer => format!(
            "DROP {keyword} {};",
            quote_object(dialect, &routine.name)
        ),
    }
}

fn default_constraint_name(table: &ObjectName, column: &str) -> String {
    format!("df_{}_{}", table.name, column)
}

fn quoted_list(dialect: Dialect, items: &[String]) -> String {
    items
        .iter()
        .map(|item| quote_ident(dialect, item))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::diff::{SchemaChange, SchemaObject};
    use crate::migration::plan::StepId;
    use crate::snapshot::Parameter;
    use std::collections::BTreeSet;

    fn step(action: StepAction) -> MigrationStep {
        MigrationStep {
            id: StepId(0),
            change: SchemaChange::Added(SchemaObject::Table(Table::new("public", "placeholder"))),
            action,
            depends_on: BTreeSet::new(),
            transactional: true,
            forward_script: String::new(),
            rollback_script: String::new(),
        }
    }

    fn orders() -> ObjectName {
        ObjectName::new("public", "orders")
    }

    #[test]
    fn test_add_column_both_dialects() {
        let action = StepAction::AddColumn {
            table: orders(),
            column: Column::new("status", "VARCHAR(20)").with_default("'pending'"),
        };

        let pg = ScriptGenerator::render(&step(action.clone()), Dialect::Postgres).unwrap();
        assert_eq!(
            pg.forward,
            "ALTER TABLE \"public\".\"orders\" ADD COLUMN \"status\" VARCHAR(20) NOT NULL DEFAULT 'pending';"
        );
        assert_eq!(
            pg.rollback,
            "ALTER TABLE \"public\".\"orders\" DROP COLUMN \"status\";"
        );

        let mssql = ScriptGenerator::render(&step(action), Dialect::SqlServer).unwrap();
        assert_eq!(
            mssql.forward,
            "ALTER TABLE [public].[orders] ADD [status] VARCHAR(20) NOT NULL DEFAULT 'pending';"
        );
    }

    #[test]
    fn test_drop_column_rollback_is_annotated() {
        let action = StepAction::DropColumn {
            table: orders(),
            column: Column::new("total", "DECIMAL(10,2)"),
        };

        let scripts = ScriptGenerator::render(&step(action), Dialect::Postgres).unwrap();
        assert!(scripts.forward.contains("DROP COLUMN \"total\""));
        assert!(scripts.rollback.starts_with("-- Data loss:"));
        assert!(scripts.rollback.contains("ADD COLUMN \"total\" DECIMAL(10,2)"));
    }

    #[test]
    fn test_create_table_and_rollback() {
        let table = Table::new("public", "orders")
            .with_column(Column::new("id", "INT").with_identity())
            .with_column(Column::nullable("note", "TEXT"))
            .with_primary_key(PrimaryKey::new(["id"]).named("pk_orders"));

        let scripts =
            ScriptGenerator::render(&step(StepAction::CreateTable { table }), Dialect::Postgres)
                .unwrap();
        assert!(scripts.forward.starts_with("CREATE TABLE \"public\".\"orders\" (\n"));
        assert!(scripts
            .forward
            .contains("\"id\" INT GENERATED BY DEFAULT AS IDENTITY NOT NULL"));
        assert!(scripts.forward.contains("\"note\" TEXT NULL"));
        assert!(scripts
            .forward
            .contains("CONSTRAINT \"pk_orders\" PRIMARY KEY (\"id\")"));
        assert_eq!(scripts.rollback, "DROP TABLE \"public\".\"orders\";");
    }

    #[test]
    fn test_drop_table_rollback_restores_structure_with_warning() {
        let table = Table::new("public", "orders")
            .with_column(Column::new("id", "INT"))
            .with_index(Index::new("ix_orders_id", ["id"]));

        let scripts =
            ScriptGenerator::render(&step(StepAction::DropTable { table }), Dialect::Postgres)
                .unwrap();
        assert_eq!(scripts.forward, "DROP TABLE \"public\".\"orders\";");
        assert!(scripts.rollback.starts_with("-- Data loss:"));
        assert!(scripts.rollback.contains("CREATE TABLE \"public\".\"orders\""));
        assert!(scripts.rollback.contains("CREATE INDEX \"ix_orders_id\""));
    }

    #[test]
    fn test_alter_column_type_postgres() {
        let action = StepAction::AlterColumn {
            table: orders(),
            before: Column::new("code", "VARCHAR(200)"),
            after: Column::new("code", "VARCHAR(50)"),
        };

        let scripts = ScriptGenerator::render(&step(action), Dialect::Postgres).unwrap();
        assert_eq!(
            scripts.forward,
            "ALTER TABLE \"public\".\"orders\" ALTER COLUMN \"code\" TYPE VARCHAR(50);"
        );
        // Narrowing forward: the rollback restores the old type but warns.
        assert!(scripts.rollback.starts_with("-- Data loss:"));
        assert!(scripts.rollback.contains("TYPE VARCHAR(200)"));
    }

    #[test]
    fn test_alter_column_nullability_sqlserver_redeclares() {
        let action = StepAction::AlterColumn {
            table: orders(),
            before: Column::nullable("email", "VARCHAR(200)").with_default("''"),
            after: Column::new("email", "VARCHAR(200)").with_default("''"),
        };

        let scripts = ScriptGenerator::render(&step(action), Dialect::SqlServer).unwrap();
        assert_eq!(
            scripts.forward,
            "ALTER TABLE [public].[orders] ALTER COLUMN [email] VARCHAR(200) NOT NULL;"
        );
        assert_eq!(
            scripts.rollback,
            "ALTER TABLE [public].[orders] ALTER COLUMN [email] VARCHAR(200) NULL;"
        );
    }

    #[test]
    fn test_identity_toggle_unsupported_on_sqlserver() {
        let action = StepAction::AlterColumn {
            table: orders(),
            before: Column::new("id", "INT"),
            after: Column::new("id", "INT").with_identity(),
        };

        let err = ScriptGenerator::render(&step(action.clone()), Dialect::SqlServer).unwrap_err();
        match err {
            PlanError::UnsupportedChange { change, dialect } => {
                assert_eq!(dialect, Dialect::SqlServer);
                assert!(change.contains("public.orders.id"));
            }
            other => panic!("expected UnsupportedChange, got {other:?}"),
        }

        // Postgres has a rule for it.
        let scripts = ScriptGenerator::render(&step(action), Dialect::Postgres).unwrap();
        assert!(scripts
            .forward
            .contains("ADD GENERATED BY DEFAULT AS IDENTITY"));
        assert!(scripts.rollback.contains("DROP IDENTITY IF EXISTS"));
    }

    #[test]
    fn test_foreign_key_roundtrip() {
        let fk = ForeignKey::new(
            "fk_orders_customer",
            "customer_id",
            ObjectName::new("public", "customers"),
            "id",
        )
        .on_delete(ReferentialAction::Cascade);

        let add = ScriptGenerator::render(
            &step(StepAction::AddForeignKey {
                table: orders(),
                fk: fk.clone(),
            }),
            Dialect::Postgres,
        )
        .unwrap();
        assert_eq!(
            add.forward,
            "ALTER TABLE \"public\".\"orders\" ADD CONSTRAINT \"fk_orders_customer\" \
             FOREIGN KEY (\"customer_id\") REFERENCES \"public\".\"customers\" (\"id\") ON DELETE CASCADE;"
        );

        // The inverse pair property: rollback of add equals forward of drop.
        let drop = ScriptGenerator::render(
            &step(StepAction::DropForeignKey {
                table: orders(),
                fk,
            }),
            Dialect::Postgres,
        )
        .unwrap();
        assert_eq!(add.rollback, drop.forward);
        assert_eq!(drop.rollback, add.forward);
    }

    #[test]
    fn test_index_online_rendering() {
        let index = Index::new("ix_orders_total", ["total"]);

        let pg = ScriptGenerator::render(
            &step(StepAction::CreateIndex {
                table: orders(),
                index: index.clone(),
                online: true,
            }),
            Dialect::Postgres,
        )
        .unwrap();
        assert_eq!(
            pg.forward,
            "CREATE INDEX CONCURRENTLY \"ix_orders_total\" ON \"public\".\"orders\" (\"total\");"
        );
        assert_eq!(pg.rollback, "DROP INDEX \"public\".\"ix_orders_total\";");

        let mssql = ScriptGenerator::render(
            &step(StepAction::CreateIndex {
                table: orders(),
                index,
                online: true,
            }),
            Dialect::SqlServer,
        )
        .unwrap();
        assert_eq!(
            mssql.forward,
            "CREATE INDEX [ix_orders_total] ON [public].[orders] ([total]) WITH (ONLINE = ON);"
        );
        assert_eq!(
            mssql.rollback,
            "DROP INDEX [ix_orders_total] ON [public].[orders];"
        );
    }

    #[test]
    fn test_alter_view_per_dialect() {
        let before = View::new("public", "order_totals", "SELECT id FROM orders");
        let after = View::new("public", "order_totals", "SELECT id, total FROM orders");
        let action = StepAction::AlterView {
            before: before.clone(),
            after: after.clone(),
        };

        let pg = ScriptGenerator::render(&step(action.clone()), Dialect::Postgres).unwrap();
        assert_eq!(
            pg.forward,
            "CREATE OR REPLACE VIEW \"public\".\"order_totals\" AS\nSELECT id, total FROM orders;"
        );
        assert_eq!(
            pg.rollback,
            "CREATE OR REPLACE VIEW \"public\".\"order_totals\" AS\nSELECT id FROM orders;"
        );

        let mssql = ScriptGenerator::render(&step(action), Dialect::SqlServer).unwrap();
        assert!(mssql.forward.starts_with("CREATE OR ALTER VIEW [public].[order_totals] AS"));
    }

    #[test]
    fn test_drop_function_signature_postgres() {
        let routine = Routine::function(
            "public",
            "order_total",
            "DECIMAL(10,2)",
            "CREATE FUNCTION public.order_total(order_id INT) RETURNS DECIMAL(10,2) AS $$ SELECT 1 $$ LANGUAGE sql",
        )
        .with_parameter(Parameter::new("order_id", "INT"));

        let scripts = ScriptGenerator::render(
            &step(StepAction::DropRoutine {
                routine: routine.clone(),
            }),
            Dialect::Postgres,
        )
        .unwrap();
        assert_eq!(
            scripts.forward,
            "DROP FUNCTION \"public\".\"order_total\"(INT);"
        );
        assert!(scripts.rollback.starts_with("CREATE FUNCTION"));
        assert!(scripts.rollback.ends_with(';'));

        let mssql = ScriptGenerator::render(
            &step(StepAction::DropRoutine { routine }),
            Dialect::SqlServer,
        )
        .unwrap();
        assert_eq!(mssql.forward, "DROP FUNCTION [public].[order_total];");
    }

    #[test]
    fn test_add_column_rollback_matches_drop_forward() {
        let column = Column::new("status", "VARCHAR(20)").with_default("'pending'");
        let add = ScriptGenerator::render(
            &step(StepAction::AddColumn {
                table: orders(),
                column: column.clone(),
            }),
            Dialect::Postgres,
        )
        .unwrap();
        let drop = ScriptGenerator::render(
            &step(StepAction::DropColumn {
                table: orders(),
                column,
            }),
            Dialect::Postgres,
        )
        .unwrap();
        assert_eq!(add.rollback, drop.forward);
    }
}
