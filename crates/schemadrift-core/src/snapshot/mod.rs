//! Snapshot data model.
//!
//! The typed representation of a database's structure at a point in time:
//! tables, columns, indexes, constraints, views, and routines. Pure data;
//! the only behavior is construction and validation.

mod ident;
mod routine;
mod snapshot;
mod table;
mod types;
mod view;

pub use ident::{ObjectKind, ObjectName};
pub use routine::{ParamDirection, Parameter, Routine, RoutineKind};
pub use snapshot::SchemaSnapshot;
pub use table::{Column, ForeignKey, Index, PrimaryKey, ReferentialAction, Table};
pub use types::{Dialect, SqlType};
pub use view::View;
