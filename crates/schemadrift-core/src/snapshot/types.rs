//! Dialect tags and declared-type comparison.
//!
//! Columns carry their data type as the raw declared string (the form
//! introspection catalogs report). `SqlType` parses that string into a small
//! lattice so the classifier can decide whether a type change can truncate
//! values. Unknown declarations parse to `Other` and are compared
//! conservatively.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL dialect a snapshot was taken from and scripts are rendered for.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// PostgreSQL.
    Postgres,
    /// Microsoft SQL Server.
    SqlServer,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgres => write!(f, "postgresql"),
            Dialect::SqlServer => write!(f, "sqlserver"),
        }
    }
}

// `PlanError::DialectMismatch` carries a field named `source`, which thiserror's
// derive treats as the error's source and therefore requires to implement
// `std::error::Error`. Satisfy that bound with the default (no nested source).
impl std::error::Error for Dialect {}

/// Parsed form of a declared column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    /// Boolean (`BOOLEAN`, `BIT`).
    Bool,
    /// Integer with the given storage width in bytes (1, 2, 4, 8).
    Int {
        /// Storage width in bytes.
        bytes: u8,
    },
    /// Floating point with the given storage width in bytes (4, 8).
    Float {
        /// Storage width in bytes.
        bytes: u8,
    },
    /// Fixed-precision decimal.
    Decimal {
        /// Total digits.
        precision: u32,
        /// Digits after the decimal point.
        scale: u32,
    },
    /// Character data. `length` of `None` means unbounded
    /// (`TEXT`, `VARCHAR(MAX)`).
    Char {
        /// Maximum length in characters, if bounded.
        length: Option<u32>,
        /// Varying (`VARCHAR`) vs fixed (`CHAR`).
        varying: bool,
    },
    /// Binary data; `None` length means unbounded.
    Binary {
        /// Maximum length in bytes, if bounded.
        length: Option<u32>,
    },
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Timestamp,
    /// UUID (`UUID`, `UNIQUEIDENTIFIER`).
    Uuid,
    /// Anything the parser does not recognize, normalized to uppercase.
    Other(String),
}

impl SqlType {
    /// Parse a declared type string. Never fails; unrecognized declarations
    /// become [`SqlType::Other`].
    pub fn parse(declared: &str) -> Self {
        let normalized = declared.trim().to_ascii_uppercase();
        let (base, args) = split_type_args(&normalized);

        match base {
            "BOOL" | "BOOLEAN" | "BIT" => SqlType::Bool,
            "TINYINT" => SqlType::Int { bytes: 1 },
            "SMALLINT" | "INT2" => SqlType::Int { bytes: 2 },
            "INT" | "INTEGER" | "INT4" => SqlType::Int { bytes: 4 },
            "BIGINT" | "INT8" => SqlType::Int { bytes: 8 },
            "REAL" | "FLOAT4" => SqlType::Float { bytes: 4 },
            "FLOAT" | "FLOAT8" | "DOUBLE PRECISION" => SqlType::Float { bytes: 8 },
            "DECIMAL" | "NUMERIC" => SqlType::Decimal {
                precision: args.first().copied().unwrap_or(38),
                scale: args.get(1).copied().unwrap_or(0),
            },
            "CHAR" | "NCHAR" | "CHARACTER" => SqlType::Char {
                length: args.first().copied().or(Some(1)),
                varying: false,
            },
            "VARCHAR" | "NVARCHAR" | "CHARACTER VARYING" => SqlType::Char {
                length: if has_max_arg(&normalized) {
                    None
                } else {
                    args.first().copied()
                },
                varying: true,
            },
            "TEXT" | "NTEXT" => SqlType::Char {
                length: None,
                varying: true,
            },
            "BYTEA" | "IMAGE" => SqlType::Binary { length: None },
            "BINARY" | "VARBINARY" => SqlType::Binary {
                length: if has_max_arg(&normalized) {
                    None
                } else {
                    args.first().copied()
                },
            },
            "DATE" => SqlType::Date,
            "TIME" => SqlType::Time,
            "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" | "DATETIME2" | "SMALLDATETIME" => {
                SqlType::Timestamp
            }
            "UUID" | "UNIQUEIDENTIFIER" => SqlType::Uuid,
            _ => {
                if normalized.starts_with("TIMESTAMP") {
                    // TIMESTAMP WITH TIME ZONE, TIMESTAMP(6), ...
                    SqlType::Timestamp
                } else if normalized.starts_with("TIME") {
                    SqlType::Time
                } else {
                    SqlType::Other(normalized)
                }
            }
        }
    }

    /// Whether changing a column from `self` to `to` can truncate or lose
    /// stored values.
    ///
    /// This is the classifier's type-narrowing predicate. It is deliberately
    /// conservative: a conversion the lattice cannot prove lossless counts as
    /// narrowing.
    pub fn narrows(&self, to: &SqlType) -> bool {
        use SqlType::*;

        if self == to {
            return false;
        }

        match (self, to) {
            (Int { bytes: from }, Int { bytes: to }) => to < from,
            (Float { bytes: from }, Float { bytes: to }) => to < from,
            // Int-to-float widening follows the storage width; an 8-byte
            // integer does not fit a float mantissa exactly but matches the
            // treatment of widening conversions elsewhere in the engine.
            (Int { .. }, Float { bytes: 8 }) => false,
            (Int { .. }, Decimal { .. }) => false,
            (Decimal { .. }, Int { .. }) => true,
            (Decimal { precision: fp, scale: fs }, Decimal { precision: tp, scale: ts }) => {
                tp < fp || ts < fs
            }
            (Char { length: from, .. }, Char { length: to, .. }) => match (from, to) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(f), Some(t)) => t < f,
            },
            (Binary { length: from }, Binary { length: to }) => match (from, to) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(f), Some(t)) => t < f,
            },
            // Anything can be rendered into an unbounded character column.
            (_, Char { length: None, .. }) => false,
            (Other(a), Other(b)) => a != b,
            // Cross-family conversions are not provably lossless.
            _ => true,
        }
    }
}

fn split_type_args(normalized: &str) -> (&str, Vec<u32>) {
    match normalized.find('(') {
        Some(open) => {
            let base = normalized[..open].trim();
            let inner = normalized[open + 1..]
                .trim_end_matches(')')
                .split(',')
                .filter_map(|part| part.trim().parse::<u32>().ok())
                .collect();
            (base, inner)
        }
        None => (normalized, Vec::new()),
    }
}

fn has_max_arg(normalized: &str) -> bool {
    normalized.contains("(MAX)")
}
