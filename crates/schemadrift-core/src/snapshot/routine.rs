//! Stored procedure and function definitions.

use super::ident::ObjectName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Whether a routine is a procedure or a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutineKind {
    /// Stored procedure.
    Procedure,
    /// Function (has a return type).
    Function,
}

/// Parameter direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamDirection {
    /// Input parameter.
    In,
    /// Output parameter.
    Out,
    /// Input/output parameter.
    InOut,
}

/// A routine parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Declared data type.
    pub data_type: String,
    /// Direction.
    pub direction: ParamDirection,
}

impl Parameter {
    /// Create an input parameter.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            direction: ParamDirection::In,
        }
    }

    /// Set the direction.
    pub fn with_direction(mut self, direction: ParamDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// A stored procedure or function.
///
/// `definition` holds the complete `CREATE ...` statement text as reported by
/// the catalog; the script generator replays it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    /// Qualified routine name.
    pub name: ObjectName,
    /// Procedure or function.
    pub kind: RoutineKind,
    /// Ordered parameter list.
    pub parameters: Vec<Parameter>,
    /// Return type (functions only).
    pub return_type: Option<String>,
    /// Full textual definition.
    pub definition: String,
    /// Objects referenced by the definition.
    pub dependencies: BTreeSet<ObjectName>,
}

impl Routine {
    /// Create a procedure definition.
    pub fn procedure(
        schema: impl Into<String>,
        name: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            name: ObjectName::new(schema, name),
            kind: RoutineKind::Procedure,
            parameters: Vec::new(),
            return_type: None,
            definition: definition.into(),
            dependencies: BTreeSet::new(),
        }
    }

    /// Create a function definition.
    pub fn function(
        schema: impl Into<String>,
        name: impl Into<String>,
        return_type: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            name: ObjectName::new(schema, name),
            kind: RoutineKind::Function,
            parameters: Vec::new(),
            return_type: Some(return_type.into()),
            definition: definition.into(),
            dependencies: BTreeSet::new(),
        }
    }

    /// Append a parameter.
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Record a referenced object.
    pub fn with_dependency(mut self, dependency: ObjectName) -> Self {
        self.dependencies.insert(dependency);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routine_builders() {
        let proc = Routine::procedure("dbo", "archive_orders", "CREATE PROCEDURE ...")
            .with_parameter(Parameter::new("cutoff", "DATE"))
            .with_dependency(ObjectName::new("dbo", "orders"));

        assert_eq!(proc.kind, RoutineKind::Procedure);
        assert!(proc.return_type.is_none());
        assert_eq!(proc.parameters[0].direction, ParamDirection::In);

        let func = Routine::function("public", "order_total", "DECIMAL(10,2)", "CREATE FUNCTION ...");
        assert_eq!(func.kind, RoutineKind::Function);
        assert_eq!(func.return_type.as_deref(), Some("DECIMAL(10,2)"));
    }
}
