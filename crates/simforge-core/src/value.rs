//! Tagged runtime values.
//!
//! Every ground variable holds one [`Value`]; the evaluator treats the four
//! kinds uniformly in arithmetic contexts via explicit coercion (bool as 0/1,
//! int promoted to real on mixed operands) rather than subtype polymorphism.

use std::fmt;

use crate::types::EnumTypeId;

/// The kind of a runtime value. Enum kinds carry the enum type they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Real,
    Enum(EnumTypeId),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Int => write!(f, "int"),
            ValueKind::Real => write!(f, "real"),
            ValueKind::Enum(id) => write!(f, "enum#{}", id.0),
        }
    }
}

/// A typed runtime value.
///
/// Enum values store the label's index into the enum type's ordered label
/// list; label order matters for `switch` cases and `Discrete` outcomes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(f64),
    Enum(EnumTypeId, usize),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Real(_) => ValueKind::Real,
            Value::Enum(id, _) => ValueKind::Enum(*id),
        }
    }

    pub fn matches(&self, kind: ValueKind) -> bool {
        self.kind() == kind
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<(EnumTypeId, usize)> {
        match self {
            Value::Enum(id, label) => Some((*id, *label)),
            _ => None,
        }
    }

    /// Numeric view as a real, with bool read as 0/1. Enums have no numeric
    /// view.
    pub fn to_real(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(n) => Some(*n as f64),
            Value::Real(x) => Some(*x),
            Value::Enum(..) => None,
        }
    }

    /// Numeric view as an integer, with bool read as 0/1. Reals and enums
    /// have no integer view.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(n) => Some(*n),
            Value::Real(_) | Value::Enum(..) => None,
        }
    }

    /// The neutral value of a kind: false, 0, 0.0 or the first enum label.
    ///
    /// Used to fill derived-layer slots before their first evaluation.
    pub fn zero_of(kind: ValueKind) -> Value {
        match kind {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Int => Value::Int(0),
            ValueKind::Real => Value::Real(0.0),
            ValueKind::Enum(id) => Value::Enum(id, 0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Real(x) => write!(f, "{x}"),
            Value::Enum(id, label) => write!(f, "enum#{}@{}", id.0, label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_matches() {
        assert_eq!(Value::Bool(true).kind(), ValueKind::Bool);
        assert_eq!(Value::Int(3).kind(), ValueKind::Int);
        assert_eq!(Value::Real(1.5).kind(), ValueKind::Real);
        let e = Value::Enum(EnumTypeId(0), 2);
        assert!(e.matches(ValueKind::Enum(EnumTypeId(0))));
        assert!(!e.matches(ValueKind::Enum(EnumTypeId(1))));
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Bool(true).to_real(), Some(1.0));
        assert_eq!(Value::Bool(false).to_int(), Some(0));
        assert_eq!(Value::Int(7).to_real(), Some(7.0));
        assert_eq!(Value::Real(2.5).to_int(), None);
        assert_eq!(Value::Enum(EnumTypeId(0), 1).to_real(), None);
    }

    #[test]
    fn test_zero_of() {
        assert_eq!(Value::zero_of(ValueKind::Bool), Value::Bool(false));
        assert_eq!(
            Value::zero_of(ValueKind::Enum(EnumTypeId(3))),
            Value::Enum(EnumTypeId(3), 0)
        );
    }
}
