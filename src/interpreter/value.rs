use std::fmt::Display;

use crate::lexer::{Keyword, Position};

use super::{RuntimeError, RuntimeResult};

/// A runtime constant. Assignments, arguments and return values always
/// deep-copy; no value is ever shared between variable tables.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Str(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
        }
    }
}

pub(super) fn negate(value: &mut Value, position: Position) -> RuntimeResult<()> {
    match value {
        Value::Int(value) => *value = value.wrapping_neg(),
        Value::Float(value) => *value = -*value,
        other => {
            return Err(RuntimeError::at(
                format!("Unexpected unary operator `-` for {}", other.type_name()),
                position,
            ))
        }
    }
    Ok(())
}

pub(super) fn logical_not(value: &mut Value, position: Position) -> RuntimeResult<()> {
    match value {
        Value::Bool(value) => *value = !*value,
        other => {
            return Err(RuntimeError::at(
                format!("Unexpected unary operator `!` for {}", other.type_name()),
                position,
            ))
        }
    }
    Ok(())
}

/// Evaluate `left op right` into a fresh value.
pub(super) fn binary(
    keyword: Keyword,
    left: &Value,
    right: &Value,
    position: Position,
) -> RuntimeResult<Value> {
    use Value::*;

    match keyword {
        Keyword::And | Keyword::Or => {
            let (Bool(l), Bool(r)) = (left, right) else {
                return Err(type_mismatch("logical operation", left, right, position));
            };
            Ok(Bool(match keyword {
                Keyword::And => *l && *r,
                _ => *l || *r,
            }))
        }
        Keyword::BitAnd
        | Keyword::BitOr
        | Keyword::BitXor
        | Keyword::Shl
        | Keyword::Shr
        | Keyword::Modulo => {
            let (Int(l), Int(r)) = (left, right) else {
                return Err(type_mismatch("bitwise operation", left, right, position));
            };
            bitwise(keyword, *l, *r, position)
        }
        _ => match (left, right) {
            (Int(l), Int(r)) => integral(keyword, *l, *r, position),
            (Int(l), Float(r)) => numeric(keyword, *l as f64, *r, position),
            (Float(l), Int(r)) => numeric(keyword, *l, *r as f64, position),
            (Float(l), Float(r)) => numeric(keyword, *l, *r, position),
            (Str(l), Str(r)) => match keyword {
                Keyword::Equal => Ok(Bool(l == r)),
                Keyword::NotEqual => Ok(Bool(l != r)),
                Keyword::Plus => Ok(Str(format!("{l}{r}"))),
                Keyword::Less | Keyword::Leq | Keyword::Greater | Keyword::Geq => Err(
                    RuntimeError::at("It is forbidden to compare strings", position),
                ),
                _ => Err(type_mismatch("binary operation", left, right, position)),
            },
            (Bool(l), Bool(r)) => match keyword {
                Keyword::Equal => Ok(Bool(l == r)),
                Keyword::NotEqual => Ok(Bool(l != r)),
                _ => Err(RuntimeError::at(
                    "It is forbidden to compare booleans",
                    position,
                )),
            },
            _ => Err(type_mismatch("binary operation", left, right, position)),
        },
    }
}

fn bitwise(keyword: Keyword, l: i64, r: i64, position: Position) -> RuntimeResult<Value> {
    let value = match keyword {
        Keyword::BitAnd => l & r,
        Keyword::BitOr => l | r,
        Keyword::BitXor => l ^ r,
        Keyword::Shl | Keyword::Shr => {
            if !(0..64).contains(&r) {
                return Err(RuntimeError::at("Shift count out of range", position));
            }
            match keyword {
                Keyword::Shl => l << r,
                _ => l >> r,
            }
        }
        _ => {
            if r == 0 {
                return Err(RuntimeError::at("Modulo by zero", position));
            }
            l % r
        }
    };

    Ok(Value::Int(value))
}

fn integral(keyword: Keyword, l: i64, r: i64, position: Position) -> RuntimeResult<Value> {
    use Value::*;

    let value = match keyword {
        Keyword::Equal => Bool(l == r),
        Keyword::NotEqual => Bool(l != r),
        Keyword::Less => Bool(l < r),
        Keyword::Leq => Bool(l <= r),
        Keyword::Greater => Bool(l > r),
        Keyword::Geq => Bool(l >= r),
        Keyword::Plus => Int(l.wrapping_add(r)),
        Keyword::Minus => Int(l.wrapping_sub(r)),
        Keyword::Times => Int(l.wrapping_mul(r)),
        Keyword::Divide => Float(l as f64 / r as f64),
        other => {
            return Err(RuntimeError::at(
                format!("Unexpected binary operator `{}`", other.spelling()),
                position,
            ))
        }
    };

    Ok(value)
}

fn numeric(keyword: Keyword, l: f64, r: f64, position: Position) -> RuntimeResult<Value> {
    use Value::*;

    let value = match keyword {
        Keyword::Equal => Bool(l == r),
        Keyword::NotEqual => Bool(l != r),
        Keyword::Less => Bool(l < r),
        Keyword::Leq => Bool(l <= r),
        Keyword::Greater => Bool(l > r),
        Keyword::Geq => Bool(l >= r),
        Keyword::Plus => Float(l + r),
        Keyword::Minus => Float(l - r),
        Keyword::Times => Float(l * r),
        Keyword::Divide => Float(l / r),
        other => {
            return Err(RuntimeError::at(
                format!("Unexpected binary operator `{}`", other.spelling()),
                position,
            ))
        }
    };

    Ok(value)
}

fn type_mismatch(what: &str, left: &Value, right: &Value, position: Position) -> RuntimeError {
    RuntimeError::at(
        format!(
            "Type mismatch for {what} (`{}` and `{}`)",
            left.type_name(),
            right.type_name()
        ),
        position,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const POS: Position = (1, 1);

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(
            Ok(Value::Int(7)),
            binary(Keyword::Plus, &Value::Int(3), &Value::Int(4), POS)
        );
        assert_eq!(
            Ok(Value::Int(-5)),
            binary(Keyword::Minus, &Value::Int(-2), &Value::Int(3), POS)
        );
        assert_eq!(
            Ok(Value::Int(12)),
            binary(Keyword::Times, &Value::Int(3), &Value::Int(4), POS)
        );
    }

    #[test]
    fn test_division_promotes_to_float() {
        assert_eq!(
            Ok(Value::Float(2.5)),
            binary(Keyword::Divide, &Value::Int(5), &Value::Int(2), POS)
        );
    }

    #[test]
    fn test_mixed_numeric_operands() {
        assert_eq!(
            Ok(Value::Float(3.0)),
            binary(Keyword::Plus, &Value::Int(1), &Value::Float(2.0), POS)
        );
        assert_eq!(
            Ok(Value::Bool(true)),
            binary(Keyword::Less, &Value::Float(0.5), &Value::Int(1), POS)
        );
        assert_eq!(
            Ok(Value::Bool(true)),
            binary(Keyword::Equal, &Value::Int(2), &Value::Float(2.0), POS)
        );
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(
            Ok(Value::Str("ab".into())),
            binary(
                Keyword::Plus,
                &Value::Str("a".into()),
                &Value::Str("b".into()),
                POS
            )
        );
    }

    #[test]
    fn test_string_ordering_is_rejected() {
        let result = binary(
            Keyword::Less,
            &Value::Str("a".into()),
            &Value::Str("b".into()),
            POS,
        );

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("It is forbidden to compare strings"));
    }

    #[test]
    fn test_boolean_equality() {
        assert_eq!(
            Ok(Value::Bool(true)),
            binary(Keyword::Equal, &Value::Bool(true), &Value::Bool(true), POS)
        );
        assert!(binary(Keyword::Less, &Value::Bool(true), &Value::Bool(false), POS).is_err());
    }

    #[test]
    fn test_bitwise_requires_integers() {
        assert_eq!(
            Ok(Value::Int(6)),
            binary(Keyword::Shl, &Value::Int(3), &Value::Int(1), POS)
        );
        assert!(binary(Keyword::BitAnd, &Value::Int(1), &Value::Float(1.0), POS).is_err());
    }

    #[test]
    fn test_modulo_by_zero() {
        let result = binary(Keyword::Modulo, &Value::Int(1), &Value::Int(0), POS);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Modulo by zero"));
    }

    #[test]
    fn test_shift_out_of_range() {
        assert!(binary(Keyword::Shl, &Value::Int(1), &Value::Int(64), POS).is_err());
        assert!(binary(Keyword::Shr, &Value::Int(1), &Value::Int(-1), POS).is_err());
    }

    #[test]
    fn test_type_mismatch() {
        let result = binary(Keyword::Plus, &Value::Int(1), &Value::Str("a".into()), POS);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Type mismatch"));
    }

    #[test]
    fn test_negate_in_place() {
        let mut value = Value::Int(3);
        negate(&mut value, POS).unwrap();
        assert_eq!(Value::Int(-3), value);

        let mut value = Value::Str("a".into());
        assert!(negate(&mut value, POS).is_err());
    }

    #[test]
    fn test_logical_not_in_place() {
        let mut value = Value::Bool(true);
        logical_not(&mut value, POS).unwrap();
        assert_eq!(Value::Bool(false), value);

        let mut value = Value::Int(1);
        assert!(logical_not(&mut value, POS).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!("7", Value::Int(7).to_string());
        assert_eq!("2.5", Value::Float(2.5).to_string());
        assert_eq!("true", Value::Bool(true).to_string());
        assert_eq!("abc", Value::Str("abc".into()).to_string());
    }
}
