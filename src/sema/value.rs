// src/sema/value.rs
//
// Compile-time values. Operations are pure; nothing here reports
// diagnostics. Integer arithmetic folds in 128 bits, which ranges over every
// value that can reach a 64-bit-wide typed location; an operation that leaves
// that domain yields Invalid and the checker reports constant overflow.

use std::fmt;
use std::rc::Rc;

use crate::frontend::{BinaryOp, UnaryOp};
use crate::sema::types::BasicType;

/// A compile-time value attached to a constant operand.
#[derive(Debug, Clone, PartialEq)]
pub enum ExactValue {
    Invalid,
    Bool(bool),
    Int(i128),
    Float(f64),
    String(Rc<str>),
    /// Only the null sentinel exists at this layer.
    Pointer(u64),
}

impl ExactValue {
    pub fn null() -> Self {
        ExactValue::Pointer(0)
    }

    pub fn string(s: &str) -> Self {
        ExactValue::String(Rc::from(s))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ExactValue::Invalid)
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            ExactValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ExactValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Promote an integer value to float for mixed int/float folding.
    pub fn to_float(&self) -> Option<f64> {
        match self {
            ExactValue::Int(v) => Some(*v as f64),
            ExactValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// True if the value is an integer zero or float zero (divisor check).
    pub fn is_zero(&self) -> bool {
        matches!(self, ExactValue::Int(0)) || matches!(self, ExactValue::Float(f) if *f == 0.0)
    }

    /// Apply a unary operator. Returns Invalid for undefined combinations;
    /// the checker has already rejected those with a diagnostic.
    pub fn unary_op(&self, op: UnaryOp) -> ExactValue {
        match (op, self) {
            (UnaryOp::Neg, ExactValue::Int(v)) => v
                .checked_neg()
                .map(ExactValue::Int)
                .unwrap_or(ExactValue::Invalid),
            (UnaryOp::Neg, ExactValue::Float(v)) => ExactValue::Float(-v),
            (UnaryOp::Not, ExactValue::Bool(v)) => ExactValue::Bool(!v),
            (UnaryOp::BitNot, ExactValue::Int(v)) => ExactValue::Int(!v),
            _ => ExactValue::Invalid,
        }
    }

    /// Apply an arithmetic, bitwise, or logical binary operator.
    /// Comparisons go through [`ExactValue::compare`] instead.
    pub fn binary_op(&self, op: BinaryOp, rhs: &ExactValue) -> ExactValue {
        use ExactValue::*;
        match (self, rhs) {
            (Int(a), Int(b)) => {
                let result = match op {
                    BinaryOp::Add => a.checked_add(*b),
                    BinaryOp::Sub => a.checked_sub(*b),
                    BinaryOp::Mul => a.checked_mul(*b),
                    BinaryOp::Div => a.checked_div(*b),
                    BinaryOp::Mod => a.checked_rem(*b),
                    BinaryOp::BitAnd => Some(a & b),
                    BinaryOp::BitOr => Some(a | b),
                    BinaryOp::BitXor => Some(a ^ b),
                    BinaryOp::Shl => u32::try_from(*b).ok().and_then(|s| a.checked_shl(s)),
                    BinaryOp::Shr => u32::try_from(*b).ok().and_then(|s| a.checked_shr(s)),
                    _ => None,
                };
                result.map(Int).unwrap_or(Invalid)
            }
            (Bool(a), Bool(b)) => match op {
                BinaryOp::And => Bool(*a && *b),
                BinaryOp::Or => Bool(*a || *b),
                _ => Invalid,
            },
            // Mixed int/float arithmetic promotes to float.
            _ => match (self.to_float(), rhs.to_float()) {
                (Some(a), Some(b)) => match op {
                    BinaryOp::Add => Float(a + b),
                    BinaryOp::Sub => Float(a - b),
                    BinaryOp::Mul => Float(a * b),
                    BinaryOp::Div => Float(a / b),
                    _ => Invalid,
                },
                _ => Invalid,
            },
        }
    }

    /// Three-way comparison; None when the values are not comparable.
    pub fn compare(&self, rhs: &ExactValue) -> Option<std::cmp::Ordering> {
        use ExactValue::*;
        match (self, rhs) {
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Pointer(a), Pointer(b)) => Some(a.cmp(b)),
            _ => {
                let (a, b) = (self.to_float()?, rhs.to_float()?);
                a.partial_cmp(&b)
            }
        }
    }

    /// Range check applied when an untyped value is committed to a typed
    /// location of basic type `target`.
    pub fn fits_in(&self, target: BasicType) -> bool {
        match self {
            ExactValue::Invalid => true,
            ExactValue::Bool(_) => target.is_boolean(),
            ExactValue::Int(v) => match target {
                BasicType::I8 => i8::try_from(*v).is_ok(),
                BasicType::I16 => i16::try_from(*v).is_ok(),
                BasicType::I32 | BasicType::Rune => i32::try_from(*v).is_ok(),
                BasicType::I64 | BasicType::Int => i64::try_from(*v).is_ok(),
                BasicType::U8 => u8::try_from(*v).is_ok(),
                BasicType::U16 => u16::try_from(*v).is_ok(),
                BasicType::U32 => u32::try_from(*v).is_ok(),
                BasicType::U64 | BasicType::Uint => u64::try_from(*v).is_ok(),
                BasicType::F32 | BasicType::F64 => true,
                BasicType::UntypedInt | BasicType::UntypedFloat | BasicType::UntypedRune => true,
                _ => false,
            },
            ExactValue::Float(v) => match target {
                BasicType::F32 | BasicType::F64 | BasicType::UntypedFloat => true,
                // An integral float may commit to an integer type.
                _ if target.is_integer() => {
                    v.fract() == 0.0 && ExactValue::Int(*v as i128).fits_in(target)
                }
                _ => false,
            },
            ExactValue::String(_) => target.is_string(),
            ExactValue::Pointer(_) => target.is_pointer(),
        }
    }

    /// Re-shape the value for its committed basic type (e.g. an integer
    /// constant assigned to a float location becomes a float value).
    pub fn convert_for(&self, target: BasicType) -> ExactValue {
        match (self, target) {
            (ExactValue::Int(v), BasicType::F32 | BasicType::F64 | BasicType::UntypedFloat) => {
                ExactValue::Float(*v as f64)
            }
            (ExactValue::Float(v), t) if t.is_integer() && v.fract() == 0.0 => {
                ExactValue::Int(*v as i128)
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for ExactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExactValue::Invalid => write!(f, "invalid"),
            ExactValue::Bool(v) => write!(f, "{}", v),
            ExactValue::Int(v) => write!(f, "{}", v),
            ExactValue::Float(v) => write!(f, "{}", v),
            ExactValue::String(s) => write!(f, "{:?}", s),
            ExactValue::Pointer(0) => write!(f, "null"),
            ExactValue::Pointer(v) => write!(f, "0x{:x}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn integer_arithmetic_folds() {
        let a = ExactValue::Int(7);
        let b = ExactValue::Int(3);
        assert_eq!(a.binary_op(BinaryOp::Add, &b), ExactValue::Int(10));
        assert_eq!(a.binary_op(BinaryOp::Div, &b), ExactValue::Int(2));
        assert_eq!(a.binary_op(BinaryOp::Mod, &b), ExactValue::Int(1));
        assert_eq!(a.binary_op(BinaryOp::Shl, &b), ExactValue::Int(56));
    }

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        let a = ExactValue::Int(1);
        let b = ExactValue::Float(0.5);
        assert_eq!(a.binary_op(BinaryOp::Add, &b), ExactValue::Float(1.5));
    }

    #[test]
    fn overflow_yields_invalid() {
        let a = ExactValue::Int(i128::MAX);
        assert_eq!(
            a.binary_op(BinaryOp::Add, &ExactValue::Int(1)),
            ExactValue::Invalid
        );
        assert_eq!(ExactValue::Int(i128::MIN).unary_op(UnaryOp::Neg), ExactValue::Invalid);
    }

    #[test]
    fn comparisons() {
        assert_eq!(
            ExactValue::Int(1).compare(&ExactValue::Int(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            ExactValue::Int(2).compare(&ExactValue::Float(2.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            ExactValue::string("a").compare(&ExactValue::string("b")),
            Some(Ordering::Less)
        );
        assert_eq!(ExactValue::Bool(true).compare(&ExactValue::Int(1)), None);
    }

    #[test]
    fn range_checks() {
        assert!(ExactValue::Int(255).fits_in(BasicType::U8));
        assert!(!ExactValue::Int(300).fits_in(BasicType::U8));
        assert!(!ExactValue::Int(-1).fits_in(BasicType::Uint));
        assert!(ExactValue::Int(3).fits_in(BasicType::F64));
        assert!(ExactValue::Float(2.0).fits_in(BasicType::I32));
        assert!(!ExactValue::Float(2.5).fits_in(BasicType::I32));
        assert!(ExactValue::null().fits_in(BasicType::RawPtr));
        assert!(!ExactValue::Bool(true).fits_in(BasicType::Int));
    }

    #[test]
    fn conversion_reshapes_numbers() {
        assert_eq!(
            ExactValue::Int(2).convert_for(BasicType::F64),
            ExactValue::Float(2.0)
        );
        assert_eq!(
            ExactValue::Float(2.0).convert_for(BasicType::Int),
            ExactValue::Int(2)
        );
    }
}
