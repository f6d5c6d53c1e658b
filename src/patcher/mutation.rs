//! Return-value mutation, planned once per patch.
//!
//! A [`MutationPlan`] is chosen from the member's [`ValueKind`] when the thunk
//! is compiled, with its literal already parsed. Applying it at call time is a
//! single match on the plan and the slot's current value.
//!
//! | Kind | Assign | Add / Subtract / Multiply / Divide |
//! |------|--------|-------------------------------------|
//! | integers | parsed literal | wrapping, in the kind's width; `/ 0` faults |
//! | floats | parsed literal | IEEE 754 |
//! | `bool` | parsed literal | wrapping `u8` math on 0/1, nonzero is `true` |
//! | `char` | parsed literal | wrapping `u16` math on the code unit |
//! | `string` | literal verbatim | appends the literal; null counts as empty |
//! | reference | the type's registered parser | unsupported |

use crate::{
    metadata::{TypeUniverse, ValueKind},
    patch::{MutationOp, ResultMutation},
    runtime::HostValue,
    Error, Result,
};

/// Arithmetic operator of a [`MutationPlan::Arithmetic`] plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    /// `current + operand`
    Add,
    /// `current - operand`
    Subtract,
    /// `current * operand`
    Multiply,
    /// `current / operand`
    Divide,
}

impl ArithOp {
    fn from_op(op: MutationOp) -> Option<Self> {
        match op {
            MutationOp::Assign => None,
            MutationOp::Add => Some(ArithOp::Add),
            MutationOp::Subtract => Some(ArithOp::Subtract),
            MutationOp::Multiply => Some(ArithOp::Multiply),
            MutationOp::Divide => Some(ArithOp::Divide),
        }
    }
}

/// What a patch does to the return slot.
#[derive(Clone, Debug, PartialEq)]
pub enum MutationPlan {
    /// Overwrite a slot of `kind`
    Assign {
        /// Kind the slot must hold
        kind: ValueKind,
        /// Pre-parsed replacement
        value: HostValue,
    },
    /// Combine the slot with an operand of the same kind
    Arithmetic {
        /// Operator
        op: ArithOp,
        /// Pre-parsed right-hand side
        operand: HostValue,
    },
    /// Append to a string slot
    Append(String),
}

impl MutationPlan {
    /// Plans `mutation` for a return value of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnparsableLiteral`] if the literal does not parse as
    /// `kind`, or [`Error::UnsupportedMutation`] if the operation is not
    /// defined for it.
    pub fn new(mutation: &ResultMutation, kind: ValueKind, universe: &TypeUniverse) -> Result<Self> {
        let literal = mutation.value.as_str();
        let unsupported = || Error::UnsupportedMutation {
            operation: mutation.operation.to_string(),
            kind: kind.to_string(),
        };

        match (ArithOp::from_op(mutation.operation), kind) {
            (_, ValueKind::Void) => Err(unsupported()),
            (None, ValueKind::Reference(token)) => {
                let parser = universe
                    .parser_for(token)
                    .ok_or_else(|| Error::UnparsableLiteral {
                        literal: literal.to_string(),
                        kind: kind.to_string(),
                        cause: "type has no registered parse rule".to_string(),
                    })?;
                let value = parser(literal).map_err(|cause| Error::UnparsableLiteral {
                    literal: literal.to_string(),
                    kind: kind.to_string(),
                    cause,
                })?;
                Ok(MutationPlan::Assign { kind, value })
            }
            (Some(_), ValueKind::Reference(_)) => Err(unsupported()),
            (None, kind) => Ok(MutationPlan::Assign {
                kind,
                value: kind.parse_literal(literal)?,
            }),
            (Some(_), ValueKind::String) => Ok(MutationPlan::Append(literal.to_string())),
            (Some(op), kind) => Ok(MutationPlan::Arithmetic {
                op,
                operand: kind.parse_literal(literal)?,
            }),
        }
    }

    /// Applies the plan to the live return value.
    ///
    /// The slot is left untouched on error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArithmeticFault`] on integer division by zero, on an
    /// invalid `char` result, or when the slot holds a value of another kind.
    pub fn apply(&self, slot: &mut HostValue) -> Result<()> {
        match self {
            MutationPlan::Assign { kind, value } => {
                if !kind.accepts(slot) {
                    return Err(mismatch(slot, &kind.to_string()));
                }
                *slot = value.clone();
            }
            MutationPlan::Append(suffix) => {
                if slot.is_null() {
                    *slot = HostValue::String(String::new());
                }
                match slot {
                    HostValue::String(current) => current.push_str(suffix),
                    other => return Err(mismatch(other, "string")),
                }
            }
            MutationPlan::Arithmetic { op, operand } => *slot = combine(*op, slot, operand)?,
        }
        Ok(())
    }
}

fn mismatch(current: &HostValue, expected: &str) -> Error {
    Error::ArithmeticFault(format!(
        "return slot holds {} but the mutation expects {expected}",
        current.type_name()
    ))
}

macro_rules! wrapping {
    ($op:expr, $a:expr, $b:expr) => {
        match $op {
            ArithOp::Add => Ok($a.wrapping_add($b)),
            ArithOp::Subtract => Ok($a.wrapping_sub($b)),
            ArithOp::Multiply => Ok($a.wrapping_mul($b)),
            ArithOp::Divide if $b == 0 => {
                Err(Error::ArithmeticFault("integer division by zero".to_string()))
            }
            ArithOp::Divide => Ok($a.wrapping_div($b)),
        }
    };
}

macro_rules! ieee {
    ($op:expr, $a:expr, $b:expr) => {
        match $op {
            ArithOp::Add => $a + $b,
            ArithOp::Subtract => $a - $b,
            ArithOp::Multiply => $a * $b,
            ArithOp::Divide => $a / $b,
        }
    };
}

fn combine(op: ArithOp, current: &HostValue, operand: &HostValue) -> Result<HostValue> {
    use HostValue as V;

    Ok(match (current, operand) {
        (V::I8(a), V::I8(b)) => V::I8(wrapping!(op, *a, *b)?),
        (V::U8(a), V::U8(b)) => V::U8(wrapping!(op, *a, *b)?),
        (V::I16(a), V::I16(b)) => V::I16(wrapping!(op, *a, *b)?),
        (V::U16(a), V::U16(b)) => V::U16(wrapping!(op, *a, *b)?),
        (V::I32(a), V::I32(b)) => V::I32(wrapping!(op, *a, *b)?),
        (V::U32(a), V::U32(b)) => V::U32(wrapping!(op, *a, *b)?),
        (V::I64(a), V::I64(b)) => V::I64(wrapping!(op, *a, *b)?),
        (V::U64(a), V::U64(b)) => V::U64(wrapping!(op, *a, *b)?),
        (V::F32(a), V::F32(b)) => V::F32(ieee!(op, *a, *b)),
        (V::F64(a), V::F64(b)) => V::F64(ieee!(op, *a, *b)),
        (V::Bool(a), V::Bool(b)) => {
            let byte: u8 = wrapping!(op, u8::from(*a), u8::from(*b))?;
            V::Bool(byte != 0)
        }
        (V::Char(a), V::Char(b)) => {
            let unit = |c: char| {
                u16::try_from(u32::from(c)).map_err(|_| {
                    Error::ArithmeticFault(format!("'{c}' is not a single UTF-16 code unit"))
                })
            };
            let (a, b) = (unit(*a)?, unit(*b)?);
            let code: u16 = wrapping!(op, a, b)?;
            let result = char::from_u32(u32::from(code)).ok_or_else(|| {
                Error::ArithmeticFault(format!("U+{code:04X} is not a valid character"))
            })?;
            V::Char(result)
        }
        (current, operand) => return Err(mismatch(current, operand.type_name())),
    })
}
