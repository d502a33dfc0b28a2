//! Arithmetic and comparison on runtime values.
//!
//! Operands must have the same kind; there are no implicit conversions.
//! Integer arithmetic wraps. Integer division by zero throws `DivideByZero`.

use std::cmp::Ordering;

use typeforge_compiler::bytecode::OpCode;
use typeforge_core::kinds::DivideByZero;

use crate::error::Fault;
use crate::value::Value;

fn mismatch(op: OpCode, lhs: &Value, rhs: &Value) -> Fault {
    Fault::TypeMismatch {
        expected: "operands of one numeric kind",
        found: format!("{} {} {}", lhs.type_name(), op.name(), rhs.type_name()),
    }
}

/// `Add`, `Sub`, `Mul`, `Div`, `Rem`. `Add` also concatenates strings.
pub(crate) fn arithmetic(op: OpCode, lhs: Value, rhs: Value) -> Result<Value, Fault> {
    macro_rules! integer {
        ($ctor:path, $a:expr, $b:expr) => {{
            let (a, b) = ($a, $b);
            match op {
                OpCode::Add => Ok($ctor(a.wrapping_add(b))),
                OpCode::Sub => Ok($ctor(a.wrapping_sub(b))),
                OpCode::Mul => Ok($ctor(a.wrapping_mul(b))),
                OpCode::Div | OpCode::Rem if b == 0 => {
                    Err(Fault::throw::<DivideByZero>("attempted to divide by zero"))
                }
                OpCode::Div => Ok($ctor(a.wrapping_div(b))),
                OpCode::Rem => Ok($ctor(a.wrapping_rem(b))),
                _ => Err(mismatch(op, &lhs, &rhs)),
            }
        }};
    }
    macro_rules! float {
        ($ctor:path, $a:expr, $b:expr) => {{
            let (a, b) = ($a, $b);
            match op {
                OpCode::Add => Ok($ctor(a + b)),
                OpCode::Sub => Ok($ctor(a - b)),
                OpCode::Mul => Ok($ctor(a * b)),
                OpCode::Div => Ok($ctor(a / b)),
                OpCode::Rem => Ok($ctor(a % b)),
                _ => Err(mismatch(op, &lhs, &rhs)),
            }
        }};
    }

    match (&lhs, &rhs) {
        (Value::I8(a), Value::I8(b)) => integer!(Value::I8, *a, *b),
        (Value::I16(a), Value::I16(b)) => integer!(Value::I16, *a, *b),
        (Value::I32(a), Value::I32(b)) => integer!(Value::I32, *a, *b),
        (Value::I64(a), Value::I64(b)) => integer!(Value::I64, *a, *b),
        (Value::U8(a), Value::U8(b)) => integer!(Value::U8, *a, *b),
        (Value::U16(a), Value::U16(b)) => integer!(Value::U16, *a, *b),
        (Value::U32(a), Value::U32(b)) => integer!(Value::U32, *a, *b),
        (Value::U64(a), Value::U64(b)) => integer!(Value::U64, *a, *b),
        (Value::F32(a), Value::F32(b)) => float!(Value::F32, *a, *b),
        (Value::F64(a), Value::F64(b)) => float!(Value::F64, *a, *b),
        (Value::Str(a), Value::Str(b)) if op == OpCode::Add => {
            Ok(Value::from(format!("{a}{b}")))
        }
        _ => Err(mismatch(op, &lhs, &rhs)),
    }
}

pub(crate) fn negate(value: Value) -> Result<Value, Fault> {
    match value {
        Value::I8(v) => Ok(Value::I8(v.wrapping_neg())),
        Value::I16(v) => Ok(Value::I16(v.wrapping_neg())),
        Value::I32(v) => Ok(Value::I32(v.wrapping_neg())),
        Value::I64(v) => Ok(Value::I64(v.wrapping_neg())),
        Value::F32(v) => Ok(Value::F32(-v)),
        Value::F64(v) => Ok(Value::F64(-v)),
        other => Err(Fault::TypeMismatch {
            expected: "a signed numeric value",
            found: other.type_name().to_string(),
        }),
    }
}

fn ordering(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::I8(a), Value::I8(b)) => a.partial_cmp(b),
        (Value::I16(a), Value::I16(b)) => a.partial_cmp(b),
        (Value::I32(a), Value::I32(b)) => a.partial_cmp(b),
        (Value::I64(a), Value::I64(b)) => a.partial_cmp(b),
        (Value::U8(a), Value::U8(b)) => a.partial_cmp(b),
        (Value::U16(a), Value::U16(b)) => a.partial_cmp(b),
        (Value::U32(a), Value::U32(b)) => a.partial_cmp(b),
        (Value::U64(a), Value::U64(b)) => a.partial_cmp(b),
        (Value::F32(a), Value::F32(b)) => a.partial_cmp(b),
        (Value::F64(a), Value::F64(b)) => a.partial_cmp(b),
        (Value::Decimal(a), Value::Decimal(b)) => a.to_f64().partial_cmp(&b.to_f64()),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        (Value::Enum { ty: ta, value: a }, Value::Enum { ty: tb, value: b }) if ta == tb => {
            a.partial_cmp(b)
        }
        _ => None,
    }
}

/// `Eq`, `Ne`, `Lt`, `Le`, `Gt`, `Ge`.
///
/// Equality is defined for every pair of values. Ordering requires
/// comparable operands; an unordered float pair compares false.
pub(crate) fn compare(op: OpCode, lhs: Value, rhs: Value) -> Result<Value, Fault> {
    let result = match op {
        OpCode::Eq => lhs == rhs,
        OpCode::Ne => lhs != rhs,
        _ => {
            let comparable = matches!(
                (&lhs, &rhs),
                (Value::F32(_), Value::F32(_)) | (Value::F64(_), Value::F64(_))
            );
            let Some(ordering) = ordering(&lhs, &rhs) else {
                return if comparable {
                    Ok(Value::Bool(false))
                } else {
                    Err(mismatch(op, &lhs, &rhs))
                };
            };
            match op {
                OpCode::Lt => ordering == Ordering::Less,
                OpCode::Le => ordering != Ordering::Greater,
                OpCode::Gt => ordering == Ordering::Greater,
                OpCode::Ge => ordering != Ordering::Less,
                _ => return Err(mismatch(op, &lhs, &rhs)),
            }
        }
    };
    Ok(Value::Bool(result))
}
