//! Bytecode interpreter.
//!
//! Each call runs in its own [`Frame`] on the Rust stack; the runtime bounds
//! the nesting with `RuntimeConfig::max_call_depth`. A script exception is a
//! `Fault::Thrown` travelling up through `?` until a frame's region table
//! claims it. Other faults are never caught, but every finally body they
//! cross still runs.

mod frame;
mod ops;

use std::sync::Arc;

use parking_lot::Mutex;
use typeforge_compiler::CompiledMethod;
use typeforge_compiler::bytecode::OpCode;
use typeforge_core::kinds::{ArgumentOutOfRange, InvalidType, NullReference};
use typeforge_core::{Decimal, TypeHash};

use crate::error::Fault;
use crate::object::ObjectRef;
use crate::runtime::Runtime;
use crate::value::{ArrayRef, Delegate, ScriptException, Value};

use frame::Frame;

enum Step {
    Continue,
    Return(Value),
}

/// Unwrap an object reference. Null throws `NullReference`; any other value
/// throws `InvalidType`.
pub(crate) fn expect_object(value: Value) -> Result<ObjectRef, Fault> {
    match value {
        Value::Object(obj) => Ok(obj),
        Value::Null => Err(Fault::throw::<NullReference>(
            "object reference not set to an instance",
        )),
        other => Err(Fault::throw::<InvalidType>(format!(
            "expected an object, found {}",
            other.type_name()
        ))),
    }
}

fn expect_bool(value: Value) -> Result<bool, Fault> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(Fault::TypeMismatch {
            expected: "bool",
            found: other.type_name().to_string(),
        }),
    }
}

fn expect_index(value: Value, len: usize) -> Result<usize, Fault> {
    let index = value.as_i32().ok_or_else(|| Fault::TypeMismatch {
        expected: "i32 index",
        found: value.type_name().to_string(),
    })?;
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| {
            Fault::throw::<ArgumentOutOfRange>(format!(
                "index {index} is out of range for length {len}"
            ))
        })
}

/// Execute `method` with `args` (receiver first).
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn run(
    runtime: &Runtime,
    method: &CompiledMethod,
    args: Vec<Value>,
    depth: usize,
) -> Result<Value, Fault> {
    let arity = usize::from(method.arity());
    if args.len() != arity {
        return Err(Fault::InvalidBytecode {
            method: method.name().to_string(),
            offset: 0,
            detail: format!("expected {arity} arguments, got {}", args.len()),
        });
    }
    let mut frame = Frame::new(method, args, runtime.config().stack_limit());

    loop {
        let at = frame.ip();
        match step(runtime, &mut frame, depth) {
            Ok(Step::Continue) => {}
            Ok(Step::Return(value)) => return Ok(value),
            Err(fault) => frame.unwind(fault, at)?,
        }
    }
}

fn step(runtime: &Runtime, frame: &mut Frame<'_>, depth: usize) -> Result<Step, Fault> {
    let at = frame.ip();
    if at >= frame.method().chunk().len() {
        return Err(frame.invalid(at, "execution ran past the end of the method"));
    }
    let byte = frame.read_u8()?;
    let op = OpCode::from_u8(byte)
        .ok_or_else(|| frame.invalid(at, format!("unknown opcode {byte:#04x}")))?;

    match op {
        // ======================================================================
        // Immediate loads
        // ======================================================================
        OpCode::PushNull => frame.push(Value::Null)?,
        OpCode::PushTrue => frame.push(Value::Bool(true))?,
        OpCode::PushFalse => frame.push(Value::Bool(false))?,
        OpCode::PushI8 => {
            let v = frame.read_u8()? as i8;
            frame.push(Value::I8(v))?
        }
        OpCode::PushI16 => {
            let v = frame.read_u16()? as i16;
            frame.push(Value::I16(v))?
        }
        OpCode::PushI32 => {
            let v = frame.read_u32()? as i32;
            frame.push(Value::I32(v))?
        }
        OpCode::PushI64 => {
            let v = frame.read_u64()? as i64;
            frame.push(Value::I64(v))?
        }
        OpCode::PushU8 => {
            let v = frame.read_u8()?;
            frame.push(Value::U8(v))?
        }
        OpCode::PushU16 => {
            let v = frame.read_u16()?;
            frame.push(Value::U16(v))?
        }
        OpCode::PushU32 => {
            let v = frame.read_u32()?;
            frame.push(Value::U32(v))?
        }
        OpCode::PushU64 => {
            let v = frame.read_u64()?;
            frame.push(Value::U64(v))?
        }
        OpCode::PushF32 => {
            let v = f32::from_bits(frame.read_u32()?);
            frame.push(Value::F32(v))?
        }
        OpCode::PushF64 => {
            let v = f64::from_bits(frame.read_u64()?);
            frame.push(Value::F64(v))?
        }
        OpCode::PushDecimal => {
            let mut parts = [0u32; 4];
            for part in &mut parts {
                *part = frame.read_u32()?;
            }
            let value = Decimal::from_parts(parts)
                .ok_or_else(|| frame.invalid(at, "malformed decimal"))?;
            frame.push(Value::Decimal(value))?
        }
        OpCode::PushEnum => {
            let ty = frame.read_hash()?;
            let value = frame.read_u64()? as i64;
            frame.push(Value::Enum { ty, value })?
        }
        OpCode::PushType => {
            let hash = frame.read_hash()?;
            frame.push(Value::Type(hash))?
        }
        OpCode::PushString => {
            let s = frame.read_str()?;
            frame.push(Value::string(s))?
        }

        // ======================================================================
        // Stack
        // ======================================================================
        OpCode::Pop => {
            frame.pop()?;
        }
        OpCode::Dup => {
            let top = frame.pop()?;
            frame.push(top.clone())?;
            frame.push(top)?
        }
        OpCode::Swap => {
            let top = frame.pop()?;
            let below = frame.pop()?;
            frame.push(top)?;
            frame.push(below)?
        }

        // ======================================================================
        // Locals, arguments, fields
        // ======================================================================
        OpCode::LoadArg => {
            let index = frame.read_u8()?;
            let value = frame
                .arg(index)
                .ok_or_else(|| frame.invalid(at, format!("argument {index} is out of range")))?;
            frame.push(value)?
        }
        OpCode::GetLocal => {
            let index = frame.read_u16()?;
            let value = frame
                .local(index)
                .ok_or_else(|| frame.invalid(at, format!("local {index} is out of range")))?;
            frame.push(value)?
        }
        OpCode::SetLocal => {
            let index = frame.read_u16()?;
            let value = frame.pop()?;
            if !frame.set_local(index, value) {
                return Err(frame.invalid(at, format!("local {index} is out of range")));
            }
        }
        OpCode::GetField => {
            let index = frame.read_u16()?;
            let target = expect_object(frame.pop()?)?;
            let value = target.field(index).ok_or_else(|| {
                frame.invalid(at, format!("'{}' has no field {index}", target.class_name()))
            })?;
            frame.push(value)?
        }
        OpCode::SetField => {
            let index = frame.read_u16()?;
            let value = frame.pop()?;
            let target = expect_object(frame.pop()?)?;
            if !target.set_field(index, value) {
                return Err(frame.invalid(
                    at,
                    format!("'{}' has no field {index}", target.class_name()),
                ));
            }
        }

        // ======================================================================
        // Arithmetic and logic
        // ======================================================================
        OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Rem => {
            let rhs = frame.pop()?;
            let lhs = frame.pop()?;
            frame.push(ops::arithmetic(op, lhs, rhs)?)?
        }
        OpCode::Neg => {
            let value = frame.pop()?;
            frame.push(ops::negate(value)?)?
        }
        OpCode::Eq | OpCode::Ne | OpCode::Lt | OpCode::Le | OpCode::Gt | OpCode::Ge => {
            let rhs = frame.pop()?;
            let lhs = frame.pop()?;
            frame.push(ops::compare(op, lhs, rhs)?)?
        }
        OpCode::Not => {
            let value = expect_bool(frame.pop()?)?;
            frame.push(Value::Bool(!value))?
        }
        OpCode::IsNull => {
            let value = frame.pop()?;
            frame.push(Value::Bool(value.is_null()))?
        }
        OpCode::IsInstance => {
            let class = frame.read_hash()?;
            let value = frame.pop()?;
            let matches = value
                .as_object()
                .is_some_and(|obj| obj.class().is_subclass_of(class));
            frame.push(Value::Bool(matches))?
        }

        // ======================================================================
        // Arrays
        // ======================================================================
        OpCode::NewArray => {
            let length = frame.pop()?;
            let length = length
                .as_i32()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    Fault::throw::<ArgumentOutOfRange>(format!(
                        "invalid array length {length:?}"
                    ))
                })?;
            let items = vec![Value::Null; length];
            frame.push(Value::Array(Arc::new(Mutex::new(items))))?
        }
        OpCode::LoadElement => {
            let index = frame.pop()?;
            let array = frame.pop()?;
            let value = {
                let array = expect_array(array)?;
                let items = array.lock();
                let i = expect_index(index, items.len())?;
                items[i].clone()
            };
            frame.push(value)?
        }
        OpCode::StoreElement => {
            let value = frame.pop()?;
            let index = frame.pop()?;
            let array = expect_array(frame.pop()?)?;
            let mut items = array.lock();
            let i = expect_index(index, items.len())?;
            items[i] = value;
        }
        OpCode::ArrayLength => {
            let array = expect_array(frame.pop()?)?;
            let len = array.lock().len();
            let len = i32::try_from(len).map_err(|_| {
                Fault::throw::<ArgumentOutOfRange>("array length exceeds i32")
            })?;
            frame.push(Value::I32(len))?
        }

        // ======================================================================
        // Control flow
        // ======================================================================
        OpCode::Jump => {
            let target = frame.read_u32()?;
            frame.jump(target)?
        }
        OpCode::JumpIfFalse | OpCode::JumpIfTrue => {
            let target = frame.read_u32()?;
            let cond = expect_bool(frame.pop()?)?;
            if cond == (op == OpCode::JumpIfTrue) {
                frame.jump(target)?
            }
        }
        OpCode::Leave => {
            let target = frame.read_u32()?;
            frame.leave(at, target)?
        }
        OpCode::EndFinally => frame.end_finally()?,
        OpCode::Return => return Ok(Step::Return(frame.pop()?)),
        OpCode::ReturnVoid => return Ok(Step::Return(Value::Null)),

        // ======================================================================
        // Calls and construction
        // ======================================================================
        OpCode::CallMethod => {
            let key = frame.read_hash()?;
            let argc = usize::from(frame.read_u8()?);
            let mut args = frame.pop_many(argc)?;
            let receiver = frame.pop()?;

            if let Value::Exception(exception) = &receiver {
                let value = exception_member(exception, key).ok_or_else(|| {
                    Fault::missing_method(exception.name(), frame.member_name(key))
                })?;
                frame.push(value)?;
                return Ok(Step::Continue);
            }

            let target = expect_object(receiver)?;
            let class = Arc::clone(target.class());
            let slot = class
                .find_method(key)
                .ok_or_else(|| Fault::missing_method(class.name(), frame.member_name(key)))?;
            args.insert(0, Value::Object(target));
            let result = runtime.call_slot(slot, args, depth + 1)?;
            if slot.returns_value() {
                frame.push(result)?
            }
        }
        OpCode::CallBase => {
            let class_hash = frame.read_hash()?;
            let key = frame.read_hash()?;
            let argc = usize::from(frame.read_u8()?);
            let mut args = frame.pop_many(argc)?;
            let target = expect_object(frame.pop()?)?;

            let class = runtime
                .class(class_hash)
                .ok_or_else(|| {
                    Fault::missing_method(&class_hash.to_string(), frame.member_name(key))
                })?;
            let slot = class
                .find_method(key)
                .ok_or_else(|| Fault::missing_method(class.name(), frame.member_name(key)))?;
            args.insert(0, Value::Object(target));
            let result = runtime.call_slot(slot, args, depth + 1)?;
            if slot.returns_value() {
                frame.push(result)?
            }
        }
        OpCode::New => {
            let class_hash = frame.read_hash()?;
            let argc = usize::from(frame.read_u8()?);
            let args = frame.pop_many(argc)?;
            let class = runtime.class(class_hash).ok_or_else(|| {
                Fault::throw::<InvalidType>(format!("unknown class {class_hash}"))
            })?;
            let instance = runtime.instantiate_at(&class, args, depth + 1)?;
            frame.push(Value::Object(instance))?
        }
        OpCode::NewDelegate => {
            let key = frame.read_hash()?;
            let target = expect_object(frame.pop()?)?;
            frame.push(Value::Delegate(Delegate::method(&target, key)))?
        }

        // ======================================================================
        // Exceptions
        // ======================================================================
        OpCode::NewException => {
            let name = frame.read_str()?;
            let message = message_text(frame.pop()?);
            let exception =
                ScriptException::with_hash(name, TypeHash::from_exception(name), message);
            frame.push(Value::Exception(Arc::new(exception)))?
        }
        OpCode::NewExceptionDynamic => {
            let message = message_text(frame.pop()?);
            let hash = match frame.pop()? {
                Value::Type(hash) => hash,
                other => {
                    return Err(Fault::TypeMismatch {
                        expected: "exception type token",
                        found: other.type_name().to_string(),
                    });
                }
            };
            let exception =
                ScriptException::with_hash(runtime.exception_name(hash), hash, message);
            frame.push(Value::Exception(Arc::new(exception)))?
        }
        OpCode::Throw => match frame.pop()? {
            Value::Exception(exception) => return Err(Fault::Thrown(exception)),
            Value::Null => {
                return Err(Fault::throw::<NullReference>("thrown exception is null"));
            }
            other => {
                return Err(Fault::throw::<InvalidType>(format!(
                    "cannot throw {}",
                    other.type_name()
                )));
            }
        },
    }
    Ok(Step::Continue)
}

fn expect_array(value: Value) -> Result<ArrayRef, Fault> {
    match value {
        Value::Array(array) => Ok(array),
        Value::Null => Err(Fault::throw::<NullReference>("array reference is null")),
        other => Err(Fault::throw::<InvalidType>(format!(
            "expected an array, found {}",
            other.type_name()
        ))),
    }
}

fn message_text(value: Value) -> String {
    match value {
        Value::Str(s) => s.to_string(),
        Value::Null => String::new(),
        other => format!("{other:?}"),
    }
}

/// Members readable on a caught exception.
fn exception_member(exception: &ScriptException, key: TypeHash) -> Option<Value> {
    if key == TypeHash::getter("Message") {
        Some(Value::string(exception.message()))
    } else if key == TypeHash::getter("Name") {
        Some(Value::string(exception.name()))
    } else {
        None
    }
}
