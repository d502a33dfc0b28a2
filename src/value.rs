//! Runtime values.
//!
//! [`Value`] is what the interpreter pushes on its operand stack and stores in
//! fields and locals. Value kinds are stored inline; objects, arrays,
//! delegates and exceptions are shared references.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use thiserror::Error;
use typeforge_core::{DataType, Decimal, ExceptionKind, KnownException, Literal, TypeHash};

use crate::error::Fault;
use crate::object::{Object, ObjectRef};

/// Shared, mutable array storage.
pub type ArrayRef = Arc<Mutex<Vec<Value>>>;

/// Host callback usable wherever a delegate is expected.
pub type HostFn = Arc<dyn Fn(&[Value]) -> Result<Value, Fault> + Send + Sync>;

/// A runtime value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Str(Arc<str>),
    Enum { ty: TypeHash, value: i64 },
    Type(TypeHash),
    Object(ObjectRef),
    Array(ArrayRef),
    Delegate(Delegate),
    Exception(Arc<ScriptException>),
}

impl Value {
    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Null => Value::Null,
            Literal::Bool(v) => Value::Bool(*v),
            Literal::I8(v) => Value::I8(*v),
            Literal::I16(v) => Value::I16(*v),
            Literal::I32(v) => Value::I32(*v),
            Literal::I64(v) => Value::I64(*v),
            Literal::U8(v) => Value::U8(*v),
            Literal::U16(v) => Value::U16(*v),
            Literal::U32(v) => Value::U32(*v),
            Literal::U64(v) => Value::U64(*v),
            Literal::F32(v) => Value::F32(*v),
            Literal::F64(v) => Value::F64(*v),
            Literal::Decimal(v) => Value::Decimal(*v),
            Literal::Str(s) => Value::Str(Arc::from(s.as_str())),
            Literal::Enum { ty, value } => Value::Enum {
                ty: *ty,
                value: *value,
            },
            Literal::Type(h) => Value::Type(*h),
        }
    }

    /// Initial value of a slot of kind `ty`.
    pub fn default_for(ty: &DataType) -> Self {
        Value::from_literal(&ty.default_literal())
    }

    pub fn string(value: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(value.as_ref()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integer kind widened to `i64`, when it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v.into()),
            Value::I16(v) => Some(v.into()),
            Value::I32(v) => Some(v.into()),
            Value::I64(v) => Some(v),
            Value::U8(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::U64(v) => i64::try_from(v).ok(),
            Value::Enum { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(f64::from(*v)),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_exception(&self) -> Option<&Arc<ScriptException>> {
        match self {
            Value::Exception(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Kind name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::Str(_) => "string",
            Value::Enum { .. } => "enum",
            Value::Type(_) => "type",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Delegate(_) => "delegate",
            Value::Exception(_) => "exception",
        }
    }
}

impl PartialEq for Value {
    /// Value kinds compare by value, references by identity. Strings compare
    /// by content.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Enum { ty: ta, value: a }, Value::Enum { ty: tb, value: b }) => {
                ta == tb && a == b
            }
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Delegate(a), Value::Delegate(b)) => a.same_target(b),
            (Value::Exception(a), Value::Exception(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}i8"),
            Value::I16(v) => write!(f, "{v}i16"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}i64"),
            Value::U8(v) => write!(f, "{v}u8"),
            Value::U16(v) => write!(f, "{v}u16"),
            Value::U32(v) => write!(f, "{v}u32"),
            Value::U64(v) => write!(f, "{v}u64"),
            Value::F32(v) => write!(f, "{v}f32"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Enum { ty, value } => write!(f, "enum {ty}::{value}"),
            Value::Type(h) => write!(f, "type {h}"),
            Value::Object(o) => write!(f, "<{}>", o.class_name()),
            Value::Array(a) => write!(f, "array[{}]", a.lock().len()),
            Value::Delegate(d) => write!(f, "{d:?}"),
            Value::Exception(e) => write!(f, "exception {e}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl From<&ObjectRef> for Value {
    fn from(value: &ObjectRef) -> Self {
        Value::Object(Arc::clone(value))
    }
}

// ============================================================================
// Delegates
// ============================================================================

/// A callable reference.
///
/// Method delegates hold their target weakly: an object subscribed to its own
/// collection does not keep itself alive, and invoking a delegate whose target
/// is gone does nothing.
#[derive(Clone)]
pub enum Delegate {
    Method { target: Weak<Object>, key: TypeHash },
    Host(HostFn),
}

impl Delegate {
    /// Delegate bound to `target`'s virtual method `key`.
    pub fn method(target: &ObjectRef, key: TypeHash) -> Self {
        Delegate::Method {
            target: Arc::downgrade(target),
            key,
        }
    }

    pub fn host(f: impl Fn(&[Value]) -> Result<Value, Fault> + Send + Sync + 'static) -> Self {
        Delegate::Host(Arc::new(f))
    }

    /// Whether both delegates call the same thing.
    pub fn same_target(&self, other: &Delegate) -> bool {
        match (self, other) {
            (
                Delegate::Method { target: a, key: ka },
                Delegate::Method { target: b, key: kb },
            ) => ka == kb && Weak::ptr_eq(a, b),
            (Delegate::Host(a), Delegate::Host(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delegate::Method { target, key } => match target.upgrade() {
                Some(obj) => write!(f, "delegate <{}>.{key}", obj.class_name()),
                None => write!(f, "delegate <dropped>.{key}"),
            },
            Delegate::Host(_) => f.write_str("delegate <host>"),
        }
    }
}

// ============================================================================
// Script exceptions
// ============================================================================

/// An exception raised by bytecode or by a native method.
///
/// Catch clauses match on [`ScriptException::hash`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {message}")]
pub struct ScriptException {
    name: String,
    hash: TypeHash,
    message: String,
}

impl ScriptException {
    pub fn new(kind: &ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            name: kind.name().to_string(),
            hash: kind.hash(),
            message: message.into(),
        }
    }

    pub fn of<K: KnownException>(message: impl Into<String>) -> Self {
        Self::new(&ExceptionKind::of::<K>(), message)
    }

    /// Exception whose discriminator is known but whose name may not be.
    pub fn with_hash(name: impl Into<String>, hash: TypeHash, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash,
            message: message.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> TypeHash {
        self.hash
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is<K: KnownException>(&self) -> bool {
        self.hash == TypeHash::from_exception(K::NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeforge_core::kinds::{InvalidOperation, NullReference};

    #[test]
    fn defaults_follow_kind() {
        assert_eq!(Value::default_for(&DataType::I32), Value::I32(0));
        assert_eq!(Value::default_for(&DataType::Bool), Value::Bool(false));
        assert_eq!(Value::default_for(&DataType::String), Value::Null);
        assert_eq!(
            Value::default_for(&DataType::collection(DataType::I32)),
            Value::Null
        );
    }

    #[test]
    fn literal_conversion_keeps_width() {
        assert_eq!(Value::from_literal(&Literal::U16(7)), Value::U16(7));
        assert_ne!(Value::from_literal(&Literal::I64(7)), Value::I32(7));
        assert_eq!(Value::from_literal(&Literal::from("a")), Value::from("a"));
    }

    #[test]
    fn integer_widening() {
        assert_eq!(Value::U8(200).as_i64(), Some(200));
        assert_eq!(Value::U64(u64::MAX).as_i64(), None);
        assert_eq!(Value::from("x").as_i64(), None);
    }

    #[test]
    fn exception_identity() {
        let e = ScriptException::of::<InvalidOperation>("nope");
        assert!(e.is::<InvalidOperation>());
        assert!(!e.is::<NullReference>());
        assert_eq!(e.to_string(), "InvalidOperation: nope");
    }

    #[test]
    fn host_delegates_compare_by_identity() {
        let a = Delegate::host(|_| Ok(Value::Null));
        let b = a.clone();
        let c = Delegate::host(|_| Ok(Value::Null));
        assert!(a.same_target(&b));
        assert!(!a.same_target(&c));
    }
}
