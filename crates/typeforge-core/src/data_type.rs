//! Value kinds used for fields, properties, locals and signatures.

use std::fmt;

use crate::{Literal, TypeHash};

/// The kind of a value slot.
///
/// Scalar kinds carry their width; reference kinds name the class or
/// contract they point at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// No value (method returns only).
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Four-word fixed point decimal.
    Decimal,
    /// Immutable string.
    String,
    /// Enumeration, stored as its underlying integer.
    Enum(TypeHash),
    /// A type token (`typeof`-style value).
    TypeToken,
    /// Reference to an instance of a class or contract.
    Object(TypeHash),
    /// Reference to a collection with the given element kind.
    Collection(Box<DataType>),
    /// Fixed-length array with the given element kind.
    Array(Box<DataType>),
    /// Bound method reference.
    Delegate,
    /// Caught exception value.
    Exception,
    /// Untyped slot.
    Any,
}

impl DataType {
    /// Collection of `element`.
    pub fn collection(element: DataType) -> Self {
        DataType::Collection(Box::new(element))
    }

    /// Array of `element`.
    pub fn array(element: DataType) -> Self {
        DataType::Array(Box::new(element))
    }

    /// Value kinds are copied and have a non-null default.
    pub fn is_value_kind(&self) -> bool {
        matches!(
            self,
            DataType::Bool
                | DataType::I8
                | DataType::I16
                | DataType::I32
                | DataType::I64
                | DataType::U8
                | DataType::U16
                | DataType::U32
                | DataType::U64
                | DataType::F32
                | DataType::F64
                | DataType::Decimal
                | DataType::Enum(_)
        )
    }

    /// Reference kinds default to null.
    pub fn is_reference_kind(&self) -> bool {
        !self.is_value_kind() && !self.is_void()
    }

    pub fn is_void(&self) -> bool {
        matches!(self, DataType::Void)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, DataType::Collection(_))
    }

    /// Element kind of a collection or array.
    pub fn element_type(&self) -> Option<&DataType> {
        match self {
            DataType::Collection(elem) | DataType::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Integer kinds usable as loop counters and array indices.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::I8
                | DataType::I16
                | DataType::I32
                | DataType::I64
                | DataType::U8
                | DataType::U16
                | DataType::U32
                | DataType::U64
        )
    }

    /// The literal a slot of this kind holds before it is first written.
    pub fn default_literal(&self) -> Literal {
        match self {
            DataType::Bool => Literal::Bool(false),
            DataType::I8 => Literal::I8(0),
            DataType::I16 => Literal::I16(0),
            DataType::I32 => Literal::I32(0),
            DataType::I64 => Literal::I64(0),
            DataType::U8 => Literal::U8(0),
            DataType::U16 => Literal::U16(0),
            DataType::U32 => Literal::U32(0),
            DataType::U64 => Literal::U64(0),
            DataType::F32 => Literal::F32(0.0),
            DataType::F64 => Literal::F64(0.0),
            DataType::Decimal => Literal::Decimal(crate::Decimal::ZERO),
            DataType::Enum(ty) => Literal::Enum { ty: *ty, value: 0 },
            _ => Literal::Null,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Void => write!(f, "void"),
            DataType::Bool => write!(f, "bool"),
            DataType::I8 => write!(f, "int8"),
            DataType::I16 => write!(f, "int16"),
            DataType::I32 => write!(f, "int"),
            DataType::I64 => write!(f, "int64"),
            DataType::U8 => write!(f, "uint8"),
            DataType::U16 => write!(f, "uint16"),
            DataType::U32 => write!(f, "uint"),
            DataType::U64 => write!(f, "uint64"),
            DataType::F32 => write!(f, "float"),
            DataType::F64 => write!(f, "double"),
            DataType::Decimal => write!(f, "decimal"),
            DataType::String => write!(f, "string"),
            DataType::Enum(ty) => write!(f, "enum {ty}"),
            DataType::TypeToken => write!(f, "type"),
            DataType::Object(ty) => write!(f, "object {ty}"),
            DataType::Collection(elem) => write!(f, "collection<{elem}>"),
            DataType::Array(elem) => write!(f, "{elem}[]"),
            DataType::Delegate => write!(f, "delegate"),
            DataType::Exception => write!(f, "exception"),
            DataType::Any => write!(f, "?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_and_reference_kinds() {
        assert!(DataType::I32.is_value_kind());
        assert!(DataType::Decimal.is_value_kind());
        assert!(DataType::Enum(TypeHash::from_name("Color")).is_value_kind());
        assert!(DataType::String.is_reference_kind());
        assert!(DataType::collection(DataType::I32).is_reference_kind());
        assert!(!DataType::Void.is_reference_kind());
    }

    #[test]
    fn defaults_follow_kind() {
        assert_eq!(DataType::I32.default_literal(), Literal::I32(0));
        assert_eq!(DataType::Bool.default_literal(), Literal::Bool(false));
        assert_eq!(DataType::String.default_literal(), Literal::Null);
        assert_eq!(
            DataType::collection(DataType::String).default_literal(),
            Literal::Null
        );
    }

    #[test]
    fn element_type_of_collection() {
        let ty = DataType::collection(DataType::String);
        assert_eq!(ty.element_type(), Some(&DataType::String));
        assert_eq!(DataType::I32.element_type(), None);
    }

    #[test]
    fn display_names() {
        assert_eq!(DataType::I32.to_string(), "int");
        assert_eq!(
            DataType::collection(DataType::String).to_string(),
            "collection<string>"
        );
        assert_eq!(DataType::array(DataType::U8).to_string(), "uint8[]");
    }
}
