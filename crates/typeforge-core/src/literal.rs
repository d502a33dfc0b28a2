//! Literal values known at build time.
//!
//! Literals appear as declared property defaults, constant properties and
//! operands of the emitter's `load_constant`. Each variant maps to exactly one
//! immediate-load instruction form.

use crate::{DataType, Decimal, TypeHash};

/// A build-time constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
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
    Str(String),
    /// Enum member, stored as its underlying integer.
    Enum { ty: TypeHash, value: i64 },
    /// Type token.
    Type(TypeHash),
}

impl Literal {
    /// String literal.
    pub fn string(value: impl Into<String>) -> Self {
        Literal::Str(value.into())
    }

    /// Kind of the slot this literal naturally fills.
    ///
    /// `Null` has no kind of its own and reports [`DataType::Any`].
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Null => DataType::Any,
            Literal::Bool(_) => DataType::Bool,
            Literal::I8(_) => DataType::I8,
            Literal::I16(_) => DataType::I16,
            Literal::I32(_) => DataType::I32,
            Literal::I64(_) => DataType::I64,
            Literal::U8(_) => DataType::U8,
            Literal::U16(_) => DataType::U16,
            Literal::U32(_) => DataType::U32,
            Literal::U64(_) => DataType::U64,
            Literal::F32(_) => DataType::F32,
            Literal::F64(_) => DataType::F64,
            Literal::Decimal(_) => DataType::Decimal,
            Literal::Str(_) => DataType::String,
            Literal::Enum { ty, .. } => DataType::Enum(*ty),
            Literal::Type(_) => DataType::TypeToken,
        }
    }

    /// Whether this literal can initialize a slot of kind `ty`.
    pub fn fits(&self, ty: &DataType) -> bool {
        match self {
            Literal::Null => ty.is_reference_kind(),
            _ => matches!(ty, DataType::Any) || &self.data_type() == ty,
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::I32(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::I64(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::F64(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<Decimal> for Literal {
    fn from(value: Decimal) -> Self {
        Literal::Decimal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_kinds() {
        assert_eq!(Literal::I16(3).data_type(), DataType::I16);
        assert_eq!(Literal::string("a").data_type(), DataType::String);
        let color = TypeHash::from_name("Color");
        assert_eq!(
            Literal::Enum { ty: color, value: 2 }.data_type(),
            DataType::Enum(color)
        );
    }

    #[test]
    fn fits_checks_kind() {
        assert!(Literal::I32(1).fits(&DataType::I32));
        assert!(!Literal::I32(1).fits(&DataType::I64));
        assert!(Literal::Null.fits(&DataType::String));
        assert!(!Literal::Null.fits(&DataType::I32));
        assert!(Literal::from("x").fits(&DataType::Any));
    }
}
