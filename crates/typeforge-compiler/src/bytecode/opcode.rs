//! Bytecode operation codes.
//!
//! Each opcode is a single byte, with operands following inline in
//! big-endian order. Jump targets are absolute `u32` code offsets.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Bytecode operation codes.
///
/// The interpreter is a stack machine. Most operations pop operands from the
/// evaluation stack and push results back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Immediate Loads
    // =========================================================================
    /// Push null.
    PushNull = 0,
    /// Push boolean true.
    PushTrue,
    /// Push boolean false.
    PushFalse,
    /// Operand: i8
    PushI8,
    /// Operand: i16
    PushI16,
    /// Operand: i32
    PushI32,
    /// Operand: i64
    PushI64,
    /// Operand: u8
    PushU8,
    /// Operand: u16
    PushU16,
    /// Operand: u32
    PushU32,
    /// Operand: u64
    PushU64,
    /// Operand: f32 bit pattern
    PushF32,
    /// Operand: f64 bit pattern
    PushF64,
    /// Operand: four u32 words (lo, mid, hi, flags)
    PushDecimal,
    /// Operands: u16 constant index (enum type hash), i64 underlying value
    PushEnum,
    /// Push a type token.
    /// Operand: u16 constant index (type hash)
    PushType,
    /// Operand: u16 constant index (string)
    PushString,

    // =========================================================================
    // Stack Operations
    // =========================================================================
    /// Pop top of stack.
    Pop,
    /// Duplicate top of stack.
    Dup,
    /// Swap the two topmost values.
    Swap,

    // =========================================================================
    // Locals and Arguments
    // =========================================================================
    /// Load argument (0 is the receiver).
    /// Operand: u8 argument index
    LoadArg,
    /// Operand: u16 local slot
    GetLocal,
    /// Operand: u16 local slot
    SetLocal,

    // =========================================================================
    // Object Fields
    // =========================================================================
    /// Pop object, push field.
    /// Operand: u16 field index
    GetField,
    /// Pop value, pop object, store field.
    /// Operand: u16 field index
    SetField,

    // =========================================================================
    // Arithmetic / Comparison / Logic
    // =========================================================================
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Logical not of a bool.
    Not,
    /// Pop value, push whether it is null.
    IsNull,
    /// Pop value, push whether it is an instance of the class or a subclass.
    /// Operand: u16 constant index (class)
    IsInstance,

    // =========================================================================
    // Arrays
    // =========================================================================
    /// Pop i32 length, push array of nulls.
    NewArray,
    /// Pop index, pop array, push element.
    LoadElement,
    /// Pop value, pop index, pop array, store element.
    StoreElement,
    /// Pop array, push its length as i32.
    ArrayLength,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Operand: u32 target
    Jump,
    /// Pop bool, jump when false.
    /// Operand: u32 target
    JumpIfFalse,
    /// Pop bool, jump when true.
    /// Operand: u32 target
    JumpIfTrue,
    /// Exit protected regions, running their finally bodies, then jump.
    /// Operand: u32 target
    Leave,
    /// End of a finally body; resume the pending exit.
    EndFinally,
    /// Return top of stack.
    Return,
    /// Return without a value.
    ReturnVoid,

    // =========================================================================
    // Calls and Construction
    // =========================================================================
    /// Virtual call on the receiver below the arguments.
    /// Operands: u16 constant index (member key), u8 argument count
    CallMethod,
    /// Non-virtual call into a named class.
    /// Operands: u16 constant index (class), u16 constant index (member key),
    /// u8 argument count
    CallBase,
    /// Construct an instance and run its constructor.
    /// Operands: u16 constant index (class), u8 argument count
    New,
    /// Pop target, push a delegate bound to one of its methods.
    /// Operand: u16 constant index (member key)
    NewDelegate,

    // =========================================================================
    // Exceptions
    // =========================================================================
    /// Pop message, push a new exception of a fixed kind.
    /// Operand: u16 constant index (kind name)
    NewException,
    /// Pop message, pop kind token, push a new exception.
    NewExceptionDynamic,
    /// Pop exception and throw it.
    Throw,
}

impl OpCode {
    /// Decode a byte.
    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::try_from(byte).ok()
    }

    /// Size of the inline operands in bytes.
    pub fn operand_size(self) -> usize {
        match self {
            OpCode::PushI8 | OpCode::PushU8 | OpCode::LoadArg => 1,
            OpCode::PushI16
            | OpCode::PushU16
            | OpCode::PushType
            | OpCode::PushString
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetField
            | OpCode::SetField
            | OpCode::IsInstance
            | OpCode::NewDelegate
            | OpCode::NewException => 2,
            OpCode::CallMethod | OpCode::New => 3,
            OpCode::PushI32
            | OpCode::PushU32
            | OpCode::PushF32
            | OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::JumpIfTrue
            | OpCode::Leave => 4,
            OpCode::CallBase => 5,
            OpCode::PushI64 | OpCode::PushU64 | OpCode::PushF64 => 8,
            OpCode::PushEnum => 10,
            OpCode::PushDecimal => 16,
            _ => 0,
        }
    }

    /// Whether the instruction carries a `u32` jump target.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpIfTrue | OpCode::Leave
        )
    }

    /// Get the name of this opcode for disassembly.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::PushNull => "PUSH_NULL",
            OpCode::PushTrue => "PUSH_TRUE",
            OpCode::PushFalse => "PUSH_FALSE",
            OpCode::PushI8 => "PUSH_I8",
            OpCode::PushI16 => "PUSH_I16",
            OpCode::PushI32 => "PUSH_I32",
            OpCode::PushI64 => "PUSH_I64",
            OpCode::PushU8 => "PUSH_U8",
            OpCode::PushU16 => "PUSH_U16",
            OpCode::PushU32 => "PUSH_U32",
            OpCode::PushU64 => "PUSH_U64",
            OpCode::PushF32 => "PUSH_F32",
            OpCode::PushF64 => "PUSH_F64",
            OpCode::PushDecimal => "PUSH_DECIMAL",
            OpCode::PushEnum => "PUSH_ENUM",
            OpCode::PushType => "PUSH_TYPE",
            OpCode::PushString => "PUSH_STRING",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::Swap => "SWAP",
            OpCode::LoadArg => "LOAD_ARG",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::GetField => "GET_FIELD",
            OpCode::SetField => "SET_FIELD",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Rem => "REM",
            OpCode::Neg => "NEG",
            OpCode::Eq => "EQ",
            OpCode::Ne => "NE",
            OpCode::Lt => "LT",
            OpCode::Le => "LE",
            OpCode::Gt => "GT",
            OpCode::Ge => "GE",
            OpCode::Not => "NOT",
            OpCode::IsNull => "IS_NULL",
            OpCode::IsInstance => "IS_INSTANCE",
            OpCode::NewArray => "NEW_ARRAY",
            OpCode::LoadElement => "LOAD_ELEMENT",
            OpCode::StoreElement => "STORE_ELEMENT",
            OpCode::ArrayLength => "ARRAY_LENGTH",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::JumpIfTrue => "JUMP_IF_TRUE",
            OpCode::Leave => "LEAVE",
            OpCode::EndFinally => "END_FINALLY",
            OpCode::Return => "RETURN",
            OpCode::ReturnVoid => "RETURN_VOID",
            OpCode::CallMethod => "CALL_METHOD",
            OpCode::CallBase => "CALL_BASE",
            OpCode::New => "NEW",
            OpCode::NewDelegate => "NEW_DELEGATE",
            OpCode::NewException => "NEW_EXCEPTION",
            OpCode::NewExceptionDynamic => "NEW_EXCEPTION_DYNAMIC",
            OpCode::Throw => "THROW",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_from_u8() {
        assert_eq!(OpCode::from_u8(0), Some(OpCode::PushNull));
        assert_eq!(OpCode::from_u8(OpCode::Throw as u8), Some(OpCode::Throw));
        assert_eq!(OpCode::from_u8(OpCode::Throw as u8 + 1), None);
        assert_eq!(OpCode::from_u8(255), None);
    }

    #[test]
    fn opcode_name() {
        assert_eq!(OpCode::PushDecimal.name(), "PUSH_DECIMAL");
        assert_eq!(OpCode::JumpIfFalse.name(), "JUMP_IF_FALSE");
        assert_eq!(OpCode::EndFinally.name(), "END_FINALLY");
    }

    #[test]
    fn operand_sizes() {
        assert_eq!(OpCode::Pop.operand_size(), 0);
        assert_eq!(OpCode::Throw.operand_size(), 0);
        assert_eq!(OpCode::PushI8.operand_size(), 1);
        assert_eq!(OpCode::GetLocal.operand_size(), 2);
        assert_eq!(OpCode::IsInstance.operand_size(), 2);
        assert_eq!(OpCode::CallMethod.operand_size(), 3);
        assert_eq!(OpCode::Leave.operand_size(), 4);
        assert_eq!(OpCode::CallBase.operand_size(), 5);
        assert_eq!(OpCode::PushEnum.operand_size(), 10);
        assert_eq!(OpCode::PushDecimal.operand_size(), 16);
    }

    #[test]
    fn branches() {
        assert!(OpCode::Leave.is_branch());
        assert!(OpCode::JumpIfTrue.is_branch());
        assert!(!OpCode::EndFinally.is_branch());
    }
}
