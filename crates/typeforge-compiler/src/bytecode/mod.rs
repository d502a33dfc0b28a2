//! Bytecode types.
//!
//! - [`OpCode`] - the instruction set
//! - [`BytecodeChunk`] - encoded instructions for one method
//! - [`Constant`] and [`ConstantPool`] - per-method string / hash table

mod chunk;
mod constant;
mod opcode;

pub use chunk::BytecodeChunk;
pub use constant::{Constant, ConstantPool};
pub use opcode::OpCode;
