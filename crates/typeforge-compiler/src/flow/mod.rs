//! Structured control flow over the emitter.
//!
//! Each construct is an `impl BytecodeEmitter` block taking closures for its
//! bodies, so labels and protected regions are always opened and closed in
//! matching pairs:
//!
//! - [`conditional`] - `if_then`, `if_then_else`
//! - [`loops`] - `while_loop`, `for_range`, `foreach`
//! - [`protected`] - try/catch/finally and structured `leave`
//! - [`throw`] - construct-and-throw helpers

pub mod conditional;
pub mod loops;
pub mod protected;
pub mod throw;

pub use loops::{Bound, LoopLabels};
pub use protected::Protected;
