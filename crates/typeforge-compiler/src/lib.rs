//! Bytecode emission for typeforge.
//!
//! - [`bytecode`] - instruction set, code buffer, per-method constant pool
//! - [`emit`] - [`BytecodeEmitter`]: one method body, locals, labels, regions
//! - [`flow`] - structured control flow (if / loops / foreach / try / throw)
//! - [`probe`] - build-time capability probes
//! - [`CompiledMethod`] - the immutable result

pub mod bytecode;
pub mod emit;
pub mod flow;
mod method;
pub mod probe;

pub use emit::{BytecodeEmitter, Label, Local, RegionHandle};
pub use flow::{Bound, LoopLabels, Protected};
pub use method::{CatchHandler, CompiledMethod, ExceptionRegion};
pub use probe::CapabilityProbe;
