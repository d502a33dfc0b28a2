//! Registry entry types.
//!
//! - [`ClassEntry`] - classes: built-in roots, collections and synthesized types
//! - [`ContractEntry`] - interface and model shapes that drive synthesis
//!
//! Supporting types:
//! - [`FieldEntry`], [`PropertyEntry`], [`MethodEntry`] - class members
//! - [`PropertyShape`], [`DefaultValue`], [`Access`] - contract members

mod class;
mod common;
mod contract;

pub use class::{ClassEntry, ClassFlags};
pub use common::{FieldEntry, MethodEntry, MethodFlags, PropertyEntry};
pub use contract::{Access, ContractEntry, ContractKind, DefaultValue, PropertyShape};
