//! Core type model for typeforge.
//!
//! Shared by the emitter, the registry and the runtime:
//!
//! - [`TypeHash`] - deterministic identity for types, members and exception kinds
//! - [`DataType`] / [`Literal`] / [`Decimal`] - value kinds and build-time constants
//! - [`entries`] - class and contract descriptions
//! - [`ExceptionKind`] - catch/throw discriminators
//! - [`BuildError`] - everything that can abort a build

mod data_type;
mod decimal;
pub mod entries;
mod error;
mod exception;
mod literal;
mod type_hash;

pub use data_type::DataType;
pub use decimal::{Decimal, MAX_SCALE};
pub use entries::*;
pub use error::{BuildError, BuildResult};
pub use exception::{ExceptionKind, KnownException, ROOT_EXCEPTION, kinds};
pub use literal::Literal;
pub use type_hash::{TypeHash, hash_constants};
