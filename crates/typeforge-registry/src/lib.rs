//! Registries for typeforge.
//!
//! - [`ContractRegistry`] - contract shapes by identity
//! - [`TypeCache`] - one synthesized type per (recipe, contract)

mod cache;
mod registry;

pub use cache::{CacheKey, Recipe, TypeCache};
pub use registry::ContractRegistry;
