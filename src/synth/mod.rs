//! Member synthesis.
//!
//! - [`descriptor`] - [`TypeDescriptor`], a class under construction
//! - [`properties`] - auto, notifying and constant properties, events
//! - [`constructor`] - base call, field initializers, collection wiring
//! - [`entity`] - members that delegate to a wrapped entity
//! - [`methods`] - `Refresh`, `Edit` and `get_Self`
//!
//! Every synthesized body is emitted through the compiler's flow builders;
//! nothing here interprets contracts at run time.

mod constructor;
mod descriptor;
mod entity;
mod methods;
mod properties;

pub use constructor::{BaseCall, ConstructorPlan, FieldInit};
pub use descriptor::TypeDescriptor;
pub use entity::EntityCollection;

/// Field backing property `property`.
pub fn backing_field(property: &str) -> String {
    format!("_{property}")
}

/// Re-entrancy guard of a mirrored collection.
pub fn guard_field(property: &str) -> String {
    format!("__syncing_{property}")
}

/// Collection-changed handler of a mirrored collection.
pub fn sync_handler(property: &str) -> String {
    format!("__sync_{property}")
}

pub fn getter(property: &str) -> String {
    format!("get_{property}")
}

pub fn setter(property: &str) -> String {
    format!("set_{property}")
}
