//! Run-time type synthesis.
//!
//! A [`Runtime`] turns declarative contracts into classes whose method bodies
//! are emitted as bytecode and executed by an embedded interpreter:
//!
//! - **Model**: an interface becomes a plain data class.
//! - **Self ViewModel**: an interface becomes a notifying class that exposes
//!   itself through `Self`.
//! - **Dynamic ViewModel**: a model class becomes a notifying wrapper around
//!   an `Entity`, with collections mirrored in both directions.
//!
//! ```
//! use typeforge::{ContractEntry, DataType, PropertyShape, Runtime, Value};
//!
//! let runtime = Runtime::new().unwrap();
//! let person = runtime
//!     .register_contract(
//!         ContractEntry::interface("IPerson")
//!             .with_property(PropertyShape::read_write("Name", DataType::String)),
//!     )
//!     .unwrap();
//!
//! let model = runtime.create_model(person).unwrap();
//! runtime.set_property(&model, "Name", "Ada").unwrap();
//!
//! let view_model = runtime
//!     .create_view_model(None, runtime.build_model(person).unwrap().type_hash())
//!     .unwrap();
//! runtime.set_entity(&view_model, &model).unwrap();
//! assert_eq!(runtime.get_property(&view_model, "Name").unwrap(), Value::from("Ada"));
//! ```
//!
//! Emission lives in `typeforge-compiler`, contracts and the type cache in
//! `typeforge-registry`, shared type descriptions in `typeforge-core`.

pub mod builtins;
mod class;
mod config;
mod error;
mod factory;
mod object;
mod runtime;
pub mod synth;
mod value;
mod vm;

pub use class::{ClassType, InstanceLayout, MethodImpl, MethodSlot, NativeCall, NativeFn};
pub use config::RuntimeConfig;
pub use error::{Error, Fault, Result};
pub use object::{Object, ObjectRef, PropertyChangedHandler, SubscriptionId};
pub use runtime::Runtime;
pub use value::{ArrayRef, Delegate, HostFn, ScriptException, Value};

pub use typeforge_compiler::{
    Bound, BytecodeEmitter, CapabilityProbe, CompiledMethod, Label, Local, LoopLabels,
    RegionHandle,
};
pub use typeforge_core::{
    BuildError, BuildResult, ClassEntry, ContractEntry, DataType, Decimal, DefaultValue,
    ExceptionKind, KnownException, Literal, MethodEntry, PropertyEntry, PropertyShape, TypeHash,
    kinds,
};
pub use typeforge_registry::{CacheKey, Recipe, TypeCache};
