//! Built-in classes.
//!
//! ```text
//! Object
//! ├── ObservableObject            RaisePropertyChanged, Refresh
//! │   ├── SelfViewModel           (abstract) get_Self
//! │   └── EntityViewModel         (abstract) Entity, OnEntityChanged, Edit, Refresh
//! ├── List                        Add, Insert, RemoveAt, Clear, Item, Count, ...
//! ├── ObservableCollection        List operations + CollectionChanged
//! ├── ListEnumerator              MoveNext, get_Current, Dispose
//! ├── CollectionEnumerator        MoveNext, get_Current
//! └── Event                       Add, Remove, Invoke
//! ```

mod collections;
mod event;
mod roots;

use typeforge_core::{BuildResult, ExceptionKind, KnownException, TypeHash, kinds};

use crate::runtime::Runtime;

pub use collections::CollectionAction;

/// Class names.
pub mod names {
    pub const OBJECT: &str = "Object";
    pub const OBSERVABLE_OBJECT: &str = "ObservableObject";
    pub const SELF_VIEW_MODEL: &str = "SelfViewModel";
    pub const ENTITY_VIEW_MODEL: &str = "EntityViewModel";
    pub const LIST: &str = "List";
    pub const OBSERVABLE_COLLECTION: &str = "ObservableCollection";
    pub const LIST_ENUMERATOR: &str = "ListEnumerator";
    pub const COLLECTION_ENUMERATOR: &str = "CollectionEnumerator";
    pub const EVENT: &str = "Event";
}

/// Infrastructure member names.
pub mod members {
    pub const RAISE_PROPERTY_CHANGED: &str = "RaisePropertyChanged";
    pub const ON_ENTITY_CHANGED: &str = "OnEntityChanged";
    pub const REFRESH: &str = "Refresh";
    pub const EDIT: &str = "Edit";
    pub const ENTITY: &str = "Entity";
    pub const SELF: &str = "Self";
    /// Field behind the `Entity` property.
    pub const ENTITY_FIELD: &str = "_Entity";
    pub const COLLECTION_CHANGED: &str = "CollectionChanged";
}

pub fn object() -> TypeHash {
    TypeHash::from_name(names::OBJECT)
}

pub fn observable_object() -> TypeHash {
    TypeHash::from_name(names::OBSERVABLE_OBJECT)
}

pub fn self_view_model() -> TypeHash {
    TypeHash::from_name(names::SELF_VIEW_MODEL)
}

pub fn entity_view_model() -> TypeHash {
    TypeHash::from_name(names::ENTITY_VIEW_MODEL)
}

pub fn list() -> TypeHash {
    TypeHash::from_name(names::LIST)
}

pub fn observable_collection() -> TypeHash {
    TypeHash::from_name(names::OBSERVABLE_COLLECTION)
}

pub fn event() -> TypeHash {
    TypeHash::from_name(names::EVENT)
}

fn kind<K: KnownException>() -> ExceptionKind {
    ExceptionKind::of::<K>()
}

/// Register every built-in class and exception kind.
pub(crate) fn install(runtime: &Runtime) -> BuildResult<()> {
    for kind in [
        kind::<kinds::Exception>(),
        kind::<kinds::InvalidOperation>(),
        kind::<kinds::InvalidType>(),
        kind::<kinds::NullReference>(),
        kind::<kinds::ArgumentOutOfRange>(),
        kind::<kinds::DivideByZero>(),
    ] {
        runtime.register_exception(&kind);
    }

    let object = runtime.register_class(roots::object()?)?;
    let observable = runtime.register_class(roots::observable_object(&object)?)?;
    runtime.register_class(roots::self_view_model(&observable)?)?;
    runtime.register_class(roots::entity_view_model(&observable)?)?;

    let list_enumerator = runtime.register_class(collections::enumerator(
        names::LIST_ENUMERATOR,
        &object,
        true,
    )?)?;
    let collection_enumerator = runtime.register_class(collections::enumerator(
        names::COLLECTION_ENUMERATOR,
        &object,
        false,
    )?)?;
    runtime.register_class(collections::list(
        names::LIST,
        &object,
        &list_enumerator,
        false,
    )?)?;
    runtime.register_class(collections::list(
        names::OBSERVABLE_COLLECTION,
        &object,
        &collection_enumerator,
        true,
    )?)?;
    runtime.register_class(event::event(&object)?)?;
    Ok(())
}
