//! Build-time capability probes.
//!
//! Emission decisions that depend on what another type exposes (does this
//! enumerator have `Dispose`? what does `GetEnumerator` return?) are answered
//! by a [`CapabilityProbe`] before any code is written. The answer is baked
//! into the emitted body; nothing is probed at run time.

use typeforge_core::{ClassEntry, DataType, TypeHash};

/// Name of the enumerator factory method on sequences.
pub const GET_ENUMERATOR: &str = "GetEnumerator";
/// Name of the optional release method on enumerators.
pub const DISPOSE: &str = "Dispose";

/// Answers member-existence questions about classes.
pub trait CapabilityProbe {
    /// Whether `class` (or one of its bases) exposes a method with `key`.
    fn has_method(&self, class: TypeHash, key: TypeHash) -> bool;

    /// Return kind of `class`'s method `key`, if it exists.
    fn method_return_type(&self, class: TypeHash, key: TypeHash) -> Option<DataType>;

    /// The enumerator class returned by `sequence`'s `GetEnumerator`.
    fn enumerator_class(&self, sequence: TypeHash) -> Option<TypeHash> {
        match self.method_return_type(sequence, TypeHash::from_member(GET_ENUMERATOR))? {
            DataType::Object(hash) => Some(hash),
            _ => None,
        }
    }

    /// Whether instances of `class` must be released with `Dispose`.
    fn is_disposable(&self, class: TypeHash) -> bool {
        self.has_method(class, TypeHash::from_member(DISPOSE))
    }
}

/// Probe over a flat list of class entries, following base links.
impl CapabilityProbe for [ClassEntry] {
    fn has_method(&self, class: TypeHash, key: TypeHash) -> bool {
        self.method_return_type(class, key).is_some()
    }

    fn method_return_type(&self, class: TypeHash, key: TypeHash) -> Option<DataType> {
        let mut current = Some(class);
        while let Some(hash) = current {
            let entry = self.iter().find(|c| c.type_hash == hash)?;
            if let Some(method) = entry.find_method_by_key(key) {
                return Some(method.return_type.clone());
            }
            current = entry.base_class;
        }
        None
    }
}
