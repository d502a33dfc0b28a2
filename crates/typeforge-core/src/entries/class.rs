//! Class type entry.

use bitflags::bitflags;

use crate::TypeHash;

use super::{FieldEntry, MethodEntry, PropertyEntry};

bitflags! {
    /// Class modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u8 {
        /// Cannot be instantiated.
        const ABSTRACT = 1 << 0;
        /// Implemented in Rust (built-in roots, collections).
        const NATIVE = 1 << 1;
        /// Produced by the synthesizer.
        const SYNTHESIZED = 1 << 2;
        /// Instances carry a list body.
        const LIST = 1 << 3;
    }
}

/// Build-time description of a class.
///
/// Members listed here are the ones declared by the class itself; inherited
/// members live on the base entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEntry {
    /// Class name.
    pub name: String,
    /// Identity.
    pub type_hash: TypeHash,
    /// Base class (single inheritance).
    pub base_class: Option<TypeHash>,
    /// Implemented contracts.
    pub interfaces: Vec<TypeHash>,
    /// Declared fields.
    pub fields: Vec<FieldEntry>,
    /// Declared properties.
    pub properties: Vec<PropertyEntry>,
    /// Declared methods (constructor included).
    pub methods: Vec<MethodEntry>,
    /// Modifiers.
    pub flags: ClassFlags,
}

impl ClassEntry {
    /// Create an empty class entry.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            type_hash: TypeHash::from_name(&name),
            name,
            base_class: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            flags: ClassFlags::empty(),
        }
    }

    // === Builder Methods ===

    pub fn with_base(mut self, base: TypeHash) -> Self {
        self.base_class = Some(base);
        self
    }

    pub fn with_interface(mut self, interface: TypeHash) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_field(mut self, field: FieldEntry) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_property(mut self, property: PropertyEntry) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_method(mut self, method: MethodEntry) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_flags(mut self, flags: ClassFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn as_abstract(self) -> Self {
        self.with_flags(ClassFlags::ABSTRACT)
    }

    // === Query Methods ===

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(ClassFlags::ABSTRACT)
    }

    pub fn is_native(&self) -> bool {
        self.flags.contains(ClassFlags::NATIVE)
    }

    pub fn is_synthesized(&self) -> bool {
        self.flags.contains(ClassFlags::SYNTHESIZED)
    }

    /// Find a declared method by name.
    pub fn find_method(&self, name: &str) -> Option<&MethodEntry> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Find a declared method by dispatch key.
    pub fn find_method_by_key(&self, key: TypeHash) -> Option<&MethodEntry> {
        self.methods.iter().find(|m| m.key == key)
    }

    /// Find a declared property by name.
    pub fn find_property(&self, name: &str) -> Option<&PropertyEntry> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// The declared constructor.
    pub fn constructor(&self) -> Option<&MethodEntry> {
        self.methods.iter().find(|m| m.is_constructor())
    }

    /// Check whether a contract is implemented directly by this class.
    pub fn implements(&self, contract: TypeHash) -> bool {
        self.interfaces.contains(&contract)
    }
}
