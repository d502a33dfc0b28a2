//! Contract entries: the declarative shapes synthesis starts from.

use crate::{DataType, Literal, TypeHash};

/// What a contract describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    /// An access interface (members only, no storage).
    Interface,
    /// A plain data model shape.
    Model,
}

/// Accessors a contract property declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Declared initial value of a property.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DefaultValue {
    /// The kind's default (`0`, `false`, null; empty collection for collections).
    #[default]
    None,
    /// A literal.
    Literal(Literal),
    /// A freshly constructed instance of the property's class.
    NewInstance,
}

/// A property declared by a contract.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyShape {
    pub name: String,
    pub data_type: DataType,
    pub access: Access,
    pub default: DefaultValue,
}

impl PropertyShape {
    pub fn read_write(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            access: Access::ReadWrite,
            default: DefaultValue::None,
        }
    }

    pub fn read_only(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            access: Access::ReadOnly,
            default: DefaultValue::None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Literal>) -> Self {
        self.default = DefaultValue::Literal(default.into());
        self
    }

    pub fn with_new_instance(mut self) -> Self {
        self.default = DefaultValue::NewInstance;
        self
    }

    pub fn is_writable(&self) -> bool {
        self.access == Access::ReadWrite
    }

    /// Read-only with a literal default: the value is fixed at construction.
    pub fn is_constant(&self) -> bool {
        self.access == Access::ReadOnly && matches!(self.default, DefaultValue::Literal(_))
    }
}

/// A contract type: the interface or model shape that drives synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractEntry {
    pub name: String,
    pub type_hash: TypeHash,
    pub kind: ContractKind,
    /// Inherited contracts; their properties are part of this contract.
    pub base_contracts: Vec<TypeHash>,
    pub properties: Vec<PropertyShape>,
    /// Declared events (change-notification style, no payload typing).
    pub events: Vec<String>,
}

impl ContractEntry {
    /// An interface contract.
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, ContractKind::Interface)
    }

    /// A model contract.
    pub fn model(name: impl Into<String>) -> Self {
        Self::new(name, ContractKind::Model)
    }

    fn new(name: impl Into<String>, kind: ContractKind) -> Self {
        let name = name.into();
        Self {
            type_hash: TypeHash::from_name(&name),
            name,
            kind,
            base_contracts: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: PropertyShape) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_event(mut self, name: impl Into<String>) -> Self {
        self.events.push(name.into());
        self
    }

    pub fn with_base(mut self, base: TypeHash) -> Self {
        self.base_contracts.push(base);
        self
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ContractKind::Interface
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyShape> {
        self.properties.iter().find(|p| p.name == name)
    }
}
