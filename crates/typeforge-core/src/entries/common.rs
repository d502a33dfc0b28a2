//! Member entries shared by class and contract entries.

use bitflags::bitflags;

use crate::{DataType, TypeHash};

bitflags! {
    /// Method modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u8 {
        /// Dispatched through the receiver's method table.
        const VIRTUAL = 1 << 0;
        /// Declared without a body; a concrete subclass must override it.
        const ABSTRACT = 1 << 1;
        /// Implemented in Rust rather than bytecode.
        const NATIVE = 1 << 2;
        /// Replaces a base declaration with the same key.
        const OVERRIDE = 1 << 3;
        /// The type's constructor.
        const CONSTRUCTOR = 1 << 4;
    }
}

/// A stored field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    /// Field name.
    pub name: String,
    /// Field kind.
    pub data_type: DataType,
}

impl FieldEntry {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A property exposed through accessor methods.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    /// Property name.
    pub name: String,
    /// Property kind.
    pub data_type: DataType,
    /// Getter member key.
    pub getter: Option<TypeHash>,
    /// Setter member key.
    pub setter: Option<TypeHash>,
    /// Setting the property raises a change notification.
    pub notifies: bool,
    /// Concrete class of the instance the constructor stores, when the
    /// declared kind does not name one (collections, `new` defaults).
    pub instance_class: Option<TypeHash>,
}

impl PropertyEntry {
    /// Read-write property with `get_<name>` / `set_<name>` accessors.
    pub fn read_write(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            getter: Some(TypeHash::getter(&name)),
            setter: Some(TypeHash::setter(&name)),
            name,
            data_type,
            notifies: false,
            instance_class: None,
        }
    }

    /// Get-only property.
    pub fn read_only(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            getter: Some(TypeHash::getter(&name)),
            setter: None,
            name,
            data_type,
            notifies: false,
            instance_class: None,
        }
    }

    /// Mark as raising change notifications.
    pub fn notifying(mut self) -> Self {
        self.notifies = true;
        self
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }
}

/// A method signature.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodEntry {
    /// Method name.
    pub name: String,
    /// Dispatch key (`TypeHash::from_member(name)`).
    pub key: TypeHash,
    /// Parameter kinds, excluding the receiver.
    pub params: Vec<DataType>,
    /// Return kind.
    pub return_type: DataType,
    /// Modifiers.
    pub flags: MethodFlags,
}

impl MethodEntry {
    /// A virtual method.
    pub fn new(name: impl Into<String>, params: Vec<DataType>, return_type: DataType) -> Self {
        let name = name.into();
        Self {
            key: TypeHash::from_member(&name),
            name,
            params,
            return_type,
            flags: MethodFlags::VIRTUAL,
        }
    }

    /// The constructor signature.
    pub fn constructor(params: Vec<DataType>) -> Self {
        Self {
            name: ".ctor".to_string(),
            key: TypeHash::CONSTRUCTOR,
            params,
            return_type: DataType::Void,
            flags: MethodFlags::CONSTRUCTOR,
        }
    }

    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodFlags::ABSTRACT)
    }

    pub fn is_constructor(&self) -> bool {
        self.flags.contains(MethodFlags::CONSTRUCTOR)
    }

    /// Receiver plus declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len() + 1
    }
}
