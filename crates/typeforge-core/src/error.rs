//! Build-time error types.
//!
//! Every failure while emitting a method body or synthesizing a type is a
//! [`BuildError`]. Build errors are programmer errors: the whole build is
//! aborted and nothing is cached.
//!
//! ```text
//! BuildError
//! ├── shape errors      - NotAnInterface, BaseNotAssignable, NonInstantiable, UnknownType, DuplicateType
//! ├── integrity errors  - Tamper, AbstractMember, DuplicateMember, UnknownMember, Sealed, InvalidDefault
//! └── emission errors   - UnresolvedLabel, LabelRedefined, UndeclaredLocal, ...
//! ```

use thiserror::Error;

use crate::{DataType, TypeHash};

/// Errors raised while building method bodies or types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    // ========================================================================
    // Shape errors
    // ========================================================================
    /// A contract argument that must be an interface is not one.
    #[error("'{name}' is not an interface")]
    NotAnInterface { name: String },

    /// The requested base type does not derive from the required root.
    #[error("base type '{base}' is not assignable to '{required}'")]
    BaseNotAssignable { base: String, required: String },

    /// A default instance is required for a type that cannot be instantiated.
    #[error("invalid type '{name}': {reason}")]
    NonInstantiable { name: String, reason: String },

    /// A type hash could not be resolved.
    #[error("unknown type {hash}")]
    UnknownType { hash: TypeHash },

    /// A type with the same identity is already registered.
    #[error("type '{name}' is already registered")]
    DuplicateType { name: String },

    // ========================================================================
    // Integrity errors
    // ========================================================================
    /// A required infrastructure member is missing from the base type.
    #[error("base type '{base}' has been tampered with: missing member '{member}'")]
    Tamper { base: String, member: String },

    /// A concrete type leaves an inherited abstract member unimplemented.
    #[error("'{class}' does not implement abstract member '{member}'")]
    AbstractMember { class: String, member: String },

    /// The same member name was defined twice on one type.
    #[error("'{class}' already defines member '{member}'")]
    DuplicateMember { class: String, member: String },

    /// A member referenced by name is not declared on the type.
    #[error("'{class}' has no member '{member}'")]
    UnknownMember { class: String, member: String },

    /// A type descriptor was modified after it was finalized.
    #[error("type '{class}' is sealed")]
    Sealed { class: String },

    /// A declared default value does not fit the property kind.
    #[error("default value of property '{property}' does not fit '{expected}'")]
    InvalidDefault { property: String, expected: DataType },

    // ========================================================================
    // Emission errors
    // ========================================================================
    /// A label was referenced but never marked.
    #[error("label {label} in '{method}' was never marked")]
    UnresolvedLabel { method: String, label: u32 },

    /// A label was marked twice.
    #[error("label {label} in '{method}' was marked twice")]
    LabelRedefined { method: String, label: u32 },

    /// A local slot was used without being declared.
    #[error("local {slot} in '{method}' was not declared")]
    UndeclaredLocal { method: String, slot: u16 },

    /// An argument index beyond the method's arity was loaded.
    #[error("argument {index} in '{method}' is out of range (arity {arity})")]
    ArgumentOutOfRange { method: String, index: u8, arity: u8 },

    /// A protected region was closed out of order or left open.
    #[error("unbalanced protected region in '{method}'")]
    UnbalancedRegion { method: String },

    /// A break/continue was requested outside of a loop.
    #[error("'{method}': {detail}")]
    InvalidBranch { method: String, detail: String },

    /// A method body outgrew the operand encoding.
    #[error("method '{method}' is too large to encode")]
    CodeTooLarge { method: String },
}

impl BuildError {
    /// Emission errors come from a single method body; shape and integrity
    /// errors come from the type being synthesized.
    pub fn is_emission_error(&self) -> bool {
        matches!(
            self,
            BuildError::UnresolvedLabel { .. }
                | BuildError::LabelRedefined { .. }
                | BuildError::UndeclaredLocal { .. }
                | BuildError::ArgumentOutOfRange { .. }
                | BuildError::UnbalancedRegion { .. }
                | BuildError::InvalidBranch { .. }
                | BuildError::CodeTooLarge { .. }
        )
    }
}

/// Result alias for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_culprit() {
        let err = BuildError::Tamper {
            base: "Audited".into(),
            member: "RaisePropertyChanged".into(),
        };
        assert_eq!(
            err.to_string(),
            "base type 'Audited' has been tampered with: missing member 'RaisePropertyChanged'"
        );

        let err = BuildError::NonInstantiable {
            name: "Shape".into(),
            reason: "type is abstract".into(),
        };
        assert_eq!(err.to_string(), "invalid type 'Shape': type is abstract");
    }

    #[test]
    fn emission_classification() {
        assert!(
            BuildError::UnresolvedLabel {
                method: "m".into(),
                label: 0
            }
            .is_emission_error()
        );
        assert!(
            !BuildError::NotAnInterface {
                name: "Person".into()
            }
            .is_emission_error()
        );
    }
}
