//! Exception kinds used by emitted code.
//!
//! A kind is a name plus its [`TypeHash`] discriminator. Catch clauses match a
//! thrown exception by discriminator; the root kind `Exception` matches every
//! exception.

use std::borrow::Cow;
use std::fmt;

use crate::TypeHash;

/// Name of the root kind.
pub const ROOT_EXCEPTION: &str = "Exception";

/// Discriminated exception kind.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ExceptionKind {
    name: Cow<'static, str>,
    hash: TypeHash,
}

impl ExceptionKind {
    /// Create a kind from its name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        let hash = TypeHash::from_exception(&name);
        Self { name, hash }
    }

    /// The root kind; catches everything.
    pub fn root() -> Self {
        Self::new(ROOT_EXCEPTION)
    }

    /// Kind for a statically known exception type.
    pub fn of<K: KnownException>() -> Self {
        Self::new(K::NAME)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> TypeHash {
        self.hash
    }

    pub fn is_root(&self) -> bool {
        self.hash == TypeHash::from_exception(ROOT_EXCEPTION)
    }

    /// Whether a catch clause of this kind handles an exception thrown with
    /// discriminator `thrown`.
    pub fn catches(&self, thrown: TypeHash) -> bool {
        self.is_root() || self.hash == thrown
    }
}

impl fmt::Debug for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExceptionKind({})", self.name)
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An exception kind known at compile time.
///
/// Lets emitters write `throw_new::<InvalidOperation>(..)`.
pub trait KnownException {
    const NAME: &'static str;
}

/// Built-in exception kinds.
pub mod kinds {
    use super::KnownException;

    macro_rules! known_exceptions {
        ($($(#[$doc:meta])* $ty:ident => $name:literal),* $(,)?) => {
            $(
                $(#[$doc])*
                #[derive(Debug, Clone, Copy)]
                pub struct $ty;

                impl KnownException for $ty {
                    const NAME: &'static str = $name;
                }
            )*
        };
    }

    known_exceptions! {
        /// Root of every kind.
        Exception => "Exception",
        /// An operation is not valid in the object's current state.
        InvalidOperation => "InvalidOperation",
        /// A value had the wrong kind.
        InvalidType => "InvalidType",
        /// A null reference was dereferenced.
        NullReference => "NullReference",
        /// An index or count was outside the allowed range.
        ArgumentOutOfRange => "ArgumentOutOfRange",
        /// Integer division or remainder by zero.
        DivideByZero => "DivideByZero",
    }
}
