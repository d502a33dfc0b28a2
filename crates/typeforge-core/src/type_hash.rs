//! Deterministic hash-based identity for types and members.
//!
//! [`TypeHash`] is a 64-bit hash computed from a name. Because the value is a
//! pure function of the name, a synthesized type, the bytecode that refers to
//! it and the cache that memoizes it all agree on identity without any
//! registration order.
//!
//! Member keys deliberately exclude the owning type: an override in a derived
//! class hashes to the same key as the base declaration, which is what
//! virtual dispatch looks up.
//!
//! # Examples
//!
//! ```
//! use typeforge_core::TypeHash;
//!
//! let a = TypeHash::from_name("IPerson");
//! let b = TypeHash::from_name("IPerson");
//! assert_eq!(a, b);
//!
//! let getter = TypeHash::from_member("get_Name");
//! assert_ne!(getter, TypeHash::from_name("get_Name"));
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// Types, members and exception kinds sharing a name still hash apart.
pub mod hash_constants {
    /// Domain marker for type hashes
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for member (method / accessor) keys
    pub const MEMBER: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for constructor keys
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Domain marker for exception kinds
    pub const EXCEPTION: u64 = 0x5ea77ffbcdf5f302;
}

/// A deterministic 64-bit hash identifying a type, a member or an exception kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Key shared by every constructor. Classes have at most one.
    pub const CONSTRUCTOR: TypeHash = TypeHash(hash_constants::CONSTRUCTOR);

    /// Create a type hash from a qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a member key from a method or accessor name.
    ///
    /// The owner is not mixed in, so `Derived::get_Name` and `Base::get_Name`
    /// share a key.
    #[inline]
    pub fn from_member(name: &str) -> Self {
        TypeHash(hash_constants::MEMBER ^ xxh64(name.as_bytes(), 0))
    }

    /// Create the discriminator for an exception kind.
    #[inline]
    pub fn from_exception(name: &str) -> Self {
        TypeHash(hash_constants::EXCEPTION ^ xxh64(name.as_bytes(), 0))
    }

    /// Member key of a property getter (`get_<name>`).
    pub fn getter(property: &str) -> Self {
        Self::from_member(&format!("get_{property}"))
    }

    /// Member key of a property setter (`set_<name>`).
    pub fn setter(property: &str) -> Self {
        Self::from_member(&format!("set_{property}"))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_hash_determinism() {
        assert_eq!(TypeHash::from_name("IPerson"), TypeHash::from_name("IPerson"));
        assert_eq!(
            TypeHash::from_member("get_Name"),
            TypeHash::from_member("get_Name")
        );
    }

    #[test]
    fn domains_do_not_collide() {
        let name = "Refresh";
        assert_ne!(TypeHash::from_name(name), TypeHash::from_member(name));
        assert_ne!(TypeHash::from_member(name), TypeHash::from_exception(name));
        assert_ne!(TypeHash::from_name(name), TypeHash::from_exception(name));
    }

    #[test]
    fn accessor_keys() {
        assert_eq!(TypeHash::getter("Age"), TypeHash::from_member("get_Age"));
        assert_eq!(TypeHash::setter("Age"), TypeHash::from_member("set_Age"));
        assert_ne!(TypeHash::getter("Age"), TypeHash::setter("Age"));
    }

    #[test]
    fn empty_hash() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!TypeHash::from_name("x").is_empty());
        assert!(!TypeHash::CONSTRUCTOR.is_empty());
    }

    #[test]
    fn display_is_hex() {
        let s = format!("{}", TypeHash(0xff));
        assert_eq!(s, "0x00000000000000ff");
        let d = format!("{:?}", TypeHash(0xff));
        assert_eq!(d, "TypeHash(0x00000000000000ff)");
    }
}
