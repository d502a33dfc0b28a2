//! Per-method name table.
//!
//! Numbers never go through the pool; they are encoded as immediate operands.
//! The pool only holds strings (string literals, exception kind names) and
//! type hashes (member keys, class identities, type tokens).

use rustc_hash::FxHashMap;
use typeforge_core::TypeHash;

/// Values stored in the constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// String data.
    Str(String),
    /// Type or member hash.
    Hash(TypeHash),
}

impl Constant {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::Str(s) => Some(s),
            Constant::Hash(_) => None,
        }
    }

    pub fn as_hash(&self) -> Option<TypeHash> {
        match self {
            Constant::Hash(h) => Some(*h),
            Constant::Str(_) => None,
        }
    }
}

/// Deduplicating constant pool owned by one method body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<Constant, u32>,
}

impl ConstantPool {
    /// Create a new empty constant pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or get existing constant, returns index.
    pub fn add(&mut self, constant: Constant) -> u32 {
        if let Some(&idx) = self.index.get(&constant) {
            return idx;
        }

        let idx = self.constants.len() as u32;
        self.constants.push(constant.clone());
        self.index.insert(constant, idx);
        idx
    }

    pub fn add_string(&mut self, value: &str) -> u32 {
        self.add(Constant::Str(value.to_string()))
    }

    pub fn add_hash(&mut self, hash: TypeHash) -> u32 {
        self.add(Constant::Hash(hash))
    }

    /// Get constant by index.
    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pool_is_empty() {
        let pool = ConstantPool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.get(0), None);
    }

    #[test]
    fn strings_and_hashes_are_distinct() {
        let mut pool = ConstantPool::new();
        let s = pool.add_string("Name");
        let h = pool.add_hash(TypeHash::from_name("Name"));
        assert_ne!(s, h);
        assert_eq!(pool.get(s).and_then(Constant::as_str), Some("Name"));
        assert_eq!(
            pool.get(h).and_then(Constant::as_hash),
            Some(TypeHash::from_name("Name"))
        );
    }

    #[test]
    fn deduplication() {
        let mut pool = ConstantPool::new();
        let a = pool.add_string("get_Name");
        let b = pool.add_string("set_Name");
        let c = pool.add_string("get_Name");

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(c, 0);
        assert_eq!(pool.len(), 2);

        let key = TypeHash::from_member("Refresh");
        assert_eq!(pool.add_hash(key), pool.add_hash(key));
        assert_eq!(pool.len(), 3);
    }
}
