//! ContractRegistry - storage for contract shapes.
//!
//! Contracts are stored by [`TypeHash`] with a secondary name index. The
//! registry is populated before synthesis and is read-only afterwards; the
//! runtime wraps it in a lock when it needs shared mutation.

use rustc_hash::FxHashMap;

use typeforge_core::{BuildError, BuildResult, ContractEntry, PropertyShape, TypeHash};

/// Registered contract types.
#[derive(Debug, Default)]
pub struct ContractRegistry {
    contracts: FxHashMap<TypeHash, ContractEntry>,
    by_name: FxHashMap<String, TypeHash>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contract. Registering the same identity twice is an error.
    pub fn register(&mut self, entry: ContractEntry) -> BuildResult<TypeHash> {
        let hash = entry.type_hash;
        if self.contracts.contains_key(&hash) {
            return Err(BuildError::DuplicateType { name: entry.name });
        }
        self.by_name.insert(entry.name.clone(), hash);
        self.contracts.insert(hash, entry);
        Ok(hash)
    }

    pub fn get(&self, hash: TypeHash) -> Option<&ContractEntry> {
        self.contracts.get(&hash)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&ContractEntry> {
        self.by_name.get(name).and_then(|h| self.contracts.get(h))
    }

    /// Look up a contract, failing with `UnknownType`.
    pub fn require(&self, hash: TypeHash) -> BuildResult<&ContractEntry> {
        self.get(hash).ok_or(BuildError::UnknownType { hash })
    }

    pub fn contains(&self, hash: TypeHash) -> bool {
        self.contracts.contains_key(&hash)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// All properties of a contract, inherited contracts first.
    ///
    /// A property redeclared by a derived contract replaces the inherited
    /// declaration in place, so each name appears once.
    pub fn all_properties(&self, hash: TypeHash) -> BuildResult<Vec<PropertyShape>> {
        let mut out = Vec::new();
        let mut visiting = Vec::new();
        self.collect_properties(hash, &mut out, &mut visiting)?;
        Ok(out)
    }

    fn collect_properties(
        &self,
        hash: TypeHash,
        out: &mut Vec<PropertyShape>,
        visiting: &mut Vec<TypeHash>,
    ) -> BuildResult<()> {
        // A contract reached twice through diamond inheritance adds nothing new.
        if visiting.contains(&hash) {
            return Ok(());
        }
        visiting.push(hash);

        let entry = self.require(hash)?;
        for base in &entry.base_contracts {
            self.collect_properties(*base, out, visiting)?;
        }
        for prop in &entry.properties {
            match out.iter_mut().find(|p| p.name == prop.name) {
                Some(existing) => *existing = prop.clone(),
                None => out.push(prop.clone()),
            }
        }
        Ok(())
    }

    /// All events of a contract, inherited contracts first, deduplicated.
    pub fn all_events(&self, hash: TypeHash) -> BuildResult<Vec<String>> {
        let entry = self.require(hash)?;
        let mut out = Vec::new();
        for base in &entry.base_contracts {
            for event in self.all_events(*base)? {
                if !out.contains(&event) {
                    out.push(event);
                }
            }
        }
        for event in &entry.events {
            if !out.contains(event) {
                out.push(event.clone());
            }
        }
        Ok(out)
    }

    /// Iterate all contracts.
    pub fn iter(&self) -> impl Iterator<Item = &ContractEntry> {
        self.contracts.values()
    }
}
