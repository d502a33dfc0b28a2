//! Pending type descriptors.

use std::sync::Arc;

use tracing::{debug, trace};
use typeforge_compiler::BytecodeEmitter;
use typeforge_core::{
    BuildError, BuildResult, ClassEntry, ClassFlags, DataType, FieldEntry, MethodEntry,
    PropertyEntry, TypeHash,
};

use crate::class::{ClassType, InstanceLayout, MethodImpl};

/// A class under construction.
///
/// Members are added one at a time; [`TypeDescriptor::finalize`] flattens
/// and validates the result exactly once. Later calls to `finalize` return
/// the same class, and any further mutation fails with
/// [`BuildError::Sealed`].
#[derive(Debug)]
pub struct TypeDescriptor {
    entry: ClassEntry,
    base: Option<Arc<ClassType>>,
    layout: InstanceLayout,
    implementations: Vec<MethodImpl>,
    finalized: Option<Arc<ClassType>>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, base: Option<Arc<ClassType>>) -> Self {
        let mut entry = ClassEntry::new(name);
        entry.base_class = base.as_ref().map(|b| b.type_hash());
        Self {
            entry,
            base,
            layout: InstanceLayout::Plain,
            implementations: Vec::new(),
            finalized: None,
        }
    }

    /// Descriptor for a runtime-synthesized class.
    pub fn synthesized(name: impl Into<String>, base: Arc<ClassType>) -> Self {
        let mut descriptor = Self::new(name, Some(base));
        descriptor.entry.flags |= ClassFlags::SYNTHESIZED;
        descriptor
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn type_hash(&self) -> TypeHash {
        self.entry.type_hash
    }

    pub fn base(&self) -> Option<&Arc<ClassType>> {
        self.base.as_ref()
    }

    pub fn is_sealed(&self) -> bool {
        self.finalized.is_some()
    }

    fn check_open(&self) -> BuildResult<()> {
        if self.is_sealed() {
            return Err(BuildError::Sealed {
                class: self.entry.name.clone(),
            });
        }
        Ok(())
    }

    fn duplicate(&self, member: &str) -> BuildError {
        BuildError::DuplicateMember {
            class: self.entry.name.clone(),
            member: member.to_string(),
        }
    }

    pub fn set_abstract(&mut self) -> BuildResult<()> {
        self.check_open()?;
        self.entry.flags |= ClassFlags::ABSTRACT;
        Ok(())
    }

    pub fn set_flags(&mut self, flags: ClassFlags) -> BuildResult<()> {
        self.check_open()?;
        self.entry.flags |= flags;
        Ok(())
    }

    pub fn set_layout(&mut self, layout: InstanceLayout) -> BuildResult<()> {
        self.check_open()?;
        self.layout = layout;
        Ok(())
    }

    pub fn add_interface(&mut self, contract: TypeHash) -> BuildResult<()> {
        self.check_open()?;
        if !self.entry.interfaces.contains(&contract) {
            self.entry.interfaces.push(contract);
        }
        Ok(())
    }

    // ==========================================================================
    // Fields
    // ==========================================================================

    /// Index of a field, inherited or own.
    pub fn field_index(&self, name: &str) -> Option<u16> {
        let inherited = self.base.as_ref().map_or(0, |b| b.fields().len());
        if let Some(index) = self.base.as_ref().and_then(|b| b.field_index(name)) {
            return Some(index);
        }
        let own = self.entry.fields.iter().position(|f| f.name == name)?;
        u16::try_from(inherited + own).ok()
    }

    /// Add a field and return its index in the flattened layout.
    pub fn add_field(&mut self, name: &str, data_type: DataType) -> BuildResult<u16> {
        self.check_open()?;
        if self.field_index(name).is_some() {
            return Err(self.duplicate(name));
        }
        let inherited = self.base.as_ref().map_or(0, |b| b.fields().len());
        let index = u16::try_from(inherited + self.entry.fields.len()).map_err(|_| {
            BuildError::CodeTooLarge {
                method: self.entry.name.clone(),
            }
        })?;
        self.entry.fields.push(FieldEntry::new(name, data_type));
        Ok(index)
    }

    // ==========================================================================
    // Properties and methods
    // ==========================================================================

    pub fn add_property(&mut self, property: PropertyEntry) -> BuildResult<()> {
        self.check_open()?;
        if self.entry.find_property(&property.name).is_some() {
            return Err(self.duplicate(&property.name));
        }
        self.entry.properties.push(property);
        Ok(())
    }

    /// Record the concrete class the constructor stores into property `name`.
    pub fn set_instance_class(&mut self, name: &str, class: TypeHash) -> BuildResult<()> {
        self.check_open()?;
        let class_name = self.entry.name.clone();
        let property = self
            .entry
            .properties
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or(BuildError::UnknownMember {
                class: class_name,
                member: name.to_string(),
            })?;
        property.instance_class = Some(class);
        Ok(())
    }

    /// Whether the class will answer `key`, through its own declarations or
    /// its base.
    pub fn has_method(&self, key: TypeHash) -> bool {
        self.entry.find_method_by_key(key).is_some()
            || self.base.as_ref().is_some_and(|b| b.find_method(key).is_some())
    }

    pub fn add_method(&mut self, method: MethodEntry, implementation: MethodImpl) -> BuildResult<()> {
        self.check_open()?;
        if self.entry.find_method_by_key(method.key).is_some() {
            return Err(self.duplicate(&method.name));
        }
        self.entry.methods.push(method);
        self.implementations.push(implementation);
        Ok(())
    }

    /// Add a bytecode method whose body is emitted by `body`.
    pub fn define_method(
        &mut self,
        method: MethodEntry,
        body: impl FnOnce(&mut BytecodeEmitter),
    ) -> BuildResult<()> {
        self.check_open()?;
        let arity = u8::try_from(method.arity()).map_err(|_| BuildError::CodeTooLarge {
            method: method.name.clone(),
        })?;
        let mut emitter = BytecodeEmitter::new(format!("{}.{}", self.entry.name, method.name), arity);
        body(&mut emitter);
        let compiled = emitter.finish()?;
        trace!(
            method = compiled.name(),
            bytes = compiled.chunk().len(),
            locals = compiled.locals().len(),
            "emitted method"
        );
        self.add_method(method, MethodImpl::bytecode(compiled))
    }

    // ==========================================================================
    // Finalization
    // ==========================================================================

    /// Seal the descriptor and produce its class.
    pub fn finalize(&mut self) -> BuildResult<Arc<ClassType>> {
        if let Some(class) = &self.finalized {
            return Ok(Arc::clone(class));
        }
        let class = Arc::new(ClassType::assemble(
            self.entry.clone(),
            self.base.clone(),
            self.layout,
            self.implementations.clone(),
        )?);
        debug!(
            class = class.name(),
            fields = class.fields().len(),
            methods = class.entry().methods.len(),
            "finalized type"
        );
        self.finalized = Some(Arc::clone(&class));
        Ok(class)
    }
}
