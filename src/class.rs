//! Finalized classes.
//!
//! A [`ClassType`] is immutable once assembled. It keeps its own declarations
//! as a [`ClassEntry`] and a flattened view of everything it inherits: fields
//! (base fields first, so a field index is stable down the hierarchy),
//! properties, interfaces and the virtual method table.

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use typeforge_compiler::CompiledMethod;
use typeforge_core::{
    BuildError, BuildResult, ClassEntry, FieldEntry, MethodEntry, MethodFlags, PropertyEntry,
    TypeHash,
};

use crate::error::Fault;
use crate::object::ObjectRef;
use crate::runtime::Runtime;
use crate::value::{Delegate, Value};

/// Native method body.
pub type NativeFn = Arc<dyn Fn(&NativeCall<'_>) -> Result<Value, Fault> + Send + Sync>;

/// How a method slot is implemented.
#[derive(Clone)]
pub enum MethodImpl {
    Bytecode(Arc<CompiledMethod>),
    Native(NativeFn),
    Abstract,
}

impl MethodImpl {
    pub fn native(
        f: impl Fn(&NativeCall<'_>) -> Result<Value, Fault> + Send + Sync + 'static,
    ) -> Self {
        MethodImpl::Native(Arc::new(f))
    }

    pub fn bytecode(method: CompiledMethod) -> Self {
        MethodImpl::Bytecode(Arc::new(method))
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, MethodImpl::Abstract)
    }
}

impl fmt::Debug for MethodImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodImpl::Bytecode(m) => write!(f, "Bytecode({}, {} bytes)", m.name(), m.chunk().len()),
            MethodImpl::Native(_) => f.write_str("Native"),
            MethodImpl::Abstract => f.write_str("Abstract"),
        }
    }
}

/// One entry of a virtual method table.
#[derive(Debug, Clone)]
pub struct MethodSlot {
    entry: MethodEntry,
    owner: String,
    implementation: MethodImpl,
}

impl MethodSlot {
    pub fn entry(&self) -> &MethodEntry {
        &self.entry
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Name of the class that declared this implementation.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn implementation(&self) -> &MethodImpl {
        &self.implementation
    }

    pub fn is_abstract(&self) -> bool {
        self.implementation.is_abstract()
    }

    /// Whether a call leaves a result on the caller's stack.
    pub fn returns_value(&self) -> bool {
        !self.entry.return_type.is_void()
    }
}

/// Native state an instance carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceLayout {
    Plain,
    List { observable: bool },
    Enumerator,
    Event,
}

/// A finalized class.
pub struct ClassType {
    entry: ClassEntry,
    base: Option<Arc<ClassType>>,
    layout: InstanceLayout,
    fields: Vec<FieldEntry>,
    field_index: FxHashMap<String, u16>,
    properties: Vec<PropertyEntry>,
    interfaces: Vec<TypeHash>,
    methods: FxHashMap<TypeHash, MethodSlot>,
}

impl ClassType {
    /// Flatten `entry` over `base` and validate the result.
    ///
    /// `implementations` pairs with `entry.methods` by position. A `Plain`
    /// layout inherits the base's layout.
    pub(crate) fn assemble(
        mut entry: ClassEntry,
        base: Option<Arc<ClassType>>,
        layout: InstanceLayout,
        implementations: Vec<MethodImpl>,
    ) -> BuildResult<Self> {
        entry.base_class = base.as_ref().map(|b| b.type_hash());
        let layout = match (&base, layout) {
            (Some(b), InstanceLayout::Plain) => b.layout,
            (_, layout) => layout,
        };
        let class_name = entry.name.clone();
        let duplicate = |member: &str| BuildError::DuplicateMember {
            class: class_name.clone(),
            member: member.to_string(),
        };

        let mut fields = base.as_ref().map(|b| b.fields.clone()).unwrap_or_default();
        for field in &entry.fields {
            if fields.iter().any(|f| f.name == field.name) {
                return Err(duplicate(&field.name));
            }
            fields.push(field.clone());
        }
        let mut field_index = FxHashMap::default();
        for (i, field) in fields.iter().enumerate() {
            let index = u16::try_from(i).map_err(|_| BuildError::CodeTooLarge {
                method: entry.name.clone(),
            })?;
            field_index.insert(field.name.clone(), index);
        }

        let mut properties = base
            .as_ref()
            .map(|b| b.properties.clone())
            .unwrap_or_default();
        let mut own_properties = FxHashSet::default();
        for property in &entry.properties {
            if !own_properties.insert(property.name.as_str()) {
                return Err(duplicate(&property.name));
            }
            match properties.iter_mut().find(|p| p.name == property.name) {
                Some(inherited) => *inherited = property.clone(),
                None => properties.push(property.clone()),
            }
        }

        let mut interfaces = base
            .as_ref()
            .map(|b| b.interfaces.clone())
            .unwrap_or_default();
        for interface in &entry.interfaces {
            if !interfaces.contains(interface) {
                interfaces.push(*interface);
            }
        }

        let mut methods = base
            .as_ref()
            .map(|b| b.methods.clone())
            .unwrap_or_default();
        let mut own_methods = FxHashSet::default();
        for (method, implementation) in entry.methods.iter_mut().zip(implementations) {
            if !own_methods.insert(method.key) {
                return Err(duplicate(&method.name));
            }
            match &implementation {
                MethodImpl::Abstract => method.flags |= MethodFlags::ABSTRACT,
                MethodImpl::Native(_) => method.flags |= MethodFlags::NATIVE,
                MethodImpl::Bytecode(_) => {}
            }
            if methods.contains_key(&method.key) && !method.is_constructor() {
                method.flags |= MethodFlags::OVERRIDE;
            }
            methods.insert(
                method.key,
                MethodSlot {
                    entry: method.clone(),
                    owner: class_name.clone(),
                    implementation,
                },
            );
        }

        if !entry.is_abstract() {
            let unimplemented = methods
                .values()
                .filter(|slot| slot.is_abstract())
                .map(|slot| slot.entry.name.clone())
                .min();
            if let Some(member) = unimplemented {
                return Err(BuildError::AbstractMember {
                    class: entry.name.clone(),
                    member,
                });
            }
        }

        Ok(Self {
            entry,
            base,
            layout,
            fields,
            field_index,
            properties,
            interfaces,
            methods,
        })
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn type_hash(&self) -> TypeHash {
        self.entry.type_hash
    }

    /// Own declarations.
    pub fn entry(&self) -> &ClassEntry {
        &self.entry
    }

    pub fn base(&self) -> Option<&Arc<ClassType>> {
        self.base.as_ref()
    }

    pub fn layout(&self) -> InstanceLayout {
        self.layout
    }

    pub fn is_abstract(&self) -> bool {
        self.entry.is_abstract()
    }

    pub fn is_synthesized(&self) -> bool {
        self.entry.is_synthesized()
    }

    /// All fields, inherited first.
    pub fn fields(&self) -> &[FieldEntry] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<u16> {
        self.field_index.get(name).copied()
    }

    pub fn properties(&self) -> &[PropertyEntry] {
        &self.properties
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyEntry> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn interfaces(&self) -> &[TypeHash] {
        &self.interfaces
    }

    pub fn implements(&self, contract: TypeHash) -> bool {
        self.interfaces.contains(&contract)
    }

    /// Whether this class is `class` or derives from it.
    pub fn is_subclass_of(&self, class: TypeHash) -> bool {
        let mut current = Some(self);
        while let Some(c) = current {
            if c.type_hash() == class {
                return true;
            }
            current = c.base.as_deref();
        }
        false
    }

    /// Virtual lookup.
    pub fn find_method(&self, key: TypeHash) -> Option<&MethodSlot> {
        self.methods.get(&key)
    }

    pub fn find_method_by_name(&self, name: &str) -> Option<&MethodSlot> {
        self.find_method(TypeHash::from_member(name))
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodSlot> {
        self.methods.values()
    }
}

impl fmt::Debug for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassType")
            .field("name", &self.entry.name)
            .field("base", &self.base.as_ref().map(|b| b.name().to_string()))
            .field("layout", &self.layout)
            .field("fields", &self.fields.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

// ============================================================================
// Native calls
// ============================================================================

/// Arguments and context of a native method invocation.
pub struct NativeCall<'a> {
    runtime: &'a Runtime,
    args: &'a [Value],
    depth: usize,
}

impl<'a> NativeCall<'a> {
    pub(crate) fn new(runtime: &'a Runtime, args: &'a [Value], depth: usize) -> Self {
        Self {
            runtime,
            args,
            depth,
        }
    }

    pub fn runtime(&self) -> &'a Runtime {
        self.runtime
    }

    /// The receiver.
    pub fn this(&self) -> Value {
        self.args.first().cloned().unwrap_or_default()
    }

    /// The receiver as an object; null throws `NullReference`.
    pub fn this_object(&self) -> Result<ObjectRef, Fault> {
        crate::vm::expect_object(self.this())
    }

    /// Argument `index`, not counting the receiver. Missing arguments read
    /// as null.
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index + 1).cloned().unwrap_or_default()
    }

    pub fn arg_count(&self) -> usize {
        self.args.len().saturating_sub(1)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Invoke a delegate one level deeper.
    pub fn invoke(&self, delegate: &Delegate, args: Vec<Value>) -> Result<Value, Fault> {
        self.runtime.invoke_delegate_at(delegate, args, self.depth + 1)
    }

    /// Virtual call on `target` one level deeper.
    pub fn call_virtual(
        &self,
        target: &ObjectRef,
        key: TypeHash,
        args: Vec<Value>,
    ) -> Result<Value, Fault> {
        self.runtime.call_virtual_at(target, key, args, self.depth + 1)
    }
}
