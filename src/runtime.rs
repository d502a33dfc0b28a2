//! The runtime: class table, contracts, type cache and method dispatch.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::warn;
use typeforge_compiler::{CapabilityProbe, CompiledMethod};
use typeforge_core::kinds::InvalidOperation;
use typeforge_core::{
    BuildError, BuildResult, ContractEntry, DataType, ExceptionKind, TypeHash,
};
use typeforge_registry::{ContractRegistry, TypeCache};

use crate::builtins::{self, members};
use crate::class::{ClassType, MethodImpl, MethodSlot, NativeCall};
use crate::config::RuntimeConfig;
use crate::error::Fault;
use crate::object::{Object, ObjectRef};
use crate::value::{Delegate, Value};
use crate::vm;

/// Owns every class, contract and synthesized type.
///
/// A runtime starts with the built-in class library installed. Contracts are
/// registered by the host; the factory methods then synthesize and cache
/// classes implementing them.
///
/// ```
/// use typeforge::{Runtime, Value};
///
/// let runtime = Runtime::new().unwrap();
/// let list = runtime.instantiate_by_name("List").unwrap();
/// runtime.call_method(&list, "Add", vec![Value::I32(7)]).unwrap();
/// assert_eq!(runtime.get_property(&list, "Count").unwrap(), Value::I32(1));
/// ```
pub struct Runtime {
    config: RuntimeConfig,
    classes: RwLock<FxHashMap<TypeHash, Arc<ClassType>>>,
    contracts: RwLock<ContractRegistry>,
    cache: TypeCache<ClassType>,
    exception_names: RwLock<FxHashMap<TypeHash, String>>,
}

impl Runtime {
    pub fn new() -> BuildResult<Self> {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> BuildResult<Self> {
        let runtime = Self {
            config,
            classes: RwLock::new(FxHashMap::default()),
            contracts: RwLock::new(ContractRegistry::new()),
            cache: TypeCache::new(),
            exception_names: RwLock::new(FxHashMap::default()),
        };
        builtins::install(&runtime)?;
        Ok(runtime)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ==========================================================================
    // Classes and contracts
    // ==========================================================================

    /// Add a finalized class to the class table.
    pub fn register_class(&self, class: Arc<ClassType>) -> BuildResult<Arc<ClassType>> {
        let mut classes = self.classes.write();
        if classes.contains_key(&class.type_hash()) {
            return Err(BuildError::DuplicateType {
                name: class.name().to_string(),
            });
        }
        classes.insert(class.type_hash(), Arc::clone(&class));
        Ok(class)
    }

    pub fn class(&self, hash: TypeHash) -> Option<Arc<ClassType>> {
        self.classes.read().get(&hash).cloned()
    }

    pub fn class_by_name(&self, name: &str) -> Option<Arc<ClassType>> {
        self.class(TypeHash::from_name(name))
    }

    pub fn require_class(&self, hash: TypeHash) -> BuildResult<Arc<ClassType>> {
        self.class(hash).ok_or(BuildError::UnknownType { hash })
    }

    pub fn register_contract(&self, contract: ContractEntry) -> BuildResult<TypeHash> {
        self.contracts.write().register(contract)
    }

    pub fn contract(&self, hash: TypeHash) -> Option<ContractEntry> {
        self.contracts.read().get(hash).cloned()
    }

    /// Run `f` against the contract registry.
    pub(crate) fn with_contracts<R>(&self, f: impl FnOnce(&ContractRegistry) -> R) -> R {
        f(&self.contracts.read())
    }

    /// Make an exception kind's name known to dynamic throws.
    pub fn register_exception(&self, kind: &ExceptionKind) {
        self.exception_names
            .write()
            .insert(kind.hash(), kind.name().to_string());
    }

    /// Name of a registered exception kind; unknown kinds are named after
    /// their hash.
    pub fn exception_name(&self, hash: TypeHash) -> String {
        self.exception_names
            .read()
            .get(&hash)
            .cloned()
            .unwrap_or_else(|| hash.to_string())
    }

    pub fn cache(&self) -> &TypeCache<ClassType> {
        &self.cache
    }

    // ==========================================================================
    // Instantiation
    // ==========================================================================

    pub fn instantiate(&self, class: TypeHash) -> Result<ObjectRef, Fault> {
        self.instantiate_with(class, Vec::new())
    }

    pub fn instantiate_by_name(&self, name: &str) -> Result<ObjectRef, Fault> {
        self.instantiate(TypeHash::from_name(name))
    }

    /// Construct an instance, passing `args` to the constructor.
    pub fn instantiate_with(&self, class: TypeHash, args: Vec<Value>) -> Result<ObjectRef, Fault> {
        let result = match self.class(class) {
            Some(class) => self.instantiate_at(&class, args, 0),
            None => Err(Fault::throw::<InvalidOperation>(format!(
                "unknown class {class}"
            ))),
        };
        surface("instantiate", result)
    }

    pub(crate) fn instantiate_at(
        &self,
        class: &Arc<ClassType>,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<ObjectRef, Fault> {
        if class.is_abstract() {
            return Err(Fault::throw::<InvalidOperation>(format!(
                "cannot instantiate abstract class '{}'",
                class.name()
            )));
        }
        let instance = Object::allocate(class);
        match class.find_method(TypeHash::CONSTRUCTOR) {
            Some(ctor) => {
                let mut ctor_args = Vec::with_capacity(args.len() + 1);
                ctor_args.push(Value::Object(Arc::clone(&instance)));
                ctor_args.extend(args);
                self.call_slot(ctor, ctor_args, depth)?;
            }
            None if !args.is_empty() => {
                return Err(Fault::missing_method(class.name(), "constructor"));
            }
            None => {}
        }
        Ok(instance)
    }

    // ==========================================================================
    // Host calls
    // ==========================================================================

    /// Virtual call of `target`'s method `name`.
    pub fn call_method(
        &self,
        target: &ObjectRef,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, Fault> {
        let result = match target.class().find_method(TypeHash::from_member(name)) {
            Some(slot) => self.call_slot(slot, with_receiver(target, args), 0),
            None => Err(Fault::MissingMethod {
                class: target.class_name().to_string(),
                member: name.to_string(),
            }),
        };
        surface(name, result)
    }

    pub fn get_property(&self, target: &ObjectRef, property: &str) -> Result<Value, Fault> {
        self.call_method(target, &format!("get_{property}"), Vec::new())
    }

    pub fn set_property(
        &self,
        target: &ObjectRef,
        property: &str,
        value: impl Into<Value>,
    ) -> Result<(), Fault> {
        self.call_method(target, &format!("set_{property}"), vec![value.into()])
            .map(drop)
    }

    /// Point a view model at a new entity.
    pub fn set_entity(&self, view_model: &ObjectRef, entity: impl Into<Value>) -> Result<(), Fault> {
        self.set_property(view_model, members::ENTITY, entity)
    }

    pub fn entity(&self, view_model: &ObjectRef) -> Result<Value, Fault> {
        self.get_property(view_model, members::ENTITY)
    }

    pub fn refresh(&self, view_model: &ObjectRef) -> Result<(), Fault> {
        self.call_method(view_model, members::REFRESH, Vec::new())
            .map(drop)
    }

    pub fn edit(&self, view_model: &ObjectRef, item: impl Into<Value>) -> Result<(), Fault> {
        self.call_method(view_model, members::EDIT, vec![item.into()])
            .map(drop)
    }

    /// Run a free-standing compiled method. `args` includes the receiver
    /// slot, which may be null.
    pub fn execute(&self, method: &CompiledMethod, args: Vec<Value>) -> Result<Value, Fault> {
        surface(method.name(), vm::run(self, method, args, 0))
    }

    pub fn invoke_delegate(&self, delegate: &Delegate, args: Vec<Value>) -> Result<Value, Fault> {
        surface("delegate", self.invoke_delegate_at(delegate, args, 0))
    }

    // ==========================================================================
    // Dispatch
    // ==========================================================================

    /// Call `slot` with `args` (receiver first) at nesting `depth`.
    pub(crate) fn call_slot(
        &self,
        slot: &MethodSlot,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Value, Fault> {
        let limit = self.config.call_depth_limit();
        if depth >= limit {
            return Err(Fault::CallDepthExceeded { limit });
        }
        match slot.implementation() {
            MethodImpl::Bytecode(method) => vm::run(self, method, args, depth),
            MethodImpl::Native(f) => f(&NativeCall::new(self, &args, depth)),
            MethodImpl::Abstract => Err(Fault::AbstractCall {
                class: slot.owner().to_string(),
                method: slot.name().to_string(),
            }),
        }
    }

    pub(crate) fn call_virtual_at(
        &self,
        target: &ObjectRef,
        key: TypeHash,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Value, Fault> {
        let slot = target
            .class()
            .find_method(key)
            .ok_or_else(|| Fault::missing_method(target.class_name(), key.to_string()))?;
        self.call_slot(slot, with_receiver(target, args), depth)
    }

    /// Invoke a delegate. A method delegate whose target was dropped does
    /// nothing.
    pub(crate) fn invoke_delegate_at(
        &self,
        delegate: &Delegate,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Value, Fault> {
        match delegate {
            Delegate::Method { target, key } => match target.upgrade() {
                Some(target) => self.call_virtual_at(&target, *key, args, depth),
                None => Ok(Value::Null),
            },
            Delegate::Host(f) => {
                let limit = self.config.call_depth_limit();
                if depth >= limit {
                    return Err(Fault::CallDepthExceeded { limit });
                }
                f(&args)
            }
        }
    }
}

fn with_receiver(target: &ObjectRef, args: Vec<Value>) -> Vec<Value> {
    let mut all = Vec::with_capacity(args.len() + 1);
    all.push(Value::Object(Arc::clone(target)));
    all.extend(args);
    all
}

/// Log faults that reach the host.
fn surface<T>(call: &str, result: Result<T, Fault>) -> Result<T, Fault> {
    if let Err(fault) = &result {
        warn!(call, %fault, "fault escaped to host");
    }
    result
}

impl CapabilityProbe for Runtime {
    fn has_method(&self, class: TypeHash, key: TypeHash) -> bool {
        self.class(class)
            .is_some_and(|c| c.find_method(key).is_some())
    }

    fn method_return_type(&self, class: TypeHash, key: TypeHash) -> Option<DataType> {
        let class = self.class(class)?;
        let slot = class.find_method(key)?;
        Some(slot.entry().return_type.clone())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("classes", &self.classes.read().len())
            .field("contracts", &self.contracts.read().len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeforge_compiler::BytecodeEmitter;
    use typeforge_core::kinds::NullReference;
    use typeforge_core::{MethodEntry, PropertyShape};

    use crate::synth::TypeDescriptor;

    #[test]
    fn builtins_are_installed() {
        let runtime = Runtime::new().unwrap();
        for name in [
            builtins::names::OBJECT,
            builtins::names::OBSERVABLE_OBJECT,
            builtins::names::ENTITY_VIEW_MODEL,
            builtins::names::LIST,
            builtins::names::OBSERVABLE_COLLECTION,
            builtins::names::EVENT,
        ] {
            assert!(runtime.class_by_name(name).is_some(), "{name}");
        }
        assert_eq!(
            runtime.exception_name(ExceptionKind::of::<NullReference>().hash()),
            "NullReference"
        );
    }

    #[test]
    fn duplicate_class_is_rejected() {
        let runtime = Runtime::new().unwrap();
        let object = runtime.class(builtins::object()).unwrap();
        assert!(matches!(
            runtime.register_class(object),
            Err(BuildError::DuplicateType { .. })
        ));
    }

    #[test]
    fn abstract_class_cannot_be_instantiated() {
        let runtime = Runtime::new().unwrap();
        let fault = runtime
            .instantiate(builtins::entity_view_model())
            .unwrap_err();
        assert!(fault.exception().unwrap().is::<InvalidOperation>());
    }

    #[test]
    fn recursion_hits_the_depth_limit() {
        let runtime = Runtime::with_config(RuntimeConfig::new().max_call_depth(16)).unwrap();
        let object = runtime.class(builtins::object()).unwrap();
        let mut d = TypeDescriptor::new("Recursive", Some(object));
        d.define_method(MethodEntry::new("Down", vec![], DataType::Void), |e| {
            e.load_this();
            e.call_method("Down", 0);
            e.ret_void();
        })
        .unwrap();
        runtime.register_class(d.finalize().unwrap()).unwrap();

        let instance = runtime.instantiate_by_name("Recursive").unwrap();
        assert!(matches!(
            runtime.call_method(&instance, "Down", vec![]),
            Err(Fault::CallDepthExceeded { limit: 16 })
        ));
    }

    #[test]
    fn execute_runs_a_free_method() {
        let runtime = Runtime::new().unwrap();
        let mut e = BytecodeEmitter::new("sum", 1);
        let total = e.declare_local(DataType::I32);
        e.load_constant(0);
        e.store_local(total);
        e.for_range(
            typeforge_compiler::Bound::Const(1),
            typeforge_compiler::Bound::Const(4),
            true,
            |e, i, _| {
                e.load_local(total);
                e.load_local(i);
                e.emit(typeforge_compiler::bytecode::OpCode::Add);
                e.store_local(total);
            },
        );
        e.load_local(total);
        e.ret();
        let method = e.finish().unwrap();
        assert_eq!(runtime.execute(&method, vec![Value::Null]).unwrap(), Value::I32(10));
    }

    #[test]
    fn dropped_delegate_target_is_a_no_op() {
        let runtime = Runtime::new().unwrap();
        let list = runtime.instantiate_by_name(builtins::names::LIST).unwrap();
        let delegate = Delegate::method(&list, TypeHash::from_member("Clear"));
        drop(list);
        assert_eq!(runtime.invoke_delegate(&delegate, vec![]).unwrap(), Value::Null);
    }

    #[test]
    fn contracts_round_trip() {
        let runtime = Runtime::new().unwrap();
        let hash = runtime
            .register_contract(
                ContractEntry::interface("IThing")
                    .with_property(PropertyShape::read_write("Name", DataType::String)),
            )
            .unwrap();
        assert_eq!(runtime.contract(hash).unwrap().name, "IThing");
        assert!(runtime.contract(TypeHash::from_name("IMissing")).is_none());
    }
}
