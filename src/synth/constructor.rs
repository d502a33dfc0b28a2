//! Synthesized constructors.
//!
//! ```text
//! this.base(<args>)                         base call
//! this._Field = <literal | new Class()>     one per initializer
//! this._Mirror.add_CollectionChanged(       one per mirrored collection
//!     delegate this.__sync_X)
//! return
//! ```

use typeforge_compiler::BytecodeEmitter;
use typeforge_core::{BuildError, BuildResult, DataType, Literal, MethodEntry, TypeHash};

use super::TypeDescriptor;
use crate::builtins::members;

/// Value stored into a field by the constructor.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInit {
    Literal(Literal),
    /// A fresh instance of the class, built with its parameterless
    /// constructor.
    New(TypeHash),
}

/// How the constructor reaches its base.
pub enum BaseCall<'a> {
    Parameterless,
    /// The base constructor taking `params`; `load` pushes the arguments.
    Matched {
        params: Vec<DataType>,
        load: Box<dyn FnOnce(&mut BytecodeEmitter) + 'a>,
    },
}

impl BaseCall<'_> {
    fn arg_count(&self) -> usize {
        match self {
            BaseCall::Parameterless => 0,
            BaseCall::Matched { params, .. } => params.len(),
        }
    }
}

/// Everything the constructor does, collected while members are added.
pub struct ConstructorPlan<'a> {
    params: Vec<DataType>,
    base_call: BaseCall<'a>,
    initializers: Vec<(u16, FieldInit)>,
    wiring: Vec<(u16, String)>,
}

impl<'a> ConstructorPlan<'a> {
    pub fn parameterless() -> Self {
        Self::with_base_call(Vec::new(), BaseCall::Parameterless)
    }

    /// Take the same parameters as the base constructor and pass them on.
    pub fn forwarding(params: Vec<DataType>) -> Self {
        if params.is_empty() {
            return Self::parameterless();
        }
        let count = params.len();
        let load = Box::new(move |e: &mut BytecodeEmitter| {
            for index in 1..=count {
                e.load_arg(u8::try_from(index).unwrap_or(u8::MAX));
            }
        });
        Self::with_base_call(
            params.clone(),
            BaseCall::Matched { params, load },
        )
    }

    /// Constructor taking `params`, reaching its base through `base_call`.
    pub fn with_base_call(params: Vec<DataType>, base_call: BaseCall<'a>) -> Self {
        Self {
            params,
            base_call,
            initializers: Vec::new(),
            wiring: Vec::new(),
        }
    }

    pub fn initialize(&mut self, field: u16, value: FieldInit) {
        self.initializers.push((field, value));
    }

    /// Subscribe method `handler` to the collection in field `mirror`.
    pub fn synchronize(&mut self, mirror: u16, handler: impl Into<String>) {
        self.wiring.push((mirror, handler.into()));
    }

    pub fn params(&self) -> &[DataType] {
        &self.params
    }
}

impl TypeDescriptor {
    /// Emit the constructor described by `plan`.
    pub fn define_constructor(&mut self, plan: ConstructorPlan<'_>) -> BuildResult<()> {
        let base = match self.base() {
            Some(base) => {
                let expected = plan.base_call.arg_count();
                let found = base
                    .find_method(TypeHash::CONSTRUCTOR)
                    .map(|ctor| ctor.entry().params.len());
                if found != Some(expected) {
                    return Err(BuildError::NonInstantiable {
                        name: base.name().to_string(),
                        reason: format!("no constructor taking {expected} arguments"),
                    });
                }
                Some(base.type_hash())
            }
            None => None,
        };

        let ConstructorPlan {
            params,
            base_call,
            initializers,
            wiring,
        } = plan;
        let add_handler = format!("add_{}", members::COLLECTION_CHANGED);

        self.define_method(MethodEntry::constructor(params), move |e| {
            if let Some(base) = base {
                e.load_this();
                let argc = match base_call {
                    BaseCall::Parameterless => 0,
                    BaseCall::Matched { params, load } => {
                        load(e);
                        params.len()
                    }
                };
                e.call_base_key(base, TypeHash::CONSTRUCTOR, u8::try_from(argc).unwrap_or(u8::MAX));
            }

            for (field, value) in &initializers {
                e.load_this();
                match value {
                    FieldInit::Literal(literal) => e.load_literal(literal),
                    FieldInit::New(class) => e.new_object(*class, 0),
                }
                e.store_field(*field);
            }

            for (mirror, handler) in &wiring {
                e.load_this();
                e.load_field(*mirror);
                e.load_this();
                e.new_delegate(handler);
                e.call_method(&add_handler, 1);
            }

            e.ret_void();
        })
    }
}

#[cfg(test)]
mod tests {
    use typeforge_compiler::bytecode::OpCode;

    use super::*;
    use crate::builtins;
    use crate::class::MethodImpl;
    use crate::{Runtime, Value};

    fn constructor_ops(class: &crate::ClassType) -> Vec<OpCode> {
        match class.find_method(TypeHash::CONSTRUCTOR).unwrap().implementation() {
            MethodImpl::Bytecode(m) => m.chunk().opcodes(),
            other => panic!("expected bytecode, found {other:?}"),
        }
    }

    #[test]
    fn initializers_run_after_the_base_call() {
        let runtime = Runtime::new().unwrap();
        let mut d = TypeDescriptor::new("Counter", runtime.class(builtins::object()));
        let count = d.add_auto_property("Count", DataType::I32, true).unwrap();
        let items = d
            .add_auto_property("Items", DataType::collection(DataType::I32), false)
            .unwrap();

        let mut plan = ConstructorPlan::parameterless();
        plan.initialize(count, FieldInit::Literal(Literal::I32(7)));
        plan.initialize(items, FieldInit::New(builtins::list()));
        d.define_constructor(plan).unwrap();
        let class = runtime.register_class(d.finalize().unwrap()).unwrap();

        assert_eq!(
            constructor_ops(&class),
            vec![
                OpCode::LoadArg,
                OpCode::CallBase,
                OpCode::LoadArg,
                OpCode::PushI32,
                OpCode::SetField,
                OpCode::LoadArg,
                OpCode::New,
                OpCode::SetField,
                OpCode::ReturnVoid,
            ]
        );

        let instance = runtime.instantiate(class.type_hash()).unwrap();
        assert_eq!(instance.field(count), Some(Value::I32(7)));
        let list = instance.field(items).unwrap();
        assert_eq!(list.as_object().unwrap().list_len(), Some(0));
    }

    #[test]
    fn forwarding_passes_arguments_to_the_base() {
        let runtime = Runtime::new().unwrap();
        let object = runtime.class(builtins::object()).unwrap();

        let mut base = TypeDescriptor::new("Named", Some(object));
        let name = base.add_field("_name", DataType::String).unwrap();
        base.define_method(MethodEntry::constructor(vec![DataType::String]), |e| {
            e.load_this();
            e.load_arg(1);
            e.store_field(name);
            e.ret_void();
        })
        .unwrap();
        let base = runtime.register_class(base.finalize().unwrap()).unwrap();

        let mut derived = TypeDescriptor::new("Derived", Some(base));
        derived
            .define_constructor(ConstructorPlan::forwarding(vec![DataType::String]))
            .unwrap();
        let derived = runtime.register_class(derived.finalize().unwrap()).unwrap();

        let instance = runtime
            .instantiate_with(derived.type_hash(), vec![Value::from("x")])
            .unwrap();
        assert_eq!(instance.field(name), Some(Value::from("x")));
    }

    #[test]
    fn base_without_a_matching_constructor_is_rejected() {
        let runtime = Runtime::new().unwrap();
        let mut d = TypeDescriptor::new("Derived", runtime.class(builtins::object()));
        let err = d
            .define_constructor(ConstructorPlan::forwarding(vec![DataType::I32]))
            .unwrap_err();
        assert!(matches!(err, BuildError::NonInstantiable { .. }));
    }
}
