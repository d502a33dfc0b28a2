//! Field-backed properties and events.

use typeforge_core::{BuildError, BuildResult, DataType, MethodEntry, PropertyEntry, TypeHash};

use super::{TypeDescriptor, backing_field, getter, setter};
use crate::builtins::{self, members};

impl TypeDescriptor {
    /// Property over a private field with trivial accessors. Returns the
    /// field index.
    pub fn add_auto_property(
        &mut self,
        name: &str,
        data_type: DataType,
        writable: bool,
    ) -> BuildResult<u16> {
        self.add_backed_property(name, data_type, writable, false)
    }

    /// Like [`add_auto_property`](Self::add_auto_property), but the setter
    /// raises a property-changed notification carrying `name`.
    pub fn add_notifying_property(
        &mut self,
        name: &str,
        data_type: DataType,
        writable: bool,
    ) -> BuildResult<u16> {
        self.require_notifier()?;
        self.add_backed_property(name, data_type, writable, true)
    }

    /// Get-only property. The constructor must initialize the returned field.
    pub fn add_constant_property(&mut self, name: &str, data_type: DataType) -> BuildResult<u16> {
        self.add_backed_property(name, data_type, false, false)
    }

    fn add_backed_property(
        &mut self,
        name: &str,
        data_type: DataType,
        writable: bool,
        notifies: bool,
    ) -> BuildResult<u16> {
        let field = self.add_field(&backing_field(name), data_type.clone())?;

        let mut property = if writable {
            PropertyEntry::read_write(name, data_type.clone())
        } else {
            PropertyEntry::read_only(name, data_type.clone())
        };
        property.notifies = notifies;
        self.add_property(property)?;

        self.define_method(MethodEntry::new(getter(name), vec![], data_type.clone()), |e| {
            e.load_this();
            e.load_field(field);
            e.ret();
        })?;

        if writable {
            self.define_method(
                MethodEntry::new(setter(name), vec![data_type], DataType::Void),
                |e| {
                    e.load_this();
                    e.load_arg(1);
                    e.store_field(field);
                    if notifies {
                        e.load_this();
                        e.load_string(name);
                        e.call_method(members::RAISE_PROPERTY_CHANGED, 1);
                    }
                    e.ret_void();
                },
            )?;
        }
        Ok(field)
    }

    /// The base must expose a concrete one-argument `RaisePropertyChanged`.
    pub(crate) fn require_notifier(&self) -> BuildResult<()> {
        let usable = self
            .base()
            .and_then(|b| b.find_method(TypeHash::from_member(members::RAISE_PROPERTY_CHANGED)))
            .is_some_and(|slot| !slot.is_abstract() && slot.entry().params.len() == 1);
        if usable {
            Ok(())
        } else {
            Err(BuildError::Tamper {
                base: self.base().map_or_else(String::new, |b| b.name().to_string()),
                member: members::RAISE_PROPERTY_CHANGED.to_string(),
            })
        }
    }

    /// Event backed by an `Event` object, with `add_<name>` and
    /// `remove_<name>` accessors. The constructor must create the returned
    /// field.
    pub fn add_event(&mut self, name: &str) -> BuildResult<u16> {
        let field = self.add_field(&backing_field(name), DataType::Object(builtins::event()))?;
        for (prefix, operation) in [("add_", "Add"), ("remove_", "Remove")] {
            self.define_method(
                MethodEntry::new(format!("{prefix}{name}"), vec![DataType::Delegate], DataType::Void),
                |e| {
                    e.load_this();
                    e.load_field(field);
                    e.load_arg(1);
                    e.call_method(operation, 1);
                    e.ret_void();
                },
            )?;
        }
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use typeforge_compiler::bytecode::OpCode;

    use super::*;
    use crate::class::MethodImpl;
    use crate::synth::TypeDescriptor;
    use crate::{Runtime, Value};

    fn setter_ops(d: &mut TypeDescriptor, name: &str) -> Vec<OpCode> {
        let class = d.finalize().unwrap();
        let slot = class.find_method_by_name(&setter(name)).unwrap();
        match slot.implementation() {
            MethodImpl::Bytecode(m) => m.chunk().opcodes(),
            other => panic!("expected bytecode, found {other:?}"),
        }
    }

    #[test]
    fn auto_property_setter_only_stores() {
        let runtime = Runtime::new().unwrap();
        let mut d = TypeDescriptor::new("Plain", runtime.class(builtins::object()));
        d.add_auto_property("Name", DataType::String, true).unwrap();
        assert_eq!(
            setter_ops(&mut d, "Name"),
            vec![OpCode::LoadArg, OpCode::LoadArg, OpCode::SetField, OpCode::ReturnVoid]
        );
    }

    #[test]
    fn notifying_property_raises() {
        let runtime = Runtime::new().unwrap();
        let mut d = TypeDescriptor::new("Notifying", runtime.class(builtins::observable_object()));
        d.add_notifying_property("Name", DataType::String, true).unwrap();
        let ops = setter_ops(&mut d, "Name");
        assert_eq!(ops.iter().filter(|op| **op == OpCode::CallMethod).count(), 1);
        assert!(d.finalize().unwrap().find_property("Name").unwrap().notifies);
    }

    #[test]
    fn notifying_property_needs_an_observable_base() {
        let runtime = Runtime::new().unwrap();
        let mut d = TypeDescriptor::new("Quiet", runtime.class(builtins::object()));
        assert_eq!(
            d.add_notifying_property("Name", DataType::String, true),
            Err(BuildError::Tamper {
                base: "Object".into(),
                member: members::RAISE_PROPERTY_CHANGED.into()
            })
        );
    }

    #[test]
    fn read_only_property_has_no_setter() {
        let runtime = Runtime::new().unwrap();
        let mut d = TypeDescriptor::new("Fixed", runtime.class(builtins::object()));
        d.add_constant_property("Version", DataType::I32).unwrap();
        let class = d.finalize().unwrap();
        assert!(class.find_method_by_name("get_Version").is_some());
        assert!(class.find_method_by_name("set_Version").is_none());
    }

    #[test]
    fn event_accessors_forward_to_the_event_object() {
        let runtime = Runtime::new().unwrap();
        let mut d = TypeDescriptor::new("Source", runtime.class(builtins::object()));
        let field = d.add_event("Changed").unwrap();
        let class = runtime.register_class(d.finalize().unwrap()).unwrap();

        let instance = runtime.instantiate(class.type_hash()).unwrap();
        let event = runtime.instantiate(builtins::event()).unwrap();
        instance.set_field(field, Value::Object(Arc::clone(&event)));

        let handler = crate::Delegate::host(|_| Ok(Value::Null));
        runtime
            .call_method(&instance, "add_Changed", vec![Value::Delegate(handler.clone())])
            .unwrap();
        assert_eq!(event.event_handler_count(), Some(1));
        runtime
            .call_method(&instance, "remove_Changed", vec![Value::Delegate(handler)])
            .unwrap();
        assert_eq!(event.event_handler_count(), Some(0));
    }
}
