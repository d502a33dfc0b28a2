//! Members that delegate to a wrapped entity.
//!
//! A scalar property reads and writes the entity's property of the same
//! name and tolerates a missing entity. A collection property keeps a local
//! observable mirror of the entity's collection:
//!
//! ```text
//! mirror edit ──CollectionChanged──> __sync_X ──> entity.X   (unless syncing)
//! Entity = e  ──OnEntityChanged───> syncing = true
//!                                   try { mirror.Clear(); foreach e.X: mirror.Add }
//!                                   finally { syncing = false }
//! ```

use typeforge_compiler::bytecode::OpCode;
use typeforge_compiler::{BytecodeEmitter, CapabilityProbe, Local};
use typeforge_core::{BuildError, BuildResult, DataType, MethodEntry, PropertyEntry, TypeHash};

use super::{TypeDescriptor, backing_field, getter, guard_field, setter, sync_handler};
use crate::builtins::{self, CollectionAction, members};

/// A mirrored collection added by
/// [`TypeDescriptor::add_entity_collection`].
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCollection {
    pub name: String,
    pub element: DataType,
    /// Class of the entity's collection, enumerated on repopulation.
    pub sequence: TypeHash,
    /// Field holding the local `ObservableCollection`.
    pub mirror: u16,
    /// Bool field set while the mirror is repopulated.
    pub guard: u16,
}

impl TypeDescriptor {
    /// Index of the inherited entity field.
    pub fn entity_field(&self) -> BuildResult<u16> {
        self.field_index(members::ENTITY_FIELD)
            .ok_or_else(|| BuildError::Tamper {
                base: self.base().map_or_else(String::new, |b| b.name().to_string()),
                member: members::ENTITY_FIELD.to_string(),
            })
    }

    /// Property forwarding to the entity's property `name`.
    ///
    /// Without an entity, reads return the kind's default and writes do
    /// nothing. A write through an entity raises one notification.
    pub fn add_entity_property(
        &mut self,
        entity: u16,
        name: &str,
        data_type: DataType,
        writable: bool,
    ) -> BuildResult<()> {
        if writable {
            self.require_notifier()?;
        }
        let mut property = if writable {
            PropertyEntry::read_write(name, data_type.clone())
        } else {
            PropertyEntry::read_only(name, data_type.clone())
        };
        property.notifies = writable;
        self.add_property(property)?;

        let default = data_type.default_literal();
        let get = getter(name);
        self.define_method(MethodEntry::new(get.as_str(), vec![], data_type.clone()), |e| {
            e.load_this();
            e.load_field(entity);
            e.is_null();
            e.if_then(|e| {
                e.load_literal(&default);
                e.ret();
            });
            e.load_this();
            e.load_field(entity);
            e.call_method(&get, 0);
            e.ret();
        })?;

        if writable {
            let set = setter(name);
            self.define_method(
                MethodEntry::new(set.as_str(), vec![data_type], DataType::Void),
                |e| {
                    e.load_this();
                    e.load_field(entity);
                    e.is_null();
                    e.if_then(|e| e.ret_void());
                    e.load_this();
                    e.load_field(entity);
                    e.load_arg(1);
                    e.call_method(&set, 1);
                    e.load_this();
                    e.load_string(name);
                    e.call_method(members::RAISE_PROPERTY_CHANGED, 1);
                    e.ret_void();
                },
            )?;
        }
        Ok(())
    }

    /// Read-only collection property mirroring the entity's collection
    /// `name`.
    ///
    /// Adds the mirror and guard fields, the getter and the `__sync_<name>`
    /// handler. The constructor must create the mirror and subscribe the
    /// handler; [`override_entity_changed`](Self::override_entity_changed)
    /// repopulates it by enumerating the entity's `sequence` instance.
    pub fn add_entity_collection(
        &mut self,
        entity: u16,
        name: &str,
        element: DataType,
        sequence: TypeHash,
    ) -> BuildResult<EntityCollection> {
        let data_type = DataType::collection(element.clone());
        let mirror = self.add_field(&backing_field(name), data_type.clone())?;
        let guard = self.add_field(&guard_field(name), DataType::Bool)?;
        self.add_property(PropertyEntry::read_only(name, data_type.clone()))?;

        self.define_method(MethodEntry::new(getter(name), vec![], data_type.clone()), |e| {
            e.load_this();
            e.load_field(mirror);
            e.ret();
        })?;

        // (sender, action, item, index)
        let handler = MethodEntry::new(
            sync_handler(name),
            vec![DataType::Any, DataType::I32, DataType::Any, DataType::I32],
            DataType::Void,
        );
        let entity_getter = getter(name);
        self.define_method(handler, |e| {
            e.load_this();
            e.load_field(guard);
            e.if_then(|e| e.ret_void());

            e.load_this();
            e.load_field(entity);
            e.is_null();
            e.if_then(|e| e.ret_void());

            let target = e.declare_local(data_type);
            e.load_this();
            e.load_field(entity);
            e.call_method(&entity_getter, 0);
            e.store_local(target);
            e.load_local(target);
            e.is_null();
            e.if_then(|e| e.ret_void());

            on_action(e, target, CollectionAction::Add, |e| {
                e.load_arg(4);
                e.load_arg(3);
                e.call_method("Insert", 2);
            });
            on_action(e, target, CollectionAction::Remove, |e| {
                e.load_arg(4);
                e.call_method("RemoveAt", 1);
            });
            on_action(e, target, CollectionAction::Reset, |e| e.call_method("Clear", 0));
            on_action(e, target, CollectionAction::Replace, |e| {
                e.load_arg(4);
                e.load_arg(3);
                e.call_method("set_Item", 2);
            });
            e.ret_void();
        })?;

        Ok(EntityCollection {
            name: name.to_string(),
            element,
            sequence,
            mirror,
            guard,
        })
    }

    /// Override `OnEntityChanged`: repopulate every mirror from the new
    /// entity, call `Refresh`, then chain to the base.
    pub fn override_entity_changed(
        &mut self,
        probe: &(impl CapabilityProbe + ?Sized),
        entity: u16,
        collections: &[EntityCollection],
    ) -> BuildResult<()> {
        let key = TypeHash::from_member(members::ON_ENTITY_CHANGED);
        let base = self
            .base()
            .filter(|b| b.find_method(key).is_some())
            .ok_or_else(|| BuildError::Tamper {
                base: self.base().map_or_else(String::new, |b| b.name().to_string()),
                member: members::ON_ENTITY_CHANGED.to_string(),
            })?;
        let base_hash = base.type_hash();
        let chain = base.find_method(key).is_some_and(|slot| !slot.is_abstract());

        self.define_method(
            MethodEntry::new(members::ON_ENTITY_CHANGED, vec![], DataType::Void),
            |e| {
                for collection in collections {
                    let source_getter = getter(&collection.name);
                    e.load_this();
                    e.load_constant(true);
                    e.store_field(collection.guard);

                    e.try_finally(
                        |e, _| {
                            e.load_this();
                            e.load_field(collection.mirror);
                            e.call_method("Clear", 0);

                            let source = e.declare_local(DataType::collection(
                                collection.element.clone(),
                            ));
                            e.load_null();
                            e.store_local(source);
                            e.load_this();
                            e.load_field(entity);
                            e.is_null();
                            e.not();
                            e.if_then(|e| {
                                e.load_this();
                                e.load_field(entity);
                                e.call_method(&source_getter, 0);
                                e.store_local(source);
                            });

                            // Another entity class may back the collection with
                            // a different builtin; each gets its own loop.
                            let others = [builtins::list(), builtins::observable_collection()]
                                .into_iter()
                                .filter(|class| *class != collection.sequence);
                            for class in others {
                                e.load_local(source);
                                e.is_instance(class);
                                e.if_then(|e| {
                                    copy_into_mirror(e, probe, collection, class, source);
                                    e.load_null();
                                    e.store_local(source);
                                });
                            }

                            e.load_local(source);
                            e.is_null();
                            e.not();
                            let sequence = collection.sequence;
                            e.if_then(|e| copy_into_mirror(e, probe, collection, sequence, source));
                        },
                        |e| {
                            e.load_this();
                            e.load_constant(false);
                            e.store_field(collection.guard);
                        },
                    );
                }

                e.load_this();
                e.call_method(members::REFRESH, 0);
                if chain {
                    e.load_this();
                    e.call_base(base_hash, members::ON_ENTITY_CHANGED, 0);
                }
                e.ret_void();
            },
        )
    }
}

/// `foreach (item in (sequence) source) this.mirror.Add(item);`
fn copy_into_mirror(
    e: &mut BytecodeEmitter,
    probe: &(impl CapabilityProbe + ?Sized),
    collection: &EntityCollection,
    sequence: TypeHash,
    source: Local,
) {
    e.foreach(
        probe,
        sequence,
        collection.element.clone(),
        |e| e.load_local(source),
        |e, item, _| {
            e.load_this();
            e.load_field(collection.mirror);
            e.load_local(item);
            e.call_method("Add", 1);
        },
    );
}

/// `if (action == <action>) { target.<apply>; return; }`
fn on_action(
    e: &mut BytecodeEmitter,
    target: Local,
    action: CollectionAction,
    apply: impl FnOnce(&mut BytecodeEmitter),
) {
    e.load_arg(2);
    e.load_constant(action.code());
    e.emit(OpCode::Eq);
    e.if_then(|e| {
        e.load_local(target);
        apply(e);
        e.ret_void();
    });
}

#[cfg(test)]
mod tests {
    use typeforge_compiler::bytecode::OpCode;

    use super::*;
    use crate::class::MethodImpl;
    use crate::Runtime;

    fn ops(class: &crate::ClassType, name: &str) -> Vec<OpCode> {
        match class.find_method_by_name(name).unwrap().implementation() {
            MethodImpl::Bytecode(m) => m.chunk().opcodes(),
            other => panic!("expected bytecode, found {other:?}"),
        }
    }

    fn descriptor(runtime: &Runtime) -> TypeDescriptor {
        let mut d = TypeDescriptor::new("Wrapper", runtime.class(builtins::entity_view_model()));
        d.set_abstract().unwrap();
        d
    }

    #[test]
    fn entity_field_is_inherited() {
        let runtime = Runtime::new().unwrap();
        assert!(descriptor(&runtime).entity_field().is_ok());

        let plain = TypeDescriptor::new("Plain", runtime.class(builtins::object()));
        assert!(matches!(
            plain.entity_field(),
            Err(BuildError::Tamper { .. })
        ));
    }

    #[test]
    fn getter_guards_a_missing_entity() {
        let runtime = Runtime::new().unwrap();
        let mut d = descriptor(&runtime);
        let entity = d.entity_field().unwrap();
        d.add_entity_property(entity, "Age", DataType::I32, true).unwrap();
        let class = d.finalize().unwrap();

        let getter_ops = ops(&class, "get_Age");
        assert_eq!(&getter_ops[..4], &[
            OpCode::LoadArg,
            OpCode::GetField,
            OpCode::IsNull,
            OpCode::JumpIfFalse
        ]);
        assert_eq!(getter_ops.iter().filter(|op| **op == OpCode::Return).count(), 2);
        assert!(class.find_property("Age").unwrap().notifies);
    }

    #[test]
    fn mirror_repopulation_is_guarded_by_a_finally() {
        let runtime = Runtime::new().unwrap();
        let mut d = descriptor(&runtime);
        let entity = d.entity_field().unwrap();
        let tags = d
            .add_entity_collection(entity, "Tags", DataType::String, builtins::list())
            .unwrap();
        d.override_entity_changed(&runtime, entity, &[tags]).unwrap();
        let class = d.finalize().unwrap();

        let body = match class
            .find_method_by_name(members::ON_ENTITY_CHANGED)
            .unwrap()
            .implementation()
        {
            MethodImpl::Bytecode(m) => m.clone(),
            other => panic!("expected bytecode, found {other:?}"),
        };
        // Guard region plus the disposable enumerator region inside it.
        assert_eq!(body.regions().len(), 2);
        assert!(body.regions()[0].finally.is_some());
        assert_eq!(body.chunk().count(OpCode::EndFinally), 2);
        assert_eq!(body.chunk().count(OpCode::CallBase), 1);
    }

    #[test]
    fn repopulation_dispatches_on_the_entity_collection_class() {
        let runtime = Runtime::new().unwrap();
        for sequence in [builtins::list(), builtins::observable_collection()] {
            let mut d = descriptor(&runtime);
            let entity = d.entity_field().unwrap();
            let tags = d
                .add_entity_collection(entity, "Tags", DataType::String, sequence)
                .unwrap();
            d.override_entity_changed(&runtime, entity, &[tags]).unwrap();
            let class = d.finalize().unwrap();

            let body = match class
                .find_method_by_name(members::ON_ENTITY_CHANGED)
                .unwrap()
                .implementation()
            {
                MethodImpl::Bytecode(m) => m.clone(),
                other => panic!("expected bytecode, found {other:?}"),
            };
            assert_eq!(body.chunk().count(OpCode::IsInstance), 1, "{sequence}");
            // Guard region plus one for the list enumerator, whichever loop it sits in.
            assert_eq!(body.regions().len(), 2, "{sequence}");
            assert_eq!(body.chunk().count(OpCode::EndFinally), 2, "{sequence}");
        }
    }

    #[test]
    fn sync_handler_takes_collection_changed_arguments() {
        let runtime = Runtime::new().unwrap();
        let mut d = descriptor(&runtime);
        let entity = d.entity_field().unwrap();
        d.add_entity_collection(entity, "Tags", DataType::String, builtins::list())
            .unwrap();
        let class = d.finalize().unwrap();
        let slot = class.find_method_by_name("__sync_Tags").unwrap();
        assert_eq!(slot.entry().arity(), 5);
        assert!(class.find_method_by_name("set_Tags").is_none());
    }
}
