//! `List`, `ObservableCollection` and their enumerators.
//!
//! Both list classes share one set of natives. An observable list calls its
//! `CollectionChanged` subscribers after each mutation with
//! `(sender, action, item, index)`; the list lock is released first, so a
//! subscriber may read or modify the list again.

use std::sync::Arc;

use typeforge_core::kinds::{ArgumentOutOfRange, InvalidOperation, InvalidType};
use typeforge_core::{BuildResult, ClassFlags, DataType, MethodEntry, PropertyEntry};

use super::members;
use crate::class::{ClassType, InstanceLayout, MethodImpl, NativeCall};
use crate::error::Fault;
use crate::object::{EnumeratorState, Object, ObjectBody};
use crate::value::{Delegate, Value};

/// Action code passed to collection-changed subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CollectionAction {
    /// `item` was inserted at `index`.
    Add = 0,
    /// `item` was removed from `index`.
    Remove = 1,
    /// Everything was removed.
    Reset = 2,
    /// The element at `index` was replaced by `item`.
    Replace = 3,
}

impl CollectionAction {
    pub fn code(self) -> i32 {
        self as i32
    }
}

struct Change {
    action: CollectionAction,
    item: Value,
    index: usize,
}

fn to_index(value: &Value) -> Result<i32, Fault> {
    value.as_i32().ok_or_else(|| {
        Fault::throw::<InvalidType>(format!("index must be an i32, found {}", value.type_name()))
    })
}

fn checked_index(index: i32, len: usize, inclusive: bool) -> Result<usize, Fault> {
    usize::try_from(index)
        .ok()
        .filter(|i| if inclusive { *i <= len } else { *i < len })
        .ok_or_else(|| {
            Fault::throw::<ArgumentOutOfRange>(format!(
                "index {index} is out of range for count {len}"
            ))
        })
}

/// Run `f` against the receiver's items, then notify subscribers of the
/// change it reports.
fn mutate<R>(
    call: &NativeCall<'_>,
    f: impl FnOnce(&mut Vec<Value>) -> Result<(R, Option<Change>), Fault>,
) -> Result<R, Fault> {
    let this = call.this_object()?;
    let ObjectBody::List(state) = this.body() else {
        return Err(Fault::TypeMismatch {
            expected: "list",
            found: this.class_name().to_string(),
        });
    };
    let observable = matches!(
        this.class().layout(),
        InstanceLayout::List { observable: true }
    );

    let (result, change, handlers) = {
        let mut state = state.lock();
        let (result, change) = f(&mut state.items)?;
        let handlers = if observable && change.is_some() {
            state.handlers.clone()
        } else {
            Vec::new()
        };
        (result, change, handlers)
    };

    if let Some(change) = change {
        let index = i32::try_from(change.index).unwrap_or(-1);
        for handler in &handlers {
            call.invoke(
                handler,
                vec![
                    Value::Object(Arc::clone(&this)),
                    Value::I32(change.action.code()),
                    change.item.clone(),
                    Value::I32(index),
                ],
            )?;
        }
    }
    Ok(result)
}

fn read<R>(call: &NativeCall<'_>, f: impl FnOnce(&[Value]) -> Result<R, Fault>) -> Result<R, Fault> {
    mutate(call, |items| Ok((f(items)?, None)))
}

fn subscribers<R>(call: &NativeCall<'_>, f: impl FnOnce(&mut Vec<Delegate>) -> R) -> Result<R, Fault> {
    let this = call.this_object()?;
    let ObjectBody::List(state) = this.body() else {
        return Err(Fault::TypeMismatch {
            expected: "list",
            found: this.class_name().to_string(),
        });
    };
    let result = f(&mut state.lock().handlers);
    Ok(result)
}

fn delegate_arg(call: &NativeCall<'_>) -> Result<Delegate, Fault> {
    match call.arg(0) {
        Value::Delegate(d) => Ok(d),
        other => Err(Fault::throw::<InvalidType>(format!(
            "expected a delegate, found {}",
            other.type_name()
        ))),
    }
}

/// A list class. `enumerator` is what `GetEnumerator` returns.
pub(super) fn list(
    name: &str,
    object: &Arc<ClassType>,
    enumerator: &Arc<ClassType>,
    observable: bool,
) -> BuildResult<Arc<ClassType>> {
    let mut d = crate::synth::TypeDescriptor::new(name, Some(Arc::clone(object)));
    d.set_layout(InstanceLayout::List { observable })?;
    d.set_flags(ClassFlags::LIST)?;
    d.add_property(PropertyEntry::read_only("Count", DataType::I32))?;

    d.add_method(
        MethodEntry::new("Add", vec![DataType::Any], DataType::Void),
        MethodImpl::native(|call| {
            let item = call.arg(0);
            mutate(call, |items| {
                items.push(item.clone());
                let index = items.len() - 1;
                Ok((Value::Null, Some(Change { action: CollectionAction::Add, item, index })))
            })
        }),
    )?;
    d.add_method(
        MethodEntry::new("Insert", vec![DataType::I32, DataType::Any], DataType::Void),
        MethodImpl::native(|call| {
            let index = to_index(&call.arg(0))?;
            let item = call.arg(1);
            mutate(call, |items| {
                let index = checked_index(index, items.len(), true)?;
                items.insert(index, item.clone());
                Ok((Value::Null, Some(Change { action: CollectionAction::Add, item, index })))
            })
        }),
    )?;
    d.add_method(
        MethodEntry::new("RemoveAt", vec![DataType::I32], DataType::Void),
        MethodImpl::native(|call| {
            let index = to_index(&call.arg(0))?;
            mutate(call, |items| {
                let index = checked_index(index, items.len(), false)?;
                let item = items.remove(index);
                Ok((Value::Null, Some(Change { action: CollectionAction::Remove, item, index })))
            })
        }),
    )?;
    d.add_method(
        MethodEntry::new("Remove", vec![DataType::Any], DataType::Bool),
        MethodImpl::native(|call| {
            let needle = call.arg(0);
            mutate(call, |items| match items.iter().position(|v| *v == needle) {
                Some(index) => {
                    let item = items.remove(index);
                    Ok((
                        Value::Bool(true),
                        Some(Change { action: CollectionAction::Remove, item, index }),
                    ))
                }
                None => Ok((Value::Bool(false), None)),
            })
        }),
    )?;
    d.add_method(
        MethodEntry::new("Clear", vec![], DataType::Void),
        MethodImpl::native(|call| {
            mutate(call, |items| {
                items.clear();
                Ok((
                    Value::Null,
                    Some(Change { action: CollectionAction::Reset, item: Value::Null, index: usize::MAX }),
                ))
            })
        }),
    )?;
    d.add_method(
        MethodEntry::new("get_Count", vec![], DataType::I32),
        MethodImpl::native(|call| {
            read(call, |items| Ok(Value::I32(i32::try_from(items.len()).unwrap_or(i32::MAX))))
        }),
    )?;
    d.add_method(
        MethodEntry::new("get_Item", vec![DataType::I32], DataType::Any),
        MethodImpl::native(|call| {
            let index = to_index(&call.arg(0))?;
            read(call, |items| {
                let index = checked_index(index, items.len(), false)?;
                Ok(items[index].clone())
            })
        }),
    )?;
    d.add_method(
        MethodEntry::new("set_Item", vec![DataType::I32, DataType::Any], DataType::Void),
        MethodImpl::native(|call| {
            let index = to_index(&call.arg(0))?;
            let item = call.arg(1);
            mutate(call, |items| {
                let index = checked_index(index, items.len(), false)?;
                items[index] = item.clone();
                Ok((Value::Null, Some(Change { action: CollectionAction::Replace, item, index })))
            })
        }),
    )?;
    d.add_method(
        MethodEntry::new("Contains", vec![DataType::Any], DataType::Bool),
        MethodImpl::native(|call| {
            let needle = call.arg(0);
            read(call, |items| Ok(Value::Bool(items.contains(&needle))))
        }),
    )?;
    d.add_method(
        MethodEntry::new("IndexOf", vec![DataType::Any], DataType::I32),
        MethodImpl::native(|call| {
            let needle = call.arg(0);
            read(call, |items| {
                let index = items
                    .iter()
                    .position(|v| *v == needle)
                    .and_then(|i| i32::try_from(i).ok())
                    .unwrap_or(-1);
                Ok(Value::I32(index))
            })
        }),
    )?;

    let enumerator_class = enumerator.type_hash();
    d.add_method(
        MethodEntry::new("GetEnumerator", vec![], DataType::Object(enumerator_class)),
        MethodImpl::native(move |call| {
            let snapshot = read(call, |items| Ok(items.to_vec()))?;
            let class = call.runtime().class(enumerator_class).ok_or_else(|| {
                Fault::throw::<InvalidType>(format!("unknown enumerator class {enumerator_class}"))
            })?;
            let enumerator = Object::allocate(&class);
            if let ObjectBody::Enumerator(state) = enumerator.body() {
                *state.lock() = EnumeratorState::new(snapshot);
            }
            Ok(Value::Object(enumerator))
        }),
    )?;

    if observable {
        d.add_method(
            MethodEntry::new(
                format!("add_{}", members::COLLECTION_CHANGED),
                vec![DataType::Delegate],
                DataType::Void,
            ),
            MethodImpl::native(|call| {
                let handler = delegate_arg(call)?;
                subscribers(call, |handlers| handlers.push(handler))?;
                Ok(Value::Null)
            }),
        )?;
        d.add_method(
            MethodEntry::new(
                format!("remove_{}", members::COLLECTION_CHANGED),
                vec![DataType::Delegate],
                DataType::Void,
            ),
            MethodImpl::native(|call| {
                let handler = delegate_arg(call)?;
                subscribers(call, |handlers| {
                    if let Some(i) = handlers.iter().position(|h| h.same_target(&handler)) {
                        handlers.remove(i);
                    }
                })?;
                Ok(Value::Null)
            }),
        )?;
    }

    d.finalize()
}

fn with_enumerator<R>(
    call: &NativeCall<'_>,
    f: impl FnOnce(&mut EnumeratorState) -> Result<R, Fault>,
) -> Result<R, Fault> {
    let this = call.this_object()?;
    let ObjectBody::Enumerator(state) = this.body() else {
        return Err(Fault::TypeMismatch {
            expected: "enumerator",
            found: this.class_name().to_string(),
        });
    };
    let mut state = state.lock();
    f(&mut state)
}

/// A snapshot enumerator. `disposable` adds `Dispose`.
pub(super) fn enumerator(
    name: &str,
    object: &Arc<ClassType>,
    disposable: bool,
) -> BuildResult<Arc<ClassType>> {
    let mut d = crate::synth::TypeDescriptor::new(name, Some(Arc::clone(object)));
    d.set_layout(InstanceLayout::Enumerator)?;

    d.add_method(
        MethodEntry::new("MoveNext", vec![], DataType::Bool),
        MethodImpl::native(|call| {
            with_enumerator(call, |state| {
                if state.disposed {
                    return Err(Fault::throw::<InvalidOperation>("enumerator has been disposed"));
                }
                let next = state.position.map_or(0, |p| p + 1);
                state.position = Some(next.min(state.items.len()));
                Ok(Value::Bool(next < state.items.len()))
            })
        }),
    )?;
    d.add_method(
        MethodEntry::new("get_Current", vec![], DataType::Any),
        MethodImpl::native(|call| {
            with_enumerator(call, |state| {
                state
                    .position
                    .and_then(|p| state.items.get(p))
                    .cloned()
                    .ok_or_else(|| {
                        Fault::throw::<InvalidOperation>("enumerator is not positioned on an element")
                    })
            })
        }),
    )?;
    if disposable {
        d.add_method(
            MethodEntry::new("Dispose", vec![], DataType::Void),
            MethodImpl::native(|call| {
                with_enumerator(call, |state| {
                    state.disposed = true;
                    state.items.clear();
                    Ok(Value::Null)
                })
            }),
        )?;
    }
    d.finalize()
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use typeforge_compiler::CapabilityProbe;
    use typeforge_core::TypeHash;

    use super::*;
    use crate::Runtime;
    use crate::builtins::names;

    /// Whether `class` hands out disposable enumerators.
    fn disposes(runtime: &Runtime, class: TypeHash) -> bool {
        runtime
            .enumerator_class(class)
            .is_some_and(|e| runtime.is_disposable(e))
    }

    fn values(runtime: &Runtime, class: &str, items: &[i32]) -> crate::object::ObjectRef {
        let list = runtime.instantiate_by_name(class).unwrap();
        for item in items {
            runtime.call_method(&list, "Add", vec![Value::I32(*item)]).unwrap();
        }
        list
    }

    #[test]
    fn list_operations() {
        let runtime = Runtime::new().unwrap();
        let list = values(&runtime, names::LIST, &[1, 2, 3]);
        runtime.call_method(&list, "Insert", vec![Value::I32(0), Value::I32(0)]).unwrap();
        runtime.call_method(&list, "RemoveAt", vec![Value::I32(3)]).unwrap();
        assert_eq!(
            list.list_items().unwrap(),
            vec![Value::I32(0), Value::I32(1), Value::I32(2)]
        );
        assert_eq!(runtime.get_property(&list, "Count").unwrap(), Value::I32(3));
        assert_eq!(
            runtime.call_method(&list, "IndexOf", vec![Value::I32(2)]).unwrap(),
            Value::I32(2)
        );
    }

    #[test]
    fn out_of_range_index_throws() {
        let runtime = Runtime::new().unwrap();
        let list = values(&runtime, names::LIST, &[1]);
        let fault = runtime
            .call_method(&list, "get_Item", vec![Value::I32(5)])
            .unwrap_err();
        assert!(fault.exception().unwrap().is::<ArgumentOutOfRange>());
    }

    #[test]
    fn observable_collection_notifies() {
        let runtime = Runtime::new().unwrap();
        let coll = values(&runtime, names::OBSERVABLE_COLLECTION, &[]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = Delegate::host(move |args| {
            sink.lock().push((args[1].clone(), args[2].clone(), args[3].clone()));
            Ok(Value::Null)
        });
        runtime
            .call_method(&coll, "add_CollectionChanged", vec![Value::Delegate(handler)])
            .unwrap();

        runtime.call_method(&coll, "Add", vec![Value::from("a")]).unwrap();
        runtime.call_method(&coll, "Clear", vec![]).unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (Value::I32(0), Value::from("a"), Value::I32(0)));
        assert_eq!(seen[1].0, Value::I32(CollectionAction::Reset.code()));
    }

    #[test]
    fn plain_list_has_no_subscription() {
        let runtime = Runtime::new().unwrap();
        let list = values(&runtime, names::LIST, &[]);
        assert!(matches!(
            runtime.call_method(&list, "add_CollectionChanged", vec![Value::Null]),
            Err(Fault::MissingMethod { .. })
        ));
    }

    #[test]
    fn enumerator_disposal_depends_on_list_kind() {
        let runtime = Runtime::new().unwrap();
        assert!(disposes(&runtime, super::super::list()));
        assert!(!disposes(&runtime, super::super::observable_collection()));
    }

    #[test]
    fn enumerator_walks_a_snapshot() {
        let runtime = Runtime::new().unwrap();
        let list = values(&runtime, names::LIST, &[4, 5]);
        let e = runtime.call_method(&list, "GetEnumerator", vec![]).unwrap();
        let e = e.as_object().unwrap();
        runtime.call_method(&list, "Clear", vec![]).unwrap();

        let mut seen = Vec::new();
        while runtime.call_method(e, "MoveNext", vec![]).unwrap() == Value::Bool(true) {
            seen.push(runtime.call_method(e, "get_Current", vec![]).unwrap());
        }
        assert_eq!(seen, vec![Value::I32(4), Value::I32(5)]);
        assert!(runtime.call_method(e, "get_Current", vec![]).is_err());
    }
}
