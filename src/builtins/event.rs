//! Multicast event objects.

use std::sync::Arc;

use typeforge_core::kinds::InvalidType;
use typeforge_core::{BuildResult, DataType, MethodEntry};

use super::names;
use crate::class::{ClassType, InstanceLayout, MethodImpl, NativeCall};
use crate::error::Fault;
use crate::object::ObjectBody;
use crate::synth::TypeDescriptor;
use crate::value::{Delegate, Value};

fn handlers<R>(call: &NativeCall<'_>, f: impl FnOnce(&mut Vec<Delegate>) -> R) -> Result<R, Fault> {
    let this = call.this_object()?;
    let ObjectBody::Event(handlers) = this.body() else {
        return Err(Fault::TypeMismatch {
            expected: "event",
            found: this.class_name().to_string(),
        });
    };
    let result = f(&mut handlers.lock());
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

pub(super) fn event(object: &Arc<ClassType>) -> BuildResult<Arc<ClassType>> {
    let mut d = TypeDescriptor::new(names::EVENT, Some(Arc::clone(object)));
    d.set_layout(InstanceLayout::Event)?;

    d.add_method(
        MethodEntry::new("Add", vec![DataType::Delegate], DataType::Void),
        MethodImpl::native(|call| {
            let handler = delegate_arg(call)?;
            handlers(call, |h| h.push(handler))?;
            Ok(Value::Null)
        }),
    )?;
    d.add_method(
        MethodEntry::new("Remove", vec![DataType::Delegate], DataType::Void),
        MethodImpl::native(|call| {
            let handler = delegate_arg(call)?;
            handlers(call, |h| {
                if let Some(i) = h.iter().position(|d| d.same_target(&handler)) {
                    h.remove(i);
                }
            })?;
            Ok(Value::Null)
        }),
    )?;
    d.add_method(
        MethodEntry::new("Invoke", vec![DataType::Any, DataType::Any], DataType::Void),
        MethodImpl::native(|call| {
            let snapshot = handlers(call, |h| h.clone())?;
            for handler in &snapshot {
                call.invoke(handler, vec![call.arg(0), call.arg(1)])?;
            }
            Ok(Value::Null)
        }),
    )?;
    d.finalize()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::Runtime;

    #[test]
    fn invoke_reaches_every_handler_until_removed() {
        let runtime = Runtime::new().unwrap();
        let event = runtime.instantiate_by_name(names::EVENT).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handler = Delegate::host(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        });

        runtime
            .call_method(&event, "Add", vec![Value::Delegate(handler.clone())])
            .unwrap();
        runtime
            .call_method(&event, "Invoke", vec![Value::Null, Value::Null])
            .unwrap();
        runtime
            .call_method(&event, "Remove", vec![Value::Delegate(handler)])
            .unwrap();
        runtime
            .call_method(&event, "Invoke", vec![Value::Null, Value::Null])
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(event.event_handler_count(), Some(0));
    }
}
