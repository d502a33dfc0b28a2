//! Root classes synthesized types derive from.

use std::sync::Arc;

use typeforge_core::kinds::InvalidType;
use typeforge_core::{BuildResult, DataType, MethodEntry, PropertyEntry, TypeHash};

use super::{members, names};
use crate::class::{ClassType, MethodImpl};
use crate::error::Fault;
use crate::synth::TypeDescriptor;
use crate::value::Value;

fn no_op() -> MethodImpl {
    MethodImpl::native(|_| Ok(Value::Null))
}

pub(super) fn object() -> BuildResult<Arc<ClassType>> {
    let mut d = TypeDescriptor::new(names::OBJECT, None);
    d.add_method(MethodEntry::constructor(vec![]), no_op())?;
    d.finalize()
}

pub(super) fn observable_object(object: &Arc<ClassType>) -> BuildResult<Arc<ClassType>> {
    let mut d = TypeDescriptor::new(names::OBSERVABLE_OBJECT, Some(Arc::clone(object)));
    d.add_method(
        MethodEntry::new(members::RAISE_PROPERTY_CHANGED, vec![DataType::String], DataType::Void),
        MethodImpl::native(|call| {
            let this = call.this_object()?;
            match call.arg(0) {
                Value::Str(name) => {
                    this.raise_property_changed(&name);
                    Ok(Value::Null)
                }
                other => Err(Fault::throw::<InvalidType>(format!(
                    "property name must be a string, found {}",
                    other.type_name()
                ))),
            }
        }),
    )?;
    d.add_method(
        MethodEntry::new(members::REFRESH, vec![], DataType::Void),
        no_op(),
    )?;
    d.finalize()
}

pub(super) fn self_view_model(observable: &Arc<ClassType>) -> BuildResult<Arc<ClassType>> {
    let mut d = TypeDescriptor::new(names::SELF_VIEW_MODEL, Some(Arc::clone(observable)));
    d.set_abstract()?;
    d.add_property(PropertyEntry::read_only(members::SELF, DataType::Any))?;
    d.add_method(
        MethodEntry::new(format!("get_{}", members::SELF), vec![], DataType::Any),
        MethodImpl::Abstract,
    )?;
    d.finalize()
}

/// Abstract entity-wrapping root.
///
/// Assigning `Entity` stores the reference, calls the virtual
/// `OnEntityChanged` and then notifies `Entity`.
pub(super) fn entity_view_model(observable: &Arc<ClassType>) -> BuildResult<Arc<ClassType>> {
    let mut d = TypeDescriptor::new(names::ENTITY_VIEW_MODEL, Some(Arc::clone(observable)));
    d.set_abstract()?;
    let entity = d.add_field(members::ENTITY_FIELD, DataType::Any)?;
    d.add_property(PropertyEntry::read_write(members::ENTITY, DataType::Any).notifying())?;

    d.add_method(
        MethodEntry::new(format!("get_{}", members::ENTITY), vec![], DataType::Any),
        MethodImpl::native(move |call| Ok(call.this_object()?.field(entity).unwrap_or_default())),
    )?;
    d.add_method(
        MethodEntry::new(format!("set_{}", members::ENTITY), vec![DataType::Any], DataType::Void),
        MethodImpl::native(move |call| {
            let this = call.this_object()?;
            this.set_field(entity, call.arg(0));
            call.call_virtual(&this, TypeHash::from_member(members::ON_ENTITY_CHANGED), vec![])?;
            this.raise_property_changed(members::ENTITY);
            Ok(Value::Null)
        }),
    )?;
    d.add_method(
        MethodEntry::new(members::ON_ENTITY_CHANGED, vec![], DataType::Void),
        no_op(),
    )?;
    d.add_method(
        MethodEntry::new(members::EDIT, vec![DataType::Any], DataType::Void),
        MethodImpl::Abstract,
    )?;
    d.finalize()
}
