//! `Refresh`, `Edit` and `get_Self`.

use typeforge_core::{BuildResult, DataType, MethodEntry, TypeHash};

use super::{TypeDescriptor, getter, setter};
use crate::builtins::members;

impl TypeDescriptor {
    /// Whether the base has a concrete implementation of `name` to chain to.
    fn base_implements(&self, name: &str) -> Option<TypeHash> {
        let base = self.base()?;
        base.find_method(TypeHash::from_member(name))
            .filter(|slot| !slot.is_abstract())
            .map(|_| base.type_hash())
    }

    /// `get_Self` returning the instance.
    pub fn add_self_accessor(&mut self) -> BuildResult<()> {
        self.define_method(
            MethodEntry::new(getter(members::SELF), vec![], DataType::Any),
            |e| {
                e.load_this();
                e.ret();
            },
        )
    }

    /// Override `Refresh` to raise one notification per name in
    /// `properties`, then chain to the base.
    pub fn override_refresh(&mut self, properties: &[String]) -> BuildResult<()> {
        self.require_notifier()?;
        let base = self.base_implements(members::REFRESH);
        self.define_method(MethodEntry::new(members::REFRESH, vec![], DataType::Void), |e| {
            for name in properties {
                e.load_this();
                e.load_string(name);
                e.call_method(members::RAISE_PROPERTY_CHANGED, 1);
            }
            if let Some(base) = base {
                e.load_this();
                e.call_base(base, members::REFRESH, 0);
            }
            e.ret_void();
        })
    }

    /// Override `Edit(source)` to copy each of `properties` from `source`
    /// through this type's own setters. A null source does nothing. Chains
    /// to the base unless the base's `Edit` is abstract.
    pub fn override_edit(&mut self, properties: &[String]) -> BuildResult<()> {
        let base = self.base_implements(members::EDIT);
        self.define_method(
            MethodEntry::new(members::EDIT, vec![DataType::Any], DataType::Void),
            |e| {
                e.load_arg(1);
                e.is_null();
                e.if_then(|e| e.ret_void());
                for name in properties {
                    e.load_this();
                    e.load_arg(1);
                    e.call_method(&getter(name), 0);
                    e.call_method(&setter(name), 1);
                }
                if let Some(base) = base {
                    e.load_this();
                    e.load_arg(1);
                    e.call_base(base, members::EDIT, 1);
                }
                e.ret_void();
            },
        )
    }
}
