//! Dynamic ViewModel recipe: model class to entity-wrapping class.

use std::sync::Arc;

use tracing::{debug, instrument};
use typeforge_core::{BuildError, BuildResult, DataType, TypeHash};
use typeforge_registry::{CacheKey, Recipe};

use super::constructor_plan;
use crate::builtins;
use crate::class::ClassType;
use crate::runtime::Runtime;
use crate::synth::{FieldInit, TypeDescriptor, sync_handler};

impl Runtime {
    /// `<Model>ViewModel` wrapping instances of `model`.
    ///
    /// Each readable model property becomes an entity-delegating property;
    /// collections become observable mirrors kept in step with the entity.
    /// `OnEntityChanged`, `Refresh` and `Edit` are overridden. `base`
    /// defaults to `EntityViewModel` and must derive from it.
    #[instrument(skip_all, fields(model = %model))]
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build_view_model(
        &self,
        base: Option<TypeHash>,
        model: TypeHash,
    ) -> BuildResult<Arc<ClassType>> {
        self.cache()
            .get_or_build(CacheKey::new(Recipe::ViewModel, model), || {
                let model = self.model_class(model)?;
                let base = self.resolve_base(base, builtins::entity_view_model())?;
                let mut d = TypeDescriptor::synthesized(
                    format!("{}ViewModel", model.name()),
                    Arc::clone(&base),
                );
                d.require_notifier()?;
                let entity = d.entity_field()?;
                for interface in model.interfaces() {
                    d.add_interface(*interface)?;
                }

                let mut plan = constructor_plan(&base);
                let mut names = Vec::new();
                let mut writable = Vec::new();
                let mut collections = Vec::new();

                for property in model.properties().iter().filter(|p| p.is_readable()) {
                    if base.find_property(&property.name).is_some() {
                        debug!(property = %property.name, "skipping property shadowed by the base");
                        continue;
                    }
                    self.check_known(&property.data_type)?;
                    match &property.data_type {
                        DataType::Collection(element) => {
                            let sequence =
                                property.instance_class.unwrap_or_else(builtins::list);
                            let mirror = d.add_entity_collection(
                                entity,
                                &property.name,
                                (**element).clone(),
                                sequence,
                            )?;
                            plan.initialize(
                                mirror.mirror,
                                FieldInit::New(builtins::observable_collection()),
                            );
                            plan.synchronize(mirror.mirror, sync_handler(&property.name));
                            collections.push(mirror);
                        }
                        other => {
                            d.add_entity_property(
                                entity,
                                &property.name,
                                other.clone(),
                                property.is_writable(),
                            )?;
                            if property.is_writable() {
                                writable.push(property.name.clone());
                            }
                        }
                    }
                    names.push(property.name.clone());
                }

                d.override_entity_changed(self, entity, &collections)?;
                d.override_refresh(&names)?;
                d.override_edit(&writable)?;
                d.define_constructor(plan)?;
                self.publish(d)
            })
    }

    /// The concrete class a view model wraps.
    fn model_class(&self, hash: TypeHash) -> BuildResult<Arc<ClassType>> {
        let Some(class) = self.class(hash) else {
            return Err(match self.contract(hash) {
                Some(contract) => BuildError::NonInstantiable {
                    name: contract.name,
                    reason: "a contract, not a model class".to_string(),
                },
                None => BuildError::UnknownType { hash },
            });
        };
        if class.is_abstract() {
            return Err(BuildError::NonInstantiable {
                name: class.name().to_string(),
                reason: "abstract class".to_string(),
            });
        }
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use typeforge_core::{ContractEntry, PropertyShape};

    use super::*;
    use crate::Value;

    fn person_model(runtime: &Runtime) -> TypeHash {
        let contract = runtime
            .register_contract(
                ContractEntry::interface("IPerson")
                    .with_property(PropertyShape::read_write("Name", DataType::String))
                    .with_property(PropertyShape::read_write("Age", DataType::I32))
                    .with_property(PropertyShape::read_write(
                        "Tags",
                        DataType::collection(DataType::String),
                    )),
            )
            .unwrap();
        runtime.build_model(contract).unwrap().type_hash()
    }

    #[test]
    fn view_model_shape() {
        let runtime = Runtime::new().unwrap();
        let model = person_model(&runtime);
        let class = runtime.build_view_model(None, model).unwrap();

        assert_eq!(class.name(), "IPersonModelViewModel");
        assert!(class.is_subclass_of(builtins::entity_view_model()));
        assert!(class.implements(TypeHash::from_name("IPerson")));
        assert!(class.find_method_by_name("__sync_Tags").is_some());
        assert!(class.find_method_by_name("set_Tags").is_none());
        assert!(!class.is_abstract());
    }

    #[test]
    fn unset_entity_reads_defaults_and_ignores_writes() {
        let runtime = Runtime::new().unwrap();
        let model = person_model(&runtime);
        let vm = runtime.create_view_model(None, model).unwrap();

        assert_eq!(runtime.get_property(&vm, "Age").unwrap(), Value::I32(0));
        assert_eq!(runtime.get_property(&vm, "Name").unwrap(), Value::Null);
        runtime.set_property(&vm, "Name", "ignored").unwrap();
        assert_eq!(runtime.get_property(&vm, "Name").unwrap(), Value::Null);
    }

    #[test]
    fn contract_is_not_a_model_class() {
        let runtime = Runtime::new().unwrap();
        person_model(&runtime);
        assert!(matches!(
            runtime.build_view_model(None, TypeHash::from_name("IPerson")),
            Err(BuildError::NonInstantiable { .. })
        ));
        assert!(matches!(
            runtime.build_view_model(None, builtins::entity_view_model()),
            Err(BuildError::NonInstantiable { .. })
        ));
    }

    #[test]
    fn base_outside_the_entity_root_is_rejected() {
        let runtime = Runtime::new().unwrap();
        let model = person_model(&runtime);
        assert!(matches!(
            runtime.build_view_model(Some(builtins::self_view_model()), model),
            Err(BuildError::BaseNotAssignable { .. })
        ));
    }
}
