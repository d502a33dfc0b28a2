//! Synthesis recipes.
//!
//! | Recipe           | Input          | Default base      | Cache key                 |
//! |------------------|----------------|-------------------|---------------------------|
//! | Model            | interface      | `Object`          | (Model, interface)        |
//! | Self ViewModel   | interface      | `SelfViewModel`   | (SelfViewModel, interface)|
//! | Dynamic ViewModel| model class    | `EntityViewModel` | (ViewModel, model class)  |
//!
//! The base never takes part in the key: the first successful build for a
//! key is the one every later request gets, whatever base it asks for.

mod model;
mod self_view_model;
mod view_model;

use std::sync::Arc;

use typeforge_core::{
    BuildError, BuildResult, ContractEntry, DataType, DefaultValue, PropertyShape, TypeHash,
};

use crate::builtins;
use crate::class::ClassType;
use crate::error::Result;
use crate::object::ObjectRef;
use crate::runtime::Runtime;
use crate::synth::{ConstructorPlan, FieldInit, TypeDescriptor};

/// How contract properties are synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    /// Plain auto-properties; collections start as `List`.
    Plain,
    /// Notifying properties; collections start as `ObservableCollection`.
    Notifying,
}

impl Style {
    fn collection_class(self) -> TypeHash {
        match self {
            Style::Plain => builtins::list(),
            Style::Notifying => builtins::observable_collection(),
        }
    }
}

impl Runtime {
    /// Build the model for `contract` and instantiate it.
    pub fn create_model(&self, contract: TypeHash) -> Result<ObjectRef> {
        let class = self.build_model(contract)?;
        Ok(self.instantiate(class.type_hash())?)
    }

    pub fn create_self_view_model(
        &self,
        base: Option<TypeHash>,
        contract: TypeHash,
    ) -> Result<ObjectRef> {
        let class = self.build_self_view_model(base, contract)?;
        Ok(self.instantiate(class.type_hash())?)
    }

    pub fn create_view_model(&self, base: Option<TypeHash>, model: TypeHash) -> Result<ObjectRef> {
        let class = self.build_view_model(base, model)?;
        Ok(self.instantiate(class.type_hash())?)
    }

    // ==========================================================================
    // Shared recipe steps
    // ==========================================================================

    fn interface_contract(&self, hash: TypeHash) -> BuildResult<ContractEntry> {
        match self.contract(hash) {
            Some(contract) if contract.is_interface() => Ok(contract),
            Some(contract) => Err(BuildError::NotAnInterface {
                name: contract.name,
            }),
            None => match self.class(hash) {
                Some(class) => Err(BuildError::NotAnInterface {
                    name: class.name().to_string(),
                }),
                None => Err(BuildError::UnknownType { hash }),
            },
        }
    }

    /// `base`, or `root` when none is given; either way it must derive from
    /// `root`.
    fn resolve_base(&self, base: Option<TypeHash>, root: TypeHash) -> BuildResult<Arc<ClassType>> {
        let class = self.require_class(base.unwrap_or(root))?;
        if !class.is_subclass_of(root) {
            return Err(BuildError::BaseNotAssignable {
                base: class.name().to_string(),
                required: self.type_name(root),
            });
        }
        Ok(class)
    }

    fn type_name(&self, hash: TypeHash) -> String {
        self.class(hash)
            .map(|c| c.name().to_string())
            .or_else(|| self.contract(hash).map(|c| c.name))
            .unwrap_or_else(|| hash.to_string())
    }

    /// Every class or contract `data_type` refers to must be registered.
    fn check_known(&self, data_type: &DataType) -> BuildResult<()> {
        match data_type {
            DataType::Object(hash) => {
                if self.class(*hash).is_none() && self.contract(*hash).is_none() {
                    return Err(BuildError::UnknownType { hash: *hash });
                }
                Ok(())
            }
            DataType::Collection(element) | DataType::Array(element) => self.check_known(element),
            _ => Ok(()),
        }
    }

    fn require_instantiable(&self, hash: TypeHash) -> BuildResult<()> {
        let reason = match self.class(hash) {
            None => "not a registered class",
            Some(class) if class.is_abstract() => "abstract class",
            Some(class)
                if class
                    .find_method(TypeHash::CONSTRUCTOR)
                    .is_some_and(|ctor| !ctor.entry().params.is_empty()) =>
            {
                "no parameterless constructor"
            }
            Some(_) => return Ok(()),
        };
        Err(BuildError::NonInstantiable {
            name: self.type_name(hash),
            reason: reason.to_string(),
        })
    }

    /// What the constructor stores into a contract property's field.
    fn field_init(&self, shape: &PropertyShape, style: Style) -> BuildResult<Option<FieldInit>> {
        if shape.data_type.is_collection() {
            return Ok(Some(FieldInit::New(style.collection_class())));
        }
        match &shape.default {
            DefaultValue::None => Ok(None),
            DefaultValue::Literal(literal) if literal.fits(&shape.data_type) => {
                Ok(Some(FieldInit::Literal(literal.clone())))
            }
            DefaultValue::Literal(_) => Err(BuildError::InvalidDefault {
                property: shape.name.clone(),
                expected: shape.data_type.clone(),
            }),
            DefaultValue::NewInstance => match &shape.data_type {
                DataType::Object(hash) => {
                    self.require_instantiable(*hash)?;
                    Ok(Some(FieldInit::New(*hash)))
                }
                other => Err(BuildError::NonInstantiable {
                    name: other.to_string(),
                    reason: "not a class type".to_string(),
                }),
            },
        }
    }

    /// `contract` followed by everything it inherits from.
    fn contract_lineage(&self, contract: &ContractEntry) -> Vec<TypeHash> {
        let mut lineage = vec![contract.type_hash];
        let mut pending = contract.base_contracts.clone();
        while let Some(hash) = pending.pop() {
            if lineage.contains(&hash) {
                continue;
            }
            lineage.push(hash);
            if let Some(base) = self.contract(hash) {
                pending.extend(base.base_contracts);
            }
        }
        lineage
    }

    /// Add a field-backed property per contract property and an event per
    /// contract event. Returns the property names.
    fn add_contract_members(
        &self,
        d: &mut TypeDescriptor,
        contract: &ContractEntry,
        plan: &mut ConstructorPlan<'_>,
        style: Style,
    ) -> BuildResult<Vec<String>> {
        for interface in self.contract_lineage(contract) {
            d.add_interface(interface)?;
        }

        let hash = contract.type_hash;
        let properties = self.with_contracts(|r| r.all_properties(hash))?;
        let events = self.with_contracts(|r| r.all_events(hash))?;

        let mut names = Vec::with_capacity(properties.len());
        for shape in &properties {
            self.check_known(&shape.data_type)?;
            let field = if shape.is_constant() {
                d.add_constant_property(&shape.name, shape.data_type.clone())?
            } else {
                match style {
                    Style::Plain => d.add_auto_property(
                        &shape.name,
                        shape.data_type.clone(),
                        shape.is_writable(),
                    )?,
                    Style::Notifying => d.add_notifying_property(
                        &shape.name,
                        shape.data_type.clone(),
                        shape.is_writable(),
                    )?,
                }
            };
            if let Some(init) = self.field_init(shape, style)? {
                if let FieldInit::New(class) = &init {
                    d.set_instance_class(&shape.name, *class)?;
                }
                plan.initialize(field, init);
            }
            names.push(shape.name.clone());
        }

        for event in &events {
            let field = d.add_event(event)?;
            plan.initialize(field, FieldInit::New(builtins::event()));
        }
        Ok(names)
    }

    /// Register a finished descriptor's class.
    fn publish(&self, mut d: TypeDescriptor) -> BuildResult<Arc<ClassType>> {
        let class = d.finalize()?;
        self.register_class(class)
    }
}

/// A constructor with the base constructor's signature, forwarding to it.
fn constructor_plan(base: &ClassType) -> ConstructorPlan<'static> {
    let params = base
        .find_method(TypeHash::CONSTRUCTOR)
        .map(|ctor| ctor.entry().params.clone())
        .unwrap_or_default();
    ConstructorPlan::forwarding(params)
}
