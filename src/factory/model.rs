//! Model recipe: interface to plain data class.

use std::sync::Arc;

use tracing::instrument;
use typeforge_core::{BuildResult, TypeHash};
use typeforge_registry::{CacheKey, Recipe};

use super::{Style, constructor_plan};
use crate::builtins;
use crate::class::ClassType;
use crate::runtime::Runtime;
use crate::synth::TypeDescriptor;

impl Runtime {
    /// Concrete `<Contract>Model` class with one auto-property per contract
    /// property.
    ///
    /// Collections start as empty `List`s, declared defaults are stored by
    /// the constructor, and read-only properties with a default are
    /// constants.
    #[instrument(skip_all, fields(contract = %contract))]
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build_model(&self, contract: TypeHash) -> BuildResult<Arc<ClassType>> {
        self.cache()
            .get_or_build(CacheKey::new(Recipe::Model, contract), || {
                let entry = self.interface_contract(contract)?;
                let base = self.require_class(builtins::object())?;
                let mut d = TypeDescriptor::synthesized(format!("{}Model", entry.name), Arc::clone(&base));

                let mut plan = constructor_plan(&base);
                self.add_contract_members(&mut d, &entry, &mut plan, Style::Plain)?;
                d.define_constructor(plan)?;
                self.publish(d)
            })
    }
}
