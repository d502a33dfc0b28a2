//! Self ViewModel recipe: interface to notifying class exposing itself.

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
    /// `<Contract>SelfViewModel` implementing `contract` with notifying
    /// properties, `get_Self` and `Refresh`.
    ///
    /// `base` defaults to `SelfViewModel` and must derive from it.
    #[instrument(skip_all, fields(contract = %contract))]
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build_self_view_model(
        &self,
        base: Option<TypeHash>,
        contract: TypeHash,
    ) -> BuildResult<Arc<ClassType>> {
        self.cache()
            .get_or_build(CacheKey::new(Recipe::SelfViewModel, contract), || {
                let entry = self.interface_contract(contract)?;
                let base = self.resolve_base(base, builtins::self_view_model())?;
                let mut d = TypeDescriptor::synthesized(
                    format!("{}SelfViewModel", entry.name),
                    Arc::clone(&base),
                );
                d.require_notifier()?;

                let mut plan = constructor_plan(&base);
                let names = self.add_contract_members(&mut d, &entry, &mut plan, Style::Notifying)?;
                d.add_self_accessor()?;
                d.override_refresh(&names)?;
                d.define_constructor(plan)?;
                self.publish(d)
            })
    }
}
