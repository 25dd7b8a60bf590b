//! Provider Registry (spec §3 Component E, §4.4): a name-keyed set of
//! configured [`LlmProvider`]s the Model Router resolves against.

use std::collections::HashMap;
use std::sync::Arc;

use super::model_router::ProviderModels;
use super::traits::LlmProvider;

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    /// Registration order, preserved so "exactly one provider configured"
    /// and "first provider" rules (spec §4.4) are well-defined.
    order: Vec<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        let id = provider.id().to_string();
        if self.providers.insert(id.clone(), provider).is_none() {
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn provider_models(&self) -> Vec<ProviderModels<'_>> {
        self.order
            .iter()
            .filter_map(|id| self.providers.get(id).map(|p| ProviderModels { provider_id: id.as_str(), models: p.models() }))
            .collect()
    }
}
