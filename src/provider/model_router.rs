//! Model Router (spec §4.4): classifies a task into one of four complexity
//! classes and resolves a (provider, model) pair against configured
//! priority lists. Grounded on the grounding codebase's `ModelRouter`
//! (`CostTier`/`TaskType`/`RouterConfig`), remapped from its 6-way task
//! taxonomy to the specification's 4-way one.

use std::collections::HashMap;

/// spec §4.4: "classifies each task into one of {simple, moderate, complex,
/// summarize}".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
    Simple,
    Moderate,
    Complex,
    Summarize,
}

#[derive(Debug, Clone)]
pub struct ModelTarget {
    pub provider_id: String,
    pub model: String,
}

/// Configuration-supplied priority lists and substring hints the rule in
/// spec §4.4 needs.
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// Provider ids ordered cheapest first.
    pub cost_rank: Vec<String>,
    /// Provider ids ordered highest-quality first.
    pub quality_rank: Vec<String>,
    /// Substrings identifying a provider's cheap models (e.g. "mini", "flash").
    pub cheap_hints: Vec<String>,
    /// Substrings identifying a provider's reasoning models (e.g. "o1", "thinking").
    pub reasoning_hints: Vec<String>,
    /// Default (provider, model) for the `moderate` class.
    pub default_target: Option<ModelTarget>,
}

/// A provider's id and the models it advertises, in priority order — the
/// slice the router searches when matching cost/reasoning hints.
pub struct ProviderModels<'a> {
    pub provider_id: &'a str,
    pub models: &'a [String],
}

pub struct ModelRouter {
    config: RouterConfig,
}

impl ModelRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    /// spec §4.4's selection rule. `providers` lists every configured
    /// provider with its advertised models, in registration order.
    pub fn route(&self, class: TaskClass, providers: &[ProviderModels<'_>]) -> Option<ModelTarget> {
        if providers.is_empty() {
            return None;
        }
        if providers.len() == 1 {
            let only = &providers[0];
            let model = only.models.first()?.clone();
            return Some(ModelTarget { provider_id: only.provider_id.to_string(), model });
        }

        match class {
            TaskClass::Simple | TaskClass::Summarize => {
                self.route_by_rank(&self.config.cost_rank, &self.config.cheap_hints, providers)
            }
            TaskClass::Complex => {
                self.route_by_rank(&self.config.quality_rank, &self.config.reasoning_hints, providers)
            }
            TaskClass::Moderate => self.config.default_target.clone().or_else(|| self.first_available(providers)),
        }
    }

    fn route_by_rank(&self, rank: &[String], hints: &[String], providers: &[ProviderModels<'_>]) -> Option<ModelTarget> {
        let by_id: HashMap<&str, &[String]> = providers.iter().map(|p| (p.provider_id, p.models)).collect();
        for provider_id in rank {
            if let Some(models) = by_id.get(provider_id.as_str()) {
                let model = models
                    .iter()
                    .find(|m| hints.iter().any(|hint| m.to_lowercase().contains(&hint.to_lowercase())))
                    .or_else(|| models.first());
                if let Some(model) = model {
                    return Some(ModelTarget { provider_id: provider_id.clone(), model: model.clone() });
                }
            }
        }
        self.first_available(providers)
    }

    fn first_available(&self, providers: &[ProviderModels<'_>]) -> Option<ModelTarget> {
        let first = providers.first()?;
        let model = first.models.first()?.clone();
        Some(ModelTarget { provider_id: first.provider_id.to_string(), model })
    }
}
