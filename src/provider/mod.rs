pub mod fallback;
pub mod model_router;
pub mod openai_compatible;
pub mod registry;
pub mod traits;

pub use fallback::{Attempt, FallbackOutcome, FallbackRouter};
pub use model_router::{ModelRouter, ModelTarget, ProviderModels, RouterConfig, TaskClass};
pub use openai_compatible::OpenAiCompatibleProvider;
pub use registry::ProviderRegistry;
pub use traits::{ChatOptions, ChatResponse, LlmProvider, TokenUsage, ToolSchema};
