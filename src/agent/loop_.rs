//! Agent Loop (spec §4.10): the turn state machine that ties the Session
//! Manager, Memory Controller, Context Guard, Model/Fallback Routers, and
//! Tool Registry together into one inbound-message-to-reply cycle.
//!
//! State machine: `idle -> thinking -> (compressing -> thinking)? ->
//! (executing -> evaluating -> thinking)* -> responding -> idle`, or
//! `any -> error -> idle`. This module expresses the machine as a bounded
//! loop over iterations rather than an explicit state enum, since every
//! state transition here is a straight-line consequence of the previous
//! one — there's no branching a caller needs to observe mid-turn beyond
//! the chunk stream itself.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::context_guard::{check, truncate, ContextWindow};
use crate::event_bus::{AppEvent, EventBus};
use crate::memory::{compress, MemoryController};
use crate::model::{Message, Session};
use crate::provider::{ChatOptions, LlmProvider, ModelRouter, ProviderRegistry, TaskClass, ToolSchema};
use crate::provider::FallbackRouter;
use crate::session::SessionManager;
use crate::tools::ToolRegistry;

use super::chunk::Chunk;

const DEFAULT_MAX_ITERATIONS: u32 = 10;
const TOOL_OUTPUT_TRUNCATE_BYTES: usize = 2000;

pub struct AgentLoop {
    sessions: Arc<SessionManager>,
    memory: Arc<MemoryController>,
    tools: Arc<ToolRegistry>,
    providers: Arc<ProviderRegistry>,
    model_router: Arc<ModelRouter>,
    fallback: Arc<FallbackRouter>,
    bus: Arc<EventBus>,
    max_iterations: u32,
    context_window: ContextWindow,
}

impl AgentLoop {
    pub fn new(
        sessions: Arc<SessionManager>,
        memory: Arc<MemoryController>,
        tools: Arc<ToolRegistry>,
        providers: Arc<ProviderRegistry>,
        model_router: Arc<ModelRouter>,
        fallback: Arc<FallbackRouter>,
        bus: Arc<EventBus>,
        context_window: ContextWindow,
    ) -> Self {
        Self {
            sessions,
            memory,
            tools,
            providers,
            model_router,
            fallback,
            bus,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            context_window,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Runs one full turn for `session_id`, streaming [`Chunk`]s to `out`.
    /// Every call ends with exactly one terminal chunk (`Done` or `Error`).
    /// Callers that need turn-duration exclusivity should hold
    /// `sessions.turn_lock(session_id)` around this call (spec §5).
    pub async fn run_turn(&self, session_id: &str, out: UnboundedSender<Chunk>) {
        self.bus.publish(AppEvent::AgentThinking { session_id: session_id.to_string() });
        let _ = out.send(Chunk::Thinking { text: None });

        let Some(mut session) = self.sessions.get(session_id) else {
            let _ = out.send(Chunk::Error { content: format!("session not found: {session_id}") });
            return;
        };

        if self.memory.needs_compression(&session, self.context_window) {
            let _ = out.send(Chunk::Thinking { text: Some("compressing conversation history".into()) });
            self.compress_session(session_id, &mut session).await;
        }

        let provider_models = self.providers.provider_models();
        let Some(default_target) = self.model_router.route(TaskClass::Moderate, &provider_models) else {
            let _ = out.send(Chunk::Error { content: "no LLM provider configured".into() });
            return;
        };
        let Some(candidates) = self.build_candidates(&default_target.provider_id, &default_target.model) else {
            let _ = out.send(Chunk::Error { content: "no LLM provider configured".into() });
            return;
        };

        let tool_schemas: Vec<ToolSchema> = self
            .tools
            .list()
            .into_iter()
            .map(|info| ToolSchema { name: info.name, description: info.description, parameters: info.schema })
            .collect();

        let mut pending_results: Vec<(String, String, bool)> = Vec::new();

        for iteration in 1..=self.max_iterations {
            let mut context = self.memory.build_context(&session, &self.tools);
            let report = check(&context, self.context_window);
            if report.should_block {
                let target = (self.context_window.total_tokens as f64 * 0.8) as u32;
                context = truncate(&context, target);
            }

            if iteration > 1 {
                let _ = out.send(Chunk::Thinking { text: None });
            }

            let tools_for_request = tool_schemas.clone();
            let outcome = self
                .fallback
                .chat(&candidates, &context, |model| ChatOptions::new(model).with_tools(tools_for_request.clone()))
                .await;

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    if !pending_results.is_empty() {
                        let summary = render_pending_results(&pending_results);
                        let _ = self.sessions.append_message(session_id, Message::assistant(summary.clone()));
                        let _ = out.send(Chunk::Text { content: summary });
                    }
                    let _ = out.send(Chunk::Error { content: err.to_string() });
                    return;
                }
            };

            self.bus.publish(AppEvent::AgentModelUsed {
                session_id: session_id.to_string(),
                provider: outcome.provider_id.clone(),
                model: outcome.model.clone(),
                iteration,
            });

            if !outcome.response.tool_calls.is_empty() {
                let tool_calls = outcome.response.tool_calls.clone();
                let assistant_message = Message::assistant_with_tool_calls(outcome.response.content.clone(), tool_calls.clone());
                let _ = self.sessions.append_message(session_id, assistant_message);

                for call in &tool_calls {
                    let args_value = serde_json::to_value(&call.args).unwrap_or(serde_json::Value::Null);
                    self.bus.publish(AppEvent::ToolExecute {
                        session_id: session_id.to_string(),
                        tool: call.name.clone(),
                        args: args_value.clone(),
                    });
                    let _ = out.send(Chunk::ToolCall { id: call.id.clone(), name: call.name.clone(), args: args_value.clone() });

                    let envelope = self.tools.execute(&call.name, args_value).await;
                    let success = envelope["success"].as_bool().unwrap_or(false);
                    let duration_ms = envelope["meta"]["duration_ms"].as_u64().unwrap_or(0);
                    let rendered = render_tool_envelope(&envelope);
                    let truncated = truncate_to_bytes(&rendered, TOOL_OUTPUT_TRUNCATE_BYTES);

                    self.bus.publish(AppEvent::ToolComplete {
                        session_id: session_id.to_string(),
                        tool: call.name.clone(),
                        result: envelope,
                    });
                    let _ = out.send(Chunk::ToolResult { id: call.id.clone(), output: truncated.clone(), success });

                    let _ = self.sessions.append_message(session_id, Message::tool_result(call.id.clone(), truncated.clone(), success, duration_ms));
                    pending_results.push((call.name.clone(), truncated, success));
                }

                if let Some(updated) = self.sessions.get(session_id) {
                    session = updated;
                }
                continue;
            }

            let content = outcome.response.content.trim().to_string();
            let final_text = if content.is_empty() {
                if pending_results.is_empty() {
                    "(turn completed but produced no output)".to_string()
                } else {
                    render_pending_results(&pending_results)
                }
            } else {
                content
            };
            let _ = self.sessions.append_message(session_id, Message::assistant(final_text.clone()));
            let _ = out.send(Chunk::Text { content: final_text });
            let _ = out.send(Chunk::Done {
                usage: Some(outcome.response.usage),
                provider_id: Some(outcome.provider_id),
                model: Some(outcome.model),
            });
            return;
        }

        let final_text = if pending_results.is_empty() {
            format!("reached the iteration limit ({}) without producing a final response", self.max_iterations)
        } else {
            format!("reached the iteration limit ({}) after executing tools:\n{}", self.max_iterations, render_pending_results(&pending_results))
        };
        let _ = self.sessions.append_message(session_id, Message::assistant(final_text.clone()));
        let _ = out.send(Chunk::Text { content: final_text });
        let _ = out.send(Chunk::Done { usage: None, provider_id: None, model: None });
    }

    async fn compress_session(&self, session_id: &str, session: &mut Session) {
        let to_compress = self.memory.messages_for_compression(session);
        if to_compress.is_empty() {
            return;
        }

        let provider_models = self.providers.provider_models();
        let Some(target) = self.model_router.route(TaskClass::Summarize, &provider_models) else {
            return;
        };
        let Some(provider) = self.providers.get(&target.provider_id) else {
            return;
        };

        let new_summary = compress(&provider, &target.model, &session.summary, to_compress).await;
        crate::memory::apply_compression(session, new_summary, 10);
        let _ = self.sessions.replace_messages(session_id, session.messages.clone(), session.summary.clone());
    }

    /// Builds the Fallback Router's candidate chain: the Model Router's
    /// selected target first, then every other configured provider on its
    /// own first model.
    fn build_candidates(&self, primary_id: &str, primary_model: &str) -> Option<Vec<(Arc<dyn LlmProvider>, String)>> {
        let primary = self.providers.get(primary_id)?;
        let mut candidates = vec![(primary, primary_model.to_string())];
        for pm in self.providers.provider_models() {
            if pm.provider_id == primary_id {
                continue;
            }
            if let (Some(provider), Some(model)) = (self.providers.get(pm.provider_id), pm.models.first()) {
                candidates.push((provider, model.clone()));
            }
        }
        Some(candidates)
    }
}

fn render_tool_envelope(envelope: &serde_json::Value) -> String {
    if envelope["success"].as_bool().unwrap_or(false) {
        envelope["data"]["output"].as_str().map(str::to_string).unwrap_or_else(|| envelope["data"].to_string())
    } else {
        envelope["error"]["message"].as_str().map(str::to_string).unwrap_or_else(|| "tool execution failed".to_string())
    }
}

fn render_pending_results(results: &[(String, String, bool)]) -> String {
    results
        .iter()
        .map(|(name, output, success)| {
            let status = if *success { "ok" } else { "failed" };
            format!("- {name} ({status}): {output}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_to_bytes(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, ProviderErrorKind};
    use crate::identity::IdentityLoader;
    use crate::memory::DailyMemory;
    use crate::model::{SessionState, ToolCall};
    use crate::provider::{ChatResponse, RouterConfig, TokenUsage};
    use crate::session::{InboundContext, SqliteSessionStore};
    use crate::tools::traits::{Tool, ToolResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct ScriptedProvider {
        id: String,
        models: Vec<String>,
        script: Mutex<Vec<Result<ChatResponse, ProviderErrorKind>>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn id(&self) -> &str {
            &self.id
        }
        fn models(&self) -> &[String] {
            &self.models
        }
        async fn chat(&self, _context: &[Message], _options: &ChatOptions) -> Result<ChatResponse, ProviderError> {
            let mut script = self.script.lock().expect("script lock poisoned");
            let next = if script.len() > 1 { script.remove(0) } else { script[0].clone() };
            next.map_err(|kind| ProviderError::new(kind, "scripted failure"))
        }
    }

    fn text_response(content: &str) -> Result<ChatResponse, ProviderErrorKind> {
        Ok(ChatResponse { content: content.to_string(), tool_calls: vec![], usage: TokenUsage::default() })
    }

    fn tool_call_response(name: &str) -> Result<ChatResponse, ProviderErrorKind> {
        Ok(ChatResponse {
            content: String::new(),
            tool_calls: vec![ToolCall { id: "call-1".into(), name: name.to_string(), args: HashMap::new() }],
            usage: TokenUsage::default(),
        })
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes a fixed string"
        }
        fn schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }
        async fn execute(&self, _args: serde_json::Value) -> Result<ToolResult, String> {
            Ok(ToolResult::ok("echoed"))
        }
    }

    struct Harness {
        agent: AgentLoop,
        sessions: Arc<SessionManager>,
        _identity_dir: TempDir,
        _memory_dir: TempDir,
    }

    fn harness(script: Vec<Result<ChatResponse, ProviderErrorKind>>, with_tool: bool) -> Harness {
        let store: Arc<dyn crate::session::SessionStore> = Arc::new(SqliteSessionStore::open_in_memory().unwrap());
        let bus = Arc::new(EventBus::new());
        let sessions = SessionManager::new(store, bus.clone(), Duration::from_secs(3600));

        let identity_dir = TempDir::new().unwrap();
        let memory_dir = TempDir::new().unwrap();
        let identity = IdentityLoader::new(identity_dir.path().to_path_buf()).unwrap();
        let daily = DailyMemory::new(memory_dir.path().to_path_buf());
        let memory = Arc::new(MemoryController::new(identity, daily));

        let mut tools = ToolRegistry::new();
        if with_tool {
            tools.register(Arc::new(EchoTool));
        }
        let tools = Arc::new(tools);

        let mut providers = ProviderRegistry::new();
        providers.register(Arc::new(ScriptedProvider { id: "stub".into(), models: vec!["stub-model".into()], script: Mutex::new(script) }));

        let agent = AgentLoop::new(
            Arc::clone(&sessions),
            memory,
            tools,
            Arc::new(providers),
            Arc::new(ModelRouter::new(RouterConfig::default())),
            Arc::new(FallbackRouter::default()),
            bus,
            ContextWindow::new(1_000_000),
        );

        Harness { agent, sessions, _identity_dir: identity_dir, _memory_dir: memory_dir }
    }

    async fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Chunk>) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        while let Some(c) = rx.recv().await {
            let terminal = c.is_terminal();
            chunks.push(c);
            if terminal {
                break;
            }
        }
        chunks
    }

    #[tokio::test]
    async fn plain_text_turn_emits_text_then_done() {
        let h = harness(vec![text_response("hello there")], false);
        let session = h.sessions.resolve(&InboundContext::dm("cli", "u1"));
        assert_eq!(session.state, SessionState::Active);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        h.agent.run_turn(&session.id, tx).await;
        let chunks = drain(&mut rx).await;

        assert!(matches!(chunks.last(), Some(Chunk::Done { .. })));
        assert!(chunks.iter().any(|c| matches!(c, Chunk::Text { content } if content == "hello there")));
    }

    #[tokio::test]
    async fn missing_session_emits_error() {
        let h = harness(vec![text_response("unused")], false);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        h.agent.run_turn("sess-nope", tx).await;
        let chunks = drain(&mut rx).await;
        assert!(matches!(chunks.last(), Some(Chunk::Error { .. })));
    }

    #[tokio::test]
    async fn tool_call_then_text_round_trips_and_appends_tool_result() {
        let h = harness(vec![tool_call_response("echo"), text_response("done")], true);
        let session = h.sessions.resolve(&InboundContext::dm("cli", "u1"));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        h.agent.run_turn(&session.id, tx).await;
        let chunks = drain(&mut rx).await;

        assert!(chunks.iter().any(|c| matches!(c, Chunk::ToolCall { name, .. } if name == "echo")));
        assert!(chunks.iter().any(|c| matches!(c, Chunk::ToolResult { success: true, .. })));
        assert!(matches!(chunks.last(), Some(Chunk::Done { .. })));

        let updated = h.sessions.get(&session.id).unwrap();
        assert!(updated.messages.iter().any(|m| !m.tool_results.is_empty()));
    }

    #[tokio::test]
    async fn reaching_iteration_limit_emits_text_summarizing_pending_tool_results() {
        let h = harness(vec![tool_call_response("echo")], true);
        let session = h.sessions.resolve(&InboundContext::dm("cli", "u1"));

        let agent = h.agent;
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        // Rebuild with a tiny iteration cap so the test doesn't loop 10 times.
        let agent = AgentLoop { max_iterations: 1, ..agent };
        agent.run_turn(&session.id, tx).await;
        let chunks = drain(&mut rx).await;

        assert!(chunks.iter().any(|c| matches!(c, Chunk::Text { content } if content.contains("iteration limit"))));
    }

    #[tokio::test]
    async fn no_provider_configured_emits_error() {
        let store: Arc<dyn crate::session::SessionStore> = Arc::new(SqliteSessionStore::open_in_memory().unwrap());
        let bus = Arc::new(EventBus::new());
        let sessions = SessionManager::new(store, bus.clone(), Duration::from_secs(3600));
        let identity_dir = TempDir::new().unwrap();
        let memory_dir = TempDir::new().unwrap();
        let identity = IdentityLoader::new(identity_dir.path().to_path_buf()).unwrap();
        let daily = DailyMemory::new(memory_dir.path().to_path_buf());
        let memory = Arc::new(MemoryController::new(identity, daily));
        let agent = AgentLoop::new(
            Arc::clone(&sessions),
            memory,
            Arc::new(ToolRegistry::new()),
            Arc::new(ProviderRegistry::new()),
            Arc::new(ModelRouter::new(RouterConfig::default())),
            Arc::new(FallbackRouter::default()),
            bus,
            ContextWindow::new(1_000_000),
        );

        let session = sessions.resolve(&InboundContext::dm("cli", "u1"));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        agent.run_turn(&session.id, tx).await;
        let chunks = drain(&mut rx).await;
        assert!(matches!(chunks.last(), Some(Chunk::Error { content }) if content.contains("no LLM provider")));
    }
}
