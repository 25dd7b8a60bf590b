//! The Scheduler's tick engine (spec §4.11): fires due cron jobs, runs their
//! declared actions against the rest of the gateway, and records a Run Log
//! entry per fire. Grounded on the grounding codebase's `TokioScheduler`
//! (a background task that wakes on an interval, scans for due jobs, and
//! reschedules) but rebuilt around this crate's own job model
//! (`CronAction::{Message,Tool,Agent}`) and persistence (`CronStore`)
//! instead of the upstream Diesel-backed heartbeat/notify jobs — see
//! DESIGN.md.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration as StdDuration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::agent::{AgentLoop, Chunk};
use crate::error::SchedulerError;
use crate::event_bus::{AppEvent, EventBus};
use crate::model::{CronAction, CronJob, Message, RunLog, RunStatus};
use crate::session::{InboundContext, SessionManager};
use crate::tools::ToolRegistry;

use super::cron_expr;
use super::store::CronStore;

/// Default wall-clock tick (spec §4.11: 60 s, replacing the grounding
/// codebase's 1 s heartbeat).
const DEFAULT_TICK: StdDuration = StdDuration::from_secs(60);

/// Sender id used for the synthetic sessions cron actions run against.
const CRON_SENDER: &str = "cron-scheduler";

pub struct CronScheduler {
    jobs: RwLock<Vec<CronJob>>,
    /// Per-job non-reentrancy guard (spec §4.11, §8 "consecutive fired runs
    /// of J do not overlap in wall-clock time"). Absent from the grounding
    /// codebase's heartbeat loop.
    running: RwLock<HashSet<String>>,
    run_logs: RwLock<Vec<RunLog>>,
    store: Arc<dyn CronStore>,
    sessions: Arc<SessionManager>,
    tools: Arc<ToolRegistry>,
    agent: Arc<AgentLoop>,
    bus: Arc<EventBus>,
    tick_interval: StdDuration,
}

impl CronScheduler {
    pub fn new(store: Arc<dyn CronStore>, sessions: Arc<SessionManager>, tools: Arc<ToolRegistry>, agent: Arc<AgentLoop>, bus: Arc<EventBus>) -> Result<Arc<Self>, SchedulerError> {
        let mut jobs = store.load_all()?;
        let now = Utc::now();
        for job in &mut jobs {
            if job.next_run.is_none() {
                job.next_run = cron_expr::next_occurrence(&job.schedule, now, job.run_count > 0)?;
            }
        }
        Ok(Arc::new(Self {
            jobs: RwLock::new(jobs),
            running: RwLock::new(HashSet::new()),
            run_logs: RwLock::new(Vec::new()),
            store,
            sessions,
            tools,
            agent,
            bus,
            tick_interval: DEFAULT_TICK,
        }))
    }

    pub fn with_tick_interval(mut self, interval: StdDuration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Spawns the tick loop; the returned handle is abortable by the caller
    /// on shutdown.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.tick_interval);
            loop {
                interval.tick().await;
                scheduler.tick().await;
            }
        })
    }

    pub fn add_job(&self, mut job: CronJob) -> Result<(), SchedulerError> {
        cron_expr::validate(&job.schedule)?;
        if job.next_run.is_none() {
            job.next_run = cron_expr::next_occurrence(&job.schedule, Utc::now(), false)?;
        }
        let mut jobs = self.jobs.write().expect("scheduler job lock poisoned");
        jobs.retain(|j| j.id != job.id);
        jobs.push(job);
        self.store.save_all(&jobs)
    }

    pub fn remove_job(&self, id: &str) -> Result<(), SchedulerError> {
        let mut jobs = self.jobs.write().expect("scheduler job lock poisoned");
        let before = jobs.len();
        jobs.retain(|j| j.id != id);
        if jobs.len() == before {
            return Err(SchedulerError::JobNotFound(id.to_string()));
        }
        self.store.save_all(&jobs)
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), SchedulerError> {
        let mut jobs = self.jobs.write().expect("scheduler job lock poisoned");
        let job = jobs.iter_mut().find(|j| j.id == id).ok_or_else(|| SchedulerError::JobNotFound(id.to_string()))?;
        job.enabled = enabled;
        self.store.save_all(&jobs)
    }

    pub fn list_jobs(&self) -> Vec<CronJob> {
        self.jobs.read().expect("scheduler job lock poisoned").clone()
    }

    pub fn run_logs(&self, job_id: &str) -> Vec<RunLog> {
        self.run_logs.read().expect("run log lock poisoned").iter().filter(|log| log.job_id == job_id).cloned().collect()
    }

    /// One wall-clock tick: finds every enabled, due, not-currently-running
    /// job and fires it concurrently.
    async fn tick(self: &Arc<Self>) {
        let now = Utc::now();
        let due: Vec<String> = {
            let jobs = self.jobs.read().expect("scheduler job lock poisoned");
            let running = self.running.read().expect("running set poisoned");
            jobs.iter()
                .filter(|j| j.enabled && !running.contains(&j.id))
                .filter(|j| j.next_run.is_some_and(|next| next <= now))
                .map(|j| j.id.clone())
                .collect()
        };

        for job_id in due {
            self.running.write().expect("running set poisoned").insert(job_id.clone());
            let scheduler = Arc::clone(self);
            tokio::spawn(async move {
                scheduler.fire(&job_id).await;
                scheduler.running.write().expect("running set poisoned").remove(&job_id);
            });
        }
    }

    async fn fire(self: &Arc<Self>, job_id: &str) {
        let Some(job) = self.jobs.read().expect("scheduler job lock poisoned").iter().find(|j| j.id == *job_id).cloned() else {
            return;
        };

        let run_log_id = format!("run-{}", Uuid::new_v4());
        let started_at = Utc::now();
        self.bus.publish(AppEvent::CronJobStarted { job_id: job.id.clone() });

        let timeout = StdDuration::from_secs(job.timeout_secs.max(1));
        let result = tokio::time::timeout(timeout, self.run_actions(&job)).await;

        let (status, output, error) = match result {
            Ok(Ok(output)) => (RunStatus::Completed, output, None),
            Ok(Err(message)) => (RunStatus::Failed, None, Some(message)),
            Err(_) => (RunStatus::Timeout, None, Some(format!("job '{}' exceeded its {}s timeout", job.name, job.timeout_secs))),
        };

        if !matches!(status, RunStatus::Completed) {
            let message = error.clone().unwrap_or_else(|| "unknown failure".to_string());
            self.bus.publish(AppEvent::CronJobFailed { job_id: job.id.clone(), error: message });
        }

        let run_log = RunLog { id: run_log_id, job_id: job.id.clone(), started_at, ended_at: Some(Utc::now()), status, output, error };
        self.run_logs.write().expect("run log lock poisoned").push(run_log);

        let mut jobs = self.jobs.write().expect("scheduler job lock poisoned");
        if let Some(j) = jobs.iter_mut().find(|j| j.id == job.id) {
            j.run_count += 1;
            if !matches!(status, RunStatus::Completed) {
                j.fail_count += 1;
            }
            j.last_run = Some(started_at);
            j.next_run = cron_expr::next_occurrence(&j.schedule, Utc::now(), true).unwrap_or(None);
        }
        if let Err(e) = self.store.save_all(&jobs) {
            log::warn!("scheduler: failed to persist jobs after firing '{}': {e}", job.id);
        }
    }

    /// Runs every action in declared order; the first failing action aborts
    /// the rest (spec §4.11 "execute actions in order... on exception or
    /// timeout, mark the Run Log failed").
    async fn run_actions(&self, job: &CronJob) -> Result<Option<String>, String> {
        let mut last_output = None;
        for action in &job.actions {
            last_output = self.execute_action(action).await?;
        }
        Ok(last_output)
    }

    async fn execute_action(&self, action: &CronAction) -> Result<Option<String>, String> {
        match action {
            CronAction::Message { channel, text } => {
                self.send_channel_message(channel, text)?;
                Ok(Some(text.clone()))
            }
            CronAction::Tool { name, args, send_output, channel } => {
                let args_value = serde_json::to_value(args).map_err(|e| e.to_string())?;
                let envelope = self.tools.execute(name, args_value).await;
                let success = envelope["success"].as_bool().unwrap_or(false);
                if !success {
                    let message = envelope["error"]["message"].as_str().unwrap_or("tool failed").to_string();
                    return Err(message);
                }
                let output = envelope["data"]["output"].as_str().unwrap_or_default().to_string();
                if *send_output {
                    if let Some(channel) = channel {
                        self.send_channel_message(channel, &output)?;
                    }
                }
                Ok(Some(output))
            }
            CronAction::Agent { prompt, tool_subset: _, channel } => {
                let reply = self.run_agent_prompt(prompt).await?;
                let reply = strip_route_directive(&reply);
                if let Some(channel) = channel {
                    if !reply.is_empty() {
                        self.send_channel_message(channel, &reply)?;
                    }
                }
                Ok(Some(reply))
            }
        }
    }

    /// Sends `text` as an outbound message on `channel` via a synthetic,
    /// reused-per-channel cron session (spec §4.11 "message" action).
    fn send_channel_message(&self, channel: &str, text: &str) -> Result<(), String> {
        let ctx = InboundContext::dm(channel, CRON_SENDER);
        let session = self.sessions.resolve(&ctx);
        let mut message = Message::assistant(text);
        message.channel = Some(channel.to_string());
        self.sessions.append_message(&session.id, message.clone()).map_err(|e| e.to_string())?;
        self.bus.publish(AppEvent::MessageOutbound { session_id: session.id, message });
        Ok(())
    }

    /// Synthesizes a throwaway session, runs the Agent Loop to completion,
    /// and returns the last assistant message's content (spec §4.11 "agent"
    /// action).
    async fn run_agent_prompt(&self, prompt: &str) -> Result<String, String> {
        let ctx = InboundContext::dm(CRON_SENDER, format!("cron-agent-{}", Uuid::new_v4()));
        let session = self.sessions.resolve(&ctx);
        self.sessions.append_message(&session.id, Message::user(prompt)).map_err(|e| e.to_string())?;

        let (tx, mut rx) = mpsc::unbounded_channel::<Chunk>();
        let agent = Arc::clone(&self.agent);
        let session_id = session.id.clone();
        let handle = tokio::spawn(async move { agent.run_turn(&session_id, tx).await });

        let mut error = None;
        while let Some(chunk) = rx.recv().await {
            if let Chunk::Error { content } = chunk {
                error = Some(content);
            }
        }
        let _ = handle.await;

        if let Some(error) = error {
            return Err(error);
        }

        let final_text = self
            .sessions
            .get(&session.id)
            .and_then(|s| s.messages.iter().rev().find(|m| m.role == crate::model::Role::Assistant).map(|m| m.content.clone()))
            .unwrap_or_default();
        Ok(final_text)
    }
}

/// Strips a trailing `<route>…</route>` directive some agent prompts emit to
/// signal routing metadata that shouldn't reach the channel (spec §4.11).
fn strip_route_directive(text: &str) -> String {
    let mut result = text.to_string();
    while let Some(start) = result.find("<route>") {
        if let Some(end) = result[start..].find("</route>") {
            result.replace_range(start..start + end + "</route>".len(), "");
        } else {
            break;
        }
    }
    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_route_directive_removes_tag_and_trims() {
        let input = "on my way <route>channel:ops</route>";
        assert_eq!(strip_route_directive(input), "on my way");
    }

    #[test]
    fn strip_route_directive_is_noop_without_tag() {
        assert_eq!(strip_route_directive("plain text"), "plain text");
    }
}
