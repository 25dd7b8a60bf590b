//! Crate-wide error types.
//!
//! Each subsystem defines a focused `thiserror` enum; [`GatewayError`] is the
//! umbrella type the Agent Loop and CLI binary convert into at their
//! boundaries via `#[from]`.

use thiserror::Error;

/// Classification of an LLM provider failure, used by the Fallback Router to
/// decide whether to try the next candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Auth,
    RateLimit,
    Timeout,
    TransientNetwork,
    Provider5xx,
    Billing,
    ContextOverflow,
    Validation,
    NotFound,
    ToolFailure,
    Internal,
}

impl ProviderErrorKind {
    /// Retryable kinds are tried against the next candidate in the fallback
    /// chain; non-retryable kinds end the chain immediately (spec §4.5/§7).
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimit
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::TransientNetwork
                | ProviderErrorKind::Billing
                | ProviderErrorKind::Provider5xx
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderErrorKind::Auth => "auth",
            ProviderErrorKind::RateLimit => "rate-limit",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::TransientNetwork => "transient-network",
            ProviderErrorKind::Provider5xx => "provider-5xx",
            ProviderErrorKind::Billing => "billing",
            ProviderErrorKind::ContextOverflow => "context-overflow",
            ProviderErrorKind::Validation => "validation",
            ProviderErrorKind::NotFound => "not-found",
            ProviderErrorKind::ToolFailure => "tool-failure",
            ProviderErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("provider error [{kind}]: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("session store error: {0}")]
    Store(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    Unknown(String),
    #[error("tool execution failed: {0}")]
    Execution(String),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression: {0}")]
    InvalidExpression(String),
    #[error("job not found: {0}")]
    JobNotFound(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(#[from] std::io::Error),
}

/// Top-level error type the Agent Loop and CLI convert into.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no LLM provider configured")]
    NoProviderConfigured,
    #[error("internal error: {0}")]
    Internal(String),
}
