//! Agents module - code generation inside a sandbox.
//!
//! # Agent Types
//! - **CodexAgent**: drives the OpenAI Codex CLI
//! - **ClaudeAgent**: drives the Claude Code CLI
//!
//! Both share [`SandboxAgent`], which owns the sandbox session, clones the
//! repository and streams command output back through a [`StreamHandler`].

mod claude;
mod codex;
mod sandboxed;
mod types;

use std::sync::Arc;

use async_trait::async_trait;

pub use claude::{ClaudeAgent, ClaudeCli};
pub use codex::{CodexAgent, CodexCli};
pub use sandboxed::{compose_prompt, CliProfile, SandboxAgent};
pub use types::{
    AgentError, AgentMode, AgentType, Conversation, ConversationRole, GenerationResult,
    PullRequestResponse,
};

use crate::config::TelemetryConfig;
use crate::sandbox::SandboxProvider;

/// Receives streamed output while an agent generates.
///
/// Agents await each call before delivering the next chunk, so a slow
/// handler throttles the stream.
#[async_trait]
pub trait StreamHandler: Send + Sync {
    async fn on_update(&self, chunk: &str);
    async fn on_error(&self, error: &str);
}

/// Capability shared by every agent provider.
///
/// # Invariants
/// - `pause_sandbox` followed by `resume_sandbox` keeps `get_session` unchanged
/// - `get_session` returns `None` when no sandbox exists instead of failing
#[async_trait]
pub trait Agent: Send + Sync {
    fn agent_type(&self) -> AgentType;

    /// Run a generation request inside the agent's sandbox.
    async fn generate(
        &self,
        prompt: &str,
        mode: AgentMode,
        history: &[Conversation],
        callbacks: Option<&dyn StreamHandler>,
    ) -> Result<GenerationResult, AgentError>;

    /// Commit the sandbox's changes and open a pull request.
    async fn create_pull_request(&self) -> Result<PullRequestResponse, AgentError>;

    async fn kill_sandbox(&self) -> Result<(), AgentError>;

    async fn pause_sandbox(&self) -> Result<(), AgentError>;

    async fn resume_sandbox(&self) -> Result<(), AgentError>;

    async fn get_session(&self) -> Result<Option<String>, AgentError>;

    /// Replace the session the agent is attached to.
    async fn set_session(&self, session_id: String) -> Result<(), AgentError>;
}

/// Credentials for the selected sandbox backend.
#[derive(Debug, Clone, Default)]
pub struct SandboxCredentials {
    /// Backend name, used in error messages.
    pub backend: String,
    /// Empty when not configured; the provider decides whether that is fatal.
    pub api_key: String,
    pub template_id: Option<String>,
}

/// Agent-specific configuration derived from [`crate::VibeKitConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    pub provider_api_key: String,
    pub github_token: String,
    pub repository: String,
    pub sandbox: SandboxCredentials,
    pub model: Option<String>,
    /// Session to resume instead of creating a new sandbox.
    pub session_id: Option<String>,
    /// Lets agents forward their own low-level telemetry.
    pub telemetry: Option<TelemetryConfig>,
}

/// Builds the agent for a given type.
pub trait AgentFactory: Send + Sync {
    fn create(&self, agent_type: AgentType, config: AgentConfig) -> Box<dyn Agent>;
}

/// Factory producing the CLI-backed agents.
pub struct DefaultAgentFactory {
    provider: Option<Arc<dyn SandboxProvider>>,
}

impl DefaultAgentFactory {
    /// `provider` is `None` when the selected backend has no provider; agents
    /// then fail on first sandbox use.
    pub fn new(provider: Option<Arc<dyn SandboxProvider>>) -> Self {
        Self { provider }
    }
}

impl AgentFactory for DefaultAgentFactory {
    fn create(&self, agent_type: AgentType, config: AgentConfig) -> Box<dyn Agent> {
        match agent_type {
            AgentType::Codex => Box::new(CodexAgent::new(config, self.provider.clone())),
            AgentType::Claude => Box::new(ClaudeAgent::new(config, self.provider.clone())),
        }
    }
}
