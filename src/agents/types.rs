//! Types shared by every agent implementation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ConfigError;
use crate::github::GitHubError;
use crate::sandbox::SandboxError;

/// Supported agent providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    /// OpenAI Codex CLI
    Codex,
    /// Anthropic Claude Code CLI
    Claude,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Codex => "codex",
            Self::Claude => "claude",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "codex" => Ok(Self::Codex),
            "claude" => Ok(Self::Claude),
            other => Err(ConfigError::UnsupportedAgentType(other.to_string())),
        }
    }
}

/// What the agent is allowed to do with the repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Answer questions without touching files
    Ask,
    /// Make changes to the repository
    #[default]
    Code,
}

impl AgentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::Code => "code",
        }
    }
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speaker of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    User,
    Assistant,
}

/// One entry of the conversation history handed to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub role: ConversationRole,
    pub content: String,
}

impl Conversation {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::Assistant,
            content: content.into(),
        }
    }
}

/// Output of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub sandbox_id: String,
    /// Working tree diff after a code-mode run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

/// A pull request opened from the sandbox's changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestResponse {
    pub html_url: String,
    pub number: u64,
    pub branch_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
}

/// Errors raised by agents, both during generation and lifecycle operations.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("GitHub error: {0}")]
    GitHub(#[from] GitHubError),

    #[error("No active sandbox session")]
    NoSession,

    #[error("Invalid repository identifier: {0}")]
    InvalidRepository(String),

    #[error("No changes found to commit")]
    NoChanges,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgentError {
    /// Best-effort runtime classification, recorded in telemetry only.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sandbox(_) => "SandboxError",
            Self::GitHub(_) => "GitHubError",
            Self::NoSession => "NoSessionError",
            Self::InvalidRepository(_) => "InvalidRepositoryError",
            Self::NoChanges => "NoChangesError",
            Self::Other(_) => "UnknownError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_type_parse() {
        assert_eq!("codex".parse::<AgentType>().unwrap(), AgentType::Codex);
        assert_eq!("claude".parse::<AgentType>().unwrap(), AgentType::Claude);

        let err = "gemini".parse::<AgentType>().unwrap_err();
        assert!(err.to_string().contains("gemini"));
    }

    #[test]
    fn test_mode_default_is_code() {
        assert_eq!(AgentMode::default(), AgentMode::Code);
        let mode: AgentMode = serde_json::from_str("\"ask\"").unwrap();
        assert_eq!(mode, AgentMode::Ask);
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(AgentError::NoSession.kind(), "NoSessionError");
        assert_eq!(
            AgentError::Other(anyhow::anyhow!("boom")).kind(),
            "UnknownError"
        );
        assert_eq!(
            AgentError::Sandbox(SandboxError::NotFound("x".into())).kind(),
            "SandboxError"
        );
    }
}
