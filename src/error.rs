//! Facade-level error taxonomy.
//!
//! - [`ConfigError`] is raised while constructing a [`crate::VibeKit`] and is never recovered.
//! - [`GenerationError`] wraps any agent failure during generation with an agent-prefixed message.
//! - Lifecycle operations return the agent's own [`crate::agents::AgentError`] untouched.

use std::path::PathBuf;

use thiserror::Error;

use crate::agents::{AgentError, AgentType};

/// Errors detected while validating configuration or selecting an agent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{} environment support is not yet implemented", capitalize(.0))]
    UnsupportedEnvironment(String),

    #[error("Exactly one sandbox environment may be configured, found: {}", .0.join(", "))]
    ConflictingEnvironments(Vec<String>),

    #[error("Unsupported agent type: {0}")]
    UnsupportedAgentType(String),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A failed generation call.
///
/// The display form is always `"<agentType> generation failed: <underlying message>"`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct GenerationError {
    pub agent_type: AgentType,
    pub message: String,
    /// Runtime classification of the underlying failure (observability only).
    pub kind: &'static str,
    #[source]
    pub source: AgentError,
}

impl GenerationError {
    pub fn new(agent_type: AgentType, source: AgentError) -> Self {
        Self {
            agent_type,
            message: format!("{} generation failed: {}", agent_type, source),
            kind: source.kind(),
            source,
        }
    }
}
