//! Configuration for the VibeKit facade.
//!
//! The shape mirrors the JSON accepted by the hosted SDK (camelCase keys), so
//! the same file can be loaded from YAML or JSON:
//!
//! ```yaml
//! agent:
//!   type: codex
//!   mode: code
//!   model: { name: o4-mini, apiKey: sk-... }
//! github: { token: ghp_..., repository: octo/hello }
//! environment:
//!   e2b: { apiKey: e2b_..., templateId: vibekit-codex }
//! telemetry: { isEnabled: true, endpoint: https://collector.example/v1/events }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::agents::AgentMode;
use crate::error::ConfigError;

/// Root configuration, owned by a single facade instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VibeKitConfig {
    pub agent: AgentSettings,
    pub github: GithubConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<TelemetryConfig>,
    /// Existing sandbox session to resume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Agent selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSettings {
    /// Agent type tag, parsed into [`crate::agents::AgentType`] at construction.
    #[serde(rename = "type")]
    pub agent_type: String,
    pub model: ModelConfig,
    #[serde(default)]
    pub mode: AgentMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubConfig {
    #[serde(default)]
    pub token: String,
    /// `owner/name` identifier of the target repository.
    pub repository: String,
}

/// Sandbox backends. At most one may be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e2b: Option<E2bConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daytona: Option<DaytonaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct E2bConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaytonaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalConfig {
    /// Directory holding sandbox folders (defaults to the system temp dir).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Telemetry settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryConfig {
    #[serde(default)]
    pub is_enabled: bool,
    /// HTTP collector endpoint; events are logged through `tracing` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_version: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Transport timeout for a single HTTP export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// The sandbox backend selected by [`EnvironmentConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxBackend {
    E2b {
        api_key: String,
        template_id: Option<String>,
    },
    Local {
        root: Option<PathBuf>,
    },
}

impl SandboxBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::E2b { .. } => "e2b",
            Self::Local { .. } => "local",
        }
    }
}

impl EnvironmentConfig {
    /// Resolve the single active backend.
    ///
    /// Unimplemented backends are rejected first. With nothing configured the
    /// E2B backend is selected with an empty credential; the agent reports the
    /// missing key when it first needs a sandbox.
    pub fn backend(&self) -> Result<SandboxBackend, ConfigError> {
        if self.daytona.is_some() {
            return Err(ConfigError::UnsupportedEnvironment("daytona".to_string()));
        }

        let mut active = vec![];
        if self.e2b.is_some() {
            active.push("e2b".to_string());
        }
        if self.local.is_some() {
            active.push("local".to_string());
        }
        if active.len() > 1 {
            return Err(ConfigError::ConflictingEnvironments(active));
        }

        if let Some(local) = &self.local {
            return Ok(SandboxBackend::Local {
                root: local.root.clone(),
            });
        }
        let e2b = self.e2b.clone().unwrap_or_default();
        Ok(SandboxBackend::E2b {
            api_key: e2b.api_key.unwrap_or_default(),
            template_id: e2b.template_id,
        })
    }
}

impl VibeKitConfig {
    /// Load a YAML or JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&contents)
    }

    /// Parse a YAML or JSON document.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Fill empty credentials from process environment variables.
    pub fn apply_env_defaults(&mut self) {
        self.apply_defaults_from(|key| std::env::var(key).ok());
    }

    /// Fill empty credentials using `lookup`.
    ///
    /// - model API key: `OPENAI_API_KEY` (codex) or `ANTHROPIC_API_KEY` (claude)
    /// - GitHub token: `GITHUB_TOKEN`
    /// - E2B API key: `E2B_API_KEY`
    pub fn apply_defaults_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.agent.model.api_key.is_empty() {
            let var = match self.agent.agent_type.as_str() {
                "codex" => Some("OPENAI_API_KEY"),
                "claude" => Some("ANTHROPIC_API_KEY"),
                _ => None,
            };
            if let Some(key) = var.and_then(|name| lookup(name)) {
                self.agent.model.api_key = key;
            }
        }

        if self.github.token.is_empty() {
            if let Some(token) = lookup("GITHUB_TOKEN") {
                self.github.token = token;
            }
        }

        if let Some(e2b) = self.environment.e2b.as_mut() {
            if e2b.api_key.as_deref().unwrap_or_default().is_empty() {
                e2b.api_key = lookup("E2B_API_KEY").or(e2b.api_key.take());
            }
        }
    }

    /// Whether telemetry is configured and switched on.
    pub fn telemetry_enabled(&self) -> bool {
        self.telemetry.as_ref().is_some_and(|t| t.is_enabled)
    }
}
