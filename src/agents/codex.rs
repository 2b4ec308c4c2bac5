//! OpenAI Codex CLI agent.

use std::collections::HashMap;
use std::sync::Arc;

use super::sandboxed::{CliProfile, SandboxAgent};
use super::{AgentConfig, AgentMode, AgentType};
use crate::sandbox::{shell_quote, SandboxProvider};

/// Invocation of `codex` in full-auto mode.
pub struct CodexCli {
    api_key: String,
    model: Option<String>,
}

impl CliProfile for CodexCli {
    fn agent_type(&self) -> AgentType {
        AgentType::Codex
    }

    fn command(&self, prompt: &str, _mode: AgentMode) -> String {
        // Ask mode is enforced through the prompt; codex has no read-only flag.
        let mut cmd = String::from("codex --approval-mode full-auto --quiet");
        if let Some(model) = &self.model {
            cmd.push_str(&format!(" --model {}", shell_quote(model)));
        }
        cmd.push(' ');
        cmd.push_str(&shell_quote(prompt));
        cmd
    }

    fn envs(&self) -> HashMap<String, String> {
        HashMap::from([("OPENAI_API_KEY".to_string(), self.api_key.clone())])
    }
}

pub type CodexAgent = SandboxAgent<CodexCli>;

impl SandboxAgent<CodexCli> {
    pub fn new(config: AgentConfig, provider: Option<Arc<dyn SandboxProvider>>) -> Self {
        let profile = CodexCli {
            api_key: config.provider_api_key.clone(),
            model: config.model.clone(),
        };
        Self::with_profile(profile, config, provider)
    }
}
