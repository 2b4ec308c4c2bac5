//! Claude Code CLI agent.

use std::collections::HashMap;
use std::sync::Arc;

use super::sandboxed::{CliProfile, SandboxAgent};
use super::{AgentConfig, AgentMode, AgentType};
use crate::sandbox::{shell_quote, SandboxProvider};

const EDIT_TOOLS: &str = "Edit,Write,MultiEdit";
const CODE_TOOLS: &str = "Edit,Write,MultiEdit,Read,Bash";

/// Invocation of `claude` in print mode with streamed JSON output.
pub struct ClaudeCli {
    api_key: String,
    model: Option<String>,
}

impl CliProfile for ClaudeCli {
    fn agent_type(&self) -> AgentType {
        AgentType::Claude
    }

    fn command(&self, prompt: &str, mode: AgentMode) -> String {
        let mut cmd = String::from("claude -p --output-format stream-json --verbose");
        if let Some(model) = &self.model {
            cmd.push_str(&format!(" --model {}", shell_quote(model)));
        }
        match mode {
            AgentMode::Ask => cmd.push_str(&format!(" --disallowedTools {}", shell_quote(EDIT_TOOLS))),
            AgentMode::Code => cmd.push_str(&format!(" --allowedTools {}", shell_quote(CODE_TOOLS))),
        }
        cmd.push(' ');
        cmd.push_str(&shell_quote(prompt));
        cmd
    }

    fn envs(&self) -> HashMap<String, String> {
        HashMap::from([("ANTHROPIC_API_KEY".to_string(), self.api_key.clone())])
    }
}

pub type ClaudeAgent = SandboxAgent<ClaudeCli>;

impl SandboxAgent<ClaudeCli> {
    pub fn new(config: AgentConfig, provider: Option<Arc<dyn SandboxProvider>>) -> Self {
        let profile = ClaudeCli {
            api_key: config.provider_api_key.clone(),
            model: config.model.clone(),
        };
        Self::with_profile(profile, config, provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> ClaudeCli {
        ClaudeCli {
            api_key: "sk-ant".into(),
            model: None,
        }
    }

    #[test]
    fn test_code_mode_allows_edits() {
        assert_eq!(
            cli().command("refactor", AgentMode::Code),
            "claude -p --output-format stream-json --verbose --allowedTools 'Edit,Write,MultiEdit,Read,Bash' 'refactor'"
        );
    }

    #[test]
    fn test_ask_mode_blocks_edits() {
        let cmd = cli().command("explain", AgentMode::Ask);
        assert!(cmd.contains("--disallowedTools 'Edit,Write,MultiEdit'"));
        assert!(!cmd.contains("--allowedTools"));
    }

    #[test]
    fn test_envs() {
        assert_eq!(
            cli().envs().get("ANTHROPIC_API_KEY").map(String::as_str),
            Some("sk-ant")
        );
    }
}
