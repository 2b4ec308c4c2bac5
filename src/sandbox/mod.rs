//! Sandbox providers - isolated execution environments used by agents.
//!
//! A sandbox is addressed by an opaque id that survives pause/resume, so a
//! caller can persist the id and reattach to the same environment later.

mod local;

pub use local::LocalSandboxProvider;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by sandbox providers.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("No sandbox provider available for the {0} environment")]
    Unavailable(String),

    #[error("Sandbox not found: {0}")]
    NotFound(String),

    #[error("Sandbox {0} is paused")]
    Paused(String),

    #[error("Failed to run command: {0}")]
    Command(String),

    #[error("Sandbox I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parameters for provisioning a new sandbox.
#[derive(Debug, Clone, Default)]
pub struct SandboxSpec {
    /// Provider credential; may be empty for providers that need none.
    pub api_key: String,
    pub template_id: Option<String>,
    pub envs: HashMap<String, String>,
}

/// A command to execute inside a sandbox.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// Shell command line, interpreted by `sh -c`.
    pub command: String,
    /// Working directory relative to the sandbox root.
    pub cwd: Option<String>,
    pub envs: HashMap<String, String>,
}

impl CommandSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_envs(mut self, envs: HashMap<String, String>) -> Self {
        self.envs.extend(envs);
        self
    }
}

/// A line of output produced while a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    Stdout(String),
    Stderr(String),
}

/// Collected result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability for provisioning and driving sandboxes.
///
/// # Invariants
/// - `pause` followed by `resume` keeps the sandbox addressable by the same id
/// - `run` on a paused sandbox fails with [`SandboxError::Paused`]
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Short provider name (e.g. "local", "e2b").
    fn name(&self) -> &str;

    /// Provision a new sandbox and return its id.
    async fn create(&self, spec: &SandboxSpec) -> Result<String, SandboxError>;

    /// Reattach to an existing sandbox, resuming it if paused.
    async fn resume(&self, sandbox_id: &str) -> Result<(), SandboxError>;

    /// Suspend a sandbox without discarding its state.
    async fn pause(&self, sandbox_id: &str) -> Result<(), SandboxError>;

    /// Destroy a sandbox.
    async fn kill(&self, sandbox_id: &str) -> Result<(), SandboxError>;

    /// Run a command to completion.
    ///
    /// When `output` is provided, each line is sent as it is produced; the
    /// sender is dropped once the command exits.
    async fn run(
        &self,
        sandbox_id: &str,
        command: CommandSpec,
        output: Option<mpsc::Sender<OutputChunk>>,
    ) -> Result<CommandOutput, SandboxError>;
}

/// Quote a value for safe interpolation into a `sh -c` command line.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
