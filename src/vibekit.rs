//! VibeKit facade - one API over the supported coding agents.
//!
//! # Responsibilities
//! 1. Validate configuration and build exactly one agent
//! 2. Wrap caller callbacks with telemetry instrumentation
//! 3. Record a telemetry span around every generation call
//! 4. Pass sandbox lifecycle operations straight through to the agent

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::agents::{
    Agent, AgentConfig, AgentError, AgentFactory, AgentMode, AgentType, Conversation,
    DefaultAgentFactory, GenerationResult, PullRequestResponse, SandboxCredentials, StreamHandler,
};
use crate::config::{SandboxBackend, VibeKitConfig};
use crate::error::{ConfigError, GenerationError};
use crate::sandbox::{LocalSandboxProvider, SandboxProvider};
use crate::telemetry::{RunSummary, SpanContext, TelemetryError, TelemetryService, TelemetrySink};

/// Source tag for errors raised by the facade itself.
const FACADE_SOURCE: &str = "vibekit";

type Callback = Box<dyn Fn(&str) + Send + Sync>;

/// Caller-supplied streaming callbacks.
///
/// ```ignore
/// let callbacks = StreamCallbacks::new()
///     .on_update(|chunk| println!("{}", chunk))
///     .on_error(|err| eprintln!("{}", err));
/// ```
#[derive(Default)]
pub struct StreamCallbacks {
    on_update: Option<Callback>,
    on_error: Option<Callback>,
}

impl StreamCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_update(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

/// Telemetry `dataType` for a streamed chunk.
///
/// JSON objects report their `type` field (or `"unknown"` without one);
/// anything that is not JSON is `"stream_output"`.
pub fn classify_chunk(chunk: &str) -> String {
    match serde_json::from_str::<Value>(chunk) {
        Err(_) | Ok(Value::Null) => "stream_output".to_string(),
        Ok(Value::Object(map)) => match map.get("type") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Bool(true)) => "true".to_string(),
            Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
            Some(v @ (Value::Array(_) | Value::Object(_))) => v.to_string(),
            _ => "unknown".to_string(),
        },
        Ok(_) => "unknown".to_string(),
    }
}

fn report(result: Result<(), TelemetryError>) {
    if let Err(e) = result {
        warn!("Telemetry export failed: {}", e);
    }
}

/// Decorates caller callbacks with telemetry.
///
/// The caller's callback always runs first; the telemetry export is awaited
/// before control returns to the agent.
struct InstrumentedCallbacks<'a> {
    inner: &'a StreamCallbacks,
    telemetry: Option<&'a TelemetryService>,
    span: SpanContext<'a>,
    repo_url: &'a str,
}

#[async_trait]
impl<'a> StreamHandler for InstrumentedCallbacks<'a> {
    async fn on_update(&self, chunk: &str) {
        if let Some(f) = &self.inner.on_update {
            f(chunk);
        }
        if let Some(telemetry) = self.telemetry {
            let data_type = classify_chunk(chunk);
            report(
                telemetry
                    .track_stream(&self.span, chunk, None, self.repo_url, &data_type)
                    .await,
            );
        }
    }

    async fn on_error(&self, error: &str) {
        if let Some(f) = &self.inner.on_error {
            f(error);
        }
        if let Some(telemetry) = self.telemetry {
            let source = format!("{}_agent", self.span.agent_type);
            report(
                telemetry
                    .track_error(&self.span, error, None, &source)
                    .await,
            );
        }
    }
}

/// Unified entry point over the Codex and Claude agents.
pub struct VibeKit {
    config: VibeKitConfig,
    agent_type: AgentType,
    agent: Box<dyn Agent>,
    telemetry: Option<TelemetryService>,
}

impl VibeKit {
    /// Build a facade with the default agents and sandbox provider.
    pub fn new(config: VibeKitConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    pub fn builder(config: VibeKitConfig) -> VibeKitBuilder {
        VibeKitBuilder {
            config,
            factory: None,
            sandbox_provider: None,
            telemetry_sink: None,
        }
    }

    pub fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    pub fn config(&self) -> &VibeKitConfig {
        &self.config
    }

    /// Run a generation request.
    ///
    /// `mode` defaults to the configured mode. Any agent failure is returned as
    /// a [`GenerationError`] prefixed with the agent type.
    pub async fn generate(
        &self,
        prompt: &str,
        mode: Option<AgentMode>,
        history: Option<&[Conversation]>,
        callbacks: Option<&StreamCallbacks>,
    ) -> Result<GenerationResult, GenerationError> {
        let mode = mode.unwrap_or(self.config.agent.mode);
        let history = history.unwrap_or_default();
        let repo_url = self.config.github.repository.as_str();
        let span = SpanContext {
            agent_type: self.agent_type,
            mode,
            prompt,
        };
        let telemetry = self.telemetry.as_ref();

        debug!(agent_type = %self.agent_type, mode = %mode, "Starting generation");
        if let Some(telemetry) = telemetry {
            report(
                telemetry
                    .track_start(
                        &span,
                        repo_url,
                        self.config.agent.model.name.as_deref(),
                        !history.is_empty(),
                    )
                    .await,
            );
        }

        let instrumented = callbacks.map(|inner| InstrumentedCallbacks {
            inner,
            telemetry,
            span,
            repo_url,
        });
        let handler = instrumented.as_ref().map(|h| h as &dyn StreamHandler);

        match self.agent.generate(prompt, mode, history, handler).await {
            Ok(result) => {
                if let Some(telemetry) = telemetry {
                    let summary = RunSummary {
                        exit_code: result.exit_code,
                        stdout_length: result.stdout.len(),
                        stderr_length: result.stderr.len(),
                    };
                    report(
                        telemetry
                            .track_end(&span, &result.sandbox_id, repo_url, &summary)
                            .await,
                    );
                }
                debug!(sandbox_id = %result.sandbox_id, exit_code = result.exit_code, "Generation finished");
                Ok(result)
            }
            Err(e) => {
                let err = GenerationError::new(self.agent_type, e);
                if let Some(telemetry) = telemetry {
                    report(
                        telemetry
                            .track_error(&span, &err.message, Some(err.kind), FACADE_SOURCE)
                            .await,
                    );
                }
                warn!(kind = err.kind, "{}", err.message);
                Err(err)
            }
        }
    }

    /// Commit the sandbox's changes and open a pull request labelled with the agent name.
    pub async fn create_pull_request(&self) -> Result<PullRequestResponse, AgentError> {
        self.agent.create_pull_request().await
    }

    /// Kill the active sandbox.
    pub async fn kill(&self) -> Result<(), AgentError> {
        self.agent.kill_sandbox().await
    }

    /// Pause the active sandbox, keeping its session id.
    pub async fn pause(&self) -> Result<(), AgentError> {
        self.agent.pause_sandbox().await
    }

    /// Resume the paused sandbox.
    pub async fn resume(&self) -> Result<(), AgentError> {
        self.agent.resume_sandbox().await
    }

    /// Current sandbox session id, if any.
    pub async fn get_session(&self) -> Result<Option<String>, AgentError> {
        self.agent.get_session().await
    }

    pub async fn set_session(&self, session_id: impl Into<String>) -> Result<(), AgentError> {
        self.agent.set_session(session_id.into()).await
    }
}

/// Builder for [`VibeKit`] with optional collaborator overrides.
pub struct VibeKitBuilder {
    config: VibeKitConfig,
    factory: Option<Box<dyn AgentFactory>>,
    sandbox_provider: Option<Arc<dyn SandboxProvider>>,
    telemetry_sink: Option<Arc<dyn TelemetrySink>>,
}

impl VibeKitBuilder {
    /// Replace the factory used to build the agent.
    pub fn agent_factory(mut self, factory: impl AgentFactory + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Sandbox provider for the default agents (required for remote backends).
    pub fn sandbox_provider(mut self, provider: Arc<dyn SandboxProvider>) -> Self {
        self.sandbox_provider = Some(provider);
        self
    }

    /// Export telemetry to this sink instead of the one described by the config.
    /// Ignored unless telemetry is enabled.
    pub fn telemetry_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry_sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<VibeKit, ConfigError> {
        let Self {
            config,
            factory,
            sandbox_provider,
            telemetry_sink,
        } = self;

        let backend = config.environment.backend()?;
        let agent_type: AgentType = config.agent.agent_type.parse()?;

        let telemetry = match config.telemetry.as_ref().filter(|t| t.is_enabled) {
            Some(telemetry_config) => Some(match telemetry_sink {
                Some(sink) => TelemetryService::with_sink(sink, config.session_id.clone()),
                None => TelemetryService::new(telemetry_config, config.session_id.clone()),
            }),
            None => None,
        };

        let factory: Box<dyn AgentFactory> = match factory {
            Some(factory) => factory,
            None => {
                let provider = sandbox_provider.or_else(|| default_provider(&backend));
                Box::new(DefaultAgentFactory::new(provider))
            }
        };
        let agent = factory.create(agent_type, agent_config(&config, &backend));

        info!(
            agent_type = %agent_type,
            environment = backend.name(),
            telemetry = telemetry.is_some(),
            "VibeKit initialized"
        );

        Ok(VibeKit {
            config,
            agent_type,
            agent,
            telemetry,
        })
    }
}

fn default_provider(backend: &SandboxBackend) -> Option<Arc<dyn SandboxProvider>> {
    match backend {
        SandboxBackend::Local { root: Some(root) } => {
            Some(Arc::new(LocalSandboxProvider::new(root.clone())))
        }
        SandboxBackend::Local { root: None } => Some(Arc::new(LocalSandboxProvider::default())),
        SandboxBackend::E2b { .. } => None,
    }
}

fn agent_config(config: &VibeKitConfig, backend: &SandboxBackend) -> AgentConfig {
    let sandbox = match backend {
        SandboxBackend::E2b {
            api_key,
            template_id,
        } => SandboxCredentials {
            backend: backend.name().to_string(),
            api_key: api_key.clone(),
            template_id: template_id.clone(),
        },
        SandboxBackend::Local { .. } => SandboxCredentials {
            backend: backend.name().to_string(),
            ..Default::default()
        },
    };

    AgentConfig {
        provider_api_key: config.agent.model.api_key.clone(),
        github_token: config.github.token.clone(),
        repository: config.github.repository.clone(),
        sandbox,
        model: config.agent.model.name.clone(),
        session_id: config.session_id.clone(),
        telemetry: config.telemetry.clone(),
    }
}
