//! Telemetry for generation calls.
//!
//! A generation call produces one telemetry span: a `start` event, any number
//! of `stream` events, then either `end` or `error`. Events are handed to a
//! [`TelemetrySink`]; the facade never reads telemetry state back.

mod http;
mod log;

pub use http::HttpTelemetrySink;
pub use log::TracingTelemetrySink;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::agents::{AgentMode, AgentType};
use crate::config::TelemetryConfig;

/// Errors raised while exporting telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Telemetry export failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Telemetry collector rejected event with status {0}")]
    Rejected(u16),

    #[error("Invalid telemetry header {0}")]
    InvalidHeader(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Start,
    Stream,
    End,
    Error,
}

/// A single telemetry record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub session_id: String,
    pub event_type: EventType,
    pub agent_type: AgentType,
    pub mode: AgentMode,
    pub prompt: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    pub metadata: Map<String, Value>,
}

/// Destination for telemetry events.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn export(&self, event: TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Fields shared by every event of one generation call.
#[derive(Debug, Clone, Copy)]
pub struct SpanContext<'a> {
    pub agent_type: AgentType,
    pub mode: AgentMode,
    pub prompt: &'a str,
}

/// Result counters reported on `end` instead of full output bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub exit_code: i32,
    pub stdout_length: usize,
    pub stderr_length: usize,
}

/// Builds telemetry events and forwards them to a sink.
pub struct TelemetryService {
    session_id: String,
    sink: Arc<dyn TelemetrySink>,
}

impl TelemetryService {
    /// Create a service exporting to the sink described by `config`.
    ///
    /// Uses [`HttpTelemetrySink`] when an endpoint is set and
    /// [`TracingTelemetrySink`] otherwise.
    pub fn new(config: &TelemetryConfig, session_id: Option<String>) -> Self {
        let sink: Arc<dyn TelemetrySink> = match &config.endpoint {
            Some(endpoint) => match HttpTelemetrySink::new(endpoint, config) {
                Ok(sink) => Arc::new(sink),
                Err(e) => {
                    tracing::warn!("Falling back to log telemetry sink: {}", e);
                    Arc::new(TracingTelemetrySink)
                }
            },
            None => Arc::new(TracingTelemetrySink),
        };
        Self::with_sink(sink, session_id)
    }

    /// Create a service exporting to a caller-supplied sink.
    pub fn with_sink(sink: Arc<dyn TelemetrySink>, session_id: Option<String>) -> Self {
        Self {
            session_id: session_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            sink,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn event(&self, ctx: &SpanContext<'_>, event_type: EventType) -> TelemetryEvent {
        TelemetryEvent {
            session_id: self.session_id.clone(),
            event_type,
            agent_type: ctx.agent_type,
            mode: ctx.mode,
            prompt: ctx.prompt.to_string(),
            timestamp: Utc::now(),
            stream_data: None,
            sandbox_id: None,
            repo_url: None,
            metadata: Map::new(),
        }
    }

    pub async fn track_start(
        &self,
        ctx: &SpanContext<'_>,
        repo_url: &str,
        model: Option<&str>,
        has_history: bool,
    ) -> Result<(), TelemetryError> {
        let mut event = self.event(ctx, EventType::Start);
        event.repo_url = Some(repo_url.to_string());
        event.metadata = object(json!({
            "repoUrl": repo_url,
            "model": model,
            "hasHistory": has_history,
        }));
        self.sink.export(event).await
    }

    pub async fn track_stream(
        &self,
        ctx: &SpanContext<'_>,
        data: &str,
        sandbox_id: Option<&str>,
        repo_url: &str,
        data_type: &str,
    ) -> Result<(), TelemetryError> {
        let mut event = self.event(ctx, EventType::Stream);
        event.stream_data = Some(data.to_string());
        event.sandbox_id = sandbox_id.map(str::to_string);
        event.repo_url = Some(repo_url.to_string());
        event.metadata = object(json!({ "dataType": data_type }));
        self.sink.export(event).await
    }

    pub async fn track_end(
        &self,
        ctx: &SpanContext<'_>,
        sandbox_id: &str,
        repo_url: &str,
        summary: &RunSummary,
    ) -> Result<(), TelemetryError> {
        let mut event = self.event(ctx, EventType::End);
        event.sandbox_id = Some(sandbox_id.to_string());
        event.repo_url = Some(repo_url.to_string());
        event.metadata = object(json!({
            "exitCode": summary.exit_code,
            "stdoutLength": summary.stdout_length,
            "stderrLength": summary.stderr_length,
        }));
        self.sink.export(event).await
    }

    pub async fn track_error(
        &self,
        ctx: &SpanContext<'_>,
        error: &str,
        error_type: Option<&str>,
        source: &str,
    ) -> Result<(), TelemetryError> {
        let mut event = self.event(ctx, EventType::Error);
        let mut metadata = object(json!({
            "error": error,
            "source": source,
        }));
        if let Some(error_type) = error_type {
            metadata.insert("errorType".to_string(), json!(error_type));
        }
        event.metadata = metadata;
        self.sink.export(event).await
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
