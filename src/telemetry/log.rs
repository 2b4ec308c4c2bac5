//! Sink that reports events through `tracing`.

use async_trait::async_trait;

use super::{EventType, TelemetryError, TelemetryEvent, TelemetrySink};

/// Logs telemetry events instead of exporting them.
pub struct TracingTelemetrySink;

#[async_trait]
impl TelemetrySink for TracingTelemetrySink {
    async fn export(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
        let metadata = serde_json::Value::Object(event.metadata);
        match event.event_type {
            EventType::Error => tracing::warn!(
                target: "vibekit::telemetry",
                session_id = %event.session_id,
                agent_type = %event.agent_type,
                mode = %event.mode,
                metadata = %metadata,
                "generation error"
            ),
            EventType::Stream => tracing::debug!(
                target: "vibekit::telemetry",
                session_id = %event.session_id,
                agent_type = %event.agent_type,
                data = event.stream_data.as_deref().unwrap_or_default(),
                metadata = %metadata,
                "generation stream"
            ),
            EventType::Start | EventType::End => tracing::info!(
                target: "vibekit::telemetry",
                session_id = %event.session_id,
                event_type = ?event.event_type,
                agent_type = %event.agent_type,
                mode = %event.mode,
                sandbox_id = event.sandbox_id.as_deref().unwrap_or_default(),
                metadata = %metadata,
                "generation lifecycle"
            ),
        }
        Ok(())
    }
}
