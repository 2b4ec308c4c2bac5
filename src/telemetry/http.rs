//! HTTP collector sink.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::json;

use super::{TelemetryError, TelemetryEvent, TelemetrySink};
use crate::config::TelemetryConfig;

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SERVICE_NAME: &str = "vibekit";

/// Posts each event as JSON to a collector endpoint.
pub struct HttpTelemetrySink {
    client: reqwest::Client,
    endpoint: String,
    service_name: String,
    service_version: String,
}

impl HttpTelemetrySink {
    pub fn new(endpoint: &str, config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TelemetryError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| TelemetryError::InvalidHeader(name.as_str().to_string()))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(
                config.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            ))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            service_name: config
                .service_name
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            service_version: config
                .service_version
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        })
    }
}

#[async_trait]
impl TelemetrySink for HttpTelemetrySink {
    async fn export(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
        let body = json!({
            "serviceName": self.service_name,
            "serviceVersion": self.service_version,
            "events": [event],
        });

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(TelemetryError::Rejected(resp.status().as_u16()));
        }
        Ok(())
    }
}
