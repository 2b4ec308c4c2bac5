//! VibeKit - one API over sandboxed AI coding agents.
//!
//! # Architecture
//! - [`VibeKit`] validates configuration, builds a single [`agents::Agent`] and
//!   wraps every generation call in a telemetry span
//! - [`agents`] holds the Codex and Claude agents, which drive provider CLIs
//!   inside a sandbox
//! - [`sandbox`] defines the sandbox provider capability and a local provider
//! - [`telemetry`] exports start/stream/end/error events

pub mod agents;
pub mod config;
pub mod error;
pub mod github;
pub mod sandbox;
pub mod telemetry;
mod vibekit;

pub use config::VibeKitConfig;
pub use error::{ConfigError, GenerationError};
pub use crate::vibekit::{classify_chunk, StreamCallbacks, VibeKit, VibeKitBuilder};
