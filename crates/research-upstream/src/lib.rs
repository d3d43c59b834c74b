//! Client for the upstream research-run platform.
//!
//! The platform executes long-running agent research jobs. This crate owns
//! the four calls every run lifecycle is made of (submit, stream, poll,
//! cancel) and decodes the platform's SSE delta stream into typed
//! [`RawDelta`] values behind the pull-based [`RunTransport`] trait. Nothing
//! in here retries or normalizes events; that is the relay crate's job.

/// Engine and platform-tool catalogs plus tool descriptor builders.
pub mod catalog;
/// Reqwest-backed `RunTransport` implementation and its configuration.
pub mod client;
/// Error taxonomy for upstream calls, including warmup classification.
pub mod error;
/// Research instructions template for run submissions.
pub mod instructions;
/// SSE decoding and the `RunTransport` trait seam.
pub mod transport;
/// Wire types for runs, results, and streamed deltas.
pub mod types;

pub use catalog::{EngineInfo, ToolInfo, available_engines, available_tools};
pub use client::{UpstreamClient, UpstreamConfig};
pub use error::UpstreamError;
pub use instructions::research_instructions;
pub use transport::{DeltaStream, RunTransport, SseDecoder};
pub use types::{RawDelta, Run, RunError, RunHandle, RunInput, RunRequest, RunResult, RunStatus};
