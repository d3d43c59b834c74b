//! Streaming relay between the upstream run platform and clients.
//!
//! One producer task per run drives the upstream client through warmup
//! retries, normalizes raw deltas into a small stable event vocabulary, and
//! pushes them over a single-consumer channel. Exactly one terminal event
//! (`done` xor `error`) is emitted per run, always last. Cancellation flows
//! the other way, from the consumer handle down to the upstream cancel call.

/// Bounded activity log ring buffer.
pub mod activity;
/// Answer extraction and synthesis from terminal payloads.
pub mod answer;
/// Delta content classification for activity events.
pub mod classify;
/// Client-side consumption state machine.
pub mod consumer;
/// The producer task: warmup retries, normalization, finalizing poll loop.
pub mod driver;
/// Outbound event vocabulary and phases.
pub mod event;
/// Process-wide tracing initialization.
pub mod observability;
/// Relay handle, cancellation, and the active-run registry.
pub mod relay;
/// Warmup retry backoff policy.
pub mod retry;
/// Reasoning tree assembly from terminal payloads.
pub mod tree;

pub use activity::{ACTIVITY_LOG_CAPACITY, ActivityKind, ActivityLog, ActivityLogEntry};
pub use consumer::ResearchSession;
pub use driver::{DriverConfig, ResearchRequest, start_run};
pub use event::{ContentKind, OutboundEvent, Phase};
pub use relay::{ActiveRuns, CancelHandle, RunRelay};
pub use retry::RetryPolicy;
pub use tree::{ReasoningTask, ToolCall};
