//! Wire types for the upstream run platform.
//!
//! Field names follow the platform's camelCase JSON; streamed deltas are kept
//! deliberately loose because their payloads are internal to the agent.

use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the run platform.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Canceled,
    TimedOut,
}

impl RunStatus {
    /// Returns true once the status can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Canceled | RunStatus::TimedOut
        )
    }

    /// Wire spelling of the status, for user-facing messages.
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Canceled => "canceled",
            RunStatus::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload attached to a failed run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// Final result of a succeeded run.
///
/// `answer` may be a plain string or a structured object; `reasoning` is the
/// agent's hierarchical task trace. Both are kept as raw JSON here; the
/// relay crate owns interpretation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(default)]
    pub answer: Option<serde_json::Value>,
    #[serde(default)]
    pub reasoning: Option<serde_json::Value>,
}

/// Snapshot of a run returned by `poll`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub run_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub result: Option<RunResult>,
    #[serde(default)]
    pub error: Option<RunError>,
}

/// Agent input for a submission: instructions plus tool descriptors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunInput {
    pub instructions: String,
    pub tools: Vec<serde_json::Value>,
}

/// Body of a run submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRequest {
    pub engine: String,
    pub input: RunInput,
}

/// Handle returned by a successful submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHandle {
    pub run_id: String,
}

/// One upstream streaming event, decoded from an SSE frame.
///
/// Consumed exactly once, in arrival order. Anything the decoder cannot
/// recognize still surfaces as `Content` with no text so the consumer's
/// counters stay accurate.
#[derive(Clone, Debug, PartialEq)]
pub enum RawDelta {
    /// Incremental agent output. `content` is opaque upstream text, often an
    /// internal JSON fragment.
    Content { content: Option<String> },
    /// In-band end-of-stream marker. Older engine builds omit the run id.
    Done { run_id: Option<String> },
    /// In-band failure report.
    Error { message: String },
}
