//! The outbound event vocabulary.
//!
//! These are the only event shapes clients ever see, regardless of what the
//! upstream stream looked like. Serialized with a `type` tag so the SSE
//! transport can forward them as-is.

use serde::{Deserialize, Serialize};

use crate::tree::ReasoningTask;

/// Coarse lifecycle phase shown to the user.
///
/// `retry` interleaves with `connecting`/`researching` while the engine
/// warms up; everything else advances strictly forward.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Init,
    Connecting,
    Researching,
    Retry,
    Finalizing,
    Complete,
    Error,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Init => "init",
            Phase::Connecting => "connecting",
            Phase::Researching => "researching",
            Phase::Retry => "retry",
            Phase::Finalizing => "finalizing",
            Phase::Complete => "complete",
            Phase::Error => "error",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of an activity event's content.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Raw agent output text.
    Delta,
    /// A tool invocation surfaced from the delta stream.
    Tool,
    /// Thoughts, task titles, conclusions, and other readable notes.
    Info,
    /// Content-less heartbeat; counters only.
    Progress,
}

/// Normalized events relayed to the client.
///
/// Per run: `run_started` at most once, exactly one of `done`/`error`, and
/// that terminal event is always last.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// A run identifier exists; cancellation is possible from here on.
    RunStarted { run_id: String },
    /// Phase transition with a human-readable message.
    Status {
        phase: Phase,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
    /// Heartbeat while waiting on the upstream (finalizing polls).
    Progress { delta_count: u64, elapsed: f64 },
    /// One processed delta, classified.
    Activity {
        delta_count: u64,
        elapsed: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        content_type: ContentKind,
    },
    /// Terminal success.
    Done {
        run_id: String,
        answer: String,
        reasoning: Vec<ReasoningTask>,
    },
    /// Terminal failure.
    Error { message: String },
}

impl OutboundEvent {
    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OutboundEvent::Done { .. } | OutboundEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = OutboundEvent::Status {
            phase: Phase::Researching,
            message: "Research in progress...".into(),
            details: None,
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "status");
        assert_eq!(json["phase"], "researching");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn activity_omits_absent_content() {
        let event = OutboundEvent::Activity {
            delta_count: 7,
            elapsed: 1.5,
            content: None,
            content_type: ContentKind::Progress,
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "activity");
        assert_eq!(json["content_type"], "progress");
        assert!(json.get("content").is_none());
    }

    #[test]
    fn terminal_split_covers_done_and_error_only() {
        assert!(
            OutboundEvent::Error {
                message: "boom".into()
            }
            .is_terminal()
        );
        assert!(
            !OutboundEvent::RunStarted {
                run_id: "r1".into()
            }
            .is_terminal()
        );
    }

    #[test]
    fn retry_phase_round_trips_through_serde() {
        let json = serde_json::to_string(&Phase::Retry).expect("serialize");
        assert_eq!(json, "\"retry\"");
        let phase: Phase = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(phase, Phase::Retry);
    }
}
