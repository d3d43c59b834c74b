//! Client-side session state.
//!
//! [`ResearchSession`] folds the outbound event stream into the state a UI
//! needs: current phase, counters, a bounded activity log, and the final
//! answer. It enforces the legal phase transitions, throttles noisy progress
//! events, and synthesizes a terminal error when the stream dies without one.

use tracing::warn;

use crate::activity::{ActivityKind, ActivityLog};
use crate::event::{ContentKind, OutboundEvent, Phase};
use crate::relay::{CancelHandle, RunRelay};

/// Log every Nth content-less activity tick.
const HEARTBEAT_LOG_EVERY: u64 = 50;
/// Log every Nth low-value progress fragment that still carried content.
const PROGRESS_LOG_EVERY: u64 = 10;

/// Accumulated view of one research run, fed by [`ResearchSession::apply`].
pub struct ResearchSession {
    phase: Phase,
    run_id: Option<String>,
    delta_count: u64,
    elapsed: f64,
    canceled: bool,
    saw_terminal: bool,
    answer: Option<String>,
    reasoning: Vec<crate::tree::ReasoningTask>,
    log: ActivityLog,
    log_collapsed: bool,
    heartbeat_ticks: u64,
    progress_fragments: u64,
    cancel: Option<CancelHandle>,
}

impl Default for ResearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ResearchSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            run_id: None,
            delta_count: 0,
            elapsed: 0.0,
            canceled: false,
            saw_terminal: false,
            answer: None,
            reasoning: Vec::new(),
            log: ActivityLog::default(),
            log_collapsed: false,
            heartbeat_ticks: 0,
            progress_fragments: 0,
            cancel: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn delta_count(&self) -> u64 {
        self.delta_count
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn reasoning(&self) -> &[crate::tree::ReasoningTask] {
        &self.reasoning
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.log
    }

    /// Whether the live log view should be collapsed. Entries are kept
    /// either way so the user can inspect what led up to a failure.
    pub fn log_collapsed(&self) -> bool {
        self.log_collapsed
    }

    pub fn is_finished(&self) -> bool {
        self.saw_terminal
    }

    /// Adopts a new relay, cancelling any still-active previous run and
    /// resetting all accumulated state.
    pub fn begin(&mut self, relay: &RunRelay) {
        if !self.saw_terminal {
            if let Some(cancel) = &self.cancel {
                cancel.cancel();
            }
        }
        *self = Self::new();
        self.cancel = Some(relay.cancel_handle());
    }

    /// Requests cancellation of the current run.
    pub fn cancel(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
            self.canceled = true;
        }
    }

    /// Folds one event into the session.
    pub fn apply(&mut self, event: &OutboundEvent) {
        if self.saw_terminal {
            warn!("event received after terminal, ignoring");
            return;
        }
        match event {
            OutboundEvent::RunStarted { run_id } => {
                self.run_id = Some(run_id.clone());
            }
            OutboundEvent::Status {
                phase, message, ..
            } => {
                if self.transition_to(*phase) {
                    self.log.push(ActivityKind::Status, message.clone());
                }
            }
            OutboundEvent::Progress {
                delta_count,
                elapsed,
            } => {
                self.delta_count = (*delta_count).max(self.delta_count);
                self.elapsed = *elapsed;
                self.heartbeat_ticks += 1;
                if self.heartbeat_ticks % HEARTBEAT_LOG_EVERY == 0 {
                    self.log.push(
                        ActivityKind::Progress,
                        format!("{} deltas after {:.1}s", self.delta_count, self.elapsed),
                    );
                }
            }
            OutboundEvent::Activity {
                delta_count,
                elapsed,
                content,
                content_type,
            } => {
                self.delta_count = (*delta_count).max(self.delta_count);
                self.elapsed = *elapsed;
                match (content, content_type) {
                    (Some(text), ContentKind::Progress) => {
                        self.progress_fragments += 1;
                        if self.progress_fragments % PROGRESS_LOG_EVERY == 0 {
                            self.log.push(ActivityKind::Progress, text.clone());
                        }
                    }
                    (None, _) => {
                        self.heartbeat_ticks += 1;
                        if self.heartbeat_ticks % HEARTBEAT_LOG_EVERY == 0 {
                            self.log.push(
                                ActivityKind::Progress,
                                format!("{} deltas after {:.1}s", self.delta_count, self.elapsed),
                            );
                        }
                    }
                    (Some(text), kind) => {
                        self.log.push(activity_kind(*kind), text.clone());
                    }
                }
            }
            OutboundEvent::Done {
                run_id,
                answer,
                reasoning,
            } => {
                self.run_id = Some(run_id.clone());
                self.answer = Some(answer.clone());
                self.reasoning = reasoning.clone();
                self.phase = Phase::Complete;
                self.saw_terminal = true;
                self.log_collapsed = true;
                self.log.push(ActivityKind::Status, "Research complete");
            }
            OutboundEvent::Error { message } => {
                self.phase = Phase::Error;
                self.saw_terminal = true;
                self.log_collapsed = true;
                self.log.push(ActivityKind::Error, message.clone());
            }
        }
    }

    /// Marks the stream closed. Without a prior terminal event this records
    /// an unexpected disconnect, unless the user cancelled.
    pub fn on_stream_closed(&mut self) {
        if self.saw_terminal || self.canceled {
            return;
        }
        self.phase = Phase::Error;
        self.saw_terminal = true;
        self.log
            .push(ActivityKind::Error, "connection closed unexpectedly");
    }

    fn transition_to(&mut self, next: Phase) -> bool {
        if next == self.phase {
            return true;
        }
        let allowed = matches!(
            (self.phase, next),
            (Phase::Idle, Phase::Init)
                | (Phase::Init, Phase::Connecting)
                | (Phase::Idle, Phase::Connecting)
                | (Phase::Connecting, Phase::Researching)
                | (Phase::Connecting, Phase::Retry)
                | (Phase::Researching, Phase::Retry)
                | (Phase::Researching, Phase::Finalizing)
                | (Phase::Retry, Phase::Connecting)
        );
        if allowed {
            self.phase = next;
        } else {
            warn!(from = %self.phase, to = %next, "ignoring invalid phase transition");
        }
        allowed
    }
}

fn activity_kind(kind: ContentKind) -> ActivityKind {
    match kind {
        ContentKind::Delta => ActivityKind::Delta,
        ContentKind::Tool => ActivityKind::Tool,
        ContentKind::Info => ActivityKind::Info,
        ContentKind::Progress => ActivityKind::Progress,
    }
}
