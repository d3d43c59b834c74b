//! The run driver.
//!
//! `start_run` spawns a task that submits the research run upstream, consumes
//! its delta stream, survives engine warmup failures with bounded retries,
//! polls for the final result, and relays everything as normalized
//! [`OutboundEvent`]s through a bounded channel. Exactly one terminal event is
//! emitted per run, and it is always the last event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt as _;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use research_upstream::{
    RawDelta, RunHandle, RunInput, RunRequest, RunStatus, RunTransport, UpstreamError, catalog,
    instructions::research_instructions,
};

use crate::classify::classify_delta;
use crate::event::{OutboundEvent, Phase};
use crate::relay::{ActiveRuns, CancelHandle, RunRelay};
use crate::retry::RetryPolicy;
use crate::{answer, tree};

const MIN_TOPIC_LEN: usize = 3;
const MAX_TOPIC_LEN: usize = 2000;

/// Tunables for the run driver.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    pub default_engine: String,
    pub retry: RetryPolicy,
    pub poll_interval: Duration,
    /// Wall-clock ceiling on the finalizing poll loop.
    pub poll_max_wait: Duration,
    pub channel_capacity: usize,
    pub arxiv_service_url: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            default_engine: "tim-gpt".into(),
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_secs(2),
            poll_max_wait: Duration::from_secs(60),
            channel_capacity: 128,
            arxiv_service_url: None,
        }
    }
}

/// What to research and with which engine and tools.
#[derive(Clone, Debug)]
pub struct ResearchRequest {
    pub topic: String,
    pub engine: Option<String>,
    pub tools: Option<Vec<String>>,
    pub include_arxiv: bool,
}

impl ResearchRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            engine: None,
            tools: None,
            include_arxiv: false,
        }
    }
}

/// Starts a research run and returns the event relay for it.
///
/// All failures, including request validation, surface as a terminal
/// `error` event on the relay rather than as a `Result` here.
pub fn start_run(
    transport: Arc<dyn RunTransport>,
    registry: ActiveRuns,
    config: DriverConfig,
    request: ResearchRequest,
) -> RunRelay {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let (cancel, abort_rx) = CancelHandle::new();
    tokio::spawn(run_task(
        transport,
        registry,
        config,
        request,
        tx,
        cancel.clone(),
        abort_rx,
    ));
    RunRelay::new(rx, cancel)
}

async fn run_task(
    transport: Arc<dyn RunTransport>,
    registry: ActiveRuns,
    config: DriverConfig,
    request: ResearchRequest,
    tx: mpsc::Sender<OutboundEvent>,
    cancel: CancelHandle,
    mut abort_rx: watch::Receiver<bool>,
) {
    // Every run id announced or resubmitted under this task. All of them
    // stay cancellable until the terminal sweep below.
    let tracked = Arc::new(tokio::sync::Mutex::new(Vec::<String>::new()));

    tokio::select! {
        _ = wait_for_abort(&mut abort_rx) => {
            let run_id = tracked.lock().await.last().cloned();
            if let Some(run_id) = &run_id {
                debug!(run_id = %run_id, "cancelling upstream run");
                if let Err(err) = transport.cancel(run_id).await {
                    warn!(run_id = %run_id, error = %err, "upstream cancel failed");
                }
            }
            send(&tx, OutboundEvent::Error { message: "canceled by user".into() }).await;
        }
        _ = drive(
            transport.clone(),
            &registry,
            &config,
            &request,
            &tx,
            &cancel,
            &tracked,
        ) => {}
    }

    for run_id in tracked.lock().await.drain(..) {
        registry.deregister(&run_id);
    }
}

async fn drive(
    transport: Arc<dyn RunTransport>,
    registry: &ActiveRuns,
    config: &DriverConfig,
    request: &ResearchRequest,
    tx: &mpsc::Sender<OutboundEvent>,
    cancel: &CancelHandle,
    tracked: &Arc<tokio::sync::Mutex<Vec<String>>>,
) {
    let topic = request.topic.trim();
    if topic.len() < MIN_TOPIC_LEN || topic.len() > MAX_TOPIC_LEN {
        send(
            tx,
            OutboundEvent::Error {
                message: format!(
                    "research topic must be between {MIN_TOPIC_LEN} and {MAX_TOPIC_LEN} characters"
                ),
            },
        )
        .await;
        return;
    }
    let engine = request
        .engine
        .clone()
        .unwrap_or_else(|| config.default_engine.clone());
    if !catalog::is_known_engine(&engine) {
        send(
            tx,
            OutboundEvent::Error {
                message: format!("unknown engine: {engine}"),
            },
        )
        .await;
        return;
    }
    let (tools, unknown) = catalog::sanitize_tool_ids(request.tools.as_deref());
    if !unknown.is_empty() {
        warn!(unknown = ?unknown, "dropping unknown tool ids");
    }

    send(
        tx,
        OutboundEvent::Status {
            phase: Phase::Init,
            message: "Preparing research run...".into(),
            details: Some(serde_json::json!({ "engine": engine, "tools": tools })),
        },
    )
    .await;

    let arxiv_url = if request.include_arxiv {
        config.arxiv_service_url.as_deref()
    } else {
        None
    };
    let run_request = RunRequest {
        engine: engine.clone(),
        input: RunInput {
            instructions: research_instructions(topic),
            tools: catalog::tool_descriptors(&tools, arxiv_url),
        },
    };

    let started = Instant::now();
    let mut delta_count = 0_u64;
    let mut run_started_sent = false;
    let mut attempt = 1_u32;
    let mut last_error = String::new();

    'attempts: loop {
        if attempt > 1 {
            let failed = attempt - 1;
            send(
                tx,
                OutboundEvent::Status {
                    phase: Phase::Retry,
                    message: format!(
                        "Engine warming up, retrying (attempt {failed} of {})...",
                        config.retry.max_attempts
                    ),
                    details: Some(serde_json::json!({
                        "attempt": failed,
                        "max_attempts": config.retry.max_attempts,
                    })),
                },
            )
            .await;
            tokio::time::sleep(config.retry.delay_after(failed)).await;
        }

        send(
            tx,
            OutboundEvent::Status {
                phase: Phase::Connecting,
                message: "Connecting to research engine...".into(),
                details: None,
            },
        )
        .await;

        let handle = match transport.submit(&run_request).await {
            Ok(handle) => handle,
            Err(err) => {
                if retry_or_fail(tx, config, &mut attempt, &mut last_error, err).await {
                    continue 'attempts;
                }
                return;
            }
        };
        track_run(registry, tracked, cancel, &handle).await;
        if !run_started_sent {
            send(
                tx,
                OutboundEvent::RunStarted {
                    run_id: handle.run_id.clone(),
                },
            )
            .await;
            run_started_sent = true;
        }

        let mut stream = match transport.open_stream(&handle).await {
            Ok(stream) => stream,
            Err(err) => {
                if retry_or_fail(tx, config, &mut attempt, &mut last_error, err).await {
                    continue 'attempts;
                }
                return;
            }
        };

        send(
            tx,
            OutboundEvent::Status {
                phase: Phase::Researching,
                message: "Research in progress...".into(),
                details: None,
            },
        )
        .await;

        loop {
            match stream.next().await {
                Some(Ok(RawDelta::Content { content })) => {
                    delta_count = delta_count.saturating_add(1);
                    let (content, content_type) = classify_delta(content.as_deref());
                    send(
                        tx,
                        OutboundEvent::Activity {
                            delta_count,
                            elapsed: elapsed_secs(started),
                            content,
                            content_type,
                        },
                    )
                    .await;
                }
                Some(Ok(RawDelta::Done { .. })) => {
                    finalize(&*transport, tx, &handle.run_id, delta_count, started, config).await;
                    return;
                }
                Some(Ok(RawDelta::Error { message })) => {
                    if research_upstream::error::transient_message(&message)
                        && config.retry.has_attempts_left(attempt)
                    {
                        debug!(run_id = %handle.run_id, message = %message, "transient stream error, retrying");
                        last_error = message;
                        attempt += 1;
                        continue 'attempts;
                    }
                    send(tx, OutboundEvent::Error { message }).await;
                    return;
                }
                Some(Err(err)) => {
                    // The run may still finish upstream; fall back to polling.
                    warn!(run_id = %handle.run_id, error = %err, "delta stream failed, falling back to polling");
                    finalize(&*transport, tx, &handle.run_id, delta_count, started, config).await;
                    return;
                }
                None => {
                    finalize(&*transport, tx, &handle.run_id, delta_count, started, config).await;
                    return;
                }
            }
        }
    }
}

/// Records a warmup failure and reports whether another attempt follows.
/// Non-warmup errors and exhausted budgets emit the terminal error here.
async fn retry_or_fail(
    tx: &mpsc::Sender<OutboundEvent>,
    config: &DriverConfig,
    attempt: &mut u32,
    last_error: &mut String,
    err: UpstreamError,
) -> bool {
    if err.is_warmup() {
        *last_error = err.to_string();
        if config.retry.has_attempts_left(*attempt) {
            *attempt += 1;
            return true;
        }
        send(
            tx,
            OutboundEvent::Error {
                message: format!(
                    "gave up after {} warmup attempts: {last_error}",
                    config.retry.max_attempts
                ),
            },
        )
        .await;
        return false;
    }
    send(
        tx,
        OutboundEvent::Error {
            message: err.to_string(),
        },
    )
    .await;
    false
}

/// Registers a newly announced run id alongside any earlier ids for this
/// task. A resubmission after a transient failure gets a fresh upstream id,
/// but clients only ever saw the first one, so old ids must keep resolving
/// to the same cancel handle.
async fn track_run(
    registry: &ActiveRuns,
    tracked: &Arc<tokio::sync::Mutex<Vec<String>>>,
    cancel: &CancelHandle,
    handle: &RunHandle,
) {
    registry.register(handle.run_id.clone(), cancel.clone());
    tracked.lock().await.push(handle.run_id.clone());
}

async fn finalize(
    transport: &dyn RunTransport,
    tx: &mpsc::Sender<OutboundEvent>,
    run_id: &str,
    delta_count: u64,
    started: Instant,
    config: &DriverConfig,
) {
    send(
        tx,
        OutboundEvent::Status {
            phase: Phase::Finalizing,
            message: "Fetching results...".into(),
            details: None,
        },
    )
    .await;

    let finalize_started = Instant::now();
    loop {
        match transport.poll(run_id).await {
            Ok(run) => match run.status {
                RunStatus::Succeeded => {
                    match run.result {
                        Some(result) => {
                            let (answer, reasoning) = answer::extract_answer(
                                result.answer.as_ref(),
                                result.reasoning.as_ref(),
                            );
                            let reasoning: Vec<tree::ReasoningTask> = reasoning;
                            send(
                                tx,
                                OutboundEvent::Done {
                                    run_id: run_id.to_string(),
                                    answer,
                                    reasoning,
                                },
                            )
                            .await;
                        }
                        None => {
                            send(
                                tx,
                                OutboundEvent::Error {
                                    message: "no result returned from upstream".into(),
                                },
                            )
                            .await;
                        }
                    }
                    return;
                }
                RunStatus::Failed | RunStatus::Canceled | RunStatus::TimedOut => {
                    let message = match run.error {
                        Some(err) => format!("run {}: {}", run.status, err.message),
                        None => format!("run {}", run.status),
                    };
                    send(tx, OutboundEvent::Error { message }).await;
                    return;
                }
                RunStatus::Queued | RunStatus::Running => {
                    send(
                        tx,
                        OutboundEvent::Progress {
                            delta_count,
                            elapsed: elapsed_secs(started),
                        },
                    )
                    .await;
                }
            },
            Err(err) => {
                let message = if err.to_string().to_lowercase().contains("timeout") {
                    "request timed out while waiting for results".to_string()
                } else {
                    format!("failed to fetch result: {err}")
                };
                send(tx, OutboundEvent::Error { message }).await;
                return;
            }
        }

        if finalize_started.elapsed() + config.poll_interval > config.poll_max_wait {
            send(
                tx,
                OutboundEvent::Error {
                    message: "timed out waiting for results".into(),
                },
            )
            .await;
            return;
        }
        tokio::time::sleep(config.poll_interval).await;
    }
}

async fn wait_for_abort(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            // Cancel handle dropped without firing; never resolves.
            std::future::pending::<()>().await;
        }
    }
}

fn elapsed_secs(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 10.0).round() / 10.0
}

async fn send(tx: &mpsc::Sender<OutboundEvent>, event: OutboundEvent) {
    if tx.send(event).await.is_err() {
        debug!("relay receiver dropped, discarding event");
    }
}
