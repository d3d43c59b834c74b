//! Reqwest implementation of [`RunTransport`].

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt as _;
use futures::stream;
use tracing::debug;

use crate::error::UpstreamError;
use crate::transport::{DeltaStream, RunTransport, SseDecoder, delta_from_frame};
use crate::types::{Run, RunHandle, RunRequest};

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Configuration for the upstream platform client.
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    /// API key used for bearer auth.
    pub api_key: String,
    /// Base URL of the platform API.
    ///
    /// Useful for proxies or local test servers.
    pub base_url: String,
    /// Default HTTP timeout for unary requests. Streaming requests are
    /// exempt; runs routinely outlive any sane request timeout.
    pub timeout: Duration,
}

impl UpstreamConfig {
    /// Creates a config with platform defaults and a provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.subconscious.dev/v1".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Builds a config from `SUBCONSCIOUS_API_KEY`.
    pub fn from_env() -> Result<Self, UpstreamError> {
        let api_key = std::env::var("SUBCONSCIOUS_API_KEY").unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(UpstreamError::protocol(
                "missing SUBCONSCIOUS_API_KEY for upstream client",
            ));
        }
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("SUBCONSCIOUS_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url;
        }
        Ok(config)
    }

    /// Overrides the API base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the default HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn runs_url(&self) -> String {
        format!("{}/runs", self.base_url.trim_end_matches('/'))
    }

    fn run_url(&self, run_id: &str) -> String {
        format!("{}/{run_id}", self.runs_url())
    }
}

/// HTTP client for the run platform.
pub struct UpstreamClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    /// Creates a client from explicit configuration.
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        if config.api_key.trim().is_empty() {
            return Err(UpstreamError::protocol(
                "upstream config api_key must not be empty",
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::protocol(format!("failed to build http client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Creates a client from `SUBCONSCIOUS_API_KEY` / `SUBCONSCIOUS_BASE_URL`.
    pub fn from_env() -> Result<Self, UpstreamError> {
        Self::new(UpstreamConfig::from_env()?)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(UpstreamError::from_api_failure(status.as_u16(), body))
    }
}

#[async_trait]
impl RunTransport for UpstreamClient {
    async fn submit(&self, request: &RunRequest) -> Result<RunHandle, UpstreamError> {
        debug!(engine = %request.engine, "submitting run");
        let response = self
            .http
            .post(self.config.runs_url())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("run submission failed: {e}")))?;
        let response = Self::check_status(response).await?;
        response
            .json::<RunHandle>()
            .await
            .map_err(|e| UpstreamError::protocol(format!("invalid submission response: {e}")))
    }

    async fn open_stream(&self, handle: &RunHandle) -> Result<DeltaStream, UpstreamError> {
        debug!(run_id = %handle.run_id, "opening delta stream");
        let response = self
            .http
            .get(format!("{}/stream", self.config.run_url(&handle.run_id)))
            .bearer_auth(&self.config.api_key)
            // The stream stays open for the run's full duration.
            .timeout(Duration::from_secs(60 * 60))
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("stream request failed: {e}")))?;
        let response = Self::check_status(response).await?;
        Ok(decode_stream(Box::pin(response.bytes_stream())))
    }

    async fn poll(&self, run_id: &str) -> Result<Run, UpstreamError> {
        let response = self
            .http
            .get(self.config.run_url(run_id))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("run poll failed: {e}")))?;
        let response = Self::check_status(response).await?;
        response
            .json::<Run>()
            .await
            .map_err(|e| UpstreamError::protocol(format!("invalid run snapshot: {e}")))
    }

    async fn cancel(&self, run_id: &str) -> Result<(), UpstreamError> {
        debug!(%run_id, "requesting upstream cancel");
        let response = self
            .http
            .post(format!("{}/cancel", self.config.run_url(run_id)))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("cancel request failed: {e}")))?;
        Self::check_status(response).await.map(|_| ())
    }
}

fn decode_stream(bytes: ByteStream) -> DeltaStream {
    struct DecodeState {
        bytes: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<RawDeltaItem>,
        done: bool,
    }
    type RawDeltaItem = Result<crate::types::RawDelta, UpstreamError>;

    let state = DecodeState {
        bytes,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };
    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for frame in state.decoder.push_chunk(&chunk) {
                        if let Some(delta) = delta_from_frame(&frame) {
                            state.pending.push_back(Ok(delta));
                        }
                    }
                }
                Some(Err(error)) => {
                    state.done = true;
                    state.pending.push_back(Err(UpstreamError::transport(format!(
                        "streaming read failed: {error}"
                    ))));
                }
                None => state.done = true,
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_point_at_platform() {
        let config = UpstreamConfig::new("key");
        assert_eq!(config.base_url, "https://api.subconscious.dev/v1");
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn config_url_helpers_trim_trailing_slash() {
        let config = UpstreamConfig::new("key").base_url("http://localhost:9000/v1/");
        assert_eq!(config.runs_url(), "http://localhost:9000/v1/runs");
        assert_eq!(config.run_url("r1"), "http://localhost:9000/v1/runs/r1");
    }

    #[test]
    fn client_rejects_empty_api_key() {
        let result = UpstreamClient::new(UpstreamConfig::new("  "));
        assert!(matches!(result, Err(UpstreamError::Protocol { .. })));
    }
}
