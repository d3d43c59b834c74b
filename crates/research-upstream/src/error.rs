//! Error taxonomy for upstream calls.
//!
//! The split matters to the relay: only the warmup class is ever retried.
//! Research engines cold-start on first use, and the platform reports that
//! as 429/502/503 or as messages mentioning warmup/termination.

/// Errors returned by upstream transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// The submission itself was rejected (bad request, auth, unknown
    /// engine). Never retried.
    #[error("submission rejected: {message}")]
    Submission {
        message: String,
        status_code: Option<u16>,
    },
    /// The engine is still warming up. Transient; retried with backoff.
    #[error("engine warming up: {message}")]
    Warmup { message: String },
    /// Network or stream I/O failed.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The response shape violated the platform protocol.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl UpstreamError {
    /// Creates a submission error.
    pub fn submission(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Submission {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a warmup error.
    pub fn warmup(message: impl Into<String>) -> Self {
        Self::Warmup {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Classifies a failed HTTP exchange with the platform.
    ///
    /// 429/502/503 are how the platform reports an engine that is not ready
    /// yet; everything else is a hard submission failure.
    pub fn from_api_failure(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        if matches!(status, 429 | 502 | 503) || transient_message(&message) {
            Self::Warmup {
                message: format!("status {status}: {message}"),
            }
        } else {
            Self::Submission {
                message: format!("status {status}: {message}"),
                status_code: Some(status),
            }
        }
    }

    /// Whether the relay's warmup controller may retry this failure.
    pub fn is_warmup(&self) -> bool {
        match self {
            Self::Warmup { .. } => true,
            Self::Transport { message } => transient_message(message),
            _ => false,
        }
    }
}

/// Heuristic for transient failure text seen from warming engines: the
/// platform reports cold starts as terminated streams, connection drops, or
/// explicit warmup notices.
pub fn transient_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["terminated", "warming", "timeout", "connection"]
        .iter()
        .any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warmup_statuses_are_retryable() {
        for status in [429, 502, 503] {
            let err = UpstreamError::from_api_failure(status, "engine not ready");
            assert!(err.is_warmup(), "status {status} should classify as warmup");
        }
    }

    #[test]
    fn bad_request_is_fatal_submission_error() {
        let err = UpstreamError::from_api_failure(400, "invalid engine");
        assert!(!err.is_warmup());
        assert!(matches!(
            err,
            UpstreamError::Submission {
                status_code: Some(400),
                ..
            }
        ));
    }

    #[test]
    fn terminated_transport_counts_as_warmup() {
        let err = UpstreamError::transport("stream terminated by remote");
        assert!(err.is_warmup());
        let err = UpstreamError::transport("tls handshake rejected");
        assert!(!err.is_warmup());
    }

    #[test]
    fn transient_message_matches_known_phrases() {
        assert!(transient_message("Engine is WARMING up"));
        assert!(transient_message("read timeout after 30s"));
        assert!(!transient_message("quota exceeded"));
    }
}
