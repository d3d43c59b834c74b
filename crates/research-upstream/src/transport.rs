//! The `RunTransport` seam and SSE delta decoding.
//!
//! The platform streams deltas as server-sent events. The decoder below
//! reassembles frames across arbitrary chunk boundaries and maps each frame's
//! JSON payload to a [`RawDelta`]. Malformed frames are logged and dropped;
//! a single bad payload must never abort a running stream.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tracing::debug;

use crate::error::UpstreamError;
use crate::types::{RawDelta, Run, RunHandle, RunRequest};

/// Pull-based, finite, non-restartable stream of raw deltas for one run.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<RawDelta, UpstreamError>> + Send>>;

/// The four calls a run lifecycle is made of.
///
/// Every call is a network round trip; no state is retained between calls
/// beyond the handle. Implementations must keep `cancel` best-effort; it is
/// issued for runs that may already be terminal.
#[async_trait]
pub trait RunTransport: Send + Sync {
    /// Starts a run and returns its handle.
    async fn submit(&self, request: &RunRequest) -> Result<RunHandle, UpstreamError>;

    /// Opens the delta stream for a submitted run.
    async fn open_stream(&self, handle: &RunHandle) -> Result<DeltaStream, UpstreamError>;

    /// Fetches the current run snapshot, including the result once terminal.
    async fn poll(&self, run_id: &str) -> Result<Run, UpstreamError>;

    /// Requests cancellation of a run.
    async fn cancel(&self, run_id: &str) -> Result<(), UpstreamError>;
}

/// One reassembled SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE frame decoder.
///
/// Bytes arrive in transport-sized chunks that do not respect frame
/// boundaries; the decoder buffers until a blank-line delimiter completes a
/// frame.
#[derive(Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    /// Feeds a chunk and returns every frame it completed.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((end, delimiter_len)) = next_frame_boundary(&self.buf) {
            let frame_bytes = self.buf[..end].to_vec();
            self.buf.drain(..end + delimiter_len);
            if let Some(frame) = parse_frame(&frame_bytes) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn next_frame_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len() && &buf[i..i + 4] == b"\r\n\r\n" {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_frame(bytes: &[u8]) -> Option<SseFrame> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut event = None;
    let mut data_lines = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim_start().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim_start().to_string());
        }
    }
    if event.is_none() && data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}

/// Maps one SSE frame to a delta.
///
/// Returns `None` for keep-alive frames, the `[DONE]` sentinel, and malformed
/// JSON (dropped, per protocol: the stream outlives bad payloads). An
/// unrecognized event type still yields a content-less delta so downstream
/// counters advance.
pub fn delta_from_frame(frame: &SseFrame) -> Option<RawDelta> {
    let data = frame.data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(error) => {
            debug!(%error, "dropping malformed delta frame");
            return None;
        }
    };
    let kind = value.get("type").and_then(|v| v.as_str()).unwrap_or("");
    match kind {
        "delta" => {
            let content = value
                .get("content")
                .map(|c| match c {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .filter(|c| !c.is_empty());
            Some(RawDelta::Content { content })
        }
        "done" => Some(RawDelta::Done {
            run_id: value
                .get("runId")
                .or_else(|| value.get("run_id"))
                .and_then(|v| v.as_str())
                .map(ToOwned::to_owned),
        }),
        "error" => {
            let message = value
                .get("error")
                .and_then(|v| v.as_str())
                .or_else(|| value.get("message").and_then(|v| v.as_str()))
                .unwrap_or("upstream stream error")
                .to_string();
            Some(RawDelta::Error { message })
        }
        _ => Some(RawDelta::Content { content: None }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_reassembles_frames_across_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        let first = b"data: {\"type\":\"delta\",\"content\":\"hel";
        let second = b"lo\"}\n\n";
        assert!(decoder.push_chunk(first).is_empty());
        let frames = decoder.push_chunk(second);
        assert_eq!(frames.len(), 1);
        assert_eq!(
            delta_from_frame(&frames[0]),
            Some(RawDelta::Content {
                content: Some("hello".into())
            })
        );
    }

    #[test]
    fn decoder_handles_crlf_delimiters_and_comments() {
        let mut decoder = SseDecoder::default();
        let frames =
            decoder.push_chunk(b": keep-alive\r\n\r\ndata: {\"type\":\"done\",\"runId\":\"r1\"}\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(
            delta_from_frame(&frames[0]),
            Some(RawDelta::Done {
                run_id: Some("r1".into())
            })
        );
    }

    #[test]
    fn done_sentinel_and_blank_data_are_skipped() {
        let frame = SseFrame {
            event: None,
            data: "[DONE]".into(),
        };
        assert_eq!(delta_from_frame(&frame), None);
        let frame = SseFrame {
            event: Some("message".into()),
            data: "   ".into(),
        };
        assert_eq!(delta_from_frame(&frame), None);
    }

    #[test]
    fn malformed_json_is_dropped_not_fatal() {
        let frame = SseFrame {
            event: None,
            data: "{not json".into(),
        };
        assert_eq!(delta_from_frame(&frame), None);
    }

    #[test]
    fn error_frame_prefers_error_field_over_message() {
        let frame = SseFrame {
            event: None,
            data: r#"{"type":"error","error":"engine terminated","message":"ignored"}"#.into(),
        };
        assert_eq!(
            delta_from_frame(&frame),
            Some(RawDelta::Error {
                message: "engine terminated".into()
            })
        );
    }

    #[test]
    fn unknown_event_type_becomes_contentless_delta() {
        let frame = SseFrame {
            event: None,
            data: r#"{"type":"usage","tokens":12}"#.into(),
        };
        assert_eq!(
            delta_from_frame(&frame),
            Some(RawDelta::Content { content: None })
        );
    }

    #[test]
    fn structured_delta_content_is_preserved_as_json_text() {
        let frame = SseFrame {
            event: None,
            data: r#"{"type":"delta","content":{"thought":"checking sources"}}"#.into(),
        };
        match delta_from_frame(&frame) {
            Some(RawDelta::Content { content: Some(c) }) => {
                assert!(c.contains("checking sources"));
            }
            other => panic!("unexpected delta: {other:?}"),
        }
    }
}
