//! Server-sent event decoding for streamed chat completions.
//!
//! Only `data:` lines matter here. Each payload is parsed as JSON and kept in
//! arrival order until `[DONE]` or the end of the body. Payloads that are not
//! valid JSON are dropped so a single bad event cannot sink the whole stream.

use futures_util::StreamExt;
use memchr::memchr;
use serde_json::Value;
use tracing::debug;

use crate::core::exchange::ExchangeError;

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        self.drain_lines(false)
    }

    pub fn finish(&mut self) -> Vec<String> {
        self.drain_lines(true)
    }

    fn drain_lines(&mut self, flush: bool) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;

        while let Some(relative_pos) = memchr(b'\n', &self.buffer[start..]) {
            let newline_index = start + relative_pos;
            match std::str::from_utf8(&self.buffer[start..newline_index]) {
                Ok(text) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        lines.push(trimmed.to_string());
                    }
                }
                Err(e) => debug!("Invalid UTF-8 in stream: {e}"),
            }
            start = newline_index + 1;
        }

        if flush {
            if let Ok(text) = std::str::from_utf8(&self.buffer[start..]) {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
            self.buffer.clear();
        } else if start > 0 {
            self.buffer.drain(..start);
        }

        lines
    }
}

pub fn sse_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

/// Accumulates decoded chunks across network reads.
#[derive(Default)]
pub struct ChunkCollector {
    lines: SseLineBuffer,
    chunks: Vec<Value>,
    done: bool,
}

impl ChunkCollector {
    /// Feed raw bytes; returns true once `[DONE]` has been seen.
    pub fn push(&mut self, bytes: &[u8]) -> bool {
        let lines = self.lines.push(bytes);
        self.absorb(lines)
    }

    pub fn finish(&mut self) {
        let lines = self.lines.finish();
        self.absorb(lines);
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn into_chunks(self) -> Vec<Value> {
        self.chunks
    }

    fn absorb(&mut self, lines: Vec<String>) -> bool {
        for line in lines {
            if self.done {
                break;
            }
            let Some(payload) = sse_data_payload(&line) else {
                continue;
            };
            if payload == DONE_SENTINEL {
                self.done = true;
                break;
            }
            if payload.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(payload) {
                Ok(chunk) => self.chunks.push(chunk),
                Err(err) => debug!(error = %err, "Dropping malformed stream event"),
            }
        }
        self.done
    }
}

/// Decode a complete event-stream body held in memory.
pub fn parse_event_stream(body: &str) -> Vec<Value> {
    let mut collector = ChunkCollector::default();
    if !collector.push(body.as_bytes()) {
        collector.finish();
    }
    collector.into_chunks()
}

pub async fn collect_stream_chunks(
    response: reqwest::Response,
) -> Result<Vec<Value>, ExchangeError> {
    let mut stream = response.bytes_stream();
    let mut collector = ChunkCollector::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if collector.push(&chunk) {
            return Ok(collector.into_chunks());
        }
    }

    collector.finish();
    debug!(done = collector.is_done(), "Event stream closed by server");
    Ok(collector.into_chunks())
}

/// True when a streamed chunk's first choice carries a tool-call fragment.
pub fn chunk_has_tool_call_delta(chunk: &Value) -> bool {
    chunk
        .pointer("/choices/0/delta/tool_calls")
        .is_some_and(|delta| !delta.is_null())
}
