//! Server-Sent-Events decoding
//!
//! Implements the `text/event-stream` line protocol:
//!
//! ```text
//! : comment
//! event: message
//! id: 42
//! retry: 3000
//! data: {"tweet": "first line"
//! data: , "more": true}
//! <blank line dispatches>
//! ```
//!
//! Lines end in `\n`, `\r\n` or `\r`; a `\r\n` split across two chunks is
//! handled. Multiple `data:` lines are joined with `\n`. An incomplete frame
//! at end of stream is discarded.
//!
//! Buffered bytes (current line plus pending data) are capped at
//! `max_frame_size`. A frame that grows past it is dropped whole and the
//! decoder skips input until the next blank line.

use std::time::Duration;

use chirp_config::DEFAULT_MAX_FRAME_SIZE;
use chirp_protocol::Event;

use crate::error::Result;

#[cfg(test)]
#[path = "sse_test.rs"]
mod tests;

/// Default SSE event type
pub const MESSAGE_EVENT: &str = "message";

/// One dispatched SSE frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event type (`message` unless an `event:` field was given)
    pub event: String,
    /// Joined `data:` lines
    pub data: String,
    /// Last event ID seen on the stream at dispatch time
    pub id: Option<String>,
}

impl SseFrame {
    /// Check if this is a default `message` frame
    #[inline]
    pub fn is_message(&self) -> bool {
        self.event == MESSAGE_EVENT
    }
}

/// Incremental SSE decoder
#[derive(Debug)]
pub struct SseDecoder {
    line: Vec<u8>,
    /// Previous chunk ended in `\r`; swallow a leading `\n`
    skip_lf: bool,
    started: bool,
    data: String,
    event: String,
    last_event_id: Option<String>,
    retry: Option<Duration>,
    max_frame_size: usize,
    /// Dropping an oversized frame until the next blank line
    discarding: bool,
    /// The current line had bytes while discarding
    discarded_line: bool,
    oversized: u64,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self {
            line: Vec::new(),
            skip_lf: false,
            started: false,
            data: String::new(),
            event: String::new(),
            last_event_id: None,
            retry: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            discarding: false,
            discarded_line: false,
            oversized: 0,
        }
    }
}

impl SseDecoder {
    /// Create a decoder at the start of a stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the bytes buffered for one frame
    pub fn with_max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max.max(1);
        self
    }

    /// Create a decoder resuming after a known event ID
    pub fn with_last_event_id(id: Option<String>) -> Self {
        Self {
            last_event_id: id,
            ..Self::default()
        }
    }

    /// Feed a chunk, returning every frame it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        let mut rest = chunk;

        while let Some((&first, tail)) = rest.split_first() {
            if self.skip_lf {
                self.skip_lf = false;
                if first == b'\n' {
                    rest = tail;
                    continue;
                }
            }

            match rest.iter().position(|b| matches!(b, b'\n' | b'\r')) {
                Some(pos) => {
                    self.append(&rest[..pos]);
                    self.skip_lf = rest[pos] == b'\r';
                    self.end_line(&mut frames);
                    rest = &rest[pos + 1..];
                }
                None => {
                    self.append(rest);
                    break;
                }
            }
        }

        frames
    }

    /// Last `id:` seen on the stream
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Take the reconnection delay announced by the server, if any
    pub fn take_retry(&mut self) -> Option<Duration> {
        self.retry.take()
    }

    /// Take the number of frames dropped for exceeding `max_frame_size`
    pub fn take_oversized(&mut self) -> u64 {
        std::mem::take(&mut self.oversized)
    }

    fn append(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if self.discarding {
            self.discarded_line = true;
            return;
        }
        if self.line.len() + self.data.len() + bytes.len() > self.max_frame_size {
            self.discard();
            self.discarded_line = true;
            return;
        }
        self.line.extend_from_slice(bytes);
    }

    /// Drop the partial frame and skip to the next blank line
    fn discard(&mut self) {
        self.line = Vec::new();
        self.data = String::new();
        self.event.clear();
        self.discarding = true;
        self.oversized += 1;
    }

    fn end_line(&mut self, frames: &mut Vec<SseFrame>) {
        if self.discarding {
            let blank = !std::mem::take(&mut self.discarded_line);
            if blank {
                self.discarding = false;
            }
            return;
        }

        let raw = std::mem::take(&mut self.line);
        let mut line = String::from_utf8_lossy(&raw).into_owned();

        if !self.started {
            self.started = true;
            if let Some(stripped) = line.strip_prefix('\u{feff}') {
                line = stripped.to_string();
            }
        }

        self.process_line(&line, frames);
    }

    fn process_line(&mut self, line: &str, frames: &mut Vec<SseFrame>) {
        if line.is_empty() {
            self.dispatch(frames);
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                if self.data.len() + value.len() + 1 > self.max_frame_size {
                    self.discard();
                    return;
                }
                self.data.push_str(value);
                self.data.push('\n');
            }
            "event" => self.event = value.to_string(),
            "id" if !value.contains('\0') => {
                self.last_event_id = (!value.is_empty()).then(|| value.to_string());
            }
            "retry" => {
                if !value.is_empty()
                    && value.bytes().all(|b| b.is_ascii_digit())
                    && let Ok(millis) = value.parse::<u64>()
                {
                    self.retry = Some(Duration::from_millis(millis));
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, frames: &mut Vec<SseFrame>) {
        let event = std::mem::take(&mut self.event);
        if self.data.is_empty() {
            return;
        }

        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }

        frames.push(SseFrame {
            event: if event.is_empty() {
                MESSAGE_EVENT.to_string()
            } else {
                event
            },
            data,
            id: self.last_event_id.clone(),
        });
    }
}

/// Decode a frame's data into an event
///
/// The payload must be JSON; its shape is not checked.
pub fn decode_event(frame: &SseFrame) -> Result<Event> {
    Ok(Event::from_json(frame.data.as_str())?)
}
