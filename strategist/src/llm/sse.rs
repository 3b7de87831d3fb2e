//! Incremental splitter for `text/event-stream` bodies.
//!
//! Network chunks can end anywhere, including inside a multi-byte character, so
//! bytes are buffered until a full line is available and only then decoded.

/// Collects `data:` payloads from an SSE byte stream.
///
/// Multi-line `data:` fields of one event are joined with `\n`; an event is
/// complete at the blank line that ends it (or at [`finish`](Self::finish)).
#[derive(Debug, Default)]
pub struct SseBuffer {
    pending: Vec<u8>,
    data: Option<String>,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes; returns payloads of every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            self.line(line, &mut events);
        }
        events
    }

    /// Flushes the trailing event when the body ends without a blank line.
    pub fn finish(mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.line(line.trim_end_matches('\r'), &mut events);
        }
        if let Some(data) = self.data.take() {
            events.push(data);
        }
        events
    }

    fn line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            if let Some(data) = self.data.take() {
                events.push(data);
            }
            return;
        }
        let Some(value) = line.strip_prefix("data:") else {
            // comments, `event:`, `id:`, `retry:` carry nothing we use
            return;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match &mut self.data {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => self.data = Some(value.to_string()),
        }
    }
}
