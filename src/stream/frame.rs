/// Prefix of an event-data line.
pub const DATA_PREFIX: &str = "data: ";

/// Payload the server sends as its last frame.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A chunk of generated text.
    Text(String),
    /// Normal completion.
    Done,
}

/// Incremental decoder for `data: ` framed text streams.
///
/// Lines are split on raw `\n` bytes, which never occur inside a multi-byte UTF-8
/// sequence, so a character split across two network reads is simply carried over
/// with the rest of its line.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the current, not yet terminated line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feed one chunk, returning every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        if chunk.is_empty() {
            return Vec::new();
        }

        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete
            .split(|b| *b == b'\n')
            .filter_map(decode_line)
            .collect()
    }

    /// End of stream: treat whatever is buffered as a final line.
    ///
    /// No delimiter is synthesized and an unterminated tail is not an error here; the
    /// caller decides what a missing sentinel means.
    pub fn finish(&mut self) -> Vec<Frame> {
        let tail = std::mem::take(&mut self.pending);
        decode_line(&tail).into_iter().collect()
    }
}

fn decode_line(raw: &[u8]) -> Option<Frame> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = String::from_utf8_lossy(raw);
    let payload = line.strip_prefix(DATA_PREFIX)?;

    if payload == DONE_SENTINEL {
        return Some(Frame::Done);
    }

    // Payloads are JSON string literals; anything else (the server emits a few bare
    // messages) is shown as-is rather than dropped.
    let text = serde_json::from_str::<String>(payload).unwrap_or_else(|_| payload.to_string());
    Some(Frame::Text(text))
}
