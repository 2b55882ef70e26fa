//! Line framing for the streamed response body
//!
//! The backend writes one event per line, each prefixed with `data: `.
//! Chunks coming off the socket do not respect line or code point
//! boundaries, so [`FrameDecoder`] carries both a partial UTF-8 sequence
//! and a partial line between calls to [`FrameDecoder::push`].

/// Prefix that marks a line as carrying an event payload.
pub const DATA_PREFIX: &str = "data: ";

/// One `data: ` line of the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    raw: String,
}

impl Frame {
    /// Build a frame from a complete line. Returns `None` for lines
    /// without the data prefix (blank keep-alives, comments, other fields).
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with(DATA_PREFIX) {
            Some(Self {
                raw: line.to_string(),
            })
        } else {
            None
        }
    }

    /// The full line, prefix included
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The line content after the `data: ` prefix
    pub fn payload(&self) -> &str {
        &self.raw[DATA_PREFIX.len()..]
    }
}

/// Incremental decoder from body chunks to frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes of an incomplete UTF-8 sequence at the end of the last chunk
    pending_bytes: Vec<u8>,
    /// Decoded text after the last newline seen
    pending_line: String,
}

impl FrameDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let text = self.decode_utf8(chunk);
        self.pending_line.push_str(&text);
        self.drain_lines()
    }

    /// Flush at end of stream.
    ///
    /// An incomplete UTF-8 sequence becomes U+FFFD. A final line that was
    /// never newline-terminated is still a frame if it carries the prefix.
    pub fn finish(&mut self) -> Vec<Frame> {
        if !self.pending_bytes.is_empty() {
            self.pending_bytes.clear();
            self.pending_line.push(char::REPLACEMENT_CHARACTER);
        }
        let mut frames = self.drain_lines();
        let tail = std::mem::take(&mut self.pending_line);
        if let Some(frame) = Frame::from_line(&tail) {
            frames.push(frame);
        }
        frames
    }

    /// Whether the decoder holds buffered input that has not formed a frame yet
    pub fn has_pending(&self) -> bool {
        !self.pending_bytes.is_empty() || !self.pending_line.is_empty()
    }

    fn drain_lines(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(pos) = self.pending_line.find('\n') {
            let line: String = self.pending_line.drain(..=pos).collect();
            if let Some(frame) = Frame::from_line(&line[..line.len() - 1]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Decode as much of `pending_bytes + chunk` as forms complete code points.
    /// Invalid sequences are replaced with U+FFFD; an incomplete sequence at
    /// the very end is kept for the next call.
    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending_bytes);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut offset = 0;
        while offset < bytes.len() {
            match std::str::from_utf8(&bytes[offset..]) {
                Ok(text) => {
                    out.push_str(text);
                    offset = bytes.len();
                }
                Err(e) => {
                    let valid_end = offset + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&bytes[offset..valid_end]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            offset = valid_end + len;
                        }
                        None => {
                            self.pending_bytes = bytes[valid_end..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}
