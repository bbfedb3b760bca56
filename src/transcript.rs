/// Ordered, append-only cumulative transcript for one session.
///
/// Chunks arrive strictly in index order, so a plain string append preserves
/// ordering without any reorder buffer.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    text: String,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one chunk's recognized text. The first non-empty text sets the
    /// transcript; later ones are joined with a newline. Empty text leaves
    /// the transcript untouched: no blank line, no duplicate separator.
    pub fn push(&mut self, chunk_text: &str) {
        if chunk_text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(chunk_text);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
