/// An immutable snapshot of document text at one version.
///
/// Line starts are computed once so line lookups are O(log n). Every applied
/// edit batch produces a new `Document` with a higher version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    text: String,
    version: i32,
    line_starts: Vec<usize>,
}

impl Document {
    /// Create a new document at version 0
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_version(text, 0)
    }

    /// Create a new document with version
    pub fn with_version(text: impl Into<String>, version: i32) -> Self {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        Self {
            text,
            version,
            line_starts,
        }
    }

    /// Get the text content
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Get the text content as owned String
    pub fn into_text(self) -> String {
        self.text
    }

    /// Get the document version
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Get the length in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if the document is empty
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of lines; an empty document and a trailing newline both count a final empty line
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset where `line` (0-indexed) starts
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Byte length of `line` (0-indexed), excluding its `\n`; 0 for lines past the end
    pub fn line_length(&self, line: usize) -> usize {
        let Some(start) = self.line_start(line) else {
            return 0;
        };
        self.line_end(line) - start
    }

    /// Text of `line` (0-indexed) without its `\n`
    pub fn line(&self, line: usize) -> Option<&str> {
        let start = self.line_start(line)?;
        Some(&self.text[start..self.line_end(line)])
    }

    fn line_end(&self, line: usize) -> usize {
        match self.line_starts.get(line + 1) {
            Some(next) => next - 1,
            None => self.text.len(),
        }
    }
}

/// Compute line start offsets for efficient position mapping
pub fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut line_starts = vec![0];
    line_starts.extend(
        text.bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n')
            .map(|(i, _)| i + 1),
    );
    line_starts
}
