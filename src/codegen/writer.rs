//! Line-exact string builder for a validation batch.
//!
//! Diagnostics are attributed by line, so every fragment must occupy exactly
//! one line of the batch.

/// Accumulates generated fragments, one per line.
pub struct SourceWriter {
    buf: String,
    lines: usize,
}

impl SourceWriter {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(4096),
            lines: 0,
        }
    }

    /// Write one fragment as a complete line. Embedded line breaks are
    /// collapsed to spaces so the fragment cannot spill onto a second line.
    pub fn line(&mut self, text: &str) {
        push_single_line(&mut self.buf, text);
        self.buf.push('\n');
        self.lines += 1;
    }

    /// Number of lines written so far; also the zero-based line the next
    /// fragment lands on.
    pub fn line_count(&self) -> usize {
        self.lines
    }

    /// Consume the writer and return the batch source.
    pub fn finish(self) -> String {
        self.buf
    }
}

impl Default for SourceWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy `text` into `buf`, replacing `\r\n`, `\r` and `\n` with one space each.
/// Every other character keeps its column.
pub fn push_single_line(buf: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                buf.push(' ');
            }
            '\n' => buf.push(' '),
            c => buf.push(c),
        }
    }
}
