//! The savable-comment buffer.
//!
//! Developer comments immediately preceding a translation call are worth
//! carrying into the catalogue (they become `#.` lines in the PO file).
//! While tokenising, every comment line is saved into a [`CommentBuffer`];
//! when a string literal is tokenised, the buffer is snapshotted onto the
//! token. A line carrying non-comment tokens between the comments and the
//! call empties the buffer, so only comments with nothing but blank lines
//! between themselves and the call survive.
//!
//! Snapshots are reference-counted and immutable: the live buffer keeps
//! evolving after a snapshot is taken, but tokens that already hold one are
//! unaffected.

use std::rc::Rc;

/// Shared, immutable view of the comment lines saved so far.
pub type CommentSnapshot = Rc<[String]>;

#[derive(Debug, Default)]
pub struct CommentBuffer {
    lines: Vec<String>,
    /// Cached snapshot, invalidated whenever `lines` changes.
    snapshot: Option<CommentSnapshot>,
    last_comment_line: usize,
    last_token_line: usize,
}

impl CommentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save one comment line, stripping surrounding ASCII whitespace.
    pub fn save_line(&mut self, line: usize, text: &str) {
        self.lines.push(trim_ascii(text).to_string());
        self.snapshot = None;
        self.last_comment_line = line;
    }

    /// Save a block comment, splitting it on its internal newlines. Each
    /// inner line is stripped independently.
    pub fn save_block(&mut self, last_line: usize, text: &str) {
        for part in text.split('\n') {
            self.lines.push(trim_ascii(part).to_string());
        }
        self.snapshot = None;
        self.last_comment_line = last_line;
    }

    /// Record the line of the most recent non-comment token.
    pub fn set_last_token_line(&mut self, line: usize) {
        self.last_token_line = line;
    }

    /// Called when the tokeniser consumes a newline: if a non-comment token
    /// appeared after the last saved comment, the buffer contents no longer
    /// precede anything and are dropped.
    pub fn observe_newline(&mut self) {
        if self.last_token_line > self.last_comment_line {
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.lines.clear();
        self.snapshot = None;
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Take a shared snapshot of the current contents. Repeated calls
    /// without intervening changes return the same allocation.
    pub fn snapshot(&mut self) -> Option<CommentSnapshot> {
        if self.lines.is_empty() {
            return None;
        }
        Some(
            self.snapshot
                .get_or_insert_with(|| Rc::from(self.lines.as_slice()))
                .clone(),
        )
    }
}

fn trim_ascii(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_ascii_whitespace())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn lines(snapshot: &CommentSnapshot) -> Vec<&str> {
        snapshot.iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn test_save_and_snapshot() {
        let mut buffer = CommentBuffer::new();
        buffer.save_line(1, "  TRANSLATORS: greeting  ");
        let snap = buffer.snapshot().unwrap();
        assert_eq!(lines(&snap), vec!["TRANSLATORS: greeting"]);
    }

    #[test]
    fn test_block_split_and_stripped() {
        let mut buffer = CommentBuffer::new();
        buffer.save_block(3, " first line \n\tsecond line\t");
        let snap = buffer.snapshot().unwrap();
        assert_eq!(lines(&snap), vec!["first line", "second line"]);
    }

    #[test]
    fn test_snapshot_is_immutable() {
        let mut buffer = CommentBuffer::new();
        buffer.save_line(1, "one");
        let snap = buffer.snapshot().unwrap();
        buffer.save_line(2, "two");
        assert_eq!(lines(&snap), vec!["one"]);
        let snap2 = buffer.snapshot().unwrap();
        assert_eq!(lines(&snap2), vec!["one", "two"]);
    }

    #[test]
    fn test_snapshot_cached_until_changed() {
        let mut buffer = CommentBuffer::new();
        buffer.save_line(1, "one");
        let a = buffer.snapshot().unwrap();
        let b = buffer.snapshot().unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_newline_after_code_resets() {
        let mut buffer = CommentBuffer::new();
        buffer.save_line(1, "stale comment");
        buffer.set_last_token_line(2); // code on line 2
        buffer.observe_newline();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_newline_between_comments_keeps_buffer() {
        let mut buffer = CommentBuffer::new();
        buffer.set_last_token_line(1); // code on line 1
        buffer.save_line(2, "comment directly above the call");
        buffer.observe_newline();
        assert!(!buffer.is_empty());
    }
}
