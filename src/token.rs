//! Shared string-token payload.
//!
//! Each tokeniser has its own token enum (the token sets genuinely differ:
//! Perl has fat commas and sigil variables, C does not), but the payload of
//! a string literal is the same everywhere and is what the argument-list
//! parser consumes.

use crate::comments::CommentSnapshot;

/// The sub-kind of a string literal, as the tokeniser saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// No escape processing at all (raw strings, single-quoted Perl/Python).
    Verbatim,
    /// Escapes processed, no interpolation (C strings, Python `"…"`).
    Escaped,
    /// Escapes processed and variables may be interpolated (Perl `"…"`).
    Interpolatable,
    /// Here-document body.
    HereDoc,
    /// One element of a `qw(…)` word list.
    WordList,
}

/// A string literal as it leaves a tokeniser: decoded value, provenance,
/// and the comment lines that were live when it was scanned.
#[derive(Debug, Clone)]
pub struct TokenString {
    pub value: String,
    pub kind: StringKind,
    /// 1-based line of the opening delimiter.
    pub line: usize,
    /// Snapshot of the savable-comment buffer, taken at tokenisation time.
    pub comments: Option<CommentSnapshot>,
    /// True when the literal contained interpolated pieces whose runtime
    /// value is unknown. Such a string can still mark an argument position
    /// as "string-valued" but its text cannot be trusted as a msgid.
    pub interpolated: bool,
}

impl TokenString {
    pub fn new(value: impl Into<String>, kind: StringKind, line: usize) -> Self {
        Self {
            value: value.into(),
            kind,
            line,
            comments: None,
            interpolated: false,
        }
    }

    pub fn with_comments(mut self, comments: Option<CommentSnapshot>) -> Self {
        self.comments = comments;
        self
    }

    pub fn mark_interpolated(mut self) -> Self {
        self.interpolated = true;
        self
    }

    /// Fold another literal onto this one (concatenation in the source).
    /// The receiver keeps its own position and comment snapshot; only the
    /// text grows, and interpolation taints propagate.
    pub fn append(&mut self, other: &TokenString) {
        self.value.push_str(&other.value);
        self.interpolated |= other.interpolated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_position() {
        let mut first = TokenString::new("hello, ", StringKind::Escaped, 2);
        let second = TokenString::new("world", StringKind::Escaped, 3);
        first.append(&second);
        assert_eq!(first.value, "hello, world");
        assert_eq!(first.line, 2);
        assert!(!first.interpolated);
    }

    #[test]
    fn test_append_propagates_interpolation() {
        let mut first = TokenString::new("a", StringKind::Interpolatable, 1);
        let second = TokenString::new("b", StringKind::Interpolatable, 1).mark_interpolated();
        first.append(&second);
        assert!(first.interpolated);
    }
}
