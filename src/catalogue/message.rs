//! The message data model.
//!
//! A [`Message`] is one deduplicated catalogue entry, keyed by its optional
//! context and its msgid. It accumulates source positions and extracted
//! comments across call sites, and carries a per-format-language
//! classification that downstream PO writers turn into `c-format` /
//! `no-c-format` style flags.

use std::fmt;

use crate::comments::CommentSnapshot;
use crate::flags::{FormatLanguage, N_FORMAT_LANGUAGES};

/// A source position contributing to a message.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MessagePosition {
    pub file: String,
    /// Line number (1-indexed).
    pub line: usize,
}

impl MessagePosition {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for MessagePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Whether a message is a format string of some language.
///
/// `Undecided` is the initial state. A validator that finds plausible
/// directives upgrades it to `Possible`; a call-site promise (the string
/// sits in a `printf`-like argument) decides `Yes` or `No` outright.
/// `Yes` is sticky across call sites; `Yes` meeting `No` is a conflict the
/// catalogue reports as an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatClassification {
    #[default]
    Undecided,
    Possible,
    Yes,
    No,
}

impl fmt::Display for FormatClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FormatClassification::Undecided => "undecided",
            FormatClassification::Possible => "possible",
            FormatClassification::Yes => "yes",
            FormatClassification::No => "no",
        };
        write!(f, "{}", text)
    }
}

/// The deduplication key of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageKey {
    pub msgctxt: Option<String>,
    pub msgid: String,
}

impl MessageKey {
    pub fn new(msgctxt: Option<String>, msgid: impl Into<String>) -> Self {
        Self {
            msgctxt,
            msgid: msgid.into(),
        }
    }

    /// The header entry's key: empty msgid, no context.
    pub fn header() -> Self {
        Self {
            msgctxt: None,
            msgid: String::new(),
        }
    }

    pub fn is_header(&self) -> bool {
        self.msgctxt.is_none() && self.msgid.is_empty()
    }
}

/// One catalogue entry.
#[derive(Debug, Clone)]
pub struct Message {
    pub key: MessageKey,
    pub msgid_plural: Option<String>,
    /// The translation template (never a real translation in this tool).
    pub msgstr: String,
    /// Source positions, in the order first observed.
    pub positions: Vec<MessagePosition>,
    /// Translator comments (`#` lines); only the header entry uses these.
    pub translator_comments: Vec<String>,
    /// Extracted comments (`#.` lines), in the order first observed.
    pub comments: Vec<String>,
    formats: [FormatClassification; N_FORMAT_LANGUAGES],
    pub fuzzy: bool,
    pub obsolete: bool,
    pub wrap: bool,
}

impl Message {
    pub fn new(key: MessageKey) -> Self {
        Self {
            key,
            msgid_plural: None,
            msgstr: String::new(),
            positions: Vec::new(),
            translator_comments: Vec::new(),
            comments: Vec::new(),
            formats: [FormatClassification::Undecided; N_FORMAT_LANGUAGES],
            fuzzy: false,
            obsolete: false,
            wrap: true,
        }
    }

    pub fn msgid(&self) -> &str {
        &self.key.msgid
    }

    pub fn msgctxt(&self) -> Option<&str> {
        self.key.msgctxt.as_deref()
    }

    pub fn format(&self, language: FormatLanguage) -> FormatClassification {
        self.formats[language.index()]
    }

    pub fn set_format(&mut self, language: FormatLanguage, classification: FormatClassification) {
        self.formats[language.index()] = classification;
    }

    /// Add a source position unless that exact position is already present.
    pub fn add_position(&mut self, position: MessagePosition) {
        if !self.positions.contains(&position) {
            self.positions.push(position);
        }
    }

    /// Append comment lines. Whether an observation's comments belong on
    /// this message at all is decided per call site by the catalogue; a
    /// site that was admitted contributes its block verbatim, even when
    /// another site happened to carry the same text.
    pub fn add_comments(&mut self, snapshot: &CommentSnapshot) {
        for line in snapshot.iter() {
            self.add_comment_line(line);
        }
    }

    pub fn add_comment_line(&mut self, line: &str) {
        self.comments.push(line.to_string());
    }

    /// Whether `position` is already recorded on this message. Used to
    /// recognise a repeated observation of the same call site.
    pub fn has_position(&self, position: &MessagePosition) -> bool {
        self.positions.contains(position)
    }
}
