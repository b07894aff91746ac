//! The deduplicating message catalogue.
//!
//! All extractors commit into a [`Catalogue`]. The catalogue enforces the
//! merge rules for messages observed at several call sites:
//!
//! - source positions are unioned, in first-observation order
//! - extracted comments are unioned per call site: a site's comment block
//!   is attached the first time that site is observed, and a repeated
//!   observation of the same site (the same position committing again,
//!   e.g. through a second matching call shape) adds nothing
//! - a plural form that disagrees with an earlier plural form is a hard
//!   error naming both locations; a site that omits the plural where
//!   another provided one degrades the message to singular with a warning
//! - format classifications merge monotonically: once `yes`, stays `yes`;
//!   `yes` meeting `no` is an error and the first classification wins
//!
//! A catalogue may carry an exclusion set (read from an existing PO file);
//! committing a key in that set silently drops the message.

use std::collections::{HashMap, HashSet};

use crate::catalogue::message::{FormatClassification, Message, MessageKey, MessagePosition};
use crate::comments::CommentSnapshot;
use crate::diagnostics::Diagnostics;
use crate::flags::{FORMAT_LANGUAGES, RegionRef};
use crate::formats::classify;

/// The default PO domain.
pub const DEFAULT_DOMAIN: &str = "messages";

/// How extracted comments are filtered on their way into the catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommentFilter {
    /// Do not attach comments at all (no `--add-comments`).
    #[default]
    Discard,
    /// Attach every comment preceding the call.
    All,
    /// Attach only comment blocks whose first line starts with the tag.
    Tagged(String),
}

impl CommentFilter {
    fn accept(&self, snapshot: &CommentSnapshot) -> bool {
        match self {
            CommentFilter::Discard => false,
            CommentFilter::All => true,
            CommentFilter::Tagged(tag) => snapshot
                .first()
                .is_some_and(|line| line.starts_with(tag.as_str())),
        }
    }
}

/// Commit-time configuration.
#[derive(Debug, Clone, Default)]
pub struct CommitSettings {
    pub msgstr_prefix: String,
    pub msgstr_suffix: String,
    pub comments: CommentFilter,
    pub no_wrap: bool,
}

impl CommitSettings {
    /// The msgstr template for one id: `prefix + id + suffix`, or empty
    /// when no template was configured.
    pub fn initial_msgstr_for(&self, msgid: &str) -> String {
        if self.msgstr_prefix.is_empty() && self.msgstr_suffix.is_empty() {
            String::new()
        } else {
            format!("{}{}{}", self.msgstr_prefix, msgid, self.msgstr_suffix)
        }
    }
}

/// Everything one call site contributes for one message.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub msgctxt: Option<String>,
    pub msgid: String,
    pub msgid_plural: Option<String>,
    pub position: MessagePosition,
    pub comments: Option<CommentSnapshot>,
    /// Extra comments carried by the matched keyword shape.
    pub extra_comments: Vec<String>,
    pub region: RegionRef,
}

#[derive(Debug, Default)]
pub struct Catalogue {
    domain: String,
    settings: CommitSettings,
    exclusions: HashSet<MessageKey>,
    index: HashMap<MessageKey, usize>,
    messages: Vec<Message>,
    header: Option<Message>,
}

impl Catalogue {
    pub fn new(settings: CommitSettings) -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            settings,
            ..Self::default()
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn settings(&self) -> &CommitSettings {
        &self.settings
    }

    pub fn set_domain(&mut self, domain: impl Into<String>) {
        self.domain = domain.into();
    }

    pub fn set_exclusions(&mut self, keys: HashSet<MessageKey>) {
        self.exclusions = keys;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn header(&self) -> Option<&Message> {
        self.header.as_ref()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_plurals(&self) -> bool {
        self.messages.iter().any(|m| m.msgid_plural.is_some())
    }

    /// Commit one observation of a message.
    pub fn commit(&mut self, draft: MessageDraft, diagnostics: &mut Diagnostics) {
        let key = MessageKey::new(draft.msgctxt.clone(), draft.msgid.clone());
        if key.is_header() {
            diagnostics.warn(
                draft.position.file.clone(),
                draft.position.line,
                "empty msgid: it is reserved by GNU gettext; gettext(\"\") \
                 returns the header entry, not the empty string",
            );
            return;
        }
        if self.exclusions.contains(&key) {
            return;
        }

        let mut incoming = Message::new(key);
        incoming.msgstr = self.settings.initial_msgstr_for(&draft.msgid);
        incoming.msgid_plural = draft.msgid_plural;
        incoming.wrap = !self.settings.no_wrap;
        incoming.positions.push(draft.position);
        if let Some(snapshot) = &draft.comments {
            if self.settings.comments.accept(snapshot) {
                incoming.add_comments(snapshot);
            }
        }
        for line in &draft.extra_comments {
            incoming.add_comment_line(line);
        }
        for language in FORMAT_LANGUAGES {
            incoming.set_format(
                language,
                classify(language, &draft.msgid, draft.region.is_format(language)),
            );
        }

        self.merge_message(incoming, diagnostics);
    }

    /// Merge a fully-formed message (from `commit` or from another
    /// catalogue) into this one.
    pub fn merge_message(&mut self, incoming: Message, diagnostics: &mut Diagnostics) {
        let Some(&index) = self.index.get(&incoming.key) else {
            self.index.insert(incoming.key.clone(), self.messages.len());
            self.messages.push(incoming);
            return;
        };
        let existing = &mut self.messages[index];

        merge_plural(existing, &incoming, diagnostics);

        for language in FORMAT_LANGUAGES {
            let old = existing.format(language);
            let new = incoming.format(language);
            match merge_classification(old, new) {
                Ok(merged) => existing.set_format(language, merged),
                Err(()) => {
                    let first = existing
                        .positions
                        .first()
                        .map(|p| p.to_string())
                        .unwrap_or_default();
                    let site = incoming.positions.first();
                    diagnostics.error(
                        site.map(|p| p.file.clone()).unwrap_or_default(),
                        site.map(|p| p.line).unwrap_or(0),
                        format!(
                            "msgid '{}' is classified both as '{}' (first seen at {}) and as 'no-{}'",
                            existing.msgid(),
                            language.name(),
                            first,
                            language.name(),
                        ),
                    );
                }
            }
        }

        existing.fuzzy |= incoming.fuzzy;
        existing.wrap &= incoming.wrap;

        // Comments union per site, keyed by position: only an observation
        // from a site not seen before contributes its comment block, so a
        // second site with coincidentally identical text still gets
        // through, while the same site committing twice does not repeat.
        let brings_new_site = incoming
            .positions
            .iter()
            .any(|position| !existing.has_position(position));
        if brings_new_site {
            for line in &incoming.comments {
                existing.add_comment_line(line);
            }
        }
        for position in incoming.positions {
            existing.add_position(position);
        }
    }

    /// Merge a whole catalogue produced by another file's extraction run.
    /// Entries arrive in the other catalogue's insertion order, keeping
    /// the combined output deterministic.
    pub fn absorb(&mut self, other: Catalogue, diagnostics: &mut Diagnostics) {
        for message in other.messages {
            self.merge_message(message, diagnostics);
        }
    }

    /// Build the `msgid ""` header entry from the run configuration.
    pub fn synthesize_header(&mut self, fields: &HeaderFields, creation_date: &str) {
        let package = fields.package_name.as_deref().unwrap_or("PACKAGE");
        let project_id = match &fields.package_version {
            Some(version) => format!("{} {}", package, version),
            None => format!("{} VERSION", package),
        };

        let mut header = Message::new(MessageKey::header());
        header.fuzzy = true;
        header.translator_comments = vec![
            "SOME DESCRIPTIVE TITLE.".to_string(),
            format!("Copyright (C) YEAR {}", fields.copyright_holder),
            format!(
                "This file is distributed under the same license as the {} package.",
                package
            ),
            "FIRST AUTHOR <EMAIL@ADDRESS>, YEAR.".to_string(),
        ];

        let mut lines = vec![
            format!("Project-Id-Version: {}", project_id),
            format!(
                "Report-Msgid-Bugs-To: {}",
                fields.msgid_bugs_address.as_deref().unwrap_or("")
            ),
            format!("POT-Creation-Date: {}", creation_date),
            "PO-Revision-Date: YEAR-MO-DA HO:MI+ZONE".to_string(),
            "Last-Translator: FULL NAME <EMAIL@ADDRESS>".to_string(),
            "Language-Team: LANGUAGE <LL@li.org>".to_string(),
            "Language: ".to_string(),
            "MIME-Version: 1.0".to_string(),
            "Content-Type: text/plain; charset=UTF-8".to_string(),
            "Content-Transfer-Encoding: 8bit".to_string(),
        ];
        if self.has_plurals() {
            lines.push("Plural-Forms: nplurals=INTEGER; plural=EXPRESSION;".to_string());
        }
        let mut msgstr = String::new();
        for line in lines {
            msgstr.push_str(&line);
            msgstr.push('\n');
        }
        header.msgstr = msgstr;
        self.header = Some(header);
    }
}

/// Header configuration copied from the driver options.
#[derive(Debug, Clone)]
pub struct HeaderFields {
    pub copyright_holder: String,
    pub package_name: Option<String>,
    pub package_version: Option<String>,
    pub msgid_bugs_address: Option<String>,
}

impl Default for HeaderFields {
    fn default() -> Self {
        Self {
            copyright_holder: "THE PACKAGE'S COPYRIGHT HOLDER".to_string(),
            package_name: None,
            package_version: None,
            msgid_bugs_address: None,
        }
    }
}

fn merge_plural(existing: &mut Message, incoming: &Message, diagnostics: &mut Diagnostics) {
    match (&existing.msgid_plural, &incoming.msgid_plural) {
        (Some(a), Some(b)) if a != b => {
            let first = existing
                .positions
                .first()
                .map(|p| p.to_string())
                .unwrap_or_default();
            let site = incoming.positions.first();
            diagnostics.error(
                site.map(|p| p.file.clone()).unwrap_or_default(),
                site.map(|p| p.line).unwrap_or(0),
                format!(
                    "msgid '{}' is used with two different plural forms: '{}' (first seen at {}) and '{}'",
                    existing.msgid(),
                    a,
                    first,
                    b
                ),
            );
        }
        (Some(_), None) | (None, Some(_)) => {
            // One site requested a plural, another did not: warn and keep
            // the msgstr layout singular.
            let site = incoming.positions.first();
            diagnostics.warn(
                site.map(|p| p.file.clone()).unwrap_or_default(),
                site.map(|p| p.line).unwrap_or(0),
                format!(
                    "msgid '{}' is used both with and without a plural form; keeping it singular",
                    existing.msgid()
                ),
            );
            existing.msgid_plural = None;
        }
        _ => {}
    }
}

fn merge_classification(
    old: FormatClassification,
    new: FormatClassification,
) -> Result<FormatClassification, ()> {
    use FormatClassification::*;
    match (old, new) {
        (a, b) if a == b => Ok(a),
        (Undecided, x) | (x, Undecided) => Ok(x),
        (Possible, Yes) | (Yes, Possible) => Ok(Yes),
        (Possible, No) | (No, Possible) => Ok(No),
        (Yes, No) | (No, Yes) => Err(()),
        _ => unreachable!(),
    }
}
