//! Per-language extraction engines.
//!
//! Each supported language pairs a hand-written tokeniser with a driver
//! that walks balanced parentheses, recognises calls to registered
//! keywords, and feeds string arguments through an
//! [`ArglistParser`](crate::arglist::ArglistParser) into the catalogue.
//!
//! The per-language modules also own their default keyword and flag
//! tables; [`Language::default_keywords`] and [`Language::default_flags`]
//! install them unless the user disabled defaults with an empty
//! `--keyword=` spec.

use clap::ValueEnum;

use crate::catalogue::{Catalogue, MessageDraft, MessagePosition};
use crate::diagnostics::Diagnostics;
use crate::flags::{FlagTable, RegionRef};
use crate::keywords::KeywordTable;
use crate::token::TokenString;

pub mod c;
pub mod escape;
pub mod perl;
pub mod python;

/// Nesting ceiling for balanced constructs and interpolated scans.
/// Exceeding it is a fatal error for the file being extracted.
pub const MAX_NESTING_DEPTH: usize = 1000;

/// A supported source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Language {
    C,
    Python,
    Perl,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Language::C => "C",
            Language::Python => "Python",
            Language::Perl => "Perl",
        }
    }

    /// Map a file extension (lower-case, without dot) to a language.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "c" | "h" | "cc" | "cpp" | "cxx" | "hh" | "hpp" | "hxx" => Some(Language::C),
            "py" | "pyi" => Some(Language::Python),
            "pl" | "pm" | "perl" => Some(Language::Perl),
            _ => None,
        }
    }

    pub fn default_keywords(&self, table: &mut KeywordTable) {
        let specs: &[&str] = match self {
            Language::C => &[
                "gettext",
                "dgettext:2",
                "dcgettext:2",
                "ngettext:1,2",
                "dngettext:2,3",
                "dcngettext:2,3",
                "pgettext:1c,2",
                "dpgettext:2c,3",
                "dcpgettext:2c,3",
                "npgettext:1c,2,3",
                "dnpgettext:2c,3,4",
                "dcnpgettext:2c,3,4",
                "gettext_noop",
            ],
            Language::Python => &[
                "gettext",
                "ugettext",
                "dgettext:2",
                "ngettext:1,2",
                "ungettext:1,2",
                "dngettext:2,3",
                "pgettext:1c,2",
                "npgettext:1c,2,3",
                "_",
            ],
            Language::Perl => &[
                "gettext",
                "dgettext:2",
                "dcgettext:2",
                "ngettext:1,2",
                "dngettext:2,3",
                "dcngettext:2,3",
                "pgettext:1c,2",
                "dpgettext:2c,3",
                "npgettext:1c,2,3",
                "dnpgettext:2c,3,4",
                "__",
                "$__",
                "%__",
                "__x",
                "__n:1,2",
                "__nx:1,2",
                "__xn:1,2",
                "__p:1c,2",
                "__np:1c,2,3",
                "N__",
                "N__n:1,2",
                "maketext",
            ],
        };
        for spec in specs {
            table.add_spec(spec);
        }
    }

    pub fn default_flags(&self, table: &mut FlagTable) {
        let specs: &[&str] = match self {
            Language::C => &[
                "gettext:1:pass-c-format",
                "dgettext:2:pass-c-format",
                "dcgettext:2:pass-c-format",
                "ngettext:1:pass-c-format",
                "ngettext:2:pass-c-format",
                "dngettext:2:pass-c-format",
                "dngettext:3:pass-c-format",
                "pgettext:2:pass-c-format",
                "npgettext:2:pass-c-format",
                "npgettext:3:pass-c-format",
                "printf:1:c-format",
                "fprintf:2:c-format",
                "sprintf:2:c-format",
                "snprintf:3:c-format",
                "vprintf:1:c-format",
                "vfprintf:2:c-format",
                "vsprintf:2:c-format",
                "vsnprintf:3:c-format",
                "asprintf:2:c-format",
                "syslog:2:c-format",
            ],
            Language::Python => &[
                "gettext:1:pass-python-format",
                "ugettext:1:pass-python-format",
                "dgettext:2:pass-python-format",
                "ngettext:1:pass-python-format",
                "ngettext:2:pass-python-format",
                "ungettext:1:pass-python-format",
                "ungettext:2:pass-python-format",
                "dngettext:2:pass-python-format",
                "dngettext:3:pass-python-format",
                "_:1:pass-python-format",
            ],
            Language::Perl => &[
                "gettext:1:pass-c-format",
                "ngettext:1:pass-c-format",
                "ngettext:2:pass-c-format",
                "__:1:pass-c-format",
                "__n:1:pass-c-format",
                "__n:2:pass-c-format",
                "printf:1:c-format",
                "sprintf:1:c-format",
            ],
        };
        for spec in specs {
            table.add_spec(spec);
        }
    }
}

/// Everything an extractor needs while working on one file.
pub struct FileContext<'a> {
    /// Display name used in positions and diagnostics.
    pub file: String,
    /// Extract every string literal, not only keyword arguments.
    pub extract_all: bool,
    pub keywords: &'a KeywordTable,
    pub flags: &'a FlagTable,
    pub catalogue: &'a mut Catalogue,
    pub diagnostics: &'a mut Diagnostics,
}

impl FileContext<'_> {
    /// Commit a bare string observation (`--extract-all` mode).
    /// Interpolated strings have no trustworthy value and are skipped.
    pub fn commit_plain(&mut self, string: &TokenString, region: &RegionRef) {
        if string.interpolated {
            return;
        }
        self.catalogue.commit(
            MessageDraft {
                msgctxt: None,
                msgid: string.value.clone(),
                msgid_plural: None,
                position: MessagePosition::new(self.file.clone(), string.line),
                comments: string.comments.clone(),
                extra_comments: Vec::new(),
                region: region.clone(),
            },
            self.diagnostics,
        );
    }
}

/// Run the extractor for `language` over already-decoded source text.
pub fn extract(language: Language, source: &str, context: &mut FileContext) {
    match language {
        Language::C => c::extract(source, context),
        Language::Python => python::extract(source, context),
        Language::Perl => perl::extract(source, context),
    }
}
