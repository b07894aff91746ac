//! Format-string validators.
//!
//! A validator parses a candidate string against the formal grammar of one
//! format-string language and produces a [`Descriptor`]: the list of
//! argument slots the string consumes, either all numbered or all named.
//! Descriptors serve two purposes:
//!
//! 1. **Classification** at extraction time: a string with plausible
//!    directives is marked `possible`, and a string sitting in an argument
//!    position with a format promise is decided `yes` or `no`
//!    (see [`classify`]).
//! 2. **Compatibility checking** between a msgid and its translation
//!    (see [`check`]).
//!
//! The grammars are in the sibling modules; this module holds the shared
//! descriptor model and the comparison rules.

use enum_dispatch::enum_dispatch;

use crate::catalogue::message::FormatClassification;
use crate::flags::FormatLanguage;

pub mod c;
pub mod python;
pub mod python_brace;

pub use c::CFormat;
pub use python::PythonFormat;
pub use python_brace::PythonBraceFormat;

/// Width of an integer argument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    Native,
    Long,
    Int64,
}

/// The base type an argument slot expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Character,
    String,
    Integer(IntWidth),
    Float,
    Pointer,
    /// `%n`-style "store the count here" slots.
    Count,
    /// Any value the language can stringify (Python `%s`, brace fields).
    Any,
}

/// Whether the slot's output uses the language's own literal syntax
/// (Python `%r`) or plain text, or accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr {
    Plain,
    Language,
    Either,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgType {
    pub base: BaseType,
    pub repr: Repr,
}

impl ArgType {
    pub fn plain(base: BaseType) -> Self {
        Self {
            base,
            repr: Repr::Plain,
        }
    }
}

/// A translation may render a slot with language syntax even when the
/// original did not ask for it; the base types still have to agree.
fn compatible(msgid: &ArgType, msgstr: &ArgType) -> bool {
    if msgid.base != msgstr.base {
        return false;
    }
    matches!(msgstr.repr, Repr::Language | Repr::Either)
        || matches!(msgid.repr, Repr::Either)
        || msgid.repr == msgstr.repr
}

/// The argument slots of one parsed format string. Numbered and named
/// directives never mix within one string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directives {
    Numbered(Vec<(usize, ArgType)>),
    Named(Vec<(String, ArgType)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    directives: Directives,
    unlikely_intentional: bool,
}

impl Descriptor {
    pub(crate) fn new(directives: Directives, unlikely_intentional: bool) -> Self {
        Self {
            directives,
            unlikely_intentional,
        }
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    /// Number of argument slots the string consumes. `%%`-style literal
    /// directives do not count.
    pub fn directive_count(&self) -> usize {
        match &self.directives {
            Directives::Numbered(args) => args.len(),
            Directives::Named(args) => args.len(),
        }
    }

    /// Heuristic: the directives look accidental (every one of them
    /// contains a space, as in `"100% complete"`), so the string should
    /// not be classified as a format string on their account.
    pub fn unlikely_intentional(&self) -> bool {
        self.unlikely_intentional
    }
}

/// Sort a numbered argument list and merge duplicate numbers. Duplicates
/// with incompatible types are a parse error.
pub(crate) fn sort_and_merge_numbered(
    mut args: Vec<(usize, ArgType)>,
) -> Result<Vec<(usize, ArgType)>, String> {
    args.sort_by_key(|(number, _)| *number);
    let mut merged: Vec<(usize, ArgType)> = Vec::with_capacity(args.len());
    for (number, arg_type) in args {
        match merged.last() {
            Some((last, existing)) if *last == number => {
                if *existing != arg_type {
                    return Err(format!("incompatible types for argument {}", number));
                }
            }
            _ => merged.push((number, arg_type)),
        }
    }
    Ok(merged)
}

/// One per-language format-string parser.
#[enum_dispatch]
pub trait FormatParser {
    /// Parse `text` into a descriptor; `Err` carries the invalid-reason.
    /// `is_translated` relaxes the unlikely-intentional heuristic, which
    /// only exists to avoid extraction-time false positives.
    fn parse(&self, text: &str, is_translated: bool) -> Result<Descriptor, String>;

    fn language(&self) -> FormatLanguage;
}

#[enum_dispatch(FormatParser)]
#[derive(Debug, Clone, Copy)]
pub enum Validator {
    CFormat,
    PythonFormat,
    PythonBraceFormat,
}

pub fn validator_for(language: FormatLanguage) -> Validator {
    match language {
        FormatLanguage::C => Validator::CFormat(CFormat),
        FormatLanguage::Python => Validator::PythonFormat(PythonFormat),
        FormatLanguage::PythonBrace => Validator::PythonBraceFormat(PythonBraceFormat),
    }
}

/// Classify a literal string for one format language.
///
/// `decided` says whether the surrounding call promised that this position
/// holds a format string of that language.
pub fn classify(language: FormatLanguage, text: &str, decided: bool) -> FormatClassification {
    let plausible = match validator_for(language).parse(text, false) {
        Ok(descriptor) => descriptor.directive_count() > 0 && !descriptor.unlikely_intentional(),
        Err(_) => false,
    };
    match (decided, plausible) {
        (true, true) => FormatClassification::Yes,
        (true, false) => FormatClassification::No,
        (false, true) => FormatClassification::Possible,
        (false, false) => FormatClassification::Undecided,
    }
}

/// Compare a msgid descriptor with its translation's descriptor.
///
/// With `require_equality` the two must consume exactly the same slots;
/// without it, a named-mode translation may use a subset of the msgid's
/// names.
pub fn check(msgid: &Descriptor, msgstr: &Descriptor, require_equality: bool) -> Result<(), String> {
    match (&msgid.directives, &msgstr.directives) {
        (Directives::Numbered(id_args), Directives::Numbered(str_args)) => {
            if id_args.len() != str_args.len() {
                return Err(format!(
                    "number of format specifications differs: {} versus {}",
                    id_args.len(),
                    str_args.len()
                ));
            }
            for ((id_num, id_type), (str_num, str_type)) in id_args.iter().zip(str_args) {
                if id_num != str_num {
                    return Err(format!(
                        "format specification for argument {} is missing",
                        id_num
                    ));
                }
                if !compatible(id_type, str_type) {
                    return Err(format!("incompatible types for argument {}", id_num));
                }
            }
            Ok(())
        }
        (Directives::Named(id_args), Directives::Named(str_args)) => {
            for (name, str_type) in str_args {
                match id_args.iter().find(|(id_name, _)| id_name == name) {
                    Some((_, id_type)) => {
                        if !compatible(id_type, str_type) {
                            return Err(format!("incompatible types for argument '{}'", name));
                        }
                    }
                    None => {
                        return Err(format!(
                            "a format specification for argument '{}' doesn't exist in the original",
                            name
                        ));
                    }
                }
            }
            if require_equality {
                for (name, _) in id_args {
                    if !str_args.iter().any(|(str_name, _)| str_name == name) {
                        return Err(format!(
                            "a format specification for argument '{}' is missing",
                            name
                        ));
                    }
                }
            }
            Ok(())
        }
        _ => Err("format strings are not of the same kind (named versus numbered)".to_string()),
    }
}
