//! Format-flag registry and argument regions.
//!
//! Some functions promise that a given argument is a format string:
//! `printf`'s first argument is a C format string, and `gettext`'s first
//! argument keeps whatever promise the surrounding call made (the
//! translation of a format string is used as a format string). The registry
//! records those promises per `(function name, argument position)`.
//!
//! A [`Region`] is the set of promises in effect at one argument position.
//! Descending into argument `i` of a call to `F` composes the enclosing
//! region with `lookup(F, i)`: positions the entry decides are overridden,
//! everything else carries over from the outer region. Regions are
//! immutable and reference-counted; composing never mutates the parent.

use std::collections::HashMap;
use std::rc::Rc;

/// The format-string languages this crate can classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatLanguage {
    C,
    Python,
    PythonBrace,
}

pub const FORMAT_LANGUAGES: [FormatLanguage; 3] = [
    FormatLanguage::C,
    FormatLanguage::Python,
    FormatLanguage::PythonBrace,
];

pub const N_FORMAT_LANGUAGES: usize = FORMAT_LANGUAGES.len();

impl FormatLanguage {
    /// The name used in PO flag comments and in `--flag` specs.
    pub fn name(&self) -> &'static str {
        match self {
            FormatLanguage::C => "c-format",
            FormatLanguage::Python => "python-format",
            FormatLanguage::PythonBrace => "python-brace-format",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        FORMAT_LANGUAGES.iter().copied().find(|l| l.name() == name)
    }

    pub fn index(&self) -> usize {
        match self {
            FormatLanguage::C => 0,
            FormatLanguage::Python => 1,
            FormatLanguage::PythonBrace => 2,
        }
    }
}

/// How certain a flag entry is about its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagCertainty {
    /// The argument is a format string of the given language.
    Decided,
    /// The argument's format-ness is whatever the enclosing call says
    /// (`pass-…` specs).
    Passthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagEntry {
    pub language: FormatLanguage,
    pub certainty: FlagCertainty,
}

/// Registry of format promises, keyed by function name and 1-based
/// argument position. Append-only during a run.
#[derive(Debug, Default)]
pub struct FlagTable {
    map: HashMap<(String, usize), Vec<FlagEntry>>,
}

impl FlagTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, argnum: usize, language: FormatLanguage, certainty: FlagCertainty) {
        self.map
            .entry((name.to_string(), argnum))
            .or_default()
            .push(FlagEntry { language, certainty });
    }

    /// Register from a `NAME:ARGNUM:FORMAT` spec, where `FORMAT` is a
    /// format-language name optionally prefixed with `pass-`. Returns
    /// `false` for malformed specs (which are ignored).
    pub fn add_spec(&mut self, spec: &str) -> bool {
        let mut parts = spec.split(':');
        let (Some(name), Some(argnum), Some(format), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if name.is_empty() {
            return false;
        }
        let Ok(argnum) = argnum.parse::<usize>() else {
            return false;
        };
        if argnum == 0 {
            return false;
        }
        let (certainty, format) = match format.strip_prefix("pass-") {
            Some(rest) => (FlagCertainty::Passthrough, rest),
            None => (FlagCertainty::Decided, format),
        };
        let Some(language) = FormatLanguage::from_name(format) else {
            return false;
        };
        self.add(name, argnum, language, certainty);
        true
    }

    pub fn lookup(&self, name: &str, argnum: usize) -> Option<&[FlagEntry]> {
        self.map
            .get(&(name.to_string(), argnum))
            .map(|entries| entries.as_slice())
    }
}

/// The promises in effect at one argument position: for each format
/// language, whether this position is known to hold a format string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Region {
    decided: [bool; N_FORMAT_LANGUAGES],
}

pub type RegionRef = Rc<Region>;

impl Region {
    /// The region outside any call: nothing is decided.
    pub fn root() -> RegionRef {
        Rc::new(Region::default())
    }

    /// Whether the given language is decided at this position.
    pub fn is_format(&self, language: FormatLanguage) -> bool {
        self.decided[language.index()]
    }

    /// Compose an outer region with the flag entries for one argument
    /// position. Decided entries switch their language on; passthrough and
    /// absent entries keep the outer value. With no entries at all the
    /// outer region is shared, not copied.
    pub fn inherit(outer: &RegionRef, entries: Option<&[FlagEntry]>) -> RegionRef {
        let Some(entries) = entries else {
            return Rc::clone(outer);
        };
        if entries.is_empty() {
            return Rc::clone(outer);
        }
        let mut region = Region {
            decided: outer.decided,
        };
        for entry in entries {
            match entry.certainty {
                FlagCertainty::Decided => region.decided[entry.language.index()] = true,
                FlagCertainty::Passthrough => {
                    // Keeps the outer value, which is already in place.
                }
            }
        }
        Rc::new(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_spec_decided() {
        let mut table = FlagTable::new();
        assert!(table.add_spec("printf:1:c-format"));
        let entries = table.lookup("printf", 1).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].language, FormatLanguage::C);
        assert_eq!(entries[0].certainty, FlagCertainty::Decided);
    }

    #[test]
    fn test_add_spec_passthrough() {
        let mut table = FlagTable::new();
        assert!(table.add_spec("gettext:1:pass-c-format"));
        let entries = table.lookup("gettext", 1).unwrap();
        assert_eq!(entries[0].certainty, FlagCertainty::Passthrough);
    }

    #[test]
    fn test_malformed_specs_rejected() {
        let mut table = FlagTable::new();
        assert!(!table.add_spec("printf:1"));
        assert!(!table.add_spec("printf:0:c-format"));
        assert!(!table.add_spec("printf:one:c-format"));
        assert!(!table.add_spec("printf:1:klingon-format"));
        assert!(!table.add_spec("printf:1:c-format:extra"));
    }

    #[test]
    fn test_inherit_decides() {
        let mut table = FlagTable::new();
        table.add_spec("printf:1:c-format");
        let root = Region::root();
        let region = Region::inherit(&root, table.lookup("printf", 1));
        assert!(region.is_format(FormatLanguage::C));
        assert!(!region.is_format(FormatLanguage::Python));
        // the parent is untouched
        assert!(!root.is_format(FormatLanguage::C));
    }

    #[test]
    fn test_inherit_carries_outer() {
        let mut table = FlagTable::new();
        table.add_spec("printf:1:c-format");
        table.add_spec("gettext:1:pass-c-format");
        let root = Region::root();
        let printf_arg = Region::inherit(&root, table.lookup("printf", 1));
        // gettext("…") nested inside printf's format argument: the msgid
        // position keeps the c-format promise.
        let gettext_arg = Region::inherit(&printf_arg, table.lookup("gettext", 1));
        assert!(gettext_arg.is_format(FormatLanguage::C));
    }

    #[test]
    fn test_inherit_without_entries_shares() {
        let root = Region::root();
        let same = Region::inherit(&root, None);
        assert!(Rc::ptr_eq(&root, &same));
    }

    #[test]
    fn test_composition_is_associative() {
        let mut table = FlagTable::new();
        table.add_spec("f:1:c-format");
        table.add_spec("g:1:python-format");
        let root = Region::root();
        let through_f = Region::inherit(&root, table.lookup("f", 1));
        let through_fg = Region::inherit(&through_f, table.lookup("g", 1));
        assert!(through_fg.is_format(FormatLanguage::C));
        assert!(through_fg.is_format(FormatLanguage::Python));
        assert!(!through_fg.is_format(FormatLanguage::PythonBrace));
    }
}
