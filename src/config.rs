//! Configuration: the `.potxrc.json` project file and the merged runtime
//! options.
//!
//! The config file supplies project-level defaults (keywords, flags,
//! header fields, ignore patterns); command-line arguments override it
//! field by field. The file is searched upward from the working
//! directory, stopping at the first repository root (a directory with a
//! `.git` entry).

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::catalogue::CommentFilter;
use crate::extractors::Language;
use crate::reader::SourceEncoding;

pub const CONFIG_FILE_NAME: &str = ".potxrc.json";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Glob patterns pruned from directory walks.
    #[serde(default)]
    pub ignores: Vec<String>,
    /// Extra keyword specs (`NAME:ARG,…`); an empty string disables the
    /// per-language defaults.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Extra flag specs (`NAME:ARGNUM:FORMAT`).
    #[serde(default)]
    pub flags: Vec<String>,
    /// Comment tag to extract; empty string means "all comments".
    #[serde(default)]
    pub add_comments: Option<String>,
    #[serde(default)]
    pub copyright_holder: Option<String>,
    #[serde(default)]
    pub msgid_bugs_address: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub package_version: Option<String>,
}

impl ConfigFile {
    /// Validate configuration values.
    ///
    /// Returns an error if any glob pattern in `ignores` is invalid.
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.ignores {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid glob pattern in 'ignores': \"{}\"", pattern))?;
        }
        Ok(())
    }
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// The driver parameters for one extraction run, after the config file
/// and the command line have been merged.
#[derive(Debug, Clone)]
pub struct Options {
    pub source_encoding: SourceEncoding,
    pub extract_all: bool,
    pub keywords: Vec<String>,
    pub flags: Vec<String>,
    pub exclude_file: Option<PathBuf>,
    pub omit_header: bool,
    pub msgstr_prefix: String,
    pub msgstr_suffix: String,
    pub add_comments: CommentFilter,
    pub copyright_holder: String,
    pub msgid_bugs_address: Option<String>,
    pub package_name: Option<String>,
    pub package_version: Option<String>,
    pub add_location: bool,
    pub no_wrap: bool,
    pub ignores: Vec<String>,
    /// Forced language; otherwise each file's extension decides.
    pub language: Option<Language>,
    pub output: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            source_encoding: SourceEncoding::Auto,
            extract_all: false,
            keywords: Vec::new(),
            flags: Vec::new(),
            exclude_file: None,
            omit_header: false,
            msgstr_prefix: String::new(),
            msgstr_suffix: String::new(),
            add_comments: CommentFilter::Discard,
            copyright_holder: "THE PACKAGE'S COPYRIGHT HOLDER".to_string(),
            msgid_bugs_address: None,
            package_name: None,
            package_version: None,
            add_location: true,
            no_wrap: false,
            ignores: Vec::new(),
            language: None,
            output: None,
        }
    }
}

/// Map an `--add-comments` style value onto a filter: absent means no
/// comments, empty means all, anything else is a tag prefix.
pub fn comment_filter(value: Option<&str>) -> CommentFilter {
    match value {
        None => CommentFilter::Discard,
        Some("") => CommentFilter::All,
        Some(tag) => CommentFilter::Tagged(tag.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: ConfigFile = serde_json::from_str("{}").unwrap();
        assert!(config.ignores.is_empty());
        assert!(config.keywords.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config: ConfigFile = serde_json::from_str(
            r#"{
                "ignores": ["**/vendor/**"],
                "keywords": ["tr:1", "trn:1,2"],
                "flags": ["log:1:c-format"],
                "addComments": "TRANSLATORS:",
                "copyrightHolder": "Example Inc.",
                "msgidBugsAddress": "bugs@example.com",
                "packageName": "example",
                "packageVersion": "1.0"
            }"#,
        )
        .unwrap();
        assert_eq!(config.keywords, vec!["tr:1", "trn:1,2"]);
        assert_eq!(config.add_comments.as_deref(), Some("TRANSLATORS:"));
        assert_eq!(config.package_name.as_deref(), Some("example"));
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_ignore_pattern_rejected() {
        let config: ConfigFile = serde_json::from_str(r#"{"ignores": ["[oops"]}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_comment_filter_mapping() {
        assert_eq!(comment_filter(None), CommentFilter::Discard);
        assert_eq!(comment_filter(Some("")), CommentFilter::All);
        assert_eq!(
            comment_filter(Some("TRANSLATORS:")),
            CommentFilter::Tagged("TRANSLATORS:".to_string())
        );
    }
}
