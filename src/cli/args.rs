//! CLI argument definitions using clap.
//!
//! potx is a single-purpose tool, so the interface is one flat command:
//! input files (or directories to walk) plus the extraction options of
//! the driver. Most flags mirror the config file; the command line wins
//! when both are given.

use std::path::PathBuf;

use clap::Parser;

use crate::extractors::Language;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    /// Source files or directories to extract from
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Write the POT output to this file instead of standard output
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Force the source language instead of deciding by file extension
    #[arg(short = 'L', long, value_enum)]
    pub language: Option<Language>,

    /// Additional keyword spec (NAME, NAME:ARG,... ); an empty value
    /// disables the per-language default keywords
    #[arg(short = 'k', long = "keyword", value_name = "SPEC")]
    pub keywords: Vec<String>,

    /// Additional format-flag spec (NAME:ARGNUM:FORMAT)
    #[arg(long = "flag", value_name = "SPEC")]
    pub flags: Vec<String>,

    /// Extract all string literals, not only keyword arguments
    #[arg(short = 'a', long)]
    pub extract_all: bool,

    /// Attach comments preceding keyword lines; with TAG, only comment
    /// blocks starting with TAG
    #[arg(short = 'c', long = "add-comments", value_name = "TAG",
          num_args = 0..=1, default_missing_value = "")]
    pub add_comments: Option<String>,

    /// Entries also present in this PO file are not extracted
    #[arg(short = 'x', long = "exclude-file", value_name = "FILE.po")]
    pub exclude_file: Option<PathBuf>,

    /// Source file encoding (overrides autodetection)
    #[arg(long = "from-code", value_name = "NAME")]
    pub from_code: Option<String>,

    /// Do not write the POT header entry
    #[arg(long)]
    pub omit_header: bool,

    /// Use this prefix for msgstr template values
    #[arg(long, value_name = "STRING")]
    pub msgstr_prefix: Option<String>,

    /// Use this suffix for msgstr template values
    #[arg(long, value_name = "STRING")]
    pub msgstr_suffix: Option<String>,

    /// Set the copyright holder in the output header
    #[arg(long, value_name = "STRING")]
    pub copyright_holder: Option<String>,

    /// Set the report address for msgid bugs in the output header
    #[arg(long, value_name = "EMAIL")]
    pub msgid_bugs_address: Option<String>,

    /// Set the package name in the output header
    #[arg(long, value_name = "NAME")]
    pub package_name: Option<String>,

    /// Set the package version in the output header
    #[arg(long, value_name = "VERSION")]
    pub package_version: Option<String>,

    /// Do not write '#: file:line' reference comments
    #[arg(long = "no-location")]
    pub no_location: bool,

    /// Do not wrap long message lines in the output
    #[arg(long = "no-wrap")]
    pub no_wrap: bool,

    /// Glob patterns excluded from directory walks (repeatable)
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignores: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
