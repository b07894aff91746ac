//! potx - translatable-string extractor for PO workflows
//!
//! potx is a CLI tool and library that scans source code for calls to
//! gettext-style translation keywords and collects the literal string
//! arguments, together with their source positions, preceding developer
//! comments, plural partners, message contexts and format-string
//! classifications, into a message catalogue written out as a POT file.
//!
//! ## Module Structure
//!
//! - `cli`: command-line interface layer (argument parsing and the driver)
//! - `config`: configuration file loading and runtime options
//! - `reader`: source-encoding conversion and character-level reading
//! - `comments`: the savable-comment buffer
//! - `token`: shared string-token payload
//! - `keywords`: keyword specs and call shapes
//! - `flags`: format-flag registry and argument regions
//! - `arglist`: the argument-list parser deciding which shapes fire
//! - `catalogue`: the deduplicating message store
//! - `formats`: per-language format-string validators
//! - `extractors`: the per-language tokenisers and drivers
//! - `po`: POT output and the exclusion-set PO reader
//! - `diagnostics`: warning/error collection and reporting

pub mod arglist;
pub mod catalogue;
pub mod cli;
pub mod comments;
pub mod config;
pub mod diagnostics;
pub mod extractors;
pub mod flags;
pub mod formats;
pub mod keywords;
pub mod po;
pub mod reader;
pub mod token;
