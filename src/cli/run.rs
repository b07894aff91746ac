//! The extraction driver: discovery, per-file extraction, merge, output.
//!
//! Files are extracted in parallel; every worker fills a private
//! catalogue and diagnostic list, and the results are merged strictly in
//! input order so the output is deterministic regardless of scheduling.
//! The keyword and flag tables are built once per language before any
//! worker starts and are read-only afterwards.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use glob::Pattern;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::catalogue::{Catalogue, CommitSettings, HeaderFields, MessageKey};
use crate::config::{self, Options};
use crate::diagnostics::{Diagnostics, Severity};
use crate::extractors::{self, FileContext, Language};
use crate::flags::FlagTable;
use crate::keywords::KeywordTable;
use crate::po;
use crate::reader::{SourceEncoding, decode_source};

use super::args::Arguments;
use super::exit_status::ExitStatus;

pub fn run(args: Arguments) -> Result<ExitStatus> {
    let options = build_options(&args)?;
    let files = discover(&args.inputs, &options)?;
    if files.is_empty() {
        bail!("no input files found");
    }
    if args.verbose {
        for (path, language) in &files {
            eprintln!("{} ({})", path.display(), language.name());
        }
    }

    let exclusions = match &options.exclude_file {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            po::read_exclusion_keys(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => HashSet::new(),
    };

    let mut tables: HashMap<Language, LanguageTables> = HashMap::new();
    for (_, language) in &files {
        tables
            .entry(*language)
            .or_insert_with(|| LanguageTables::build(*language, &options));
    }

    let results: Vec<(Catalogue, Diagnostics)> = files
        .par_iter()
        .map(|(path, language)| extract_file(path, *language, &options, &tables, &exclusions))
        .collect();

    let mut catalogue = Catalogue::new(commit_settings(&options));
    let mut diagnostics = Diagnostics::new();
    for (file_catalogue, file_diagnostics) in results {
        diagnostics.absorb(file_diagnostics);
        catalogue.absorb(file_catalogue, &mut diagnostics);
    }

    if !options.omit_header {
        let fields = HeaderFields {
            copyright_holder: options.copyright_holder.clone(),
            package_name: options.package_name.clone(),
            package_version: options.package_version.clone(),
            msgid_bugs_address: options.msgid_bugs_address.clone(),
        };
        catalogue.synthesize_header(&fields, &creation_date());
    }

    diagnostics.print();

    let pot = po::write_pot(
        &catalogue,
        &po::WriterOptions {
            add_location: options.add_location,
        },
    );
    match &options.output {
        Some(path) => fs::write(path, pot)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", pot),
    }

    Ok(if diagnostics.error_count() > 0 {
        ExitStatus::Failure
    } else {
        ExitStatus::Success
    })
}

/// Per-language keyword and flag tables, built before extraction starts.
struct LanguageTables {
    keywords: KeywordTable,
    flags: FlagTable,
}

impl LanguageTables {
    fn build(language: Language, options: &Options) -> Self {
        let mut keywords = KeywordTable::new();
        for spec in &options.keywords {
            keywords.add_spec(spec);
        }
        if !keywords.defaults_disabled() {
            language.default_keywords(&mut keywords);
        }

        let mut flags = FlagTable::new();
        language.default_flags(&mut flags);
        for spec in &options.flags {
            flags.add_spec(spec);
        }

        Self { keywords, flags }
    }
}

fn commit_settings(options: &Options) -> CommitSettings {
    CommitSettings {
        msgstr_prefix: options.msgstr_prefix.clone(),
        msgstr_suffix: options.msgstr_suffix.clone(),
        comments: options.add_comments.clone(),
        no_wrap: options.no_wrap,
    }
}

fn extract_file(
    path: &Path,
    language: Language,
    options: &Options,
    tables: &HashMap<Language, LanguageTables>,
    exclusions: &HashSet<MessageKey>,
) -> (Catalogue, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let mut catalogue = Catalogue::new(commit_settings(options));
    catalogue.set_exclusions(exclusions.clone());
    let display = path.display().to_string();

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            diagnostics.file_error(
                display,
                Severity::FatalError,
                format!("cannot read file: {}", err),
            );
            return (catalogue, diagnostics);
        }
    };
    let source = match decode_source(&bytes, &options.source_encoding) {
        Ok(source) => source,
        Err(err) => {
            diagnostics.file_error(display, Severity::FatalError, format!("{:#}", err));
            return (catalogue, diagnostics);
        }
    };

    let language_tables = &tables[&language];
    let mut context = FileContext {
        file: display,
        extract_all: options.extract_all,
        keywords: &language_tables.keywords,
        flags: &language_tables.flags,
        catalogue: &mut catalogue,
        diagnostics: &mut diagnostics,
    };
    extractors::extract(language, &source, &mut context);

    (catalogue, diagnostics)
}

/// Resolve the inputs to `(file, language)` pairs. Directories are walked
/// in sorted order; explicit files are taken as given. The forced
/// `--language` wins everywhere; otherwise the extension decides, and an
/// explicit file with an unknown extension is an error.
fn discover(inputs: &[PathBuf], options: &Options) -> Result<Vec<(PathBuf, Language)>> {
    let ignore_patterns: Vec<Pattern> = options
        .ignores
        .iter()
        .map(|p| Pattern::new(p))
        .collect::<Result<_, _>>()
        .context("Invalid --ignore pattern")?;
    let ignored = |path: &Path| {
        let text = path.to_string_lossy();
        ignore_patterns.iter().any(|p| p.matches(&text))
    };

    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !ignored(e.path()))
            {
                let entry = entry.with_context(|| format!("Failed to walk {}", input.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(extension_language) = language_of(entry.path()) else {
                    continue;
                };
                let language = match options.language {
                    Some(forced) if forced != extension_language => continue,
                    Some(forced) => forced,
                    None => extension_language,
                };
                files.push((entry.into_path(), language));
            }
        } else {
            if ignored(input) {
                continue;
            }
            let language = match options.language.or_else(|| language_of(input)) {
                Some(language) => language,
                None => bail!(
                    "cannot determine the language of {} (use --language)",
                    input.display()
                ),
            };
            files.push((input.clone(), language));
        }
    }
    Ok(files)
}

fn language_of(path: &Path) -> Option<Language> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    Language::from_extension(&extension)
}

fn build_options(args: &Arguments) -> Result<Options> {
    let config = match std::env::current_dir()
        .ok()
        .and_then(|dir| config::find_config_file(&dir))
    {
        Some(path) => config::load_config(&path)?,
        None => config::ConfigFile::default(),
    };

    let mut options = Options::default();

    options.ignores = config.ignores;
    options.ignores.extend(args.ignores.iter().cloned());
    options.keywords = config.keywords;
    options.keywords.extend(args.keywords.iter().cloned());
    options.flags = config.flags;
    options.flags.extend(args.flags.iter().cloned());

    let add_comments = args.add_comments.as_deref().or(config.add_comments.as_deref());
    options.add_comments = config::comment_filter(add_comments);

    if let Some(code) = &args.from_code {
        options.source_encoding = SourceEncoding::from_label(code);
    }
    options.extract_all = args.extract_all;
    options.exclude_file = args.exclude_file.clone();
    options.omit_header = args.omit_header;
    options.msgstr_prefix = args.msgstr_prefix.clone().unwrap_or_default();
    options.msgstr_suffix = args.msgstr_suffix.clone().unwrap_or_default();
    if let Some(holder) = args.copyright_holder.clone().or(config.copyright_holder) {
        options.copyright_holder = holder;
    }
    options.msgid_bugs_address = args
        .msgid_bugs_address
        .clone()
        .or(config.msgid_bugs_address);
    options.package_name = args.package_name.clone().or(config.package_name);
    options.package_version = args.package_version.clone().or(config.package_version);
    options.add_location = !args.no_location;
    options.no_wrap = args.no_wrap;
    options.language = args.language;
    options.output = args.output.clone();

    Ok(options)
}

/// `POT-Creation-Date` value: current UTC time, minute precision.
fn creation_date() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (year, month, day) = civil_from_days((secs / 86400) as i64);
    let rem = secs % 86400;
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}+0000",
        year,
        month,
        day,
        rem / 3600,
        (rem % 3600) / 60
    )
}

/// Gregorian date from days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_civil_from_days() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
        // Leap day.
        assert_eq!(civil_from_days(19_782), (2024, 2, 29));
    }

    #[test]
    fn test_language_of() {
        assert_eq!(language_of(Path::new("src/a.c")), Some(Language::C));
        assert_eq!(language_of(Path::new("b.PY")), Some(Language::Python));
        assert_eq!(language_of(Path::new("noext")), None);
    }

    #[test]
    fn test_tables_defaults_disabled_by_empty_spec() {
        let options = Options {
            keywords: vec![String::new(), "tr:1".to_string()],
            ..Options::default()
        };
        let tables = LanguageTables::build(Language::C, &options);
        assert!(tables.keywords.lookup("gettext").is_none());
        assert!(tables.keywords.lookup("tr").is_some());
    }
}
