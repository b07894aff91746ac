//! POT serialization.
//!
//! Renders a [`Catalogue`] in PO template format: the header entry first,
//! then every message in extraction order with its `#.` extracted
//! comments, `#:` references, `#,` flags, and the msgctxt / msgid /
//! msgid_plural / msgstr block. Long strings wrap at spaces; strings with
//! embedded newlines split after each `\n`, matching the usual PO layout.

use std::fmt::Write as _;

use crate::catalogue::{Catalogue, FormatClassification, Message};
use crate::flags::FORMAT_LANGUAGES;

/// Target width for wrapped string segments and `#:` reference lines.
const WRAP_WIDTH: usize = 77;

#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Emit `#: file:line` reference comments.
    pub add_location: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self { add_location: true }
    }
}

/// Render the whole catalogue as POT text.
pub fn write_pot(catalogue: &Catalogue, options: &WriterOptions) -> String {
    let mut out = String::new();

    if let Some(header) = catalogue.header() {
        for line in &header.translator_comments {
            writeln!(out, "# {}", line).unwrap();
        }
        out.push_str("#\n");
        if header.fuzzy {
            out.push_str("#, fuzzy\n");
        }
        out.push_str("msgid \"\"\n");
        write_string(&mut out, "msgstr", &header.msgstr, true);
        out.push('\n');
    }

    for message in catalogue.messages() {
        write_message(&mut out, catalogue, message, options);
        out.push('\n');
    }

    // Drop the trailing separator so the file ends with one newline.
    if out.ends_with("\n\n") {
        out.pop();
    }
    out
}

fn write_message(out: &mut String, catalogue: &Catalogue, message: &Message, options: &WriterOptions) {
    for line in &message.comments {
        writeln!(out, "#. {}", line).unwrap();
    }

    if options.add_location && !message.positions.is_empty() {
        let mut line = String::from("#:");
        for position in &message.positions {
            let reference = position.to_string();
            if line.len() + 1 + reference.len() > WRAP_WIDTH && line != "#:" {
                writeln!(out, "{}", line).unwrap();
                line = String::from("#:");
            }
            line.push(' ');
            line.push_str(&reference);
        }
        writeln!(out, "{}", line).unwrap();
    }

    let mut flags: Vec<String> = Vec::new();
    if message.fuzzy {
        flags.push("fuzzy".to_string());
    }
    for language in FORMAT_LANGUAGES {
        match message.format(language) {
            FormatClassification::Yes => flags.push(language.name().to_string()),
            FormatClassification::No => flags.push(format!("no-{}", language.name())),
            FormatClassification::Possible | FormatClassification::Undecided => {}
        }
    }
    if !message.wrap {
        flags.push("no-wrap".to_string());
    }
    if !flags.is_empty() {
        writeln!(out, "#, {}", flags.join(", ")).unwrap();
    }

    if let Some(msgctxt) = message.msgctxt() {
        write_string(out, "msgctxt", msgctxt, message.wrap);
    }
    write_string(out, "msgid", message.msgid(), message.wrap);
    match &message.msgid_plural {
        Some(plural) => {
            write_string(out, "msgid_plural", plural, message.wrap);
            write_string(out, "msgstr[0]", &message.msgstr, message.wrap);
            let plural_template = catalogue.settings().initial_msgstr_for(plural);
            write_string(out, "msgstr[1]", &plural_template, message.wrap);
        }
        None => {
            write_string(out, "msgstr", &message.msgstr, message.wrap);
        }
    }
}

/// Write one `keyword "…"` block, splitting the value into continuation
/// segments when it contains newlines or exceeds the wrap width.
fn write_string(out: &mut String, keyword: &str, value: &str, wrap: bool) {
    let segments = split_segments(value, wrap);
    if segments.len() == 1 {
        writeln!(out, "{} \"{}\"", keyword, escape(&segments[0])).unwrap();
    } else {
        writeln!(out, "{} \"\"", keyword).unwrap();
        for segment in segments {
            writeln!(out, "\"{}\"", escape(&segment)).unwrap();
        }
    }
}

/// Split a value into PO string segments: after each embedded newline,
/// and (when wrapping is on) at spaces so no segment overflows the width.
fn split_segments(value: &str, wrap: bool) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut rest = value;
    while let Some(idx) = rest.find('\n') {
        lines.push(rest[..=idx].to_string());
        rest = &rest[idx + 1..];
    }
    if !rest.is_empty() {
        lines.push(rest.to_string());
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    if !wrap {
        return lines;
    }
    let mut segments = Vec::new();
    for line in lines {
        if escaped_len(&line) <= WRAP_WIDTH {
            segments.push(line);
            continue;
        }
        let mut current = String::new();
        for word in split_after_spaces(&line) {
            if !current.is_empty() && escaped_len(&current) + escaped_len(&word) > WRAP_WIDTH {
                segments.push(std::mem::take(&mut current));
            }
            current.push_str(&word);
        }
        if !current.is_empty() {
            segments.push(current);
        }
    }
    segments
}

/// Split into chunks that each end just after a space, so rejoining the
/// chunks reproduces the original text.
fn split_after_spaces(line: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for c in line.chars() {
        current.push(c);
        if c == ' ' {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn escaped_len(text: &str) -> usize {
    escape(text).chars().count()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::catalogue::{CommitSettings, HeaderFields, MessageDraft, MessagePosition};
    use crate::diagnostics::Diagnostics;
    use crate::flags::Region;

    use super::*;

    fn draft(msgid: &str, file: &str, line: usize) -> MessageDraft {
        MessageDraft {
            msgctxt: None,
            msgid: msgid.to_string(),
            msgid_plural: None,
            position: MessagePosition::new(file, line),
            comments: None,
            extra_comments: Vec::new(),
            region: Region::root(),
        }
    }

    #[test]
    fn test_simple_entry() {
        let mut catalogue = Catalogue::new(CommitSettings::default());
        let mut diags = Diagnostics::new();
        catalogue.commit(draft("hello", "a.c", 10), &mut diags);

        let text = write_pot(&catalogue, &WriterOptions::default());
        assert_eq!(text, "#: a.c:10\nmsgid \"hello\"\nmsgstr \"\"\n");
    }

    #[test]
    fn test_context_and_plural_layout() {
        let mut catalogue = Catalogue::new(CommitSettings::default());
        let mut diags = Diagnostics::new();
        let mut d = draft("item", "b.c", 3);
        d.msgctxt = Some("menu".to_string());
        d.msgid_plural = Some("items".to_string());
        catalogue.commit(d, &mut diags);

        let text = write_pot(&catalogue, &WriterOptions::default());
        assert_eq!(
            text,
            "#: b.c:3\nmsgctxt \"menu\"\nmsgid \"item\"\nmsgid_plural \"items\"\n\
             msgstr[0] \"\"\nmsgstr[1] \"\"\n"
        );
    }

    #[test]
    fn test_extracted_comments_and_flags() {
        let mut catalogue = Catalogue::new(CommitSettings {
            comments: crate::catalogue::CommentFilter::All,
            ..CommitSettings::default()
        });
        let mut diags = Diagnostics::new();
        let mut d = draft("%d items", "c.c", 1);
        d.comments = Some(std::rc::Rc::from(
            vec!["TRANSLATORS: count".to_string()].as_slice(),
        ));
        catalogue.commit(d, &mut diags);

        let text = write_pot(&catalogue, &WriterOptions::default());
        // A plausible format string without a decided context carries no
        // format flag.
        assert_eq!(
            text,
            "#. TRANSLATORS: count\n#: c.c:1\nmsgid \"%d items\"\nmsgstr \"\"\n"
        );
    }

    #[test]
    fn test_embedded_newlines_split() {
        let mut catalogue = Catalogue::new(CommitSettings::default());
        let mut diags = Diagnostics::new();
        catalogue.commit(draft("first\nsecond\n", "d.c", 1), &mut diags);

        let text = write_pot(&catalogue, &WriterOptions { add_location: false });
        assert_eq!(text, "msgid \"\"\n\"first\\n\"\n\"second\\n\"\nmsgstr \"\"\n");
    }

    #[test]
    fn test_escaping() {
        let mut catalogue = Catalogue::new(CommitSettings::default());
        let mut diags = Diagnostics::new();
        catalogue.commit(draft("say \"hi\"\tnow", "e.c", 1), &mut diags);

        let text = write_pot(&catalogue, &WriterOptions { add_location: false });
        assert_eq!(text, "msgid \"say \\\"hi\\\"\\tnow\"\nmsgstr \"\"\n");
    }

    #[test]
    fn test_header_written_first_with_fuzzy() {
        let mut catalogue = Catalogue::new(CommitSettings::default());
        let mut diags = Diagnostics::new();
        catalogue.commit(draft("x", "f.c", 1), &mut diags);
        catalogue.synthesize_header(&HeaderFields::default(), "2026-08-01 00:00+0000");

        let text = write_pot(&catalogue, &WriterOptions::default());
        assert!(text.starts_with("# SOME DESCRIPTIVE TITLE.\n"));
        assert!(text.contains("#, fuzzy\nmsgid \"\"\nmsgstr \"\"\n"));
        assert!(text.contains("\"Project-Id-Version: PACKAGE VERSION\\n\"\n"));
        // The header block is followed by a blank line, then the entry.
        assert!(text.contains("\\n\"\n\n#: f.c:1\nmsgid \"x\"\n"));
    }

    #[test]
    fn test_long_line_wrapped_at_spaces() {
        let mut catalogue = Catalogue::new(CommitSettings::default());
        let mut diags = Diagnostics::new();
        let long = "this message is deliberately written to be much longer than the \
                    seventy-seven column wrap limit used for portable object files";
        catalogue.commit(draft(long, "g.c", 1), &mut diags);

        let text = write_pot(&catalogue, &WriterOptions { add_location: false });
        assert!(text.starts_with("msgid \"\"\n"));
        // Rejoining the segments must reproduce the original text.
        let joined: String = text
            .lines()
            .filter(|l| l.starts_with('"'))
            .map(|l| l.trim_matches('"'))
            .collect();
        assert_eq!(joined, long);
    }

    #[test]
    fn test_no_wrap_flag_and_behaviour() {
        let mut catalogue = Catalogue::new(CommitSettings {
            no_wrap: true,
            ..CommitSettings::default()
        });
        let mut diags = Diagnostics::new();
        catalogue.commit(draft("short", "h.c", 1), &mut diags);

        let text = write_pot(&catalogue, &WriterOptions { add_location: false });
        assert_eq!(text, "#, no-wrap\nmsgid \"short\"\nmsgstr \"\"\n");
    }
}
