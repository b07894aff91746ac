//! A minimal PO reader: just enough to build an exclusion set.
//!
//! `--exclude-file` takes an existing PO/POT file whose entries must not
//! appear in the output. Only the `(msgctxt, msgid)` keys matter, so this
//! parser tracks the current field across lines (including `"…"`
//! continuation lines), decodes string escapes, and ignores everything
//! else: comments, flags, plural blocks, obsolete entries.

use std::collections::HashSet;

use anyhow::{Result, bail};

use crate::catalogue::MessageKey;

#[derive(PartialEq, Clone, Copy)]
enum Field {
    None,
    Ctxt,
    Id,
    Other,
}

/// Parse PO text into the set of `(msgctxt, msgid)` keys it defines.
pub fn read_exclusion_keys(text: &str) -> Result<HashSet<MessageKey>> {
    let mut keys = HashSet::new();
    let mut field = Field::None;
    let mut msgctxt: Option<String> = None;
    let mut msgid: Option<String> = None;

    let mut flush = |msgctxt: &mut Option<String>, msgid: &mut Option<String>| {
        if let Some(id) = msgid.take() {
            keys.insert(MessageKey::new(msgctxt.take(), id));
        } else {
            *msgctxt = None;
        }
    };

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("msgctxt") {
            flush(&mut msgctxt, &mut msgid);
            msgctxt = Some(quoted(rest, number + 1)?);
            field = Field::Ctxt;
        } else if let Some(rest) = line.strip_prefix("msgid_plural") {
            let _ = quoted(rest, number + 1)?;
            field = Field::Other;
        } else if let Some(rest) = line.strip_prefix("msgid") {
            if msgid.is_some() {
                flush(&mut msgctxt, &mut msgid);
            }
            msgid = Some(quoted(rest, number + 1)?);
            field = Field::Id;
        } else if let Some(rest) = line.strip_prefix("msgstr") {
            let rest = rest.trim_start_matches(|c: char| c == '[' || c == ']' || c.is_ascii_digit());
            let _ = quoted(rest, number + 1)?;
            field = Field::Other;
        } else if line.starts_with('"') {
            let continuation = unquote(line, number + 1)?;
            match field {
                Field::Ctxt => {
                    if let Some(ctxt) = &mut msgctxt {
                        ctxt.push_str(&continuation);
                    }
                }
                Field::Id => {
                    if let Some(id) = &mut msgid {
                        id.push_str(&continuation);
                    }
                }
                Field::Other => {}
                Field::None => bail!("line {}: stray string continuation", number + 1),
            }
        } else {
            bail!("line {}: cannot parse PO line: {}", number + 1, line);
        }
    }
    flush(&mut msgctxt, &mut msgid);
    Ok(keys)
}

fn quoted(rest: &str, line_number: usize) -> Result<String> {
    unquote(rest.trim(), line_number)
}

fn unquote(text: &str, line_number: usize) -> Result<String> {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| anyhow::anyhow!("line {}: expected a quoted string", line_number))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_simple_entries() {
        let keys = read_exclusion_keys(
            "msgid \"one\"\nmsgstr \"\"\n\nmsgid \"two\"\nmsgstr \"done\"\n",
        )
        .unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&MessageKey::new(None, "one")));
        assert!(keys.contains(&MessageKey::new(None, "two")));
    }

    #[test]
    fn test_context_key() {
        let keys = read_exclusion_keys(
            "msgctxt \"menu\"\nmsgid \"Open\"\nmsgstr \"\"\n\nmsgid \"Open\"\nmsgstr \"\"\n",
        )
        .unwrap();
        assert!(keys.contains(&MessageKey::new(Some("menu".into()), "Open")));
        assert!(keys.contains(&MessageKey::new(None, "Open")));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_continuation_lines() {
        let keys = read_exclusion_keys(
            "msgid \"\"\n\"first\\n\"\n\"second\"\nmsgstr \"\"\n",
        )
        .unwrap();
        assert!(keys.contains(&MessageKey::new(None, "first\nsecond")));
    }

    #[test]
    fn test_plural_entry_keyed_by_singular() {
        let keys = read_exclusion_keys(
            "msgid \"file\"\nmsgid_plural \"files\"\nmsgstr[0] \"\"\nmsgstr[1] \"\"\n",
        )
        .unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys.contains(&MessageKey::new(None, "file")));
    }

    #[test]
    fn test_comments_and_header_ignored() {
        let keys = read_exclusion_keys(
            "# translator comment\n#: a.c:1\n#, fuzzy\nmsgid \"\"\nmsgstr \"\"\n\
             \nmsgid \"real\"\nmsgstr \"\"\n",
        )
        .unwrap();
        assert!(keys.contains(&MessageKey::new(None, "real")));
        // The header key ("") is present but harmless: empty msgids are
        // never committed anyway.
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_escapes_decoded() {
        let keys = read_exclusion_keys("msgid \"a\\\"b\\\\c\"\nmsgstr \"\"\n").unwrap();
        assert!(keys.contains(&MessageKey::new(None, "a\"b\\c")));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(read_exclusion_keys("not a po file\n").is_err());
    }
}
