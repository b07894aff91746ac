//! The Python `str.format` (brace) format-string grammar.
//!
//! Recognised replacement-field syntax:
//!
//! ```text
//! { [arg_name] ['.' attribute | '[' index ']']* ['!' conversion] [':' spec] }
//! ```
//!
//! `arg_name` is empty (automatic numbering), all digits (manual
//! numbering), or an identifier (named mode). `{{` and `}}` are literal
//! braces. A format spec may itself contain replacement fields one level
//! deep (`{0:{width}}`); each nested field allocates an argument slot of
//! its own.
//!
//! Mixing automatic and manual numbering is a parse error (as in Python),
//! and so is mixing named and numbered fields within one string.

use crate::flags::FormatLanguage;

use super::{
    ArgType, BaseType, Descriptor, Directives, FormatParser, Repr, sort_and_merge_numbered,
};

#[derive(Debug, Clone, Copy)]
pub struct PythonBraceFormat;

#[derive(Default)]
struct Fields {
    named: Vec<(String, ArgType)>,
    numbered: Vec<(usize, ArgType)>,
    auto_counter: usize,
    manual_seen: bool,
    auto_seen: bool,
}

impl Fields {
    fn any() -> ArgType {
        ArgType {
            base: BaseType::Any,
            repr: Repr::Either,
        }
    }

    fn add_auto(&mut self) -> Result<(), String> {
        if self.manual_seen {
            return Err(
                "cannot switch from manual to automatic field numbering".to_string()
            );
        }
        if !self.named.is_empty() {
            return Err("format string mixes named and numbered arguments".to_string());
        }
        self.auto_seen = true;
        self.numbered.push((self.auto_counter, Self::any()));
        self.auto_counter += 1;
        Ok(())
    }

    fn add_manual(&mut self, number: usize) -> Result<(), String> {
        if self.auto_seen {
            return Err(
                "cannot switch from automatic to manual field numbering".to_string()
            );
        }
        if !self.named.is_empty() {
            return Err("format string mixes named and numbered arguments".to_string());
        }
        self.manual_seen = true;
        self.numbered.push((number, Self::any()));
        Ok(())
    }

    fn add_named(&mut self, name: String) -> Result<(), String> {
        if !self.numbered.is_empty() {
            return Err("format string mixes named and numbered arguments".to_string());
        }
        if !self.named.iter().any(|(existing, _)| *existing == name) {
            self.named.push((name, Self::any()));
        }
        Ok(())
    }
}

impl FormatParser for PythonBraceFormat {
    fn parse(&self, text: &str, _is_translated: bool) -> Result<Descriptor, String> {
        let mut chars = text.chars().peekable();
        let mut fields = Fields::default();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    if chars.peek() == Some(&'{') {
                        chars.next();
                        continue;
                    }
                    parse_field(&mut chars, &mut fields, 0)?;
                }
                '}' => {
                    if chars.peek() == Some(&'}') {
                        chars.next();
                        continue;
                    }
                    return Err("single '}' encountered in format string".to_string());
                }
                _ => {}
            }
        }

        // The brace grammar has no way to put a space inside a directive,
        // so the unlikely-intentional heuristic never fires for it.
        let directives = if !fields.named.is_empty() {
            Directives::Named(fields.named)
        } else {
            Directives::Numbered(sort_and_merge_numbered(fields.numbered)?)
        };
        Ok(Descriptor::new(directives, false))
    }

    fn language(&self) -> FormatLanguage {
        FormatLanguage::PythonBrace
    }
}

fn parse_field(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    fields: &mut Fields,
    depth: usize,
) -> Result<(), String> {
    // arg_name
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }

    if name.is_empty() {
        fields.add_auto()?;
    } else if name.chars().all(|c| c.is_ascii_digit()) {
        let number: usize = name
            .parse()
            .map_err(|_| "argument number out of range".to_string())?;
        fields.add_manual(number)?;
    } else {
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(format!("invalid argument name '{}'", name));
        }
        fields.add_named(name)?;
    }

    // attribute and index accesses
    loop {
        match chars.peek() {
            Some('.') => {
                chars.next();
                let mut attr = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        attr.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if attr.is_empty() {
                    return Err("missing attribute name after '.'".to_string());
                }
            }
            Some('[') => {
                chars.next();
                let mut index = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(c) => index.push(c),
                        None => return Err("unterminated index access".to_string()),
                    }
                }
                if index.is_empty() {
                    return Err("empty index access".to_string());
                }
            }
            _ => break,
        }
    }

    // conversion
    if chars.peek() == Some(&'!') {
        chars.next();
        match chars.next() {
            Some('r' | 's' | 'a') => {}
            Some(other) => return Err(format!("unknown conversion '!{}'", other)),
            None => return Err("unterminated replacement field".to_string()),
        }
    }

    // format spec, possibly with nested fields
    if chars.peek() == Some(&':') {
        chars.next();
        loop {
            match chars.next() {
                Some('}') => return Ok(()),
                Some('{') => {
                    if depth >= 1 {
                        return Err("replacement fields nested too deeply".to_string());
                    }
                    parse_field(chars, fields, depth + 1)?;
                }
                Some(_) => {}
                None => return Err("unterminated replacement field".to_string()),
            }
        }
    }

    match chars.next() {
        Some('}') => Ok(()),
        _ => Err("unterminated replacement field".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(text: &str) -> Result<Descriptor, String> {
        PythonBraceFormat.parse(text, false)
    }

    #[test]
    fn test_named_fields() {
        let descriptor = parse("{name} has {count}").unwrap();
        assert_eq!(descriptor.directive_count(), 2);
        let Directives::Named(args) = descriptor.directives() else {
            panic!("expected named directives");
        };
        assert_eq!(args[0].0, "name");
        assert_eq!(args[1].0, "count");
    }

    #[test]
    fn test_automatic_numbering() {
        let descriptor = parse("{} and {}").unwrap();
        assert_eq!(descriptor.directive_count(), 2);
    }

    #[test]
    fn test_manual_numbering_merges_duplicates() {
        let descriptor = parse("{0} and {0}").unwrap();
        assert_eq!(descriptor.directive_count(), 1);
    }

    #[test]
    fn test_switching_numbering_styles_rejected() {
        assert!(parse("{} and {1}").is_err());
        assert!(parse("{1} and {}").is_err());
    }

    #[test]
    fn test_mixing_named_and_numbered_rejected() {
        assert!(parse("{0} and {name}").is_err());
        assert!(parse("{name} and {0}").is_err());
    }

    #[test]
    fn test_attributes_and_indexes() {
        let descriptor = parse("{user.name} at {rows[0]}").unwrap();
        let Directives::Named(args) = descriptor.directives() else {
            panic!("expected named directives");
        };
        assert_eq!(args[0].0, "user");
        assert_eq!(args[1].0, "rows");
    }

    #[test]
    fn test_conversion_and_spec() {
        let descriptor = parse("{value!r:>10}").unwrap();
        assert_eq!(descriptor.directive_count(), 1);
        assert!(parse("{value!q}").is_err());
    }

    #[test]
    fn test_nested_spec_fields() {
        let descriptor = parse("{0:{width}.{precision}}");
        // Mixing the numbered outer field with named nested fields is
        // still a kind mix and must fail.
        assert!(descriptor.is_err());

        let descriptor = parse("{value:{width}}").unwrap();
        assert_eq!(descriptor.directive_count(), 2);
    }

    #[test]
    fn test_doubled_braces_are_literal() {
        let descriptor = parse("{{not a field}}").unwrap();
        assert_eq!(descriptor.directive_count(), 0);
    }

    #[test]
    fn test_stray_close_brace_rejected() {
        assert!(parse("oops }").is_err());
    }

    #[test]
    fn test_unterminated_field_rejected() {
        assert!(parse("{name").is_err());
    }
}
