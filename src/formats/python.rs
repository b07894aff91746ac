//! The Python `%` (percent-operator) format-string grammar.
//!
//! Recognised directive syntax:
//!
//! ```text
//! % [(name)] [flags] [width] [.precision] [length] conversion
//! ```
//!
//! with `flags` from `- + space # 0`, `width`/`precision` either digits or
//! `*`, `length` one of `h l L` (ignored by Python, tolerated here), and
//! `conversion` one of `d i o u x X e E f F g G c s r a %`.
//!
//! A string is either fully named (`%(count)d`) or fully unnamed; mixing
//! is a parse error. `*` widths are only meaningful in unnamed mode
//! (Python raises at runtime otherwise) and are rejected in named mode.

use crate::flags::FormatLanguage;

use super::{
    ArgType, BaseType, Descriptor, Directives, FormatParser, IntWidth, Repr,
    sort_and_merge_numbered,
};

#[derive(Debug, Clone, Copy)]
pub struct PythonFormat;

impl FormatParser for PythonFormat {
    fn parse(&self, text: &str, is_translated: bool) -> Result<Descriptor, String> {
        let mut chars = text.chars().peekable();
        let mut named: Vec<(String, ArgType)> = Vec::new();
        let mut unnamed: Vec<(usize, ArgType)> = Vec::new();
        let mut next_number = 1usize;
        let mut spaced = 0usize;

        while let Some(c) = chars.next() {
            if c != '%' {
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                continue;
            }

            let name = if chars.peek() == Some(&'(') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some(c) => name.push(c),
                        None => return Err("unterminated argument name".to_string()),
                    }
                }
                Some(name)
            } else {
                None
            };

            let mut seen_space = false;
            while let Some(&c) = chars.peek() {
                if matches!(c, '-' | '+' | ' ' | '#' | '0') {
                    if c == ' ' {
                        seen_space = true;
                    }
                    chars.next();
                } else {
                    break;
                }
            }

            let mut star_slots = 0usize;
            for _ in 0..2 {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    if name.is_some() {
                        return Err(
                            "'*' width is not allowed together with named arguments".to_string()
                        );
                    }
                    star_slots += 1;
                } else {
                    while let Some(&c) = chars.peek() {
                        if c.is_ascii_digit() {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                if chars.peek() == Some(&'.') {
                    chars.next();
                } else {
                    break;
                }
            }

            if let Some(&c) = chars.peek() {
                if matches!(c, 'h' | 'l' | 'L') {
                    chars.next();
                }
            }

            let Some(conversion) = chars.next() else {
                return Err("unterminated format directive".to_string());
            };
            let arg_type = match conversion {
                'd' | 'i' | 'o' | 'u' | 'x' | 'X' => {
                    ArgType::plain(BaseType::Integer(IntWidth::Native))
                }
                'e' | 'E' | 'f' | 'F' | 'g' | 'G' => ArgType::plain(BaseType::Float),
                'c' => ArgType::plain(BaseType::Character),
                's' => ArgType {
                    base: BaseType::Any,
                    repr: Repr::Either,
                },
                'r' | 'a' => ArgType {
                    base: BaseType::Any,
                    repr: Repr::Language,
                },
                other => {
                    return Err(format!("'{}' is not a valid conversion specifier", other));
                }
            };

            match name {
                Some(name) => {
                    if !unnamed.is_empty() {
                        return Err(
                            "format string mixes named and unnamed arguments".to_string()
                        );
                    }
                    if let Some((_, existing)) =
                        named.iter().find(|(existing, _)| *existing == name)
                    {
                        if *existing != arg_type {
                            return Err(format!("incompatible types for argument '{}'", name));
                        }
                    } else {
                        named.push((name, arg_type));
                    }
                    if seen_space {
                        spaced += 1;
                    }
                }
                None => {
                    if !named.is_empty() {
                        return Err(
                            "format string mixes named and unnamed arguments".to_string()
                        );
                    }
                    for _ in 0..star_slots {
                        unnamed.push((
                            next_number,
                            ArgType::plain(BaseType::Integer(IntWidth::Native)),
                        ));
                        next_number += 1;
                    }
                    unnamed.push((next_number, arg_type));
                    next_number += 1;
                    if seen_space {
                        spaced += 1 + star_slots;
                    }
                }
            }
        }

        let slot_count = named.len() + unnamed.len();
        let unlikely = !is_translated && slot_count > 0 && spaced == slot_count;
        let directives = if !named.is_empty() {
            Directives::Named(named)
        } else {
            Directives::Numbered(sort_and_merge_numbered(unnamed)?)
        };
        Ok(Descriptor::new(directives, unlikely))
    }

    fn language(&self) -> FormatLanguage {
        FormatLanguage::Python
    }
}
