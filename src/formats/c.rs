//! The C (printf) format-string grammar.
//!
//! Recognised directive syntax:
//!
//! ```text
//! % [N$] [flags] [width] [.precision] [length] conversion
//! ```
//!
//! where `width` and `precision` may be `*` or `*N$` (each `*` consumes an
//! integer argument of its own), `flags` are `- + space # 0 ' I`, `length`
//! is one of `hh h l ll L q j z t`, and `conversion` is one of
//! `d i o u x X e E f F g G a A c s p n m %`.
//!
//! A string either numbers all of its argument slots (`%N$…`, `*N$`) or
//! none of them; mixing the two styles is a parse error, as is a repeated
//! number with a different type.

use crate::flags::FormatLanguage;

use super::{
    ArgType, BaseType, Descriptor, Directives, FormatParser, IntWidth, Repr,
    sort_and_merge_numbered,
};

#[derive(Debug, Clone, Copy)]
pub struct CFormat;

#[derive(PartialEq, Clone, Copy)]
enum Mode {
    Numbered,
    Unnumbered,
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    args: Vec<(usize, ArgType)>,
    mode: Option<Mode>,
    next_number: usize,
    /// Count of argument-consuming directives whose text contains a space.
    spaced_directives: usize,
}

impl FormatParser for CFormat {
    fn parse(&self, text: &str, is_translated: bool) -> Result<Descriptor, String> {
        let mut parser = Parser {
            chars: text.chars().peekable(),
            args: Vec::new(),
            mode: None,
            next_number: 1,
            spaced_directives: 0,
        };
        parser.run()?;

        let unlikely = !is_translated
            && !parser.args.is_empty()
            && parser.spaced_directives == parser.args.len();
        let args = sort_and_merge_numbered(parser.args)?;
        Ok(Descriptor::new(Directives::Numbered(args), unlikely))
    }

    fn language(&self) -> FormatLanguage {
        FormatLanguage::C
    }
}

impl Parser<'_> {
    fn run(&mut self) -> Result<(), String> {
        while let Some(c) = self.chars.next() {
            if c == '%' {
                self.directive()?;
            }
        }
        Ok(())
    }

    fn directive(&mut self) -> Result<(), String> {
        if self.chars.peek() == Some(&'%') {
            self.chars.next();
            return Ok(());
        }

        let mut seen_space = false;
        let slots_before = self.args.len();

        let number = self.positional_reference()?;

        // Flags. The space flag is what the unlikely-intentional heuristic
        // is looking for.
        while let Some(&c) = self.chars.peek() {
            if matches!(c, '-' | '+' | ' ' | '#' | '0' | '\'' | 'I') {
                if c == ' ' {
                    seen_space = true;
                }
                self.chars.next();
            } else {
                break;
            }
        }

        self.width_or_precision(number.is_some())?;
        if self.chars.peek() == Some(&'.') {
            self.chars.next();
            self.width_or_precision(number.is_some())?;
        }

        let length = self.length_modifier();

        let Some(conversion) = self.chars.next() else {
            return Err("unterminated format directive".to_string());
        };
        let arg_type = match conversion {
            'd' | 'i' | 'o' | 'u' | 'x' | 'X' => {
                ArgType::plain(BaseType::Integer(integer_width(&length)))
            }
            'e' | 'E' | 'f' | 'F' | 'g' | 'G' | 'a' | 'A' => ArgType::plain(BaseType::Float),
            'c' => ArgType::plain(BaseType::Character),
            's' => ArgType {
                base: BaseType::String,
                repr: Repr::Either,
            },
            'p' => ArgType::plain(BaseType::Pointer),
            'n' => ArgType::plain(BaseType::Count),
            // glibc's %m consumes no argument.
            'm' => return Ok(()),
            other => {
                return Err(format!(
                    "'{}' is not a valid conversion specifier",
                    other
                ));
            }
        };
        self.allocate(number, arg_type)?;

        if seen_space {
            // Attribute the space to every slot this directive allocated
            // (the conversion's own slot plus any `*` slots).
            self.spaced_directives += self.args.len() - slots_before;
        }
        Ok(())
    }

    /// `N$` immediately after the `%` (or after a `*`).
    fn positional_reference(&mut self) -> Result<Option<usize>, String> {
        let mut digits = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if digits.is_empty() {
            return Ok(None);
        }
        if self.chars.peek() == Some(&'$') {
            self.chars.next();
            let number: usize = digits
                .parse()
                .map_err(|_| "argument number out of range".to_string())?;
            if number == 0 {
                return Err("argument number 0 is not allowed".to_string());
            }
            return Ok(Some(number));
        }
        // Plain digits were a width; nothing to do.
        Ok(None)
    }

    /// A width or precision: digits, `*`, or `*N$`. Each `*` allocates an
    /// integer argument slot.
    fn width_or_precision(&mut self, numbered: bool) -> Result<(), String> {
        if self.chars.peek() == Some(&'*') {
            self.chars.next();
            let number = self.positional_reference()?;
            if numbered && number.is_none() {
                return Err("format string mixes numbered and unnumbered arguments".to_string());
            }
            self.allocate(number, ArgType::plain(BaseType::Integer(IntWidth::Native)))?;
            return Ok(());
        }
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.chars.next();
            } else {
                break;
            }
        }
        Ok(())
    }

    fn length_modifier(&mut self) -> String {
        let mut length = String::new();
        while let Some(&c) = self.chars.peek() {
            if matches!(c, 'h' | 'l' | 'L' | 'q' | 'j' | 'z' | 't') {
                length.push(c);
                self.chars.next();
                if length.len() == 2 {
                    break;
                }
            } else {
                break;
            }
        }
        length
    }

    fn allocate(&mut self, number: Option<usize>, arg_type: ArgType) -> Result<(), String> {
        match number {
            Some(number) => {
                if self.mode == Some(Mode::Unnumbered) {
                    return Err(
                        "format string mixes numbered and unnumbered arguments".to_string()
                    );
                }
                self.mode = Some(Mode::Numbered);
                self.args.push((number, arg_type));
            }
            None => {
                if self.mode == Some(Mode::Numbered) {
                    return Err(
                        "format string mixes numbered and unnumbered arguments".to_string()
                    );
                }
                self.mode = Some(Mode::Unnumbered);
                self.args.push((self.next_number, arg_type));
                self.next_number += 1;
            }
        }
        Ok(())
    }
}

fn integer_width(length: &str) -> IntWidth {
    match length {
        "ll" | "q" | "j" => IntWidth::Int64,
        "l" | "z" | "t" => IntWidth::Long,
        _ => IntWidth::Native,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(text: &str) -> Result<Descriptor, String> {
        CFormat.parse(text, false)
    }

    fn numbered(descriptor: &Descriptor) -> &[(usize, ArgType)] {
        match descriptor.directives() {
            Directives::Numbered(args) => args,
            Directives::Named(_) => panic!("expected numbered directives"),
        }
    }

    #[test]
    fn test_simple_directives() {
        let descriptor = parse("%d items in %s").unwrap();
        let args = numbered(&descriptor);
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].1.base, BaseType::Integer(IntWidth::Native));
        assert_eq!(args[1].1.base, BaseType::String);
    }

    #[test]
    fn test_positional_references_sorted() {
        let descriptor = parse("%2$s owns %1$d files").unwrap();
        let args = numbered(&descriptor);
        assert_eq!(args[0].0, 1);
        assert_eq!(args[0].1.base, BaseType::Integer(IntWidth::Native));
        assert_eq!(args[1].0, 2);
        assert_eq!(args[1].1.base, BaseType::String);
    }

    #[test]
    fn test_star_width_allocates_integer_slot() {
        let descriptor = parse("%.*f").unwrap();
        let args = numbered(&descriptor);
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].1.base, BaseType::Integer(IntWidth::Native));
        assert_eq!(args[1].1.base, BaseType::Float);
    }

    #[test]
    fn test_length_modifiers() {
        let args = |text: &str| numbered(&parse(text).unwrap()).to_vec();
        assert_eq!(args("%hhd")[0].1.base, BaseType::Integer(IntWidth::Native));
        assert_eq!(args("%ld")[0].1.base, BaseType::Integer(IntWidth::Long));
        assert_eq!(args("%zu")[0].1.base, BaseType::Integer(IntWidth::Long));
        assert_eq!(args("%lld")[0].1.base, BaseType::Integer(IntWidth::Int64));
        assert_eq!(args("%jd")[0].1.base, BaseType::Integer(IntWidth::Int64));
    }

    #[test]
    fn test_percent_escape_consumes_nothing() {
        let descriptor = parse("100%% complete").unwrap();
        assert_eq!(descriptor.directive_count(), 0);
    }

    #[test]
    fn test_mixing_styles_rejected() {
        assert!(parse("%1$d and %d").is_err());
        assert!(parse("%d and %1$d").is_err());
        assert!(parse("%1$*d").is_err());
    }

    #[test]
    fn test_argument_zero_rejected() {
        assert!(parse("%0$d").is_err());
    }

    #[test]
    fn test_unknown_conversion_rejected() {
        assert!(parse("%y").is_err());
        assert!(parse("hanging %").is_err());
    }

    #[test]
    fn test_duplicate_number_conflicting_type_rejected() {
        assert!(parse("%1$d %1$s").is_err());
        assert!(parse("%1$d %1$d").is_ok());
    }

    #[test]
    fn test_space_flag_is_unlikely_intentional() {
        // "100% of files" parses as a "% o" directive; the space marks it
        // as probably not a format string at all.
        let descriptor = parse("100% of files").unwrap();
        assert_eq!(descriptor.directive_count(), 1);
        assert!(descriptor.unlikely_intentional());

        let descriptor = parse("%d files (100% done)").unwrap();
        assert!(!descriptor.unlikely_intentional());
    }

    #[test]
    fn test_translated_relaxes_heuristic() {
        let descriptor = CFormat.parse("100% of files", true).unwrap();
        assert!(!descriptor.unlikely_intentional());
    }

    #[test]
    fn test_glibc_m_consumes_no_argument() {
        let descriptor = parse("error: %m").unwrap();
        assert_eq!(descriptor.directive_count(), 0);
    }
}
