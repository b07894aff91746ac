//! Extractor for C and C++ sources.
//!
//! The tokeniser is a small pipeline: characters come from the
//! [`CharReader`] with backslash-newline continuations spliced out,
//! comments are diverted into the savable-comment buffer, and adjacent
//! string literals (`"a" "b"`) are folded into a single token that keeps
//! the first literal's position and comment snapshot.
//!
//! The driver walks all three bracket kinds. A known keyword immediately
//! followed by `(` opens an argument list; commas count argument
//! positions; the matching `)` (or end of file) decides the call. Braces
//! and square brackets (compound literals, subscripts) open balanced
//! groups of their own, so commas inside them do not disturb the
//! enclosing call's argument count.

use crate::arglist::ArglistParser;
use crate::comments::CommentBuffer;
use crate::diagnostics::Diagnostics;
use crate::flags::{Region, RegionRef};
use crate::reader::CharReader;
use crate::token::{StringKind, TokenString};

use super::{FileContext, MAX_NESTING_DEPTH, escape};

/// One decoded escape sequence: a raw byte (`\xNN`, octal) or a code
/// point (`\uNNNN`, named escapes).
enum Escaped {
    Byte(u8),
    Char(char),
}

#[derive(Debug)]
enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    String(TokenString),
    Symbol(String),
    Other,
    Eof,
}

/// Which closing token ends the current balanced group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closer {
    Paren,
    Bracket,
    Brace,
}

struct Tokenizer<'a> {
    reader: CharReader<'a>,
    file: String,
    comments: CommentBuffer,
    pending: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    fn new(source: &'a str, file: String) -> Self {
        Self {
            reader: CharReader::new(source),
            file,
            comments: CommentBuffer::new(),
            pending: Vec::new(),
        }
    }

    /// Character layer: splices `\` + newline.
    fn getc(&mut self) -> Option<char> {
        loop {
            let c = self.reader.get()?;
            if c == '\\' && self.reader.peek() == Some('\n') {
                self.reader.get();
                continue;
            }
            return Some(c);
        }
    }

    fn ungetc(&mut self, c: char) {
        self.reader.unget(c);
    }

    /// Token layer with adjacent-literal folding.
    fn next_token(&mut self, diagnostics: &mut Diagnostics) -> Token {
        let token = self.next_raw(diagnostics);
        let Token::String(mut string) = token else {
            return token;
        };
        loop {
            match self.next_raw(diagnostics) {
                Token::String(next) => string.append(&next),
                other => {
                    self.pending.push(other);
                    break;
                }
            }
        }
        Token::String(string)
    }

    fn next_raw(&mut self, diagnostics: &mut Diagnostics) -> Token {
        if let Some(token) = self.pending.pop() {
            return token;
        }
        loop {
            let Some(c) = self.getc() else {
                return Token::Eof;
            };
            match c {
                '\n' => {
                    self.comments.observe_newline();
                }
                c if c.is_ascii_whitespace() => {}
                '/' => match self.getc() {
                    Some('/') => self.line_comment(),
                    Some('*') => self.block_comment(diagnostics),
                    Some(other) => {
                        self.ungetc(other);
                        return self.token_at(Token::Other);
                    }
                    None => return self.token_at(Token::Other),
                },
                '"' => {
                    let string = self.string_literal(diagnostics);
                    self.comments.set_last_token_line(string.line);
                    return Token::String(string);
                }
                '\'' => {
                    self.char_literal(diagnostics);
                    return self.token_at(Token::Other);
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut name = String::from(c);
                    while let Some(c) = self.getc() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                        } else {
                            self.ungetc(c);
                            break;
                        }
                    }
                    return self.token_at(Token::Symbol(name));
                }
                c if c.is_ascii_digit() => {
                    // Preprocessing numbers: swallow everything that can
                    // belong to the literal.
                    while let Some(c) = self.getc() {
                        if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
                            continue;
                        }
                        self.ungetc(c);
                        break;
                    }
                    return self.token_at(Token::Other);
                }
                '(' => return self.token_at(Token::LParen),
                ')' => return self.token_at(Token::RParen),
                '[' => return self.token_at(Token::LBracket),
                ']' => return self.token_at(Token::RBracket),
                '{' => return self.token_at(Token::LBrace),
                '}' => return self.token_at(Token::RBrace),
                ',' => return self.token_at(Token::Comma),
                _ => return self.token_at(Token::Other),
            }
        }
    }

    fn token_at(&mut self, token: Token) -> Token {
        self.comments.set_last_token_line(self.reader.line());
        token
    }

    fn line_comment(&mut self) {
        let line = self.reader.line();
        let mut text = String::new();
        while let Some(c) = self.getc() {
            if c == '\n' {
                self.ungetc(c);
                break;
            }
            text.push(c);
        }
        self.comments.save_line(line, &text);
    }

    fn block_comment(&mut self, diagnostics: &mut Diagnostics) {
        let start_line = self.reader.line();
        let mut text = String::new();
        loop {
            match self.getc() {
                Some('*') => match self.getc() {
                    Some('/') => break,
                    Some(c) => {
                        text.push('*');
                        self.ungetc(c);
                    }
                    None => {
                        diagnostics.warn(self.file.clone(), start_line, "unterminated block comment");
                        break;
                    }
                },
                Some(c) => text.push(c),
                None => {
                    diagnostics.warn(self.file.clone(), start_line, "unterminated block comment");
                    break;
                }
            }
        }
        self.comments.save_block(self.reader.line(), &text);
    }

    fn string_literal(&mut self, diagnostics: &mut Diagnostics) -> TokenString {
        let line = self.reader.line();
        // C `\xNN` and octal escapes denote bytes in the source encoding,
        // so the literal is assembled as bytes and validated as UTF-8 once
        // it is complete.
        let mut bytes: Vec<u8> = Vec::new();
        let mut buf = [0u8; 4];
        loop {
            match self.getc() {
                None => {
                    diagnostics.warn(self.file.clone(), line, "unterminated string literal");
                    break;
                }
                Some('\n') => {
                    // Close at end of line and keep the partial content.
                    diagnostics.warn(self.file.clone(), line, "unterminated string literal");
                    self.ungetc('\n');
                    break;
                }
                Some('"') => break,
                Some('\\') => match self.escape(diagnostics) {
                    Some(Escaped::Byte(b)) => bytes.push(b),
                    Some(Escaped::Char(c)) => {
                        bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    }
                    None => {}
                },
                Some(c) => bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes()),
            }
        }
        let value = match String::from_utf8(bytes) {
            Ok(value) => value,
            Err(err) => {
                diagnostics.warn(
                    self.file.clone(),
                    line,
                    "string literal is not valid UTF-8 after escape decoding",
                );
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };
        let snapshot = self.comments.snapshot();
        TokenString::new(value, StringKind::Escaped, line).with_comments(snapshot)
    }

    /// Decode one escape sequence after the backslash. `None` means the
    /// escape was invalid and has been elided (with a warning).
    fn escape(&mut self, diagnostics: &mut Diagnostics) -> Option<Escaped> {
        let line = self.reader.line();
        let c = self.getc()?;
        match c {
            'a' => Some(Escaped::Char('\x07')),
            'b' => Some(Escaped::Char('\x08')),
            'f' => Some(Escaped::Char('\x0C')),
            'n' => Some(Escaped::Char('\n')),
            'r' => Some(Escaped::Char('\r')),
            't' => Some(Escaped::Char('\t')),
            'v' => Some(Escaped::Char('\x0B')),
            '\\' | '"' | '\'' | '?' => Some(Escaped::Char(c)),
            '0'..='7' => {
                let value = escape::octal_value(c, &mut self.reader);
                if value > 0xFF {
                    diagnostics.warn(
                        self.file.clone(),
                        line,
                        format!("octal escape value {:o} does not fit in a byte", value),
                    );
                    return None;
                }
                Some(Escaped::Byte(value as u8))
            }
            'x' => {
                let (value, count) = escape::hex_digits(&mut self.reader, 2);
                if count != 2 {
                    diagnostics.warn(
                        self.file.clone(),
                        line,
                        "\\x escape expects exactly 2 hex digits",
                    );
                    return None;
                }
                Some(Escaped::Byte(value as u8))
            }
            'u' => self.unicode_escape(4, line, diagnostics),
            'U' => self.unicode_escape(8, line, diagnostics),
            other => {
                diagnostics.warn(
                    self.file.clone(),
                    line,
                    format!("invalid escape sequence '\\{}'", other),
                );
                None
            }
        }
    }

    fn unicode_escape(
        &mut self,
        digits: usize,
        line: usize,
        diagnostics: &mut Diagnostics,
    ) -> Option<Escaped> {
        let (value, count) = escape::hex_digits(&mut self.reader, digits);
        if count != digits {
            diagnostics.warn(
                self.file.clone(),
                line,
                format!("escape expects exactly {} hex digits", digits),
            );
            return None;
        }
        match escape::code_point(value) {
            Ok(decoded) => Some(Escaped::Char(decoded)),
            Err(reason) => {
                diagnostics.warn(self.file.clone(), line, reason);
                None
            }
        }
    }

    fn char_literal(&mut self, diagnostics: &mut Diagnostics) {
        loop {
            match self.getc() {
                None | Some('\n') => return,
                Some('\'') => return,
                Some('\\') => {
                    let _ = self.escape(diagnostics);
                }
                Some(_) => {}
            }
        }
    }
}

pub fn extract(source: &str, context: &mut FileContext) {
    let mut tokenizer = Tokenizer::new(source, context.file.clone());
    let root = Region::root();
    let top = ArglistParser::without_shapes(context.file.as_str());
    extract_parenthesized(&mut tokenizer, context, &root, None, top, 0, None);
}

/// Walk one balanced group (or, with no expected closer, the whole file).
/// Only parentheses open argument lists; braces and brackets are tracked
/// purely for balance. Returns `true` when end of input was reached.
fn extract_parenthesized(
    tokenizer: &mut Tokenizer<'_>,
    context: &mut FileContext,
    outer_region: &RegionRef,
    fname: Option<&str>,
    mut parser: ArglistParser,
    depth: usize,
    closer: Option<Closer>,
) -> bool {
    let mut arg = 1usize;
    let mut last_symbol: Option<String> = None;

    loop {
        let token = tokenizer.next_token(context.diagnostics);
        match token {
            Token::Comma => {
                arg += 1;
                last_symbol = None;
            }
            Token::LParen | Token::LBracket | Token::LBrace => {
                if depth >= MAX_NESTING_DEPTH {
                    context.diagnostics.fatal(
                        context.file.clone(),
                        tokenizer.reader.line(),
                        "too many open parentheses",
                    );
                    parser.done(arg, context.catalogue, context.diagnostics);
                    return true;
                }
                let is_call = matches!(token, Token::LParen);
                let callee = if is_call { last_symbol.take() } else { None };
                last_symbol = None;
                let inner = match callee.as_deref().and_then(|n| context.keywords.lookup(n)) {
                    Some(shapes) => ArglistParser::new(context.file.as_str(), shapes),
                    None => ArglistParser::without_shapes(context.file.as_str()),
                };
                let arg_region = Region::inherit(
                    outer_region,
                    fname.and_then(|f| context.flags.lookup(f, arg)),
                );
                let inner_closer = match token {
                    Token::LParen => Closer::Paren,
                    Token::LBracket => Closer::Bracket,
                    _ => Closer::Brace,
                };
                if extract_parenthesized(
                    tokenizer,
                    context,
                    &arg_region,
                    callee.as_deref(),
                    inner,
                    depth + 1,
                    Some(inner_closer),
                ) {
                    parser.done(arg, context.catalogue, context.diagnostics);
                    return true;
                }
            }
            Token::RParen | Token::RBracket | Token::RBrace => {
                let found = match token {
                    Token::RParen => Closer::Paren,
                    Token::RBracket => Closer::Bracket,
                    _ => Closer::Brace,
                };
                match closer {
                    None => {
                        context.diagnostics.warn(
                            context.file.clone(),
                            tokenizer.reader.line(),
                            "unbalanced closing bracket",
                        );
                        last_symbol = None;
                    }
                    Some(expected) => {
                        if expected != found {
                            context.diagnostics.warn(
                                context.file.clone(),
                                tokenizer.reader.line(),
                                "mismatched closing bracket",
                            );
                        }
                        parser.done(arg, context.catalogue, context.diagnostics);
                        return false;
                    }
                }
            }
            Token::String(string) => {
                let arg_region = Region::inherit(
                    outer_region,
                    fname.and_then(|f| context.flags.lookup(f, arg)),
                );
                if context.extract_all {
                    context.commit_plain(&string, &arg_region);
                }
                parser.remember(arg, &string, &arg_region);
                last_symbol = None;
            }
            Token::Symbol(name) => {
                last_symbol = Some(name);
            }
            Token::Other => {
                last_symbol = None;
            }
            Token::Eof => {
                if closer.is_some() {
                    context.diagnostics.warn(
                        context.file.clone(),
                        tokenizer.reader.line(),
                        "unbalanced opening bracket at end of file",
                    );
                }
                parser.done(arg, context.catalogue, context.diagnostics);
                return true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::catalogue::{Catalogue, CommentFilter, CommitSettings, FormatClassification};
    use crate::flags::{FlagTable, FormatLanguage};
    use crate::keywords::KeywordTable;

    use super::super::Language;
    use super::*;

    fn run_with(source: &str, extract_all: bool) -> (Catalogue, Diagnostics) {
        let mut keywords = KeywordTable::new();
        Language::C.default_keywords(&mut keywords);
        let mut flags = FlagTable::new();
        Language::C.default_flags(&mut flags);
        let settings = CommitSettings {
            comments: CommentFilter::All,
            ..CommitSettings::default()
        };
        let mut catalogue = Catalogue::new(settings);
        let mut diagnostics = Diagnostics::new();
        let mut context = FileContext {
            file: "test.c".to_string(),
            extract_all,
            keywords: &keywords,
            flags: &flags,
            catalogue: &mut catalogue,
            diagnostics: &mut diagnostics,
        };
        extract(source, &mut context);
        (catalogue, diagnostics)
    }

    fn run(source: &str) -> (Catalogue, Diagnostics) {
        run_with(source, false)
    }

    #[test]
    fn test_simple_call() {
        let (catalogue, diags) = run("int main() { puts(gettext(\"hello\")); }\n");
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue.messages()[0].msgid(), "hello");
        assert_eq!(catalogue.messages()[0].positions[0].to_string(), "test.c:1");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_position_line() {
        let (catalogue, _) = run("\n\nconst char *s =\n    gettext(\"deep\");\n");
        assert_eq!(catalogue.messages()[0].positions[0].line, 4);
    }

    #[test]
    fn test_plural_call() {
        let (catalogue, _) = run("ngettext(\"%d file\", \"%d files\", n);\n");
        let message = &catalogue.messages()[0];
        assert_eq!(message.msgid(), "%d file");
        assert_eq!(message.msgid_plural.as_deref(), Some("%d files"));
    }

    #[test]
    fn test_context_call() {
        let (catalogue, _) = run("npgettext(\"menu\", \"item\", \"items\", n);\n");
        let message = &catalogue.messages()[0];
        assert_eq!(message.msgctxt(), Some("menu"));
        assert_eq!(message.msgid(), "item");
        assert_eq!(message.msgid_plural.as_deref(), Some("items"));
    }

    #[test]
    fn test_adjacent_literals_folded() {
        let (catalogue, _) = run("gettext(\"hello, \" \"world\");\n");
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue.messages()[0].msgid(), "hello, world");
    }

    #[test]
    fn test_deduplication_across_lines() {
        let (catalogue, _) = run("gettext(\"ok\");\ngettext(\"ok\");\n");
        assert_eq!(catalogue.len(), 1);
        let positions: Vec<_> = catalogue.messages()[0]
            .positions
            .iter()
            .map(|p| p.line)
            .collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn test_escape_decoding() {
        // \xc3 \xa9 are bytes; together they are the UTF-8 encoding of é.
        let (catalogue, _) = run("gettext(\"caf\\xc3\\xa9 \\t \\u00e9 \\101\");\n");
        assert_eq!(catalogue.messages()[0].msgid(), "café \t é A");
    }

    #[test]
    fn test_escape_bytes_forming_invalid_utf8_warn() {
        let (_, diags) = run("gettext(\"bad \\xff byte\");\n");
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn test_invalid_escape_elided_with_warning() {
        let (catalogue, diags) = run("gettext(\"a\\qb\");\n");
        assert_eq!(catalogue.messages()[0].msgid(), "ab");
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn test_surrogate_escape_rejected() {
        let (catalogue, diags) = run("gettext(\"x\\ud800y\");\n");
        assert_eq!(catalogue.messages()[0].msgid(), "xy");
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn test_comment_attached() {
        let source = "\
/* This is shown in the menu. */
gettext(\"Open\");
";
        let (catalogue, _) = run(source);
        assert_eq!(
            catalogue.messages()[0].comments,
            vec!["This is shown in the menu."]
        );
    }

    #[test]
    fn test_line_comment_attached_and_chain_broken_by_code_line() {
        let source = "\
// stale note
int x = 1;
gettext(\"later\");
";
        let (catalogue, _) = run(source);
        assert!(catalogue.messages()[0].comments.is_empty());
    }

    #[test]
    fn test_blank_line_keeps_comment_chain() {
        // Only a line with actual code breaks the chain; blank lines are
        // allowed between the comment and the call.
        let source = "\
// still relevant

gettext(\"text\");
";
        let (catalogue, _) = run(source);
        assert_eq!(catalogue.messages()[0].comments, vec!["still relevant"]);
    }

    #[test]
    fn test_consecutive_comments_both_attached() {
        let source = "\
// first line
// second line
gettext(\"both\");
";
        let (catalogue, _) = run(source);
        assert_eq!(
            catalogue.messages()[0].comments,
            vec!["first line", "second line"]
        );
    }

    #[test]
    fn test_format_classification_from_context() {
        let (catalogue, _) = run_with("printf(\"%d items\", n);\n", true);
        assert_eq!(catalogue.len(), 1);
        assert_eq!(
            catalogue.messages()[0].format(FormatLanguage::C),
            FormatClassification::Yes
        );
    }

    #[test]
    fn test_format_classification_possible_without_context() {
        let (catalogue, _) = run("gettext(\"%d items\");\n");
        assert_eq!(
            catalogue.messages()[0].format(FormatLanguage::C),
            FormatClassification::Possible
        );
    }

    #[test]
    fn test_passthrough_region_inside_printf() {
        let (catalogue, _) = run("printf(gettext(\"%d files\"), n);\n");
        assert_eq!(
            catalogue.messages()[0].format(FormatLanguage::C),
            FormatClassification::Yes
        );
    }

    #[test]
    fn test_extract_all() {
        let (catalogue, _) = run_with("const char *a = \"plain\";\n", true);
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue.messages()[0].msgid(), "plain");
    }

    #[test]
    fn test_non_string_msgid_not_extracted() {
        let (catalogue, _) = run("gettext(variable);\n");
        assert!(catalogue.is_empty());
    }

    #[test]
    fn test_unbalanced_close_warns_and_recovers() {
        let (catalogue, diags) = run(") ;\ngettext(\"still works\");\n");
        assert_eq!(catalogue.len(), 1);
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn test_unterminated_string_recovers_with_partial_content() {
        let (catalogue, diags) = run("gettext(\"partial\n);\n");
        assert!(diags.warning_count() >= 1);
        // The candidate is still committed with the content seen so far.
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue.messages()[0].msgid(), "partial");
    }

    #[test]
    fn test_line_continuation_spliced() {
        let (catalogue, _) = run("gettext(\"split\\\nted\");\n");
        assert_eq!(catalogue.messages()[0].msgid(), "splitted");
    }

    #[test]
    fn test_nested_call_keeps_outer_arglist() {
        let (catalogue, _) = run("dgettext(domain(), \"msg\");\n");
        // domain() is argument 1; the msgid sits at argument 2.
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue.messages()[0].msgid(), "msg");
    }

    #[test]
    fn test_compound_literal_commas_do_not_shift_positions() {
        // The commas inside the brace initializer stay inside their own
        // balanced group; the msgid is still argument 2.
        let (catalogue, _) = run("dgettext((struct opt){1, 2, 3}, \"msg\");\n");
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue.messages()[0].msgid(), "msg");
    }

    #[test]
    fn test_subscript_commas_do_not_shift_positions() {
        let (catalogue, _) = run("dgettext(domains[index(1, 2)], \"msg\");\n");
        assert_eq!(catalogue.len(), 1);
        assert_eq!(catalogue.messages()[0].msgid(), "msg");
    }

    #[test]
    fn test_mismatched_closer_warns() {
        let (catalogue, diags) = run("f(]\ngettext(\"after\");\n");
        assert_eq!(catalogue.messages()[0].msgid(), "after");
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn test_nesting_at_limit_succeeds() {
        let source = format!(
            "{}gettext(\"deep enough\"){};\n",
            "(".repeat(MAX_NESTING_DEPTH - 1),
            ")".repeat(MAX_NESTING_DEPTH - 1)
        );
        let (catalogue, diags) = run(&source);
        assert_eq!(catalogue.messages()[0].msgid(), "deep enough");
        assert!(!diags.has_fatal());
    }

    #[test]
    fn test_nesting_beyond_limit_is_fatal() {
        let source = format!("{}x", "(".repeat(MAX_NESTING_DEPTH + 1));
        let (_, diags) = run(&source);
        assert!(diags.has_fatal());
    }
}
