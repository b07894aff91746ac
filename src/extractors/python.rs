//! Extractor for Python sources.
//!
//! Python brings a few twists of its own: string prefixes (`r`, `b`, `u`,
//! `f` and their combinations), short and triple-quoted strings, implicit
//! concatenation of adjacent literals as well as explicit `+`
//! concatenation, dotted callee names (`i18n.gettext(…)`), and f-string
//! interpolation, which taints the literal's value.
//!
//! The driver walks all three bracket kinds; only parentheses open
//! argument lists, square brackets and braces are tracked purely for
//! balance.

use crate::arglist::ArglistParser;
use crate::comments::CommentBuffer;
use crate::diagnostics::Diagnostics;
use crate::flags::{Region, RegionRef};
use crate::reader::CharReader;
use crate::token::{StringKind, TokenString};

use super::{FileContext, MAX_NESTING_DEPTH, escape};

#[derive(Debug)]
enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Plus,
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

#[derive(Default, Clone, Copy)]
struct StringModes {
    raw: bool,
    fstring: bool,
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

    /// Token layer with concatenation folding: `"a" "b"` and `"a" + "b"`
    /// both collapse into one string token.
    fn next_token(&mut self, diagnostics: &mut Diagnostics) -> Token {
        let token = self.next_raw(diagnostics);
        let Token::String(mut string) = token else {
            return token;
        };
        loop {
            match self.next_raw(diagnostics) {
                Token::String(next) => string.append(&next),
                Token::Plus => match self.next_raw(diagnostics) {
                    Token::String(next) => string.append(&next),
                    other => {
                        self.pending.push(other);
                        self.pending.push(Token::Plus);
                        break;
                    }
                },
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
                '\n' => self.comments.observe_newline(),
                c if c.is_ascii_whitespace() => {}
                '#' => self.line_comment(),
                '\'' | '"' => {
                    let string = self.string_literal(c, StringModes::default(), diagnostics);
                    self.comments.set_last_token_line(string.line);
                    return Token::String(string);
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    return self.symbol_or_prefixed_string(c, diagnostics);
                }
                c if c.is_ascii_digit() => {
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
                '+' => return self.token_at(Token::Plus),
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

    /// An identifier, which may turn out to be a string prefix (`r"…"`,
    /// `f'…'`, `rb"…"`, …) or a dotted name (`i18n.gettext`).
    fn symbol_or_prefixed_string(&mut self, first: char, diagnostics: &mut Diagnostics) -> Token {
        let mut name = String::from(first);
        while let Some(c) = self.getc() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
            } else {
                self.ungetc(c);
                break;
            }
        }

        if let Some(modes) = string_prefix(&name) {
            if let Some(quote) = self.reader.peek() {
                if quote == '\'' || quote == '"' {
                    self.getc();
                    let string = self.string_literal(quote, modes, diagnostics);
                    self.comments.set_last_token_line(string.line);
                    return Token::String(string);
                }
            }
        }

        // Fold `a.b.c` into one dotted symbol; the dot must be adjacent.
        loop {
            match self.getc() {
                Some('.') => match self.getc() {
                    Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                        name.push('.');
                        name.push(c);
                        while let Some(c) = self.getc() {
                            if c.is_ascii_alphanumeric() || c == '_' {
                                name.push(c);
                            } else {
                                self.ungetc(c);
                                break;
                            }
                        }
                    }
                    Some(c) => {
                        self.ungetc(c);
                        self.ungetc('.');
                        break;
                    }
                    None => {
                        self.ungetc('.');
                        break;
                    }
                },
                Some(c) => {
                    self.ungetc(c);
                    break;
                }
                None => break,
            }
        }
        self.token_at(Token::Symbol(name))
    }

    fn string_literal(
        &mut self,
        quote: char,
        modes: StringModes,
        diagnostics: &mut Diagnostics,
    ) -> TokenString {
        let line = self.reader.line();
        let triple = self.eat_triple(quote);
        let mut value = String::new();
        let mut interpolated = false;

        loop {
            let Some(c) = self.getc() else {
                diagnostics.warn(self.file.clone(), line, "unterminated string literal");
                break;
            };
            match c {
                c if c == quote => {
                    if !triple {
                        break;
                    }
                    if self.eat_triple(quote) {
                        break;
                    }
                    value.push(c);
                }
                '\n' if !triple => {
                    diagnostics.warn(self.file.clone(), line, "unterminated string literal");
                    self.ungetc('\n');
                    break;
                }
                '\\' => {
                    if modes.raw {
                        value.push('\\');
                        if let Some(next) = self.getc() {
                            value.push(next);
                        }
                    } else if let Some(decoded) = self.escape(diagnostics) {
                        value.push(decoded);
                    }
                }
                '{' if modes.fstring => {
                    if self.reader.peek() == Some('{') {
                        self.getc();
                        value.push('{');
                    } else {
                        self.skip_fstring_field(diagnostics);
                        interpolated = true;
                    }
                }
                '}' if modes.fstring => {
                    if self.reader.peek() == Some('}') {
                        self.getc();
                    }
                    value.push('}');
                }
                c => value.push(c),
            }
        }

        let kind = if modes.raw {
            StringKind::Verbatim
        } else {
            StringKind::Escaped
        };
        let snapshot = self.comments.snapshot();
        let mut string = TokenString::new(value, kind, line).with_comments(snapshot);
        if interpolated {
            string = string.mark_interpolated();
        }
        string
    }

    fn eat_triple(&mut self, quote: char) -> bool {
        if self.reader.peek() != Some(quote) {
            return false;
        }
        self.getc();
        if self.reader.peek() == Some(quote) {
            self.getc();
            return true;
        }
        self.ungetc(quote);
        false
    }

    /// Skip an f-string replacement field, tracking nested braces.
    fn skip_fstring_field(&mut self, diagnostics: &mut Diagnostics) {
        let line = self.reader.line();
        let mut depth = 1usize;
        while depth > 0 {
            match self.getc() {
                Some('{') => depth += 1,
                Some('}') => depth -= 1,
                Some(_) => {}
                None => {
                    diagnostics.warn(self.file.clone(), line, "unterminated f-string expression");
                    return;
                }
            }
        }
    }

    fn escape(&mut self, diagnostics: &mut Diagnostics) -> Option<char> {
        let line = self.reader.line();
        let c = self.getc()?;
        match c {
            // Backslash-newline inside a literal continues the line.
            '\n' => None,
            'a' => Some('\x07'),
            'b' => Some('\x08'),
            'f' => Some('\x0C'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'v' => Some('\x0B'),
            '\\' | '\'' | '"' => Some(c),
            '0'..='7' => {
                let value = escape::octal_value(c, &mut self.reader);
                self.checked(value, line, diagnostics)
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
                self.checked(value, line, diagnostics)
            }
            'u' | 'U' => {
                let digits = if c == 'u' { 4 } else { 8 };
                let (value, count) = escape::hex_digits(&mut self.reader, digits);
                if count != digits {
                    diagnostics.warn(
                        self.file.clone(),
                        line,
                        format!("escape expects exactly {} hex digits", digits),
                    );
                    return None;
                }
                self.checked(value, line, diagnostics)
            }
            'N' => {
                if !self.reader.eat('{') {
                    diagnostics.warn(self.file.clone(), line, "malformed \\N escape");
                    return None;
                }
                let mut name = String::new();
                loop {
                    match self.getc() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => {
                            diagnostics.warn(self.file.clone(), line, "unterminated \\N escape");
                            return None;
                        }
                    }
                }
                match escape::named_char(&name) {
                    Some(decoded) => Some(decoded),
                    None => {
                        diagnostics.warn(
                            self.file.clone(),
                            line,
                            format!("unknown Unicode character name '{}'", name),
                        );
                        None
                    }
                }
            }
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

    fn checked(&self, value: u32, line: usize, diagnostics: &mut Diagnostics) -> Option<char> {
        match escape::code_point(value) {
            Ok(decoded) => Some(decoded),
            Err(reason) => {
                diagnostics.warn(self.file.clone(), line, reason);
                None
            }
        }
    }
}

fn string_prefix(name: &str) -> Option<StringModes> {
    if name.len() > 2 {
        return None;
    }
    let mut modes = StringModes::default();
    for c in name.chars() {
        match c.to_ascii_lowercase() {
            'r' => modes.raw = true,
            'f' => modes.fstring = true,
            'b' | 'u' => {}
            _ => return None,
        }
    }
    Some(modes)
}

pub fn extract(source: &str, context: &mut FileContext) {
    let mut tokenizer = Tokenizer::new(source, context.file.clone());
    let root = Region::root();
    let top = ArglistParser::without_shapes(context.file.as_str());
    extract_balanced(&mut tokenizer, context, &root, None, top, 0, None);
}

/// Look a callee name up in the keyword table; dotted names fall back to
/// their last component (`self._` matches the `_` keyword).
fn lookup_callee(
    context: &FileContext,
    name: &str,
) -> Option<crate::keywords::ShapeSet> {
    context.keywords.lookup(name).or_else(|| {
        name.rsplit('.')
            .next()
            .filter(|last| *last != name)
            .and_then(|last| context.keywords.lookup(last))
    })
}

fn extract_balanced(
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
                        "too many open brackets",
                    );
                    parser.done(arg, context.catalogue, context.diagnostics);
                    return true;
                }
                let is_call = matches!(token, Token::LParen);
                let callee = if is_call { last_symbol.take() } else { None };
                last_symbol = None;
                let inner = match callee.as_deref().and_then(|n| lookup_callee(context, n)) {
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
                if extract_balanced(
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
            Token::Plus | Token::Other => {
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
