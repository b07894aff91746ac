//! Extractor for Perl sources.
//!
//! Perl is the most demanding tokeniser in this crate:
//!
//! - **Line-based reading.** Here-documents absorb whole physical lines
//!   that follow the line containing the `<<DELIM` marker, so the reader
//!   works line-wise and keeps an "already eaten up to" register that the
//!   main scan jumps over when it finishes the current line.
//! - **Quote-like operators.** `q`, `qq`, `qw`, `qx`, `m`, `s`, `tr`, `y`
//!   with arbitrary delimiters, including nested bracket pairs.
//! - **Regex versus division.** A `/` after a token that ends an operand
//!   is division; anywhere else it opens a regex. The decision is a fixed
//!   function of the previous token kind.
//! - **Interpolation.** Double-quoted strings are scanned twice: once to
//!   find the closing delimiter, once to decode escapes (including the
//!   `\U \L \Q \l \u \E` case-modification marks) and to look for
//!   `$keyword{key}` / `${keyword}{key}` / `$keyword->{key}` hash lookups
//!   whose identifier is a registered keyword; such keys are extracted as
//!   messages of their own. Any other interpolation taints the literal.
//! - **POD and data sections.** `=pod`-style blocks up to `=cut`, and
//!   everything after `__END__` / `__DATA__`, are invisible to the
//!   tokeniser apart from feeding nothing into the comment buffer.

use crate::arglist::ArglistParser;
use crate::catalogue::{MessageDraft, MessagePosition};
use crate::comments::CommentBuffer;
use crate::diagnostics::Diagnostics;
use crate::flags::{Region, RegionRef};
use crate::reader::CharReader;
use crate::token::{StringKind, TokenString};

use super::{FileContext, MAX_NESTING_DEPTH, escape};

// ---------------------------------------------------------------------
// Line-based reader
// ---------------------------------------------------------------------

struct PerlReader {
    lines: Vec<Vec<char>>,
    /// Current line index (0-based).
    cur: usize,
    /// Next column within the current line.
    col: usize,
    /// First line index not yet eaten by a here-document body; the main
    /// scan jumps here when the current physical line is exhausted.
    heredoc_end: usize,
    pushback: Vec<char>,
}

impl PerlReader {
    fn new(source: &str) -> Self {
        let lines = source
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).chars().collect())
            .collect();
        Self {
            lines,
            cur: 0,
            col: 0,
            heredoc_end: 0,
            pushback: Vec::new(),
        }
    }

    /// 1-based line number of the next character.
    fn line(&self) -> usize {
        self.cur + 1
    }

    fn at_line_start(&self) -> bool {
        self.pushback.is_empty() && self.col == 0
    }

    fn current_line_is(&self, text: &str) -> bool {
        self.cur < self.lines.len() && self.lines[self.cur].iter().collect::<String>() == text
    }

    fn current_line_starts_pod(&self) -> bool {
        self.cur < self.lines.len()
            && self.lines[self.cur].first() == Some(&'=')
            && self
                .lines
                .get(self.cur)
                .and_then(|l| l.get(1))
                .is_some_and(|c| c.is_ascii_alphabetic())
    }

    /// Skip a POD block: everything up to and including the `=cut` line.
    fn skip_pod(&mut self) {
        while self.cur < self.lines.len() {
            let is_cut = {
                let line: String = self.lines[self.cur].iter().collect();
                line == "=cut" || line.starts_with("=cut ") || line.starts_with("=cut\t")
            };
            self.cur += 1;
            self.col = 0;
            if is_cut {
                return;
            }
        }
    }

    fn get(&mut self) -> Option<char> {
        if let Some(c) = self.pushback.pop() {
            return Some(c);
        }
        if self.cur >= self.lines.len() {
            return None;
        }
        let line = &self.lines[self.cur];
        if self.col < line.len() {
            let c = line[self.col];
            self.col += 1;
            Some(c)
        } else {
            // The last line has no trailing newline.
            if self.cur + 1 >= self.lines.len() && self.heredoc_end <= self.cur + 1 {
                self.cur = self.lines.len();
                self.col = 0;
                return None;
            }
            self.cur = self.heredoc_end.max(self.cur + 1);
            self.col = 0;
            Some('\n')
        }
    }

    fn unget(&mut self, c: char) {
        self.pushback.push(c);
    }

    fn peek(&mut self) -> Option<char> {
        let c = self.get()?;
        self.unget(c);
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        match self.get() {
            Some(c) if c == expected => true,
            Some(c) => {
                self.unget(c);
                false
            }
            None => false,
        }
    }

    /// Absorb a here-document body: the physical lines following the
    /// current one, up to a line equal to `delim` (`<<~` allows the
    /// delimiter line to be indented). Returns the body and whether the
    /// delimiter was found.
    fn read_heredoc(&mut self, delim: &str, trim_indent: bool) -> (String, bool) {
        let start = self.heredoc_end.max(self.cur + 1);
        let mut body = String::new();
        let mut i = start;
        while i < self.lines.len() {
            let line: String = self.lines[i].iter().collect();
            if line == delim || (trim_indent && line.trim_start() == delim) {
                self.heredoc_end = i + 1;
                return (body, true);
            }
            body.push_str(&line);
            body.push('\n');
            i += 1;
        }
        self.heredoc_end = self.lines.len();
        (body, false)
    }
}

// ---------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------

#[derive(Debug)]
enum Token {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    FatComma,
    Dereference,
    Semicolon,
    Dot,
    String(TokenString),
    /// The elements of a `qw(…)` word list, in order.
    QwList(Vec<TokenString>),
    Number,
    Symbol(String),
    Variable(String),
    RegexOp,
    NamedOp(String),
    Other,
    Eof,
}

/// Summary of the previous token for the regex-versus-division decision:
/// does it end an operand (so `/`, `%`, `*`, `<<` are operators), or are
/// we in operand position (so they start a regex, sigil or here-doc)?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Operand,
    Operator,
}

fn position_after(token: &Token) -> Position {
    match token {
        Token::String(_)
        | Token::QwList(_)
        | Token::Number
        | Token::Symbol(_)
        | Token::Variable(_)
        | Token::RParen
        | Token::RBrace
        | Token::RBracket => Position::Operator,
        _ => Position::Operand,
    }
}

const NAMED_OPERATORS: &[&str] = &[
    "if", "unless", "while", "until", "for", "foreach", "and", "or", "not", "xor", "eq", "ne",
    "lt", "gt", "le", "ge", "cmp", "x", "return", "my", "our", "local", "sub", "use", "no",
    "require", "print", "do", "else", "elsif",
];

struct Tokenizer {
    reader: PerlReader,
    file: String,
    comments: CommentBuffer,
    pending: Vec<Token>,
    position: Position,
}

impl Tokenizer {
    fn new(source: &str, file: String) -> Self {
        Self {
            reader: PerlReader::new(source),
            file,
            comments: CommentBuffer::new(),
            pending: Vec::new(),
            position: Position::Operand,
        }
    }

    fn push_token(&mut self, token: Token) {
        self.pending.push(token);
    }

    /// Token layer with `.`-concatenation folding.
    fn next_token(&mut self, context: &mut FileContext) -> Token {
        let token = self.next_classified(context);
        let Token::String(mut string) = token else {
            return token;
        };
        loop {
            match self.next_classified(context) {
                Token::Dot => match self.next_classified(context) {
                    Token::String(next) => string.append(&next),
                    other => {
                        self.pending.push(other);
                        self.pending.push(Token::Dot);
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

    fn next_classified(&mut self, context: &mut FileContext) -> Token {
        let token = self.next_raw(context);
        self.position = position_after(&token);
        token
    }

    fn next_raw(&mut self, context: &mut FileContext) -> Token {
        if let Some(token) = self.pending.pop() {
            return token;
        }
        loop {
            if self.reader.at_line_start() {
                if self.reader.current_line_is("__END__")
                    || self.reader.current_line_is("__DATA__")
                {
                    return Token::Eof;
                }
                if self.reader.current_line_starts_pod() {
                    self.reader.skip_pod();
                    continue;
                }
            }
            let Some(c) = self.reader.get() else {
                return Token::Eof;
            };
            match c {
                '\n' => self.comments.observe_newline(),
                c if c.is_ascii_whitespace() => {}
                '#' => self.line_comment(),
                '"' => return self.double_quoted_string('"', context),
                '\'' => return self.single_quoted_string('\''),
                '`' => {
                    let _ = self.scan_raw('`', context.diagnostics);
                    return self.token_at(Token::Other);
                }
                '$' | '@' | '%' | '&' | '*' => {
                    if let Some(token) = self.sigil(c) {
                        return token;
                    }
                    return self.token_at(Token::Other);
                }
                '/' => {
                    if self.position == Position::Operand {
                        let _ = self.scan_raw('/', context.diagnostics);
                        self.consume_regex_flags();
                        return self.token_at(Token::RegexOp);
                    }
                    return self.token_at(Token::Other);
                }
                '<' => {
                    if self.reader.peek() == Some('<') && self.position == Position::Operand {
                        self.reader.get();
                        if let Some(token) = self.heredoc(context) {
                            return token;
                        }
                        self.reader.unget('<');
                        return self.token_at(Token::Other);
                    }
                    return self.token_at(Token::Other);
                }
                '-' => {
                    if self.reader.eat('>') {
                        return self.token_at(Token::Dereference);
                    }
                    return self.token_at(Token::Other);
                }
                '=' => {
                    if self.reader.eat('>') {
                        return self.token_at(Token::FatComma);
                    }
                    return self.token_at(Token::Other);
                }
                ';' => return self.token_at(Token::Semicolon),
                ',' => return self.token_at(Token::Comma),
                '.' => {
                    if self.reader.peek().is_some_and(|c| c.is_ascii_digit()) {
                        self.number();
                        return self.token_at(Token::Number);
                    }
                    if self.reader.eat('.') {
                        // Range operator.
                        return self.token_at(Token::Other);
                    }
                    return self.token_at(Token::Dot);
                }
                '(' => return self.token_at(Token::LParen),
                ')' => return self.token_at(Token::RParen),
                '{' => return self.token_at(Token::LBrace),
                '}' => return self.token_at(Token::RBrace),
                '[' => return self.token_at(Token::LBracket),
                ']' => return self.token_at(Token::RBracket),
                c if c.is_ascii_digit() => {
                    self.number();
                    return self.token_at(Token::Number);
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    return self.word(c, context);
                }
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
        while let Some(c) = self.reader.get() {
            if c == '\n' {
                self.reader.unget(c);
                break;
            }
            text.push(c);
        }
        self.comments.save_line(line, &text);
    }

    fn number(&mut self) {
        while let Some(c) = self.reader.get() {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
                continue;
            }
            self.reader.unget(c);
            break;
        }
    }

    fn consume_regex_flags(&mut self) {
        while let Some(c) = self.reader.get() {
            if c.is_ascii_lowercase() {
                continue;
            }
            self.reader.unget(c);
            break;
        }
    }

    /// A word: identifier (with `::` package separators), named operator,
    /// or quote-like operator.
    fn word(&mut self, first: char, context: &mut FileContext) -> Token {
        let mut name = String::from(first);
        loop {
            match self.reader.get() {
                Some(c) if c.is_ascii_alphanumeric() || c == '_' => name.push(c),
                Some(':') => {
                    if self.reader.eat(':') {
                        name.push_str("::");
                    } else {
                        self.reader.unget(':');
                        break;
                    }
                }
                Some(c) => {
                    self.reader.unget(c);
                    break;
                }
                None => break,
            }
        }

        match name.as_str() {
            "q" | "qq" | "qx" | "qw" | "m" | "s" | "tr" | "y" => {
                if let Some(token) = self.quotelike(&name, context) {
                    return token;
                }
            }
            _ => {}
        }
        if NAMED_OPERATORS.contains(&name.as_str()) {
            return self.token_at(Token::NamedOp(name));
        }
        self.token_at(Token::Symbol(name))
    }

    /// A sigil introducing a variable, or an operator spelled with the
    /// same character (`%`, `&`, `*` in operator position).
    fn sigil(&mut self, sigil: char) -> Option<Token> {
        if sigil != '$' && sigil != '@' && self.position == Position::Operator {
            return None;
        }
        let mut name = String::from(sigil);
        match self.reader.peek() {
            Some('{') => {
                // ${name} — normalised to $name.
                self.reader.get();
                loop {
                    match self.reader.get() {
                        Some('}') => break,
                        Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == ':' => {
                            name.push(c)
                        }
                        Some(c) => {
                            self.reader.unget(c);
                            break;
                        }
                        None => break,
                    }
                }
                Some(self.token_at(Token::Variable(name)))
            }
            Some('$') => {
                // $$name and deeper derefs keep only the outer sigil.
                self.reader.get();
                match self.sigil('$') {
                    Some(Token::Variable(inner)) => {
                        name.push_str(inner.trim_start_matches('$'));
                        Some(self.token_at(Token::Variable(name)))
                    }
                    _ => Some(self.token_at(Token::Variable(name))),
                }
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                while let Some(c) = self.reader.get() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                    } else if c == ':' && self.reader.eat(':') {
                        name.push_str("::");
                    } else {
                        self.reader.unget(c);
                        break;
                    }
                }
                Some(self.token_at(Token::Variable(name)))
            }
            Some(c) if sigil == '$' => {
                // Special variables: $_, $0, $!, $#array, …
                self.reader.get();
                if c == '#' {
                    while let Some(c) = self.reader.get() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            continue;
                        }
                        self.reader.unget(c);
                        break;
                    }
                }
                name.push(c);
                Some(self.token_at(Token::Variable(name)))
            }
            _ => {
                if sigil == '$' || sigil == '@' {
                    Some(self.token_at(Token::Other))
                } else {
                    None
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Strings and quote-likes
    // -----------------------------------------------------------------

    fn closing_delimiter(open: char) -> char {
        match open {
            '(' => ')',
            '{' => '}',
            '[' => ']',
            '<' => '>',
            other => other,
        }
    }

    /// Collect the raw text of a delimited section, honouring backslash
    /// escapes and nesting when the delimiters are a bracket pair.
    fn scan_raw(&mut self, open: char, diagnostics: &mut Diagnostics) -> String {
        let close = Self::closing_delimiter(open);
        let nests = close != open;
        let line = self.reader.line();
        let mut depth = 1usize;
        let mut raw = String::new();
        loop {
            match self.reader.get() {
                None => {
                    diagnostics.warn(self.file.clone(), line, "unterminated string literal");
                    break;
                }
                Some('\\') => {
                    raw.push('\\');
                    if let Some(c) = self.reader.get() {
                        raw.push(c);
                    }
                }
                Some(c) if c == close => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    raw.push(c);
                }
                Some(c) if nests && c == open => {
                    depth += 1;
                    raw.push(c);
                }
                Some(c) => raw.push(c),
            }
        }
        raw
    }

    fn single_quoted_string(&mut self, open: char) -> Token {
        let line = self.reader.line();
        let close = Self::closing_delimiter(open);
        let mut value = String::new();
        loop {
            match self.reader.get() {
                None => break,
                Some('\\') => match self.reader.get() {
                    Some(c) if c == close || c == '\\' => value.push(c),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => break,
                },
                Some(c) if c == close => break,
                Some(c) => value.push(c),
            }
        }
        let snapshot = self.comments.snapshot();
        let token =
            Token::String(TokenString::new(value, StringKind::Verbatim, line).with_comments(snapshot));
        self.token_at(token)
    }

    fn double_quoted_string(&mut self, open: char, context: &mut FileContext) -> Token {
        let line = self.reader.line();
        let raw = self.scan_raw(open, context.diagnostics);
        let string = self.process_interpolatable(&raw, line, StringKind::Interpolatable, context);
        self.token_at(Token::String(string))
    }

    fn quotelike(&mut self, op: &str, context: &mut FileContext) -> Option<Token> {
        // Find the delimiter. A following `=>`, separator or closing
        // bracket means the word was a bareword (`q => 1`, `$h{s}`), not
        // a quote-like operator.
        let delim = loop {
            match self.reader.get() {
                Some(c) if c == ' ' || c == '\t' => continue,
                Some(c)
                    if c.is_ascii_alphanumeric()
                        || matches!(c, '_' | '=' | ',' | ';' | '}' | ')' | ']') =>
                {
                    self.reader.unget(c);
                    return None;
                }
                Some(c) => break c,
                None => return None,
            }
        };
        let line = self.reader.line();
        match op {
            "q" => {
                let raw = self.scan_raw(delim, context.diagnostics);
                let value = decode_single_quoted(&raw, Self::closing_delimiter(delim));
                let snapshot = self.comments.snapshot();
                Some(self.token_at(Token::String(
                    TokenString::new(value, StringKind::Verbatim, line).with_comments(snapshot),
                )))
            }
            "qq" => {
                let raw = self.scan_raw(delim, context.diagnostics);
                let string =
                    self.process_interpolatable(&raw, line, StringKind::Interpolatable, context);
                Some(self.token_at(Token::String(string)))
            }
            "qx" => {
                let _ = self.scan_raw(delim, context.diagnostics);
                Some(self.token_at(Token::Other))
            }
            "qw" => {
                let raw = self.scan_raw(delim, context.diagnostics);
                let snapshot = self.comments.snapshot();
                let words = raw
                    .split_ascii_whitespace()
                    .map(|word| {
                        TokenString::new(word, StringKind::WordList, line)
                            .with_comments(snapshot.clone())
                    })
                    .collect();
                Some(self.token_at(Token::QwList(words)))
            }
            "m" => {
                let _ = self.scan_raw(delim, context.diagnostics);
                self.consume_regex_flags();
                Some(self.token_at(Token::RegexOp))
            }
            "s" | "tr" | "y" => {
                let _ = self.scan_raw(delim, context.diagnostics);
                // Bracket delimiters take a fresh delimiter for the
                // replacement part; plain ones reuse the same character.
                if Self::closing_delimiter(delim) != delim {
                    let second = loop {
                        match self.reader.get() {
                            Some(c) if c.is_ascii_whitespace() => continue,
                            Some(c) => break Some(c),
                            None => break None,
                        }
                    };
                    if let Some(second) = second {
                        let _ = self.scan_raw(second, context.diagnostics);
                    }
                } else {
                    let _ = self.scan_raw(delim, context.diagnostics);
                }
                self.consume_regex_flags();
                Some(self.token_at(Token::RegexOp))
            }
            _ => None,
        }
    }

    fn heredoc(&mut self, context: &mut FileContext) -> Option<Token> {
        // Optional `~` (indented here-doc): delimiters are matched after
        // stripping indentation, which read_heredoc does not do; strip the
        // marker and treat it like a plain here-doc.
        let indented = self.reader.eat('~');
        let (delim, interpolate) = match self.reader.peek() {
            Some('"') => {
                self.reader.get();
                (self.scan_raw('"', context.diagnostics), true)
            }
            Some('\'') => {
                self.reader.get();
                (self.scan_raw('\'', context.diagnostics), false)
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut delim = String::new();
                while let Some(c) = self.reader.get() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        delim.push(c);
                    } else {
                        self.reader.unget(c);
                        break;
                    }
                }
                (delim, true)
            }
            _ => return None,
        };
        let line = self.reader.line();
        let (mut body, found) = self.reader.read_heredoc(&delim, indented);
        if !found {
            context.diagnostics.warn(
                self.file.clone(),
                line,
                format!("end of file before matching here-document delimiter '{}'", delim),
            );
        }
        if indented {
            body = body
                .lines()
                .map(|l| l.trim_start())
                .collect::<Vec<_>>()
                .join("\n");
            if !body.is_empty() {
                body.push('\n');
            }
        }
        let string = if interpolate {
            self.process_interpolatable(&body, line, StringKind::HereDoc, context)
        } else {
            let snapshot = self.comments.snapshot();
            TokenString::new(body, StringKind::HereDoc, line).with_comments(snapshot)
        };
        Some(self.token_at(Token::String(string)))
    }

    // -----------------------------------------------------------------
    // Second pass over interpolatable text
    // -----------------------------------------------------------------

    /// Decode escapes and case-modification marks, detect interpolation,
    /// and run the keyword-hash scan over already-collected raw text.
    fn process_interpolatable(
        &mut self,
        raw: &str,
        line: usize,
        kind: StringKind,
        context: &mut FileContext,
    ) -> TokenString {
        let mut chars = CharReader::new(raw);
        let mut value = String::new();
        let mut interpolated = false;
        let mut case_mods: Vec<char> = Vec::new();
        let mut one_shot: Option<char> = None;

        while let Some(c) = chars.get() {
            match c {
                '\\' => {
                    let Some(e) = chars.get() else {
                        value.push('\\');
                        break;
                    };
                    match e {
                        'L' | 'U' | 'Q' => case_mods.push(e),
                        'E' => {
                            case_mods.pop();
                        }
                        'l' | 'u' => one_shot = Some(e),
                        _ => {
                            chars.unget(e);
                            if let Some(decoded) = self.string_escape(&mut chars, line, context) {
                                push_cased(&mut value, decoded, &case_mods, &mut one_shot);
                            }
                        }
                    }
                }
                '$' | '@' => {
                    if self.keyword_hash_lookup(c, &mut chars, line, context) {
                        interpolated = true;
                        continue;
                    }
                    // Any other interpolation makes the value uncertain.
                    if chars
                        .peek()
                        .is_some_and(|n| n.is_ascii_alphanumeric() || n == '_' || n == '{')
                    {
                        interpolated = true;
                        skip_variable(&mut chars);
                    } else {
                        push_cased(&mut value, c, &case_mods, &mut one_shot);
                    }
                }
                c => push_cased(&mut value, c, &case_mods, &mut one_shot),
            }
        }

        let snapshot = self.comments.snapshot();
        let mut string = TokenString::new(value, kind, line).with_comments(snapshot);
        if interpolated {
            string = string.mark_interpolated();
        }
        string
    }

    /// One escape sequence of double-quote semantics (after the `\`).
    fn string_escape(
        &mut self,
        chars: &mut CharReader,
        line: usize,
        context: &mut FileContext,
    ) -> Option<char> {
        let c = chars.get()?;
        match c {
            'a' => Some('\x07'),
            'b' => Some('\x08'),
            'e' => Some('\x1B'),
            'f' => Some('\x0C'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            '0'..='7' => {
                let v = escape::octal_value(c, chars);
                self.checked(v, line, context)
            }
            'x' => {
                if chars.eat('{') {
                    match escape::braced_hex(chars) {
                        Some(v) => self.checked(v, line, context),
                        None => {
                            context.diagnostics.warn(
                                self.file.clone(),
                                line,
                                "malformed \\x{…} escape",
                            );
                            None
                        }
                    }
                } else {
                    let (v, count) = escape::hex_digits(chars, 2);
                    if count == 0 {
                        context.diagnostics.warn(
                            self.file.clone(),
                            line,
                            "\\x escape without hex digits",
                        );
                        return None;
                    }
                    self.checked(v, line, context)
                }
            }
            'N' => {
                if !chars.eat('{') {
                    context
                        .diagnostics
                        .warn(self.file.clone(), line, "malformed \\N escape");
                    return None;
                }
                let mut name = String::new();
                loop {
                    match chars.get() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => {
                            context.diagnostics.warn(
                                self.file.clone(),
                                line,
                                "unterminated \\N escape",
                            );
                            return None;
                        }
                    }
                }
                if let Some(rest) = name.strip_prefix("U+") {
                    let value = u32::from_str_radix(rest, 16).ok()?;
                    return self.checked(value, line, context);
                }
                match escape::named_char(&name) {
                    Some(decoded) => Some(decoded),
                    None => {
                        context.diagnostics.warn(
                            self.file.clone(),
                            line,
                            format!("unknown Unicode character name '{}'", name),
                        );
                        None
                    }
                }
            }
            'c' => {
                // Control escape: \cA is chr(1).
                let c = chars.get()?;
                let value = (c.to_ascii_uppercase() as u32) ^ 0x40;
                char::from_u32(value)
            }
            other => Some(other),
        }
    }

    fn checked(&self, value: u32, line: usize, context: &mut FileContext) -> Option<char> {
        match escape::code_point(value) {
            Ok(decoded) => Some(decoded),
            Err(reason) => {
                context.diagnostics.warn(self.file.clone(), line, reason);
                None
            }
        }
    }

    /// The interpolation scan: `$name{key}`, `${name}{key}` and
    /// `$name->{key}` where `name` (or `$name` / `%name`) is a registered
    /// keyword cause `key` to be extracted as a message. Returns `true`
    /// when the scan consumed a full hash lookup.
    fn keyword_hash_lookup(
        &mut self,
        sigil: char,
        chars: &mut CharReader,
        line: usize,
        context: &mut FileContext,
    ) -> bool {
        if sigil != '$' {
            return false;
        }
        // Tentatively parse; rewinding is impossible with a plain
        // CharReader, so collect and replay on failure is avoided by only
        // committing to consumption once the shape is certain.
        let braced = chars.peek() == Some('{');
        if braced {
            chars.get();
        }
        let mut name = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                chars.get();
            } else {
                break;
            }
        }
        if name.is_empty() {
            if braced {
                chars.unget('{');
            }
            return false;
        }
        if braced && !chars.eat('}') {
            // ${expr…}: not our shape; the variable is interpolation all
            // the same, and skip_variable picks up the remainder.
            skip_braced_remainder(chars);
            return true;
        }
        if chars.eat('-') {
            if !chars.eat('>') {
                chars.unget('-');
                return true;
            }
        }
        if !chars.eat('{') {
            // A plain `$name` interpolation.
            return true;
        }
        let key = match hash_key(chars) {
            Some(key) => key,
            None => return true,
        };

        let known = context
            .keywords
            .lookup(&name)
            .or_else(|| context.keywords.lookup(&format!("${}", name)))
            .or_else(|| context.keywords.lookup(&format!("%{}", name)));
        if known.is_some() {
            let region = Region::inherit(&Region::root(), context.flags.lookup(&name, 1));
            context.catalogue.commit(
                MessageDraft {
                    msgctxt: None,
                    msgid: key,
                    msgid_plural: None,
                    position: MessagePosition::new(self.file.clone(), line),
                    comments: self.comments.snapshot(),
                    extra_comments: Vec::new(),
                    region,
                },
                context.diagnostics,
            );
        }
        true
    }
}

/// Read a hash key: a bareword, or a single- or double-quoted literal.
/// Inside a double-quoted string's raw text the quote may still carry its
/// backslash (`$__{\"Hello\"}`), so a leading `\` before a quote is
/// skipped and the closing quote may be escaped the same way.
fn hash_key(chars: &mut CharReader) -> Option<String> {
    let mut key = String::new();
    if chars.peek() == Some('\\') {
        chars.get();
        match chars.peek() {
            Some('\'' | '"') => {}
            _ => {
                chars.unget('\\');
            }
        }
    }
    let quote = match chars.peek() {
        Some(q @ ('\'' | '"')) => {
            chars.get();
            Some(q)
        }
        _ => None,
    };
    loop {
        match chars.get() {
            None => return None,
            Some('}') if quote.is_none() => break,
            Some(q) if Some(q) == quote => {
                if !chars.eat('}') {
                    return None;
                }
                break;
            }
            Some('\\') if quote.is_some() => match chars.get() {
                Some(q) if Some(q) == quote => {
                    if !chars.eat('}') {
                        return None;
                    }
                    break;
                }
                Some(c) => key.push(c),
                None => return None,
            },
            Some(c) if quote.is_none() && !(c.is_ascii_alphanumeric() || c == '_') => {
                return None;
            }
            Some(c) => key.push(c),
        }
    }
    (!key.is_empty()).then_some(key)
}

/// Skip over the rest of an interpolated variable: name characters plus
/// any `[…]` / `{…}` / `->` subscripts.
fn skip_variable(chars: &mut CharReader) {
    while let Some(c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
            chars.get();
        } else {
            break;
        }
    }
    loop {
        match chars.peek() {
            Some('[') => {
                chars.get();
                skip_to(chars, ']');
            }
            Some('{') => {
                chars.get();
                skip_to(chars, '}');
            }
            Some('-') => {
                chars.get();
                if !chars.eat('>') {
                    chars.unget('-');
                    break;
                }
            }
            _ => break,
        }
    }
}

fn skip_to(chars: &mut CharReader, close: char) {
    while let Some(c) = chars.get() {
        if c == close {
            break;
        }
    }
}

fn skip_braced_remainder(chars: &mut CharReader) {
    skip_to(chars, '}');
}

fn decode_single_quoted(raw: &str, close: char) -> String {
    let mut value = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(c) if c == close || c == '\\' => value.push(c),
                Some(c) => {
                    value.push('\\');
                    value.push(c);
                }
                None => value.push('\\'),
            }
        } else {
            value.push(c);
        }
    }
    value
}

fn push_cased(value: &mut String, c: char, case_mods: &[char], one_shot: &mut Option<char>) {
    let c = match one_shot.take() {
        Some('l') => c.to_ascii_lowercase(),
        Some('u') => c.to_ascii_uppercase(),
        _ => c,
    };
    match case_mods.last() {
        Some('L') => value.extend(c.to_lowercase()),
        Some('U') => value.extend(c.to_uppercase()),
        Some('Q') => {
            if !(c.is_alphanumeric() || c == '_') {
                value.push('\\');
            }
            value.push(c);
        }
        _ => value.push(c),
    }
}

// ---------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------

pub fn extract(source: &str, context: &mut FileContext) {
    let mut tokenizer = Tokenizer::new(source, context.file.clone());
    let root = Region::root();
    let top = ArglistParser::without_shapes(context.file.as_str());
    extract_balanced(&mut tokenizer, context, &root, None, top, 0, ListEnd::TopLevel);
}

/// What terminates the current argument scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListEnd {
    TopLevel,
    Paren,
    Bracket,
    Brace,
    /// A paren-less argument list: ends at `;` or at the enclosing
    /// group's closing token, which is pushed back for the caller.
    Statement,
}

fn extract_balanced(
    tokenizer: &mut Tokenizer,
    context: &mut FileContext,
    outer_region: &RegionRef,
    fname: Option<&str>,
    mut parser: ArglistParser,
    depth: usize,
    end: ListEnd,
) -> bool {
    let mut arg = 1usize;
    let mut last_symbol: Option<String> = None;

    loop {
        let token = tokenizer.next_token(context);
        match token {
            Token::Comma | Token::FatComma => {
                arg += 1;
                last_symbol = None;
            }
            Token::Semicolon => {
                last_symbol = None;
                if end == ListEnd::Statement {
                    parser.done(arg, context.catalogue, context.diagnostics);
                    return false;
                }
            }
            Token::LParen | Token::LBracket | Token::LBrace => {
                if depth >= MAX_NESTING_DEPTH {
                    context.diagnostics.fatal(
                        context.file.clone(),
                        tokenizer.reader.line(),
                        "too many nested constructs",
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
                let inner_end = match token {
                    Token::LParen => ListEnd::Paren,
                    Token::LBracket => ListEnd::Bracket,
                    _ => ListEnd::Brace,
                };
                if extract_balanced(
                    tokenizer,
                    context,
                    &arg_region,
                    callee.as_deref(),
                    inner,
                    depth + 1,
                    inner_end,
                ) {
                    parser.done(arg, context.catalogue, context.diagnostics);
                    return true;
                }
            }
            Token::RParen | Token::RBracket | Token::RBrace => {
                let matches_end = matches!(
                    (&token, end),
                    (Token::RParen, ListEnd::Paren)
                        | (Token::RBracket, ListEnd::Bracket)
                        | (Token::RBrace, ListEnd::Brace)
                );
                if matches_end {
                    parser.done(arg, context.catalogue, context.diagnostics);
                    return false;
                }
                match end {
                    ListEnd::Statement => {
                        // The closer belongs to the enclosing group.
                        tokenizer.push_token(token);
                        parser.done(arg, context.catalogue, context.diagnostics);
                        return false;
                    }
                    ListEnd::TopLevel => {
                        context.diagnostics.warn(
                            context.file.clone(),
                            tokenizer.reader.line(),
                            "unbalanced closing bracket",
                        );
                        last_symbol = None;
                    }
                    _ => {
                        context.diagnostics.warn(
                            context.file.clone(),
                            tokenizer.reader.line(),
                            "mismatched closing bracket",
                        );
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
            Token::QwList(words) => {
                // A word list flattens into the surrounding argument list.
                let count = words.len();
                for (i, word) in words.into_iter().enumerate() {
                    let arg_region = Region::inherit(
                        outer_region,
                        fname.and_then(|f| context.flags.lookup(f, arg)),
                    );
                    if context.extract_all {
                        context.commit_plain(&word, &arg_region);
                    }
                    parser.remember(arg, &word, &arg_region);
                    if i + 1 < count {
                        arg += 1;
                    }
                }
                last_symbol = None;
            }
            Token::Symbol(name) => {
                let Some(shapes) = context.keywords.lookup(&name) else {
                    last_symbol = Some(name);
                    continue;
                };
                let next = tokenizer.next_token(context);
                let list_end = match next {
                    Token::LParen => Some(ListEnd::Paren),
                    Token::String(_) | Token::QwList(_) | Token::Variable(_) | Token::Number => {
                        // Paren-less call: the arguments run to the end of
                        // the statement.
                        tokenizer.push_token(next);
                        Some(ListEnd::Statement)
                    }
                    other => {
                        tokenizer.push_token(other);
                        None
                    }
                };
                if let Some(list_end) = list_end {
                    if depth >= MAX_NESTING_DEPTH {
                        context.diagnostics.fatal(
                            context.file.clone(),
                            tokenizer.reader.line(),
                            "too many nested constructs",
                        );
                        parser.done(arg, context.catalogue, context.diagnostics);
                        return true;
                    }
                    let inner = ArglistParser::new(context.file.as_str(), shapes);
                    let arg_region = Region::inherit(
                        outer_region,
                        fname.and_then(|f| context.flags.lookup(f, arg)),
                    );
                    if extract_balanced(
                        tokenizer,
                        context,
                        &arg_region,
                        Some(&name),
                        inner,
                        depth + 1,
                        list_end,
                    ) {
                        parser.done(arg, context.catalogue, context.diagnostics);
                        return true;
                    }
                }
                last_symbol = None;
            }
            Token::Variable(name) => {
                // `$__{"key"}` outside a string: a keyword hash lookup.
                let hash_shapes = context.keywords.lookup(&name).or_else(|| {
                    context
                        .keywords
                        .lookup(&format!("%{}", name.trim_start_matches('$')))
                });
                if let Some(shapes) = hash_shapes {
                    let next = tokenizer.next_token(context);
                    if let Token::LBrace = next {
                        let key = tokenizer.next_token(context);
                        if let Token::String(string) = key {
                            let mut hash = ArglistParser::new(context.file.as_str(), shapes);
                            let region = Region::inherit(
                                outer_region,
                                context.flags.lookup(name.trim_start_matches('$'), 1),
                            );
                            hash.remember(1, &string, &region);
                            hash.done(1, context.catalogue, context.diagnostics);
                            if !matches!(
                                tokenizer.next_token(context),
                                Token::RBrace
                            ) {
                                context.diagnostics.warn(
                                    context.file.clone(),
                                    tokenizer.reader.line(),
                                    "unterminated hash subscript",
                                );
                            }
                        } else {
                            tokenizer.push_token(key);
                            tokenizer.push_token(Token::LBrace);
                        }
                    } else {
                        tokenizer.push_token(next);
                    }
                }
                last_symbol = None;
            }
            Token::Dereference
            | Token::Dot
            | Token::Number
            | Token::RegexOp
            | Token::NamedOp(_)
            | Token::Other => {
                last_symbol = None;
            }
            Token::Eof => {
                if !matches!(end, ListEnd::TopLevel | ListEnd::Statement) {
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
