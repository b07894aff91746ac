//! Keyword table: which identifiers are translation calls, and which of
//! their argument positions carry which role.
//!
//! A keyword is registered from a textual spec of the form `NAME:ARG,ARG,…`
//! where each `ARG` is one of:
//!
//! - `N` — a plain argument position; the first one is the msgid, the
//!   second (if given) the plural msgid
//! - `Nc` — the position of the message context
//! - `Nt` — the call must have exactly N arguments to count
//! - `"text"` — an extra comment attached to every message this shape
//!   extracts
//!
//! `NAME` alone means "argument 1 is the msgid". One name may accumulate
//! several shapes (e.g. a 1-argument and a 3-argument variant); the
//! argument-list parser tries all of them in parallel.
//!
//! Malformed specs are silently ignored, including specs whose name part
//! still contains a `:` after the trailing shape has been split off.

use std::collections::HashMap;
use std::sync::Arc;

/// One way a keyword can be called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallShape {
    /// Position of the msgid argument (1-based, always >= 1).
    pub argnum1: usize,
    /// Position of the plural msgid, 0 if this shape has none.
    pub argnum2: usize,
    /// Position of the msgctxt, 0 if this shape has none.
    pub argnumc: usize,
    /// Required total argument count, 0 if unconstrained.
    pub argtotal: usize,
    /// Extra extracted comments carried by this shape.
    pub comments: Vec<String>,
}

impl Default for CallShape {
    fn default() -> Self {
        Self {
            argnum1: 1,
            argnum2: 0,
            argnumc: 0,
            argtotal: 0,
            comments: Vec::new(),
        }
    }
}

impl CallShape {
    /// Highest argument position this shape still cares about.
    pub fn max_argnum(&self) -> usize {
        self.argnum1.max(self.argnum2).max(self.argnumc)
    }
}

/// The set of call shapes registered for one keyword.
pub type ShapeSet = Arc<Vec<CallShape>>;

#[derive(Debug, Default)]
pub struct KeywordTable {
    map: HashMap<String, ShapeSet>,
    defaults_disabled: bool,
}

impl KeywordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a keyword from its textual spec. Returns `false` when the
    /// spec was malformed (and therefore ignored).
    pub fn add_spec(&mut self, spec: &str) -> bool {
        if spec.is_empty() {
            self.disable_defaults();
            return true;
        }
        match parse_spec(spec) {
            Some((name, shape)) => {
                self.add_shape(name, shape);
                true
            }
            None => false,
        }
    }

    pub fn add_shape(&mut self, name: &str, shape: CallShape) {
        let shapes = self
            .map
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Vec::new()));
        Arc::make_mut(shapes).push(shape);
    }

    /// Suppress the per-language default keyword set.
    pub fn disable_defaults(&mut self) {
        self.defaults_disabled = true;
    }

    pub fn defaults_disabled(&self) -> bool {
        self.defaults_disabled
    }

    pub fn lookup(&self, name: &str) -> Option<ShapeSet> {
        self.map.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Split `NAME:SHAPE` from the right: everything after the last `:` must
/// parse as a shape, and the remaining name must not itself contain a `:`.
fn parse_spec(spec: &str) -> Option<(&str, CallShape)> {
    match spec.rfind(':') {
        None => Some((spec, CallShape::default())),
        Some(idx) => {
            let name = &spec[..idx];
            if name.is_empty() || name.contains(':') {
                return None;
            }
            let shape = parse_shape(&spec[idx + 1..])?;
            Some((name, shape))
        }
    }
}

fn parse_shape(text: &str) -> Option<CallShape> {
    let mut argnum1 = 0usize;
    let mut argnum2 = 0usize;
    let mut argnumc = 0usize;
    let mut argtotal = 0usize;
    let mut comments = Vec::new();

    for arg in split_args(text)? {
        let arg = arg.trim();
        if arg.is_empty() {
            return None;
        }
        if let Some(comment) = arg.strip_prefix('"') {
            let comment = comment.strip_suffix('"')?;
            comments.push(comment.to_string());
            continue;
        }
        let (digits, suffix) = match arg.find(|c: char| !c.is_ascii_digit()) {
            Some(0) => return None,
            Some(idx) => (&arg[..idx], &arg[idx..]),
            None => (arg, ""),
        };
        let number: usize = digits.parse().ok()?;
        if number == 0 {
            return None;
        }
        match suffix {
            "" => {
                if argnum1 == 0 {
                    argnum1 = number;
                } else if argnum2 == 0 {
                    argnum2 = number;
                } else {
                    return None;
                }
            }
            "c" => {
                if argnumc != 0 {
                    return None;
                }
                argnumc = number;
            }
            "t" => {
                if argtotal != 0 {
                    return None;
                }
                argtotal = number;
            }
            _ => return None,
        }
    }

    if argnum1 == 0 {
        argnum1 = 1;
    }
    if argnum2 != 0 && argnum2 <= argnum1 {
        return None;
    }
    Some(CallShape {
        argnum1,
        argnum2,
        argnumc,
        argtotal,
        comments,
    })
}

/// Split the shape part on commas, keeping commas inside a quoted comment.
fn split_args(text: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    for c in text.chars() {
        match c {
            '"' => {
                in_quote = !in_quote;
                current.push(c);
            }
            ',' if !in_quote => {
                args.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if in_quote {
        return None;
    }
    args.push(current);
    Some(args)
}
