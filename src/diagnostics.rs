//! Diagnostic collection and reporting for extraction runs.
//!
//! Extraction problems are never panics: every component reports through a
//! [`Diagnostics`] sink owned by the driver, and the driver decides what to
//! do with them. Each diagnostic renders as a classic compiler-style line:
//!
//! ```text
//! src/app.c:42: warning: unterminated string literal
//! ```
//!
//! Severities:
//! - `warning`: extraction continues, the result may be incomplete
//! - `error`: something in the input is wrong; extraction continues but the
//!   process will exit non-zero
//! - `fatal-error`: the current file cannot be processed any further

use std::fmt;

use colored::Colorize;

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    FatalError,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::FatalError => write!(f, "fatal-error"),
        }
    }
}

/// A single reported problem, tied to a source location when one is known.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub file: String,
    /// 1-based line number; `None` for file-level problems (I/O, encoding).
    pub line: Option<usize>,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}: {}", self.file, line, self.severity, self.message),
            None => write!(f, "{}: {}: {}", self.file, self.severity, self.message),
        }
    }
}

impl Diagnostic {
    /// Render with a coloured severity for terminal output.
    pub fn to_colored_string(&self) -> String {
        let severity = match self.severity {
            Severity::Warning => "warning".bold().yellow(),
            Severity::Error => "error".bold().red(),
            Severity::FatalError => "fatal-error".bold().red(),
        };
        match self.line {
            Some(line) => format!("{}:{}: {}: {}", self.file, line, severity, self.message),
            None => format!("{}: {}: {}", self.file, severity, self.message),
        }
    }
}

/// Ordered sink of diagnostics for one file (or one whole run after merging).
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, file: impl Into<String>, line: usize, message: impl Into<String>) {
        self.push(Severity::Warning, file, Some(line), message);
    }

    pub fn error(&mut self, file: impl Into<String>, line: usize, message: impl Into<String>) {
        self.push(Severity::Error, file, Some(line), message);
    }

    pub fn fatal(&mut self, file: impl Into<String>, line: usize, message: impl Into<String>) {
        self.push(Severity::FatalError, file, Some(line), message);
    }

    /// Report a problem that has no meaningful line number.
    pub fn file_error(&mut self, file: impl Into<String>, severity: Severity, message: impl Into<String>) {
        self.push(severity, file, None, message);
    }

    fn push(
        &mut self,
        severity: Severity,
        file: impl Into<String>,
        line: Option<usize>,
        message: impl Into<String>,
    ) {
        self.entries.push(Diagnostic {
            file: file.into(),
            line,
            severity,
            message: message.into(),
        });
    }

    /// Append all diagnostics from another sink, preserving order.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity >= Severity::Error)
            .count()
    }

    pub fn has_fatal(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::FatalError)
    }

    fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }

    /// Print every diagnostic to stderr, coloured.
    pub fn print(&self) {
        for entry in &self.entries {
            eprintln!("{}", entry.to_colored_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_line() {
        let d = Diagnostic {
            file: "src/app.c".to_string(),
            line: Some(42),
            severity: Severity::Warning,
            message: "unterminated string literal".to_string(),
        };
        assert_eq!(d.to_string(), "src/app.c:42: warning: unterminated string literal");
    }

    #[test]
    fn test_display_without_line() {
        let d = Diagnostic {
            file: "data.bin".to_string(),
            line: None,
            severity: Severity::FatalError,
            message: "unsupported encoding".to_string(),
        };
        assert_eq!(d.to_string(), "data.bin: fatal-error: unsupported encoding");
    }

    #[test]
    fn test_counts() {
        let mut diags = Diagnostics::new();
        diags.warn("a.c", 1, "w1");
        diags.error("a.c", 2, "e1");
        diags.fatal("a.c", 3, "f1");

        assert_eq!(diags.warning_count(), 1);
        // error_count includes fatal errors: both make the exit code non-zero
        assert_eq!(diags.error_count(), 2);
        assert!(diags.has_fatal());
    }

    #[test]
    fn test_absorb_preserves_order() {
        let mut first = Diagnostics::new();
        first.warn("a.c", 1, "first");
        let mut second = Diagnostics::new();
        second.warn("b.c", 2, "second");

        first.absorb(second);
        let messages: Vec<_> = first.entries().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
