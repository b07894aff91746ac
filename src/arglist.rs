//! The argument-list parser.
//!
//! One [`ArglistParser`] is allocated per recognised call to a translation
//! keyword. The keyword's call shapes are tried in parallel: every shape
//! gets its own partial call, `remember` feeds string arguments to every
//! shape that cares about that position, and `done` decides which shapes
//! fire once the closing parenthesis (or statement end) fixes the final
//! argument count. Each firing shape commits exactly one message; shapes
//! that never saw their msgid, or whose required argument count does not
//! match, silently discard their candidates.

use crate::catalogue::{Catalogue, MessageDraft, MessagePosition};
use crate::diagnostics::Diagnostics;
use crate::flags::{Region, RegionRef};
use crate::keywords::ShapeSet;
use crate::token::TokenString;

/// Candidate strings for one call shape.
#[derive(Debug, Default, Clone)]
struct PartialCall {
    msgctxt: Option<TokenString>,
    msgid: Option<TokenString>,
    msgid_region: Option<RegionRef>,
    msgid_plural: Option<TokenString>,
}

#[derive(Debug)]
pub struct ArglistParser {
    file: String,
    shapes: ShapeSet,
    calls: Vec<PartialCall>,
}

impl ArglistParser {
    pub fn new(file: impl Into<String>, shapes: ShapeSet) -> Self {
        let calls = vec![PartialCall::default(); shapes.len()];
        Self {
            file: file.into(),
            shapes,
            calls,
        }
    }

    /// An empty parser: tracks nesting but can never fire.
    pub fn without_shapes(file: impl Into<String>) -> Self {
        Self::new(file, ShapeSet::default())
    }

    /// A fresh parser over the same shape set, with no recorded state.
    /// Used when argument evaluation branches.
    pub fn branch(&self) -> Self {
        Self::new(self.file.clone(), self.shapes.clone())
    }

    /// Record a string argument at 1-based position `arg`.
    pub fn remember(&mut self, arg: usize, string: &TokenString, region: &RegionRef) {
        for (shape, call) in self.shapes.iter().zip(&mut self.calls) {
            if shape.argnumc == arg {
                call.msgctxt = Some(string.clone());
            }
            if shape.argnum1 == arg {
                call.msgid = Some(string.clone());
                call.msgid_region = Some(region.clone());
            }
            if shape.argnum2 == arg {
                call.msgid_plural = Some(string.clone());
            }
        }
    }

    /// Whether arguments from position `next_arg` onwards can still change
    /// the outcome of any shape.
    pub fn decided(&self, next_arg: usize) -> bool {
        self.shapes.iter().zip(&self.calls).all(|(shape, call)| {
            if shape.argtotal != 0 {
                // The final argument count still matters.
                return false;
            }
            next_arg > shape.max_argnum()
                || (call.msgid.is_none() && next_arg > shape.argnum1)
        })
    }

    /// Decide the call with its final argument count, committing one
    /// message per firing shape.
    pub fn done(
        self,
        final_arg_count: usize,
        catalogue: &mut Catalogue,
        diagnostics: &mut Diagnostics,
    ) {
        let ArglistParser {
            file,
            shapes,
            calls,
        } = self;
        for (shape, call) in shapes.iter().zip(calls) {
            if shape.argtotal != 0 && final_arg_count != shape.argtotal {
                continue;
            }
            let Some(msgid) = call.msgid else {
                continue;
            };
            if msgid.interpolated {
                diagnostics.warn(
                    file.clone(),
                    msgid.line,
                    "msgid contains interpolated parts; message not extracted",
                );
                continue;
            }
            let msgctxt = match (&call.msgctxt, shape.argnumc) {
                (_, 0) => None,
                (Some(ctxt), _) if !ctxt.interpolated => Some(ctxt.value.clone()),
                // The shape demands a context this call did not provide as
                // a literal; the shape cannot fire.
                _ => continue,
            };
            let msgid_plural = match call.msgid_plural {
                Some(plural) if plural.interpolated => {
                    diagnostics.warn(
                        file.clone(),
                        plural.line,
                        "msgid_plural contains interpolated parts; extracting the singular form only",
                    );
                    None
                }
                Some(plural) => Some(plural.value),
                None => None,
            };

            catalogue.commit(
                MessageDraft {
                    msgctxt,
                    msgid: msgid.value.clone(),
                    msgid_plural,
                    position: MessagePosition::new(file.clone(), msgid.line),
                    comments: msgid.comments.clone(),
                    extra_comments: shape.comments.clone(),
                    region: call.msgid_region.unwrap_or_else(Region::root),
                },
                diagnostics,
            );
        }
    }
}
