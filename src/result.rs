//! The immutable outcome of one engine run.
//!
//! A `ParseResult` captures everything observable about a finished parse:
//! outcome flags, the final value stack, furthest-failure diagnostics, a
//! captured engine exception if one was thrown, and the optional call-stack
//! snapshot and trace.  [`append_to`](ParseResult::append_to) renders the
//! fixed-order human-readable report; its exact wording is
//! implementation-defined but stable within a version, so golden-file tests
//! may rely on it.

use crate::linemap::LineMap;
use crate::parse::Frame;
use crate::stack::Value;
use itertools::Itertools;
use std::fmt;

/// Outcome record of [`run`](crate::run).
pub struct ParseResult {
    /// Whether the root parser matched.
    pub success: bool,
    /// Whether it matched *and* consumed the whole input.
    pub full_match: bool,
    /// Number of positions consumed on success; 0 on failure (the cursor
    /// was rolled back to the origin).
    pub match_size: usize,
    /// Snapshot of the value stack.  Empty after a clean failure (full
    /// rollback); after an exception it holds whatever was there when the
    /// exception fired, for post-mortem inspection.
    pub value_stack: Vec<Value>,
    /// The furthest position any leaf parser failed at.
    pub error_position: Option<usize>,
    /// Labels of the leaf parsers that failed at `error_position`, in
    /// registration order, not de-duplicated.
    pub expected: Vec<String>,
    /// Message of the engine exception, if one escaped the parse.
    pub thrown: Option<String>,
    /// Call-stack snapshot captured at the last furthest-error update, when
    /// recording was enabled.
    pub call_stack: Option<Vec<Frame>>,
    /// The per-invocation trace, when tracing was enabled.
    pub trace: Option<String>,
    /// Map built for character input, used to format positions.
    pub line_map: Option<LineMap>,
}

impl ParseResult {
    /// Renders the report into `out`.
    ///
    /// `line_map` overrides the result's own map (e.g. to apply a different
    /// tab width); pass `None` to use the stored one.  Sections appear in
    /// fixed order: outcome, error location and expected set, call stack,
    /// value stack, trace.
    pub fn append_to(&self, out: &mut String, line_map: Option<&LineMap>) {
        let map = line_map.or(self.line_map.as_ref());
        let locate = |offset: usize| match map {
            Some(map) => map.position_of(offset).to_string(),
            None => format!("position {}", offset),
        };

        if let Some(thrown) = &self.thrown {
            out.push_str(&format!("Exception thrown: {}\n", thrown));
        } else if self.full_match {
            out.push_str("Success (full match)\n");
        } else if self.success {
            out.push_str(&format!("Success (partial match, size {})\n", self.match_size));
        } else {
            out.push_str("Failure\n");
        }

        if !self.success {
            match self.error_position {
                Some(position) => {
                    out.push_str(&format!("Furthest error at {}\n", locate(position)));
                    if !self.expected.is_empty() {
                        out.push_str(&format!(
                            "Expected one of: {}\n",
                            self.expected.iter().unique().join(", ")
                        ));
                    }
                }
                None => out.push_str("No error was recorded\n"),
            }
        }

        if let Some(frames) = &self.call_stack {
            out.push_str("Call stack at furthest error:\n");
            for frame in frames.iter().rev() {
                out.push_str(&format!("  in {} at {}\n", frame.parser, locate(frame.position)));
            }
        }

        if self.value_stack.is_empty() {
            out.push_str("Value stack is empty\n");
        } else {
            out.push_str(&format!("Value stack ({} entries):\n", self.value_stack.len()));
            for (index, value) in self.value_stack.iter().enumerate() {
                out.push_str(&format!("  [{}] {:?}\n", index, value));
            }
        }

        if let Some(trace) = &self.trace {
            out.push_str("Trace:\n");
            out.push_str(trace);
        }
    }

    /// The report as a fresh string, using the stored line map.
    pub fn report(&self) -> String {
        let mut out = String::new();
        self.append_to(&mut out, None);
        out
    }
}

impl fmt::Display for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

impl fmt::Debug for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseResult")
            .field("success", &self.success)
            .field("full_match", &self.full_match)
            .field("match_size", &self.match_size)
            .field("error_position", &self.error_position)
            .field("expected", &self.expected)
            .field("thrown", &self.thrown)
            .field("stack_depth", &self.value_stack.len())
            .finish()
    }
}
