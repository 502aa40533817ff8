//! Double-run determinism harness for parsers under test.
//!
//! Backtracking over journaled state has one failure mode that ordinary
//! assertions miss: a parser that mutates state without journaling behaves
//! differently the *second* time it runs.  Every assertion here therefore
//! runs the parser twice against the same input and compares the observable
//! outcomes before checking anything else; a divergence is reported naming
//! the differing field.  The first run skips call-stack recording for
//! speed; the second enables it (when configured) so that a failing
//! assertion carries useful diagnostics.

use crate::driver::run;
use crate::linemap::LineMap;
use crate::parse::ParseOptions;
use crate::parser::ParserRef;
use crate::result::ParseResult;
use crate::stack::downcast;
use crate::wellformed::GrammarError;
use crate::Input;
use std::error::Error;
use std::fmt;

/// A failed fixture assertion.
///
/// `Divergence` is the double-run check itself; the remaining variants are
/// ordinary expectation failures, each carrying the report of the offending
/// run.
#[derive(Debug)]
pub enum FixtureError {
    /// The grammar failed the well-formedness check before any run.
    IllFormed(GrammarError),
    /// The two runs disagreed on an observable — the signature of
    /// improperly journaled side effects.
    Divergence {
        /// Name of the differing field: `thrown`, `success`, `match_size`
        /// or `error_position`.
        field: &'static str,
        /// The first run's value, formatted.
        first: String,
        /// The second run's value, formatted.
        second: String,
        /// Both runs' reports, joined by the fixture's `trace_separator`.
        reports: String,
    },
    /// Expected a match, got a failure or an exception.
    UnexpectedFailure { report: String },
    /// Expected a failure, got a match.
    UnexpectedSuccess { report: String },
    /// The match succeeded but did not consume the whole input.
    IncompleteMatch { matched: usize, length: usize, report: String },
    /// The parse failed as expected, but at the wrong position.
    WrongErrorPosition { expected: usize, actual: Option<usize>, report: String },
    /// The match consumed an unexpected number of positions.
    WrongMatchSize { expected: usize, actual: usize, report: String },
    /// The top of the value stack was not the expected fragment.
    ValueMismatch { expected: String, actual: String, report: String },
    /// A value was expected but the stack came back empty.
    EmptyValueStack { report: String },
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureError::IllFormed(error) => write!(f, "{}", error),
            FixtureError::Divergence { field, first, second, reports } => write!(
                f,
                "the two runs disagree on {}: {} vs {} \
                 (side effects not properly journaled?){}",
                field, first, second, reports
            ),
            FixtureError::UnexpectedFailure { report } => {
                write!(f, "expected a full match, but the parse failed\n{}", report)
            }
            FixtureError::UnexpectedSuccess { report } => {
                write!(f, "expected a failure, but the parse succeeded\n{}", report)
            }
            FixtureError::IncompleteMatch { matched, length, report } => write!(
                f,
                "expected a full match, but only {} of {} positions were consumed\n{}",
                matched, length, report
            ),
            FixtureError::WrongErrorPosition { expected, actual, report } => write!(
                f,
                "expected the furthest error at {}, but it is at {:?}\n{}",
                expected, actual, report
            ),
            FixtureError::WrongMatchSize { expected, actual, report } => write!(
                f,
                "expected a match of size {}, but the match size is {}\n{}",
                expected, actual, report
            ),
            FixtureError::ValueMismatch { expected, actual, report } => write!(
                f,
                "expected {} on top of the value stack, found {}\n{}",
                expected, actual, report
            ),
            FixtureError::EmptyValueStack { report } => {
                write!(f, "expected a value on the stack, but it is empty\n{}", report)
            }
        }
    }
}

impl Error for FixtureError {}

/// Test harness around one parser.
///
/// The panicking methods (`success`, `failure`, ...) are the ones to call
/// from `#[test]` functions; the `try_*` twins return the typed error and
/// exist mostly so the harness itself can be tested.
pub struct TestFixture {
    parser: ParserRef,
    /// Column numbering origin used in reports (0 permitted).
    pub column_start: usize,
    /// Tab stop width used in reports.
    pub tab_width: usize,
    /// Whether the second run records the call stack.
    pub record_call_stack: bool,
    /// Separator between the two runs' reports in divergence messages.
    pub trace_separator: String,
}

impl TestFixture {
    /// Wraps `parser` with default tunables.
    pub fn new(parser: ParserRef) -> TestFixture {
        TestFixture {
            parser,
            column_start: 1,
            tab_width: 4,
            record_call_stack: true,
            trace_separator: "\n------".to_owned(),
        }
    }

    /// Asserts a full match.  Returns the (second) result for further
    /// inspection.
    pub fn success(&self, input: impl Into<Input>) -> ParseResult {
        self.try_success(input).unwrap_or_else(|error| panic!("{}", error))
    }

    /// Asserts a full match whose topmost stack value equals `expected`.
    pub fn success_expect<T>(&self, input: impl Into<Input>, expected: &T) -> ParseResult
    where
        T: PartialEq + fmt::Debug + 'static,
    {
        self.try_success_expect(input, expected).unwrap_or_else(|error| panic!("{}", error))
    }

    /// Asserts a match, full or not.
    pub fn prefix(&self, input: impl Into<Input>) -> ParseResult {
        self.try_prefix(input).unwrap_or_else(|error| panic!("{}", error))
    }

    /// Asserts a match consuming exactly `size` positions.
    pub fn prefix_expect(&self, input: impl Into<Input>, size: usize) -> ParseResult {
        self.try_prefix_expect(input, size).unwrap_or_else(|error| panic!("{}", error))
    }

    /// Asserts a clean failure (no exception).
    pub fn failure(&self, input: impl Into<Input>) -> ParseResult {
        self.try_failure(input).unwrap_or_else(|error| panic!("{}", error))
    }

    /// Asserts a clean failure whose furthest error sits at `position`.
    pub fn failure_at(&self, input: impl Into<Input>, position: usize) -> ParseResult {
        self.try_failure_at(input, position).unwrap_or_else(|error| panic!("{}", error))
    }

    /// Double-runs without asserting an outcome.
    pub fn try_run(&self, input: impl Into<Input>) -> Result<ParseResult, FixtureError> {
        let input = input.into();
        self.double_run(&input)
    }

    /// See [`success`](TestFixture::success).
    pub fn try_success(&self, input: impl Into<Input>) -> Result<ParseResult, FixtureError> {
        let input = input.into();
        let result = self.double_run(&input)?;
        if result.thrown.is_some() || !result.success {
            return Err(FixtureError::UnexpectedFailure { report: self.report(&result, &input) });
        }
        if !result.full_match {
            return Err(FixtureError::IncompleteMatch {
                matched: result.match_size,
                length: input.len(),
                report: self.report(&result, &input),
            });
        }
        Ok(result)
    }

    /// See [`success_expect`](TestFixture::success_expect).
    pub fn try_success_expect<T>(
        &self,
        input: impl Into<Input>,
        expected: &T,
    ) -> Result<ParseResult, FixtureError>
    where
        T: PartialEq + fmt::Debug + 'static,
    {
        let input = input.into();
        let result = self.double_run(&input)?;
        if result.thrown.is_some() || !result.success {
            return Err(FixtureError::UnexpectedFailure { report: self.report(&result, &input) });
        }
        if !result.full_match {
            return Err(FixtureError::IncompleteMatch {
                matched: result.match_size,
                length: input.len(),
                report: self.report(&result, &input),
            });
        }
        let top = match result.value_stack.last() {
            Some(top) => top,
            None => {
                return Err(FixtureError::EmptyValueStack { report: self.report(&result, &input) })
            }
        };
        match downcast::<T>(top) {
            Some(actual) if actual == expected => Ok(result),
            _ => Err(FixtureError::ValueMismatch {
                expected: format!("{:?}", expected),
                actual: format!("{:?}", top),
                report: self.report(&result, &input),
            }),
        }
    }

    /// See [`prefix`](TestFixture::prefix).
    pub fn try_prefix(&self, input: impl Into<Input>) -> Result<ParseResult, FixtureError> {
        let input = input.into();
        let result = self.double_run(&input)?;
        if result.thrown.is_some() || !result.success {
            return Err(FixtureError::UnexpectedFailure { report: self.report(&result, &input) });
        }
        Ok(result)
    }

    /// See [`prefix_expect`](TestFixture::prefix_expect).
    pub fn try_prefix_expect(
        &self,
        input: impl Into<Input>,
        size: usize,
    ) -> Result<ParseResult, FixtureError> {
        let input = input.into();
        let result = self.double_run(&input)?;
        if result.thrown.is_some() || !result.success {
            return Err(FixtureError::UnexpectedFailure { report: self.report(&result, &input) });
        }
        if result.match_size != size {
            return Err(FixtureError::WrongMatchSize {
                expected: size,
                actual: result.match_size,
                report: self.report(&result, &input),
            });
        }
        Ok(result)
    }

    /// See [`failure`](TestFixture::failure).
    pub fn try_failure(&self, input: impl Into<Input>) -> Result<ParseResult, FixtureError> {
        let input = input.into();
        let result = self.double_run(&input)?;
        if result.success {
            return Err(FixtureError::UnexpectedSuccess { report: self.report(&result, &input) });
        }
        Ok(result)
    }

    /// See [`failure_at`](TestFixture::failure_at).
    pub fn try_failure_at(
        &self,
        input: impl Into<Input>,
        position: usize,
    ) -> Result<ParseResult, FixtureError> {
        let input = input.into();
        let result = self.double_run(&input)?;
        if result.success {
            return Err(FixtureError::UnexpectedSuccess { report: self.report(&result, &input) });
        }
        if result.error_position != Some(position) {
            return Err(FixtureError::WrongErrorPosition {
                expected: position,
                actual: result.error_position,
                report: self.report(&result, &input),
            });
        }
        Ok(result)
    }

    /// The two runs, compared field by field; returns the second.
    fn double_run(&self, input: &Input) -> Result<ParseResult, FixtureError> {
        let first = run(&self.parser, input, ParseOptions::default())
            .map_err(FixtureError::IllFormed)?;
        let second = run(
            &self.parser,
            input,
            ParseOptions { record_call_stack: self.record_call_stack, ..ParseOptions::default() },
        )
        .map_err(FixtureError::IllFormed)?;

        if first.thrown != second.thrown {
            return Err(self.divergence("thrown", &first, &second, input, |result| {
                format!("{:?}", result.thrown)
            }));
        }
        if first.success != second.success {
            return Err(self.divergence("success", &first, &second, input, |result| {
                result.success.to_string()
            }));
        }
        if first.success && first.match_size != second.match_size {
            return Err(self.divergence("match_size", &first, &second, input, |result| {
                result.match_size.to_string()
            }));
        }
        if !first.success && first.error_position != second.error_position {
            return Err(self.divergence("error_position", &first, &second, input, |result| {
                format!("{:?}", result.error_position)
            }));
        }
        Ok(second)
    }

    fn divergence(
        &self,
        field: &'static str,
        first: &ParseResult,
        second: &ParseResult,
        input: &Input,
        format: impl Fn(&ParseResult) -> String,
    ) -> FixtureError {
        let reports = format!(
            "\n{}{}{}",
            self.report(first, input),
            self.trace_separator,
            self.report(second, input)
        );
        FixtureError::Divergence { field, first: format(first), second: format(second), reports }
    }

    fn report(&self, result: &ParseResult, input: &Input) -> String {
        let mut out = String::new();
        if input.is_text() {
            let text = input.text_range(0..input.len());
            let map = LineMap::new(&text, self.tab_width, self.column_start);
            result.append_to(&mut out, Some(&map));
        } else {
            result.append_to(&mut out, None);
        }
        out
    }
}
