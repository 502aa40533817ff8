//! The engine entry point.
//!
//! [`run`] wires the pieces together: optional well-formedness gate, a
//! fresh [`Parse`] over the input, the root invocation, and assembly of the
//! immutable [`ParseResult`].  Engine exceptions (panics out of grammar
//! bugs or user actions) are caught here and recorded in the result rather
//! than unwinding into the caller.

use crate::linemap::LineMap;
use crate::parse::{Parse, ParseOptions};
use crate::parser::ParserRef;
use crate::result::ParseResult;
use crate::wellformed::{self, GrammarError};
use crate::Input;
use log::debug;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Runs `parser` against `input`.
///
/// Parse failure is a normal outcome, reported through
/// [`ParseResult::success`]; only configuration errors (structural grammar
/// faults found by the well-formedness check) surface as `Err`.
pub fn run(
    parser: &ParserRef,
    input: &Input,
    options: ParseOptions,
) -> Result<ParseResult, GrammarError> {
    if options.well_formedness_check {
        wellformed::check(parser)?;
    }

    let mut parse = Parse::new(input, options);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| parse.apply(parser)));
    let (success, thrown) = match outcome {
        Ok(matched) => (matched, None),
        Err(payload) => (false, Some(panic_message(payload))),
    };

    let match_size = if success { parse.pos } else { 0 };
    let full_match = success && match_size == input.len();
    let line_map = if input.is_text() {
        Some(LineMap::with_defaults(&input.text_range(0..input.len())))
    } else {
        None
    };
    debug!(
        "parse finished: success={}, size={}, error_position={:?}",
        success,
        match_size,
        parse.error_position()
    );

    Ok(ParseResult {
        success,
        full_match,
        match_size,
        value_stack: parse.stack().snapshot(),
        error_position: parse.error_position(),
        expected: parse.expected().to_vec(),
        thrown,
        call_stack: parse.error_call_stack().map(<[_]>::to_vec),
        trace: parse.take_trace(),
        line_map,
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "engine exception with a non-string payload".to_owned()
    }
}
