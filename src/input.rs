//! A uniform random-access view over the parse input.
//!
//! The engine drives parsers against either a character sequence or a
//! pre-tokenized sequence through the same interface.  Positions are
//! code-point offsets for text and plain indices for tokens; both range over
//! `0..=len()`, with `len()` itself designating end-of-input.
//!
//! The input is fully materialized before the parse starts; the engine
//! performs no I/O of its own.

use crate::stack::Value;
use std::fmt;
use std::ops::Range;

/// The sequence a [`Parse`](crate::Parse) consumes.
///
/// `Text` stores the decoded code points of the source string, so cursor
/// arithmetic and diagnostics agree on offsets regardless of UTF-8 encoding
/// width.  `Tokens` stores opaque values produced by an external lexer;
/// the engine never inspects them except through token predicates.
pub enum Input {
    /// Character input, one entry per code point.
    Text(Vec<char>),
    /// Token input, one entry per token.
    Tokens(Vec<Value>),
}

impl Input {
    /// Number of positions in the input.
    pub fn len(&self) -> usize {
        match self {
            Input::Text(chars) => chars.len(),
            Input::Tokens(tokens) => tokens.len(),
        }
    }

    /// True if the input holds no positions at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The character at `pos`, or `None` past the end.
    ///
    /// Raises an engine exception when called on token input: a character
    /// primitive driven against tokens is a grammar bug, and the driver
    /// reports it through `ParseResult::thrown`.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        match self {
            Input::Text(chars) => chars.get(pos).copied(),
            Input::Tokens(_) => panic!("character primitive driven against token input"),
        }
    }

    /// The token at `pos`, or `None` past the end.
    ///
    /// Raises an engine exception when called on character input.
    pub fn token_at(&self, pos: usize) -> Option<&Value> {
        match self {
            Input::Text(_) => panic!("token primitive driven against character input"),
            Input::Tokens(tokens) => tokens.get(pos),
        }
    }

    /// True if the characters starting at `pos` spell out `text`.
    pub fn starts_with(&self, pos: usize, text: &str) -> bool {
        match self {
            Input::Text(chars) => {
                let mut at = pos;
                for c in text.chars() {
                    match chars.get(at) {
                        Some(&have) if have == c => at += 1,
                        _ => return false,
                    }
                }
                true
            }
            Input::Tokens(_) => panic!("character primitive driven against token input"),
        }
    }

    /// The matched characters in `range`, collected into a string.
    pub fn text_range(&self, range: Range<usize>) -> String {
        match self {
            Input::Text(chars) => chars[range].iter().collect(),
            Input::Tokens(_) => panic!("character primitive driven against token input"),
        }
    }

    /// The matched tokens in `range`.
    pub fn token_range(&self, range: Range<usize>) -> &[Value] {
        match self {
            Input::Text(_) => panic!("token primitive driven against character input"),
            Input::Tokens(tokens) => &tokens[range],
        }
    }

    /// True for `Text` input.
    pub fn is_text(&self) -> bool {
        matches!(self, Input::Text(_))
    }

    /// Builds token input from externally lexed values.
    pub fn tokens(tokens: Vec<Value>) -> Input {
        Input::Tokens(tokens)
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Input {
        Input::Text(text.chars().collect())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Input {
        Input::from(text.as_str())
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Text(chars) => write!(f, "Text({:?})", chars.iter().collect::<String>()),
            Input::Tokens(tokens) => write!(f, "Tokens(len={})", tokens.len()),
        }
    }
}
