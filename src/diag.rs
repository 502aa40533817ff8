//! Annotated-source rendering of parse failures.
//!
//! [`ParseResult::append_to`](crate::ParseResult::append_to) is the stable,
//! machine-friendly report; this module produces the human-facing one,
//! underlining the furthest-error position in the offending source line via
//! `annotate-snippets`.

use crate::result::ParseResult;
use annotate_snippets::display_list::{DisplayList, FormatOptions};
use annotate_snippets::snippet::{Annotation, AnnotationType, Slice, Snippet, SourceAnnotation};
use itertools::Itertools;

/// Renders the furthest error of a failed parse against `source`.
///
/// Returns `None` when the parse succeeded or recorded no error position.
/// `color` enables ANSI styling (available through the crate's default
/// `annotate-snippets/color` feature).
pub fn annotate(result: &ParseResult, source: &str, color: bool) -> Option<String> {
    if result.success {
        return None;
    }
    let error_position = result.error_position?;

    let label = if result.expected.is_empty() {
        "parse failed here".to_owned()
    } else {
        format!("expected one of: {}", result.expected.iter().unique().join(", "))
    };
    let title = Annotation {
        id: None,
        label: Some("parse failure"),
        annotation_type: AnnotationType::Error,
    };
    let opt = FormatOptions { color, ..Default::default() };

    if source.is_empty() {
        let snippet = Snippet { title: Some(title), footer: vec![], slices: vec![], opt };
        return Some(format!("{}\n{}", DisplayList::from(snippet), label));
    }

    let (start, end) = annotation_range(source, error_position);
    let snippet = Snippet {
        title: Some(title),
        footer: vec![],
        slices: vec![Slice {
            source,
            line_start: 1,
            origin: Some("<input>"),
            annotations: vec![SourceAnnotation {
                range: (start, end),
                label: &label,
                annotation_type: AnnotationType::Error,
            }],
            fold: true,
        }],
        opt,
    };
    Some(DisplayList::from(snippet).to_string())
}

/// Byte range covering the character at code-point offset `position`, or
/// the final character when the error sits at end of input.
fn annotation_range(source: &str, position: usize) -> (usize, usize) {
    let start = source
        .char_indices()
        .nth(position)
        .map_or(source.len(), |(byte, _)| byte);
    match source[start..].chars().next() {
        Some(c) => (start, start + c.len_utf8()),
        None => {
            let previous = source[..start]
                .chars()
                .next_back()
                .map_or(0, |c| start - c.len_utf8());
            (previous, start)
        }
    }
}
