// MIT License
//
// Copyright (c) 2024 Jerome Johnson
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Conditional block resolution
//!
//! A conditional block keeps or drops a span of template text:
//!
//! ```text
//! line 1
//! {? plan.tests ?}
//! tests/ holds the test suite
//! {? end ?}
//! line 3
//! ```
//!
//! Blocks do not nest and have no `else`. Bodies are opaque here; any
//! `{{ ... }}` markers inside a kept body are left for substitution.
//!
//! # Whitespace
//!
//! When a chunk starting with a newline is appended to output that already
//! ends with one, the leading newline is dropped. Markers sitting on their own
//! lines therefore vanish without leaving blank lines, whether the block is
//! kept or dropped.
//!
//! Only `\n` counts as a newline here. Templates read from files have their
//! `\r\n` line endings turned into `\n` before they reach this module.

use tracing::trace;

use crate::{
    ast,
    error::{Result, TemplateError},
    expression::{Marker, MarkerType},
    value::Lookup,
};

/// A piece of template text after splitting on conditional markers
#[derive(Debug, Clone, Copy)]
pub enum Segment<'a> {
    /// Text outside any block
    Text(&'a str),
    /// A `{? condition ?}` body `{? end ?}` block
    Conditional {
        /// The opening marker carrying the condition
        condition: Marker<'a>,
        /// Text between the opening and `end` markers
        body: &'a str,
    },
}

/// Splits template text into literal text and conditional blocks.
///
/// The whole template is checked before anything is evaluated: a block that
/// is never closed, an `end` with no block open, or a block opened inside
/// another block is an error.
pub fn segments(src: &str) -> Result<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = src;
    let mut marker = Marker::from(src, MarkerType::Condition);
    while let Some(open) = marker {
        segments.push(Segment::Text(open.prefix));
        if open.is_end() {
            return Err(TemplateError::malformed("end without a matching condition", &open));
        }
        let close = open.next().ok_or_else(|| TemplateError::unclosed(&open))?;
        if !close.is_end() {
            return Err(TemplateError::malformed("conditional blocks cannot be nested", &close));
        }
        segments.push(Segment::Conditional {
            condition: open,
            body: close.prefix,
        });
        rest = close.postfix;
        marker = close.next();
    }
    segments.push(Segment::Text(rest));
    Ok(segments)
}

/// Appends `chunk`, dropping its leading newline if `out` already ends with one
fn append_collapsed(out: &mut String, chunk: &str) {
    let chunk = if out.ends_with('\n') {
        chunk.strip_prefix('\n').unwrap_or(chunk)
    } else {
        chunk
    };
    out.push_str(chunk);
}

/// Evaluates every conditional block and returns the surviving text.
///
/// Expression markers in the result are untouched.
pub fn resolve_conditionals(src: &str, scope: &dyn Lookup) -> Result<String> {
    let mut out = String::with_capacity(src.len());
    for segment in segments(src)? {
        match segment {
            Segment::Text(text) => append_collapsed(&mut out, text),
            Segment::Conditional { condition, body } => {
                let keep = ast::evaluate(condition.expression(), scope)?.is_truthy();
                trace!(condition = condition.expression(), keep, "resolved conditional block");
                if keep {
                    append_collapsed(&mut out, body);
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Namespace;

    fn resolve(src: &str) -> String {
        resolve_conditionals(src, &Namespace::new()).unwrap()
    }

    #[test]
    fn text_without_blocks_is_unchanged() {
        assert_eq!(resolve("a\n\nb\n"), "a\n\nb\n");
    }

    #[test]
    fn true_block_keeps_body() {
        assert_eq!(
            resolve("\nline 1\n{? True ?}\nline 2\n{? end ?}\nline 3\n"),
            "\nline 1\nline 2\nline 3\n"
        );
    }

    #[test]
    fn false_block_drops_body() {
        assert_eq!(
            resolve("\nline 1\n{? False ?}\nline 2\n{? end ?}\nline 3\n"),
            "\nline 1\nline 3\n"
        );
    }

    #[test]
    fn chained_false_blocks_leave_no_blank_lines() {
        assert_eq!(
            resolve("line 1\n{? false ?}\nline 2\n{? end ?}\n{? false ?}\nline 3\n{? end ?}\nline 4"),
            "line 1\nline 4"
        );
    }

    #[test]
    fn inline_blocks() {
        assert_eq!(resolve("a{? 1 < 2 ?}b{? end ?}c"), "abc");
        assert_eq!(resolve("a{? 1 > 2 ?}b{? end ?}c"), "ac");
    }

    #[test]
    fn intentional_blank_lines_survive() {
        assert_eq!(resolve("a\n\n{? true ?}\nb\n{? end ?}\n"), "a\n\nb\n");
    }

    #[test]
    fn body_expressions_are_left_alone() {
        assert_eq!(resolve("{? true ?}{{ missing }}{? end ?}"), "{{ missing }}");
    }

    #[test]
    fn dropped_bodies_are_never_evaluated() {
        assert_eq!(resolve("x{? false ?}{{ 1 / 0 }}{? end ?}"), "x");
    }

    #[test]
    fn condition_uses_namespace() {
        let ns = Namespace::new().with("tests", true).with("license", "");
        let src = "{? tests ?}T{? end ?}{? license ?}L{? end ?}";
        assert_eq!(resolve_conditionals(src, &ns).unwrap(), "T");
    }

    #[test]
    fn undefined_condition_variable() {
        let err = resolve_conditionals("{? nope ?}x{? end ?}", &Namespace::new()).unwrap_err();
        assert_eq!(err, TemplateError::UndefinedVariable { name: "nope".into() });
    }

    #[test]
    fn unclosed_block() {
        let err = segments("a\n{? true ?}\nb").unwrap_err();
        assert!(matches!(err, TemplateError::MalformedTemplate { .. }));
    }

    #[test]
    fn stray_end() {
        let err = segments("a\n{? end ?}\nb").unwrap_err();
        assert!(matches!(err, TemplateError::MalformedTemplate { .. }));
    }

    #[test]
    fn nested_blocks_are_rejected() {
        let err = segments("{? a ?}{? b ?}x{? end ?}{? end ?}").unwrap_err();
        assert!(matches!(err, TemplateError::MalformedTemplate { .. }));
    }

    #[test]
    fn structure_is_checked_before_evaluation() {
        let err = resolve_conditionals("{? nope ?}x", &Namespace::new()).unwrap_err();
        assert!(matches!(err, TemplateError::MalformedTemplate { .. }));
    }
}
