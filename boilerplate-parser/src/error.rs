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

//! Error handling for template rendering
//!
//! Every failure while resolving conditionals or substituting expressions is a
//! [`TemplateError`]. Messages carry a short excerpt of the offending template
//! text so the caller can locate the problem.

use thiserror::Error;

use crate::expression::Marker;

/// Error type for template rendering failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    /// An expression referenced a name that is not in the namespace
    #[error("name '{name}' is not defined")]
    UndefinedVariable { name: String },

    /// Conditional markers do not pair up into `{? cond ?}` ... `{? end ?}` blocks
    #[error("malformed template: {message} near \"{near}\"")]
    MalformedTemplate { message: String, near: String },

    /// The expression text could not be parsed or evaluated
    #[error("invalid expression `{expression}`: {message}")]
    Expression { expression: String, message: String },
}

/// Returns the last 32 characters of a string for error context
pub(crate) fn rcap(src: &str) -> &str {
    static CAP_AT: usize = 32;

    match src.char_indices().rev().nth(CAP_AT - 1) {
        Some((pos, _)) => &src[pos..],
        None => src,
    }
}

impl TemplateError {
    /// Creates a malformed template error with context from a marker
    pub(crate) fn malformed(message: &str, marker: &Marker<'_>) -> Self {
        Self::MalformedTemplate {
            message: message.to_string(),
            near: marker.around().to_string(),
        }
    }

    /// Creates an error for a conditional block that is never closed
    pub(crate) fn unclosed(marker: &Marker<'_>) -> Self {
        Self::malformed("unclosed conditional block", marker)
    }
}

/// Result type for template rendering operations
pub type Result<T> = std::result::Result<T, TemplateError>;
