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

//! Template marker scanning
//!
//! This module finds the two kinds of marker a template can contain:
//! - Substitutions: `{{ expression }}`
//! - Conditions: `{? expression ?}` and the closing `{? end ?}`
//!
//! Markers never span a line break and there is no escape syntax, so any
//! `{{ ... }}` or `{? ... ?}` on a single line is a marker.
//!
//! # Examples
//!
//! ```rust
//! use boilerplate_parser::expression::{Marker, MarkerType};
//!
//! let template = "Hello {{ name }}!";
//! let marker = Marker::from(template, MarkerType::Substitution).unwrap();
//! assert_eq!(marker.prefix, "Hello ");
//! assert_eq!(marker.expression(), "name");
//! assert_eq!(marker.postfix, "!");
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::error::rcap;

static SUBSTITUTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{(.+?)\}\}").unwrap());
static CONDITION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\?(.+?)\?\}").unwrap());

/// Keyword closing a conditional block
pub const END: &str = "end";

/// Types of template markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerType {
    /// `{{ expression }}`
    Substitution,
    /// `{? expression ?}` or `{? end ?}`
    Condition,
}

impl MarkerType {
    fn pattern(self) -> &'static Regex {
        match self {
            MarkerType::Substitution => &*SUBSTITUTION,
            MarkerType::Condition => &*CONDITION,
        }
    }
}

/// A marker found in template text
#[derive(Debug, Clone, Copy)]
pub struct Marker<'a> {
    /// The type of marker
    pub marker_type: MarkerType,
    /// Text before the marker
    pub prefix: &'a str,
    /// Text between the delimiters, untrimmed
    pub content: &'a str,
    /// Text after the marker
    pub postfix: &'a str,
    /// The complete marker including delimiters
    pub raw: &'a str,
}

impl<'a> Marker<'a> {
    /// Finds the first marker of the given type in `src`
    pub fn from(src: &'a str, marker_type: MarkerType) -> Option<Self> {
        let captures = marker_type.pattern().captures(src)?;
        let whole = captures.get(0)?;
        let content = captures.get(1)?;
        Some(Self {
            marker_type,
            prefix: &src[..whole.start()],
            content: content.as_str(),
            postfix: &src[whole.end()..],
            raw: whole.as_str(),
        })
    }

    /// Finds the next marker of the same type after this one
    pub fn next(&self) -> Option<Self> {
        Self::from(self.postfix, self.marker_type)
    }

    /// The expression text with surrounding whitespace removed
    pub fn expression(&self) -> &'a str {
        self.content.trim()
    }

    /// Whether this is a `{? end ?}` marker
    pub fn is_end(&self) -> bool {
        self.marker_type == MarkerType::Condition && self.expression() == END
    }

    /// Returns the marker with a little of the text before it, for error messages
    pub fn around(&self) -> String {
        format!("{}{}", rcap(self.prefix), self.raw)
    }
}
