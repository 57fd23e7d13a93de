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

//! Expression tokenization
//!
//! This module splits the text inside a marker into tokens. Tokens borrow from
//! the source and are produced lazily: [`Token::first`] yields the first token
//! and each token's [`Token::next`] yields the one after it.
//!
//! # Token Types
//!
//! - Numbers: `42`, `2.5`
//! - Strings: `"double"` or `'single'` quoted, with backslash escapes
//! - Identifiers: variable names and the keywords `and`, `or`, `not`, `in`,
//!   `true`, `false`
//! - Symbols: operators and punctuation such as `+`, `//`, `==`, `(`, `[`, `.`
//!
//! # Examples
//!
//! ```rust
//! use boilerplate_parser::expression_tokenizer::{Token, TokenType};
//!
//! let token = Token::first("plan.name == 'demo'").unwrap().unwrap();
//! assert_eq!(token.value, "plan");
//! assert_eq!(token.token_type, TokenType::Identifier);
//! let token = token.next().unwrap().unwrap();
//! assert_eq!(token.value, ".");
//! ```

use crate::error::rcap;

/// Operators made of two characters, checked before single characters
const DOUBLE_SYMBOLS: [&str; 7] = ["==", "!=", "<=", ">=", "//", "&&", "||"];
/// Operators and punctuation made of one character
const SINGLE_SYMBOLS: &str = "+-*/%<>!()[],.";

/// Types of tokens that can be parsed from an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// An integer or decimal number
    Number,
    /// A quoted string; the value excludes the quotes but keeps escapes
    Str,
    /// A variable name or keyword
    Identifier,
    /// An operator or punctuation
    Symbol,
}

/// A token parsed from an expression
#[derive(Debug, Clone)]
pub struct Token<'a> {
    /// The type of token
    pub token_type: TokenType,
    /// The token's value
    pub value: &'a str,
    /// The remaining text after this token
    pub tail: &'a str,
}

fn find_end_of_string(src: &str, quote: char) -> Result<usize, String> {
    let cliped = &src[1..];
    let mut escaped = false;
    for (i, c) in cliped.char_indices() {
        match c {
            '\\' => escaped = !escaped,
            c if c == quote && !escaped => return Ok(i + 1),
            _ => escaped = false,
        }
    }
    Err(format!("unterminated string near {}", rcap(src)))
}

fn find_end_of_number(src: &str) -> usize {
    let bytes = src.as_bytes();
    let mut end = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if bytes.get(end) == Some(&b'.') && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) {
        end += 1;
        end += bytes[end..].iter().take_while(|b| b.is_ascii_digit()).count();
    }
    end
}

fn find_end_of_identifier(src: &str) -> usize {
    src.char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(src.len())
}

fn symbol_len(src: &str) -> Option<usize> {
    if DOUBLE_SYMBOLS.iter().any(|symbol| src.starts_with(symbol)) {
        return Some(2);
    }
    src.chars().next().filter(|c| SINGLE_SYMBOLS.contains(*c)).map(|_| 1)
}

/// Parses a single token from the input string
fn parse(src: &str) -> Result<Option<Token<'_>>, String> {
    let Some(first) = src.chars().next() else {
        return Ok(None);
    };
    let (token_type, value, rest) = match first {
        '"' | '\'' => {
            let end = find_end_of_string(src, first)?;
            (TokenType::Str, &src[1..end], &src[end + 1..])
        }
        c if c.is_ascii_digit() => {
            let end = find_end_of_number(src);
            (TokenType::Number, &src[..end], &src[end..])
        }
        c if c.is_alphabetic() || c == '_' => {
            let end = find_end_of_identifier(src);
            (TokenType::Identifier, &src[..end], &src[end..])
        }
        c => match symbol_len(src) {
            Some(len) => (TokenType::Symbol, &src[..len], &src[len..]),
            None => return Err(format!("unexpected character '{}'", c)),
        },
    };
    Ok(Some(Token {
        token_type,
        value,
        tail: rest.trim_start(),
    }))
}

impl<'a> Token<'a> {
    /// Parses the first token from a string
    pub fn first(src: &'a str) -> Result<Option<Self>, String> {
        parse(src.trim())
    }

    /// Parses the next token after this one
    pub fn next(&self) -> Result<Option<Self>, String> {
        parse(self.tail)
    }

    /// Whether this token is the given operator or punctuation
    pub fn is_symbol(&self, symbol: &str) -> bool {
        self.token_type == TokenType::Symbol && self.value == symbol
    }

    /// Whether this token is the given keyword
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.token_type == TokenType::Identifier && self.value == keyword
    }
}
