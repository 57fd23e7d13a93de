//! Template grammar and evaluation
//!
//! This crate parses and renders the two marker kinds used by `boilerplate`
//! templates. It knows nothing about files or configuration; the `boilerplate`
//! crate builds the namespace and handles I/O.
//!
//! # Syntax
//!
//! - `{{ expression }}` is replaced with the value of the expression
//! - `{? expression ?}` ... `{? end ?}` keeps its body only when the
//!   expression is truthy
//!
//! Rendering is two passes: conditional blocks are resolved first, then
//! expressions in the surviving text are substituted. Expressions inside a
//! dropped block are never evaluated.
//!
//! # Example
//!
//! ```rust
//! use boilerplate_parser::{Namespace, render};
//!
//! let ns = Namespace::new().with("name", "demo").with("tests", false);
//! let out = render("# {{ name }}\n{? tests ?}\nsee tests/\n{? end ?}\n", &ns).unwrap();
//! assert_eq!(out, "# demo\n");
//! ```
//!
//! # Module Structure
//!
//! - `expression.rs`: Marker scanning
//! - `expression_tokenizer.rs`: Tokenization of expressions
//! - `ast.rs`: Expression parsing and evaluation
//! - `block.rs`: Conditional block resolution
//! - `substitution.rs`: Expression substitution
//! - `value.rs`: Values and namespaces
//! - `error.rs`: Error types

pub mod ast;
pub mod block;
pub mod error;
pub mod expression;
pub mod expression_tokenizer;
pub mod substitution;
pub mod value;

pub use block::resolve_conditionals;
pub use error::{Result, TemplateError};
pub use substitution::substitute;
pub use value::{Lookup, Namespace, Value};

/// Renders template text against `scope`: conditionals first, then substitutions.
pub fn render(src: &str, scope: &dyn Lookup) -> Result<String> {
    let resolved = resolve_conditionals(src, scope)?;
    substitute(&resolved, scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn plain_text_passes_through() {
        let text = "this is not actually a template\n\n  with { braces } and ?}";
        let ns = Namespace::new().with("unused", 1);
        assert_eq!(render(text, &ns).unwrap(), text);
        assert_eq!(render(text, &Namespace::new()).unwrap(), text);
    }

    #[test]
    fn greeting() {
        let ns = Namespace::new().with("greeting", "hi").with("name", "John Doe");
        assert_eq!(
            render("{{ greeting }} my name is {{ name }}", &ns).unwrap(),
            "hi my name is John Doe"
        );
    }

    #[test]
    fn undefined_variable_fails_the_render() {
        let ns = Namespace::new().with("name", "John Doe");
        assert_eq!(
            render("{{ hi }}", &ns).unwrap_err(),
            TemplateError::UndefinedVariable { name: "hi".into() }
        );
    }

    #[test]
    fn non_text_results_are_stringified() {
        let ns = Namespace::new().with("v", 3);
        assert_eq!(render("{{ 1 + v }}", &ns).unwrap(), "4");
    }

    #[test]
    fn sequences_are_newline_joined() {
        let ns = Namespace::new().with("my_list", vec![1, 2, 3]);
        assert_eq!(
            render("line 1\n{{ my_list }}\nline 3", &ns).unwrap(),
            "line 1\n1\n2\n3\nline 3"
        );
    }

    #[test]
    fn conditionals_do_not_add_blank_lines() {
        let ns = Namespace::new();
        assert_eq!(
            render("line 1\n{? true ?}\nline 2\n{? end ?}\nline 3", &ns).unwrap(),
            "line 1\nline 2\nline 3"
        );
        assert_eq!(
            render("line 1\n{? false ?}\nline 2\n{? end ?}\nline 3", &ns).unwrap(),
            "line 1\nline 3"
        );
        assert_eq!(
            render(
                "line 1\n{? false ?}\nline 2\n{? end ?}\n{? false ?}\nline 3\n{? end ?}\nline 4",
                &ns
            )
            .unwrap(),
            "line 1\nline 4"
        );
    }

    #[test]
    fn kept_bodies_are_substituted() {
        let ns = Namespace::new().with("tests", true).with("name", "demo");
        assert_eq!(
            render("{? tests ?}\n{{ name }}/tests\n{? end ?}\n", &ns).unwrap(),
            "\ndemo/tests\n"
        );
    }

    #[test]
    fn rendering_rendered_output_is_identity() {
        let ns = Namespace::new().with("name", "demo").with("show", true);
        let once = render("# {{ name }}\n{? show ?}\nshown\n{? end ?}\n", &ns).unwrap();
        assert_eq!(render(&once, &Namespace::new()).unwrap(), once);
    }

    #[test]
    fn any_lookup_table_works() {
        let mut table = HashMap::new();
        table.insert("x".to_string(), Value::from(2));
        assert_eq!(render("{{ x * x }}", &table).unwrap(), "4");
    }
}
