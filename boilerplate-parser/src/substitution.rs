//! Expression substitution.
//!
//! Replaces each `{{ expression }}` with the text of its value. The output is
//! never scanned again, so a value that itself looks like a marker is
//! inserted as-is.

use crate::{
    ast,
    error::Result,
    expression::{Marker, MarkerType},
    value::Lookup,
};

/// Substitutes every expression marker in `src`.
///
/// The first expression that fails aborts the whole substitution.
pub fn substitute(src: &str, scope: &dyn Lookup) -> Result<String> {
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    let mut marker = Marker::from(src, MarkerType::Substitution);
    while let Some(current) = marker {
        out.push_str(current.prefix);
        let value = ast::evaluate(current.expression(), scope)?;
        out.push_str(&value.to_text());
        rest = current.postfix;
        marker = current.next();
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::TemplateError, value::Namespace};

    #[test]
    fn replaces_markers_in_place() {
        let ns = Namespace::new().with("name", "John Doe").with("greeting", "hi");
        let out = substitute("\nline1\n{{ greeting }} my name is {{name}}\nline3\n", &ns).unwrap();
        assert_eq!(out, "\nline1\nhi my name is John Doe\nline3\n");
    }

    #[test]
    fn values_are_not_rescanned() {
        let ns = Namespace::new().with("raw", "{{ raw }}");
        assert_eq!(substitute("<{{ raw }}>", &ns).unwrap(), "<{{ raw }}>");
    }

    #[test]
    fn conditional_markers_pass_through() {
        assert_eq!(substitute("{? x ?}", &Namespace::new()).unwrap(), "{? x ?}");
    }

    #[test]
    fn first_failure_aborts() {
        let err = substitute("{{ 1 }} {{ hi }}", &Namespace::new()).unwrap_err();
        assert_eq!(err, TemplateError::UndefinedVariable { name: "hi".into() });
    }

    #[test]
    fn blank_marker_is_an_expression_error() {
        let err = substitute("{{   }}", &Namespace::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Expression { .. }));
    }
}
