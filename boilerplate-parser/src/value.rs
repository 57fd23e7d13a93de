//! Runtime values and the namespace expressions are evaluated against.
//!
//! Template values are dynamically typed but the set of shapes is closed:
//! text, integers, floats, booleans, sequences and string-keyed maps. The one
//! conversion that matters to rendering is [`Value::to_text`], which decides
//! what a `{{ ... }}` marker is replaced with.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Display},
    hash::BuildHasher,
};

/// A template runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Sequence(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Converts the value to the text inserted in place of an expression marker.
    ///
    /// Text is inserted verbatim, a sequence inserts each element on its own
    /// line, and everything else uses its [`Display`] form.
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Sequence(items) => items
                .iter()
                .map(|item| item.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        }
    }

    /// Coerce to boolean: `false`, zero and empty containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Text(s) => !s.is_empty(),
            Value::Integer(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Boolean(b) => *b,
            Value::Sequence(items) => !items.is_empty(),
            Value::Map(fields) => !fields.is_empty(),
        }
    }

    /// Name of the type, used in evaluation error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Sequence(_) => "sequence",
            Value::Map(_) => "map",
        }
    }

    /// Numeric view of the value, if it has one.
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(fields) => {
                f.write_str("{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(fields: BTreeMap<String, T>) -> Self {
        Value::Map(fields.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<Namespace> for Value {
    fn from(namespace: Namespace) -> Self {
        Value::Map(namespace.values)
    }
}

/// Read-only access to named values during evaluation.
///
/// Expressions can reach nothing but what a `Lookup` hands out.
pub trait Lookup {
    fn lookup(&self, name: &str) -> Option<&Value>;
}

impl<S: BuildHasher> Lookup for HashMap<String, Value, S> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl Lookup for BTreeMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// Mapping from variable name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    values: BTreeMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Namespace::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a value, returning the one it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Copies every entry of `other` into this namespace; `other` wins on collisions.
    pub fn merge(&mut self, other: &Namespace) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Lookup for Namespace {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Namespace {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_inserted_verbatim() {
        assert_eq!(Value::from("a\nb").to_text(), "a\nb");
    }

    #[test]
    fn sequences_join_with_newlines() {
        let value = Value::from(vec![1, 2, 3]);
        assert_eq!(value.to_text(), "1\n2\n3");
    }

    #[test]
    fn nested_sequences_use_bracket_form() {
        let value = Value::Sequence(vec![Value::from(vec!["a", "b"]), Value::from("c")]);
        assert_eq!(value.to_text(), "[a, b]\nc");
    }

    #[test]
    fn scalars_use_canonical_form() {
        assert_eq!(Value::from(4).to_text(), "4");
        assert_eq!(Value::from(2.0).to_text(), "2.0");
        assert_eq!(Value::from(0.25).to_text(), "0.25");
        assert_eq!(Value::from(true).to_text(), "true");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::Sequence(vec![]).is_truthy());
        assert!(Value::from("no").is_truthy());
        assert!(Value::from(vec![0]).is_truthy());
    }

    #[test]
    fn later_merge_wins() {
        let mut ns = Namespace::new().with("a", 1).with("b", 2);
        ns.merge(&Namespace::new().with("b", "two"));
        assert_eq!(ns.get("a"), Some(&Value::Integer(1)));
        assert_eq!(ns.get("b"), Some(&Value::from("two")));
    }

    #[test]
    fn namespace_collects_from_pairs() {
        let ns: Namespace = [("name", "John Doe"), ("greeting", "hi")].into_iter().collect();
        assert_eq!(ns.len(), 2);
        assert_eq!(ns.lookup("greeting"), Some(&Value::from("hi")));
    }

    #[test]
    fn namespace_becomes_a_map_value() {
        let plan = Namespace::new().with("name", "demo");
        let Value::Map(fields) = Value::from(plan) else {
            panic!("expected a map");
        };
        assert_eq!(fields.get("name"), Some(&Value::from("demo")));
    }
}
