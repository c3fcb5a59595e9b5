//! ---
//! slv_section: "02-remote-api"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Ordered multi-valued request parameters."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::fmt;

/// A single parameter value as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    /// Free-form text.
    Str(String),
    /// Integer identifiers, timestamps.
    Int(i64),
    /// Flags, rendered as `true` / `false`.
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(value) => f.write_str(value),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// Caller input for a parameter: one value, or a list that expands to one pair per element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// A single value, repeated as many times as the encoder is asked to.
    Single(Scalar),
    /// Several values sharing the same key, kept in order.
    Multiple(Vec<Scalar>),
}

impl ParamValue {
    /// Build a [`ParamValue::Multiple`] from any iterator of scalar-convertible items.
    pub fn many<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        ParamValue::Multiple(values.into_iter().map(Into::into).collect())
    }

    /// Returns the value when this is a scalar.
    pub fn as_single(&self) -> Option<&Scalar> {
        match self {
            ParamValue::Single(value) => Some(value),
            ParamValue::Multiple(_) => None,
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, ParamValue::Multiple(_))
    }
}

macro_rules! param_value_from {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    ParamValue::Single(value.into())
                }
            }

            impl From<Vec<$ty>> for ParamValue {
                fn from(values: Vec<$ty>) -> Self {
                    ParamValue::many(values)
                }
            }
        )+
    };
}

param_value_from!(&str, String, i64, i32, bool);

impl From<Scalar> for ParamValue {
    fn from(value: Scalar) -> Self {
        ParamValue::Single(value)
    }
}

impl From<Vec<Scalar>> for ParamValue {
    fn from(values: Vec<Scalar>) -> Self {
        ParamValue::Multiple(values)
    }
}

/// Ordered (key, value) pairs where a key may appear several times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    pairs: Vec<(String, Scalar)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append exactly one pair.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Append `value` under `key`.
    ///
    /// A list appends one pair per element in order and ignores `repeat`. A scalar is
    /// appended `repeat` times.
    pub fn encode(
        &mut self,
        key: &str,
        value: impl Into<ParamValue>,
        repeat: usize,
    ) -> &mut Self {
        match value.into() {
            ParamValue::Multiple(values) => {
                for value in values {
                    self.pairs.push((key.to_owned(), value));
                }
            }
            ParamValue::Single(value) => {
                for _ in 0..repeat {
                    self.pairs.push((key.to_owned(), value.clone()));
                }
            }
        }
        self
    }

    /// Owned-builder form of [`ParameterSet::encode`].
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.encode(key, value, 1);
        self
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Every value stored under `key`, in insertion order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Scalar> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Wire representation used for query strings and form bodies.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.pairs
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

/// Encode a single key into a fresh [`ParameterSet`].
pub fn encode(key: &str, value: impl Into<ParamValue>, repeat: usize) -> ParameterSet {
    let mut set = ParameterSet::new();
    set.encode(key, value, repeat);
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_yields_one_pair_per_element_in_order() {
        let set = encode("deviceId", vec![101i64, 102, 103], 1);
        let values: Vec<String> = set.get_all("deviceId").map(ToString::to_string).collect();
        assert_eq!(values, vec!["101", "102", "103"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn list_ignores_repeat_count() {
        let set = encode("name", vec!["a", "b"], 5);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn scalar_is_repeated() {
        let set = encode("name", "TotalKWHPositive", 3);
        assert_eq!(set.len(), 3);
        assert!(set
            .iter()
            .all(|(k, v)| k == "name" && *v == Scalar::from("TotalKWHPositive")));
    }

    #[test]
    fn zero_repeat_appends_nothing() {
        let set = encode("name", "x", 0);
        assert!(set.is_empty());
    }

    #[test]
    fn encoding_into_a_clone_leaves_original_alone() {
        let base = ParameterSet::new().with("ser", "json");
        let mut derived = base.clone();
        derived.encode("deviceId", vec![1i64, 2], 1);
        assert_eq!(base.len(), 1);
        assert_eq!(derived.len(), 3);
    }

    #[test]
    fn booleans_render_lowercase() {
        let set = ParameterSet::new().with("partialMatch", true);
        assert_eq!(
            set.to_pairs(),
            vec![("partialMatch".to_owned(), "true".to_owned())]
        );
    }

    #[test]
    fn keys_are_case_sensitive() {
        let set = ParameterSet::new().with("Name", "upper").with("name", "lower");
        assert_eq!(set.get("name"), Some(&Scalar::from("lower")));
        assert_eq!(set.get("Name"), Some(&Scalar::from("upper")));
    }
}
