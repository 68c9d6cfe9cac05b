//! Schema-free movie records.
//!
//! A record is an open map of attribute name to value. Values are a scalar
//! or a flat list of scalars; the JSON encoding is the plain one (no tags),
//! so records written by other tools load unchanged.

use std::collections::BTreeMap;
use std::fmt;

use kolekto_cas::ContentId;
use serde::{Deserialize, Deserializer, Serialize};

/// Attribute listing auxiliary store entries attached to a record
/// (subtitles and the like). Those entries are kept alive by GC.
pub const EXTERNALS_KEY: &str = "_externals";

/// Internal/system attribute names start with this prefix.
pub const INTERNAL_PREFIX: char = '_';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n.into())
    }
}

impl From<u64> for Scalar {
    fn from(n: u64) -> Self {
        Scalar::Number(n.into())
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::Number(n.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl Value {
    /// Scalar view, `None` for lists.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::List(_) => None,
        }
    }

    /// Elements as a slice; a scalar is a one-element list.
    pub fn as_slice(&self) -> &[Scalar] {
        match self {
            Value::Scalar(s) => std::slice::from_ref(s),
            Value::List(items) => items,
        }
    }

    /// Render for display, joining list elements with `sep`.
    pub fn join(&self, sep: &str) -> String {
        self.as_slice()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(sep)
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

macro_rules! value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(v.into())
                }
            }

            impl From<Vec<$ty>> for Value {
                fn from(items: Vec<$ty>) -> Self {
                    Value::List(items.into_iter().map(Into::into).collect())
                }
            }
        )*
    };
}

value_from!(&str, String, bool, i64, u64, i32);

impl From<Vec<Scalar>> for Value {
    fn from(items: Vec<Scalar>) -> Self {
        Value::List(items)
    }
}

/// Attribute map describing one catalogued item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl<'de> Deserialize<'de> for Record {
    /// `null` attributes are dropped: a missing value and an explicit null
    /// mean the same thing to every consumer.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<Value>>::deserialize(deserializer)?;
        Ok(Record(
            raw.into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect(),
        ))
    }
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Text of a scalar string attribute.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_scalar).and_then(Scalar::as_str)
    }

    /// Whether a boolean attribute is set to `true`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Value::Scalar(Scalar::Bool(true))))
    }

    /// Auxiliary identifiers listed under [`EXTERNALS_KEY`].
    pub fn externals(&self) -> Vec<ContentId> {
        self.get(EXTERNALS_KEY)
            .map(|v| {
                v.as_slice()
                    .iter()
                    .filter_map(Scalar::as_str)
                    .map(|s| ContentId::from_entry_name(s.to_ascii_lowercase()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Attributes in display order: user-visible names first, internal
    /// (`_`-prefixed) names after, each group alphabetical.
    pub fn display_order(&self) -> Vec<(&str, &Value)> {
        let mut fields: Vec<_> = self.0.iter().map(|(k, v)| (k.as_str(), v)).collect();
        fields.sort_by_key(|(k, _)| (k.starts_with(INTERNAL_PREFIX), *k));
        fields
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Record(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_encoding() {
        let mut record = Record::new();
        record.insert("title", "Foo");
        record.insert("year", 2001i64);
        record.insert("watched", true);
        record.insert("genres", vec!["Action", "Drama"]);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"genres":["Action","Drama"],"title":"Foo","watched":true,"year":2001}"#
        );
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_nulls_are_dropped() {
        let record: Record = serde_json::from_str(r#"{"title":"Foo","year":null}"#).unwrap();
        assert_eq!(record.len(), 1);
        assert!(!record.contains_key("year"));
    }

    #[test]
    fn test_nested_maps_are_rejected() {
        assert!(serde_json::from_str::<Record>(r#"{"cast":{"lead":"X"}}"#).is_err());
    }

    #[test]
    fn test_externals() {
        let record: Record =
            serde_json::from_str(r#"{"title":"Foo","_externals":["AB12","cd34"]}"#).unwrap();
        let ids: Vec<_> = record.externals().iter().map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["ab12", "cd34"]);
        assert!(Record::new().externals().is_empty());
    }

    #[test]
    fn test_display_order_puts_internal_last() {
        let record: Record = [("_datasource", "tmdb"), ("title", "Foo"), ("ext", "mkv")]
            .into_iter()
            .collect();
        let keys: Vec<_> = record.display_order().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["ext", "title", "_datasource"]);
    }

    #[test]
    fn test_accessors() {
        let record: Record =
            serde_json::from_str(r#"{"title":"Foo","year":2001,"crap":false,"favorite":true}"#).unwrap();
        assert_eq!(record.text("title"), Some("Foo"));
        assert_eq!(record.text("year"), None);
        assert_eq!(record.get("year").and_then(Value::as_scalar).and_then(Scalar::as_i64), Some(2001));
        assert!(record.flag("favorite"));
        assert!(!record.flag("crap"));
        assert!(!record.flag("missing"));
        assert_eq!(Value::from(vec!["a", "b"]).join(", "), "a, b");
    }
}
