//! Values flowing through a dependency pool.
//!
//! [`Value`] is the closed set of everything a step can read or produce.
//! Lists and records are reference-counted so copying a pool entry into a
//! step view never deep-clones content data.

use std::{collections::BTreeMap, fmt, sync::Arc};

use chrono::NaiveDate;
use compact_str::CompactString;
use serde::{Serialize, Serializer, ser::Error as _};

use crate::thing::ThingRef;

/// Keyed record, used for track sections, contributions and similar
/// structured field values.
pub type Record = BTreeMap<CompactString, Value>;

/// A single pool value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(CompactString),
    Date(NaiveDate),
    List(Arc<[Value]>),
    Record(Arc<Record>),
    Thing(ThingRef),
    Func(MapFn),
}

/// Element-wise mapping function passed as an input value.
#[derive(Clone)]
pub struct MapFn(Arc<dyn Fn(&Value) -> Value + Send + Sync>);

impl MapFn {
    pub fn new(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    #[inline]
    pub fn call(&self, value: &Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for MapFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MapFn(..)")
    }
}

impl Value {
    /// Build a list value from any iterator of values.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(items.into_iter().collect())
    }

    pub fn empty_list() -> Self {
        Self::List(Arc::from([]))
    }

    pub fn string(s: impl Into<CompactString>) -> Self {
        Self::String(s.into())
    }

    pub fn record<K: Into<CompactString>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Record(Arc::new(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn func(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self::Func(MapFn::new(f))
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truthiness used by filters and the `falsy` availability mode.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Date(_) | Self::Record(_) | Self::Thing(_) | Self::Func(_) => true,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub const fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub const fn as_thing(&self) -> Option<&ThingRef> {
        match self {
            Self::Thing(thing) => Some(thing),
            _ => None,
        }
    }

    pub const fn as_func(&self) -> Option<&MapFn> {
        match self {
            Self::Func(f) => Some(f),
            _ => None,
        }
    }

    /// Short type name for diagnostics.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::List(_) => "array",
            Self::Record(_) => "object",
            Self::Thing(_) => "thing",
            Self::Func(_) => "function",
        }
    }
}

// Things and functions compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            (Self::Thing(a), Self::Thing(b)) => Arc::ptr_eq(a, b),
            (Self::Func(a), Self::Func(b)) => Arc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::List(items) => write!(f, "array of {}", items.len()),
            Self::Record(record) => write!(f, "object with {} keys", record.len()),
            Self::Thing(thing) => match thing.reference() {
                Ok(reference) => f.write_str(&reference),
                Err(_) => write!(f, "{} without reference", thing.kind().name()),
            },
            Self::Func(_) => f.write_str("function"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            #[allow(clippy::cast_possible_truncation)]
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Self::List(items) => serializer.collect_seq(items.iter()),
            Self::Record(record) => serializer.collect_map(record.iter()),
            Self::Thing(thing) => {
                serializer.serialize_str(&thing.reference().map_err(S::Error::custom)?)
            }
            Self::Func(_) => serializer.serialize_str("<function>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<CompactString> for Value {
    fn from(s: CompactString) -> Self {
        Self::String(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<ThingRef> for Value {
    fn from(thing: ThingRef) -> Self {
        Self::Thing(thing)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(!Value::empty_list().is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(Value::list([Value::Null]).is_truthy());
    }

    #[test]
    fn test_list_equality_is_structural() {
        let a = Value::list([Value::from(1.0), Value::from("x")]);
        let b = Value::list([Value::from(1.0), Value::from("x")]);
        assert_eq!(a, b);
        assert_ne!(a, Value::empty_list());
    }

    #[test]
    fn test_functions_compare_by_identity() {
        let f = Value::func(|v: &Value| v.clone());
        let g = Value::func(|v: &Value| v.clone());
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
    }

    #[test]
    fn test_serialize_numbers_and_dates() {
        let date = NaiveDate::from_ymd_opt(2009, 4, 13).unwrap();
        let value = Value::record([
            ("count", Value::from(3.0)),
            ("ratio", Value::from(0.5)),
            ("date", Value::from(date)),
            ("none", Value::Null),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(
            json,
            r#"{"count":3,"date":"2009-04-13","none":null,"ratio":0.5}"#
        );
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<f64>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::string("a"));
    }
}
