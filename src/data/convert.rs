//! TOML values to composite values.

use chrono::NaiveDate;
use toml::value::Datetime;

use crate::composite::Value;

/// Convert a parsed TOML value.
///
/// Integers become numbers; a date without a time becomes a date, any other
/// datetime keeps its TOML text.
pub fn from_toml(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::from(s.as_str()),
        toml::Value::Integer(n) => Value::from(*n),
        toml::Value::Float(n) => Value::from(*n),
        toml::Value::Boolean(b) => Value::from(*b),
        toml::Value::Datetime(datetime) => date_only(datetime)
            .map_or_else(|| Value::from(datetime.to_string()), Value::from),
        toml::Value::Array(items) => Value::list(items.iter().map(from_toml)),
        toml::Value::Table(table) => Value::record(table.iter().map(|(k, v)| (k.as_str(), from_toml(v)))),
    }
}

fn date_only(datetime: &Datetime) -> Option<NaiveDate> {
    match (datetime.date, datetime.time, datetime.offset) {
        (Some(date), None, None) => {
            NaiveDate::from_ymd_opt(i32::from(date.year), u32::from(date.month), u32::from(date.day))
        }
        _ => None,
    }
}
