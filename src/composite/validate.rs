//! Validator combinators.
//!
//! Validators are plain values built from a small closed set of
//! combinators. Checking a value returns structured failures (a path into
//! the value plus a reason) instead of a boolean, so errors can point at
//! the exact offending element.
//!
//! ```ignore
//! let contribs = Validator::array_of(Validator::record([
//!     RecordField::required("who", Validator::Reference("artist")),
//!     RecordField::optional("what", Validator::ContentString),
//! ]));
//! contribs.check(&value)?;
//! ```

use std::{fmt, sync::LazyLock};

use compact_str::CompactString;
use regex::Regex;

use super::value::Value;

static DIRECTORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_\-]*$").expect("valid regex"));

static COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{4}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$")
        .expect("valid regex")
});

// ============================================================================
// Types
// ============================================================================

/// Coarse value type, used by input declarations that only care about shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Boolean,
    Number,
    String,
    Date,
    Array,
    Object,
    Thing,
    Function,
}

impl ValueType {
    pub const fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Boolean, Value::Bool(_))
                | (Self::Number, Value::Number(_))
                | (Self::String, Value::String(_))
                | (Self::Date, Value::Date(_))
                | (Self::Array, Value::List(_))
                | (Self::Object, Value::Record(_))
                | (Self::Thing, Value::Thing(_))
                | (Self::Function, Value::Func(_))
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Date => "date",
            Self::Array => "array",
            Self::Object => "object",
            Self::Thing => "thing",
            Self::Function => "function",
        }
    }
}

/// Field of a [`Validator::Record`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: &'static str,
    pub validator: Validator,
    pub required: bool,
}

impl RecordField {
    pub const fn required(name: &'static str, validator: Validator) -> Self {
        Self { name, validator, required: true }
    }

    pub const fn optional(name: &'static str, validator: Validator) -> Self {
        Self { name, validator, required: false }
    }
}

/// A composable value predicate.
///
/// Null is never passed to a validator; whether null is acceptable is
/// decided by the input or field that owns the validator.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    Any,
    Type(ValueType),
    Boolean,
    Number,
    /// Integer >= 0.
    WholeNumber,
    /// Length in seconds, >= 0.
    Duration,
    String,
    /// String without surrounding whitespace or zero-width characters.
    ContentString,
    Directory,
    Color,
    Date,
    /// `"<type>:<directory>"`, or a bare directory, for the given type.
    Reference(&'static str),
    /// A resolved thing whose reference type matches.
    Thing(&'static str),
    ArrayOf(Box<Validator>),
    /// Array without duplicate items.
    UniqueArrayOf(Box<Validator>),
    Record(Vec<RecordField>),
    AnyOf(Vec<Validator>),
}

/// Step into a nested value, for failure paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Index(usize),
    Key(CompactString),
}

/// Structured validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub path: Vec<PathSegment>,
    pub reason: String,
}

impl ValidationFailure {
    fn new(path: &[PathSegment], reason: impl Into<String>) -> Self {
        Self { path: path.to_vec(), reason: reason.into() }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return f.write_str(&self.reason);
        }
        f.write_str("at ")?;
        for (i, segment) in self.path.iter().enumerate() {
            match segment {
                PathSegment::Index(index) => write!(f, "[{index}]")?,
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
            }
        }
        write!(f, ": {}", self.reason)
    }
}

// ============================================================================
// Checking
// ============================================================================

impl Validator {
    pub fn array_of(item: Validator) -> Self {
        Self::ArrayOf(Box::new(item))
    }

    pub fn unique_array_of(item: Validator) -> Self {
        Self::UniqueArrayOf(Box::new(item))
    }

    pub fn record(fields: impl IntoIterator<Item = RecordField>) -> Self {
        Self::Record(fields.into_iter().collect())
    }

    /// Check a value, returning the first failure.
    pub fn check(&self, value: &Value) -> Result<(), ValidationFailure> {
        match self.check_all(value).into_iter().next() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    /// Check a value, collecting every failure.
    pub fn check_all(&self, value: &Value) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        self.collect(value, &mut Vec::new(), &mut failures);
        failures
    }

    fn collect(
        &self,
        value: &Value,
        path: &mut Vec<PathSegment>,
        out: &mut Vec<ValidationFailure>,
    ) {
        let expected = |out: &mut Vec<ValidationFailure>, what: &str| {
            out.push(ValidationFailure::new(
                path,
                format!("expected {what}, got {}", value.type_name()),
            ));
        };

        match self {
            Self::Any => {}
            Self::Type(ty) => {
                if !ty.matches(value) {
                    expected(out, ty.name());
                }
            }
            Self::Boolean => {
                if !matches!(value, Value::Bool(_)) {
                    expected(out, "boolean");
                }
            }
            Self::Number => {
                if !matches!(value, Value::Number(n) if n.is_finite()) {
                    expected(out, "finite number");
                }
            }
            Self::WholeNumber => match value {
                Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => {}
                Value::Number(n) => out.push(ValidationFailure::new(
                    path,
                    format!("expected whole number, got {n}"),
                )),
                _ => expected(out, "whole number"),
            },
            Self::Duration => match value {
                Value::Number(n) if *n >= 0.0 && n.is_finite() => {}
                Value::Number(n) => out.push(ValidationFailure::new(
                    path,
                    format!("expected non-negative duration, got {n}"),
                )),
                _ => expected(out, "duration in seconds"),
            },
            Self::String => {
                if !matches!(value, Value::String(_)) {
                    expected(out, "string");
                }
            }
            Self::ContentString => match value {
                Value::String(s) => {
                    if let Some(reason) = content_string_problem(s) {
                        out.push(ValidationFailure::new(path, reason));
                    }
                }
                _ => expected(out, "content string"),
            },
            Self::Directory => match value {
                Value::String(s) if DIRECTORY_RE.is_match(s) => {}
                Value::String(s) => out.push(ValidationFailure::new(
                    path,
                    format!("{s:?} is not a valid directory"),
                )),
                _ => expected(out, "directory"),
            },
            Self::Color => match value {
                Value::String(s) if COLOR_RE.is_match(s) => {}
                Value::String(s) => out.push(ValidationFailure::new(
                    path,
                    format!("{s:?} is not a hex color"),
                )),
                _ => expected(out, "color"),
            },
            Self::Date => {
                if !matches!(value, Value::Date(_)) {
                    expected(out, "date");
                }
            }
            Self::Reference(ty) => match value {
                Value::String(s) => {
                    if let Some(reason) = reference_problem(s, ty) {
                        out.push(ValidationFailure::new(path, reason));
                    }
                }
                Value::Thing(thing) if thing.kind().reference_type() == *ty => {}
                _ => expected(out, &format!("reference to {ty}")),
            },
            Self::Thing(ty) => match value {
                Value::Thing(thing) if thing.kind().reference_type() == *ty => {}
                Value::Thing(thing) => out.push(ValidationFailure::new(
                    path,
                    format!("expected {ty}, got {}", thing.kind().reference_type()),
                )),
                _ => expected(out, ty),
            },
            Self::ArrayOf(item) | Self::UniqueArrayOf(item) => {
                let Value::List(items) = value else {
                    expected(out, "array");
                    return;
                };
                for (index, entry) in items.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    if entry.is_null() {
                        out.push(ValidationFailure::new(path, "unexpected null item"));
                    } else {
                        item.collect(entry, path, out);
                    }
                    path.pop();
                }
                if matches!(self, Self::UniqueArrayOf(_)) {
                    for (index, entry) in items.iter().enumerate() {
                        if items[..index].contains(entry) {
                            path.push(PathSegment::Index(index));
                            out.push(ValidationFailure::new(
                                path,
                                format!("duplicate item {entry}"),
                            ));
                            path.pop();
                        }
                    }
                }
            }
            Self::Record(fields) => {
                let Value::Record(record) = value else {
                    expected(out, "object");
                    return;
                };
                for key in record.keys() {
                    if !fields.iter().any(|field| field.name == key.as_str()) {
                        path.push(PathSegment::Key(key.clone()));
                        out.push(ValidationFailure::new(path, "unknown key"));
                        path.pop();
                    }
                }
                for field in fields {
                    path.push(PathSegment::Key(field.name.into()));
                    match record.get(field.name) {
                        Some(entry) if !entry.is_null() => {
                            field.validator.collect(entry, path, out);
                        }
                        _ if field.required => {
                            out.push(ValidationFailure::new(path, "missing required key"));
                        }
                        _ => {}
                    }
                    path.pop();
                }
            }
            Self::AnyOf(options) => {
                let mut reasons = Vec::new();
                for option in options {
                    let failures = option.check_all(value);
                    if failures.is_empty() {
                        return;
                    }
                    reasons.extend(failures.into_iter().map(|f| f.to_string()));
                }
                out.push(ValidationFailure::new(
                    path,
                    format!("matched none of: {}", reasons.join("; ")),
                ));
            }
        }
    }
}

fn content_string_problem(s: &str) -> Option<&'static str> {
    if s.trim() != s {
        Some("content string has leading or trailing whitespace")
    } else if s.contains('\u{200B}') {
        Some("content string contains a zero-width space")
    } else {
        None
    }
}

fn reference_problem(s: &str, ty: &str) -> Option<String> {
    let directory = match s.split_once(':') {
        Some((prefix, _)) if prefix != ty => {
            return Some(format!("expected reference to {ty}, got {prefix:?}"));
        }
        Some((_, directory)) => directory,
        None => s,
    };
    if DIRECTORY_RE.is_match(directory) {
        None
    } else {
        Some(format!("{directory:?} is not a valid directory in reference"))
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Type(ty) => f.write_str(ty.name()),
            Self::Boolean => f.write_str("boolean"),
            Self::Number => f.write_str("number"),
            Self::WholeNumber => f.write_str("whole number"),
            Self::Duration => f.write_str("duration"),
            Self::String => f.write_str("string"),
            Self::ContentString => f.write_str("content string"),
            Self::Directory => f.write_str("directory"),
            Self::Color => f.write_str("color"),
            Self::Date => f.write_str("date"),
            Self::Reference(ty) => write!(f, "reference to {ty}"),
            Self::Thing(ty) => write!(f, "{ty}"),
            Self::ArrayOf(item) => write!(f, "array of {item}"),
            Self::UniqueArrayOf(item) => write!(f, "unique array of {item}"),
            Self::Record(fields) => {
                let names: Vec<_> = fields.iter().map(|field| field.name).collect();
                write!(f, "object {{{}}}", names.join(", "))
            }
            Self::AnyOf(options) => {
                let names: Vec<_> = options.iter().map(ToString::to_string).collect();
                write!(f, "one of ({})", names.join(" | "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color() {
        assert!(Validator::Color.check(&Value::from("#fa0")).is_ok());
        assert!(Validator::Color.check(&Value::from("#ffaa0080")).is_ok());
        let err = Validator::Color.check(&Value::from("orange")).unwrap_err();
        assert!(err.reason.contains("not a hex color"));
        assert!(Validator::Color.check(&Value::from(3.0)).is_err());
    }

    #[test]
    fn test_content_string() {
        assert!(Validator::ContentString.check(&Value::from("Homestuck Vol. 1")).is_ok());
        assert!(Validator::ContentString.check(&Value::from(" padded")).is_err());
        assert!(Validator::ContentString.check(&Value::from("a\u{200B}b")).is_err());
    }

    #[test]
    fn test_reference() {
        let v = Validator::Reference("track");
        assert!(v.check(&Value::from("track:showtime")).is_ok());
        assert!(v.check(&Value::from("showtime")).is_ok());
        let err = v.check(&Value::from("album:showtime")).unwrap_err();
        assert!(err.reason.contains("expected reference to track"));
        assert!(v.check(&Value::from("track:bad dir")).is_err());
    }

    #[test]
    fn test_array_reports_every_bad_index() {
        let v = Validator::array_of(Validator::Number);
        let value = Value::list([
            Value::from(1.0),
            Value::from("two"),
            Value::from(3.0),
            Value::from(false),
        ]);
        let failures = v.check_all(&value);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].path, vec![PathSegment::Index(1)]);
        assert_eq!(failures[1].path, vec![PathSegment::Index(3)]);
        assert_eq!(failures[0].to_string(), "at [1]: expected finite number, got string");
    }

    #[test]
    fn test_unique_array() {
        let v = Validator::unique_array_of(Validator::String);
        let value = Value::list([Value::from("a"), Value::from("b"), Value::from("a")]);
        let failure = v.check(&value).unwrap_err();
        assert_eq!(failure.path, vec![PathSegment::Index(2)]);
    }

    #[test]
    fn test_record_fields() {
        let v = Validator::record([
            RecordField::required("who", Validator::Reference("artist")),
            RecordField::optional("what", Validator::ContentString),
        ]);
        assert!(v.check(&Value::record([("who", Value::from("artist:toby-fox"))])).is_ok());

        let missing = v.check(&Value::record([("what", Value::from("Music"))])).unwrap_err();
        assert_eq!(missing.to_string(), "at who: missing required key");

        let unknown = v
            .check(&Value::record([
                ("who", Value::from("toby-fox")),
                ("when", Value::from("now")),
            ]))
            .unwrap_err();
        assert_eq!(unknown.path, vec![PathSegment::Key("when".into())]);
    }

    #[test]
    fn test_nested_path_display() {
        let v = Validator::array_of(Validator::record([RecordField::required(
            "tracks",
            Validator::array_of(Validator::Reference("track")),
        )]));
        let value = Value::list([Value::record([(
            "tracks",
            Value::list([Value::from("track:ok"), Value::from(5.0)]),
        )])]);
        let failure = v.check(&value).unwrap_err();
        assert_eq!(
            failure.to_string(),
            "at [0].tracks[1]: expected reference to track, got number"
        );
    }

    #[test]
    fn test_any_of() {
        let v = Validator::AnyOf(vec![Validator::Number, Validator::Date]);
        assert!(v.check(&Value::from(1.0)).is_ok());
        let failure = v.check(&Value::from("x")).unwrap_err();
        assert!(failure.reason.starts_with("matched none of"));
    }

    #[test]
    fn test_type_validator() {
        let v = Validator::Type(ValueType::Function);
        assert!(v.check(&Value::func(|v: &Value| v.clone())).is_ok());
        assert_eq!(
            v.check(&Value::from(1.0)).unwrap_err().reason,
            "expected function, got number"
        );
    }
}
