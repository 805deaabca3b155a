//! Input descriptors and call-site bindings.
//!
//! An [`InputSpec`] is a named parameter slot on a template. A [`Binding`]
//! is what a call site (or a step's dependency list) plugs into a slot:
//! a dependency name, a literal, a forwarded input of the enclosing
//! template, or one of the special per-invocation values.
//!
//! ```ignore
//! InputSpec::declare("list", InputOptions {
//!     type_: Some(ValueType::Array),
//!     ..Default::default()
//! })?;
//!
//! template.bind([
//!     ("list", Binding::from("#trackRefs")),
//!     ("referenceType", input::value("track")),
//! ])?;
//! ```

use compact_str::CompactString;

use super::{
    DepName,
    error::{
        CompositeError, ConfigProblem, ConfigurationError, ProblemKind, Result, ValidationError,
    },
    validate::{ValidationFailure, Validator, ValueType},
    value::Value,
};

// ============================================================================
// Bindings
// ============================================================================

/// Something that can be plugged into an input slot or read by a step.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A pool entry: entity state, or a `#`-prefixed step-local name
    Dependency(DepName),
    /// A literal, fixed at composition time
    Value(Value),
    /// An input of the enclosing template
    Input(CompactString),
    /// The entity the composite is evaluated for
    Myself,
    /// The stored update value of the property being computed
    UpdateValue,
    /// The name of the property being computed
    ThisProperty,
}

impl Binding {
    pub fn dependency(name: impl Into<DepName>) -> Self {
        Self::Dependency(name.into())
    }

    /// Describe the binding for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::Dependency(name) => format!("dependency '{name}'"),
            Self::Value(value) => format!("literal {value}"),
            Self::Input(name) => format!("input '{name}'"),
            Self::Myself => "myself".into(),
            Self::UpdateValue => "update value".into(),
            Self::ThisProperty => "this property".into(),
        }
    }
}

impl From<&str> for Binding {
    fn from(name: &str) -> Self {
        Self::Dependency(name.into())
    }
}

impl From<DepName> for Binding {
    fn from(name: DepName) -> Self {
        Self::Dependency(name)
    }
}

impl From<Value> for Binding {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Literal binding.
pub fn value(value: impl Into<Value>) -> Binding {
    Binding::Value(value.into())
}

/// Forward the enclosing template's input of this name.
pub fn named(name: &str) -> Binding {
    Binding::Input(name.into())
}

pub const fn myself() -> Binding {
    Binding::Myself
}

pub const fn update_value() -> Binding {
    Binding::UpdateValue
}

pub const fn this_property() -> Binding {
    Binding::ThisProperty
}

// ============================================================================
// Input Descriptors
// ============================================================================

/// How an input may be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    /// Any binding; resolved per invocation
    #[default]
    Dynamic,
    /// Must be a literal known at composition time
    StaticValue,
    /// Must be a dependency name known at composition time
    StaticDependency,
}

/// Options accepted by [`InputSpec::declare`].
#[derive(Debug, Clone, Default)]
pub struct InputOptions {
    pub kind: InputKind,
    pub type_: Option<ValueType>,
    pub validate: Option<Validator>,
    pub default: Option<Value>,
    pub default_dependency: Option<DepName>,
    pub accepts_null: bool,
}

/// A named, validated parameter slot on a template.
#[derive(Debug, Clone)]
pub struct InputSpec {
    name: CompactString,
    kind: InputKind,
    validator: Option<Validator>,
    default: Option<Value>,
    default_dependency: Option<DepName>,
    accepts_null: bool,
}

impl InputSpec {
    /// Declare an input.
    ///
    /// Fails if both a type and a validator are given, or both a default
    /// value and a default dependency.
    pub fn declare(name: &str, options: InputOptions) -> Result<Self, ConfigurationError> {
        let context = format!("input '{name}'");
        let mut problems = Vec::new();
        if options.type_.is_some() && options.validate.is_some() {
            problems.push(ConfigProblem::new(
                context.as_str(),
                ProblemKind::TypeAndValidator { input: name.into() },
            ));
        }
        if options.default.is_some() && options.default_dependency.is_some() {
            problems.push(ConfigProblem::new(
                context.as_str(),
                ProblemKind::DefaultAndDefaultDependency { input: name.into() },
            ));
        }
        ConfigurationError::check(problems)?;

        Ok(Self {
            name: name.into(),
            kind: options.kind,
            validator: options.validate.or(options.type_.map(Validator::Type)),
            default: options.default,
            default_dependency: options.default_dependency,
            accepts_null: options.accepts_null,
        })
    }

    /// Shorthand for a dynamic input with a validator.
    pub fn dynamic(name: &str, validator: Validator) -> Result<Self, ConfigurationError> {
        Self::declare(name, InputOptions { validate: Some(validator), ..Default::default() })
    }

    /// Shorthand for a static literal input with a validator.
    pub fn static_value(name: &str, validator: Validator) -> Result<Self, ConfigurationError> {
        Self::declare(
            name,
            InputOptions {
                kind: InputKind::StaticValue,
                validate: Some(validator),
                ..Default::default()
            },
        )
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub const fn kind(&self) -> InputKind {
        self.kind
    }

    #[inline]
    pub const fn is_static(&self) -> bool {
        !matches!(self.kind, InputKind::Dynamic)
    }

    pub const fn default_dependency(&self) -> Option<&DepName> {
        self.default_dependency.as_ref()
    }

    /// Whether a call site must bind this input.
    pub const fn is_required(&self) -> bool {
        self.default.is_none() && self.default_dependency.is_none() && !self.accepts_null
    }

    /// Resolve the call-site binding at composition time.
    ///
    /// Static inputs must be bound to a literal (or a dependency name, for
    /// static dependency inputs); forwarded inputs are accepted here and
    /// checked against the enclosing template when the chain is compiled.
    /// Returns the binding the call keeps, `None` meaning "resolve the
    /// defaults per invocation".
    pub fn resolve_static(&self, binding: Option<Binding>) -> Result<Option<Binding>, ProblemKind> {
        let input = || self.name.clone();
        match (self.kind, binding) {
            (_, Some(Binding::Input(outer))) => Ok(Some(Binding::Input(outer))),

            (InputKind::StaticValue, Some(Binding::Value(value))) => {
                if !value.is_null()
                    && let Some(validator) = &self.validator
                    && let Err(failure) = validator.check(&value)
                {
                    return Err(ProblemKind::InvalidStaticInput { input: input(), failure });
                }
                Ok(Some(Binding::Value(value)))
            }
            (InputKind::StaticValue, Some(other)) => Err(ProblemKind::StaticInputNotLiteral {
                input: input(),
                given: other.describe(),
            }),
            (InputKind::StaticValue, None) => match &self.default {
                Some(default) => Ok(Some(Binding::Value(default.clone()))),
                None if self.accepts_null => Ok(Some(Binding::Value(Value::Null))),
                None => Err(ProblemKind::MissingInput { input: input() }),
            },

            (InputKind::StaticDependency, Some(Binding::Dependency(name))) => {
                Ok(Some(Binding::Dependency(name)))
            }
            (InputKind::StaticDependency, Some(_)) => {
                Err(ProblemKind::StaticDependencyNotName { input: input() })
            }
            (InputKind::StaticDependency, None) => match &self.default_dependency {
                Some(name) => Ok(Some(Binding::Dependency(name.clone()))),
                None if self.accepts_null => Ok(None),
                None => Err(ProblemKind::MissingInput { input: input() }),
            },

            (InputKind::Dynamic, Some(binding)) => Ok(Some(binding)),
            (InputKind::Dynamic, None) if self.is_required() => {
                Err(ProblemKind::MissingInput { input: input() })
            }
            (InputKind::Dynamic, None) => Ok(None),
        }
    }

    /// Resolve the input's value for one invocation.
    ///
    /// `bound` is the value of the call-site binding, if any. Absent or null
    /// values fall back to the default dependency (looked up through
    /// `lookup`), then the default literal. The result is validated.
    pub fn resolve_dynamic(
        &self,
        template: &str,
        bound: Option<Value>,
        lookup: impl FnOnce(&str) -> Result<Value>,
    ) -> Result<Value> {
        let mut value = bound.unwrap_or_default();
        if value.is_null()
            && let Some(dependency) = &self.default_dependency
        {
            value = lookup(dependency)?;
        }
        if value.is_null()
            && let Some(default) = &self.default
        {
            value = default.clone();
        }

        let failure = if value.is_null() {
            (!self.accepts_null).then(|| ValidationFailure {
                path: Vec::new(),
                reason: "expected a value, got null".into(),
            })
        } else {
            self.validator.as_ref().and_then(|v| v.check(&value).err())
        };

        match failure {
            Some(failure) => Err(CompositeError::Validation(ValidationError {
                template: template.into(),
                input: self.name.clone(),
                failure,
            })),
            None => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_input() -> InputSpec {
        InputSpec::declare(
            "list",
            InputOptions { type_: Some(ValueType::Array), ..Default::default() },
        )
        .unwrap()
    }

    #[test]
    fn test_declare_rejects_type_and_validator() {
        let err = InputSpec::declare(
            "list",
            InputOptions {
                type_: Some(ValueType::Array),
                validate: Some(Validator::array_of(Validator::Number)),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.has(|k| matches!(k, ProblemKind::TypeAndValidator { .. })));
    }

    #[test]
    fn test_declare_rejects_both_defaults_and_reports_all() {
        let err = InputSpec::declare(
            "list",
            InputOptions {
                type_: Some(ValueType::Array),
                validate: Some(Validator::Any),
                default: Some(Value::empty_list()),
                default_dependency: Some("trackData".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.problems.len(), 2);
        assert!(err.has(|k| matches!(k, ProblemKind::DefaultAndDefaultDependency { .. })));
    }

    #[test]
    fn test_static_value_rejects_dependency_name() {
        let spec = InputSpec::static_value("value", Validator::Any).unwrap();
        let problem = spec.resolve_static(Some(Binding::from("bareName"))).unwrap_err();
        assert!(matches!(problem, ProblemKind::StaticInputNotLiteral { .. }));
        assert_eq!(
            spec.resolve_static(Some(value("foo"))).unwrap(),
            Some(Binding::Value(Value::from("foo")))
        );
    }

    #[test]
    fn test_static_value_is_validated_at_composition() {
        let spec = InputSpec::static_value("mode", Validator::String).unwrap();
        let problem = spec.resolve_static(Some(value(3.0))).unwrap_err();
        assert!(matches!(problem, ProblemKind::InvalidStaticInput { .. }));
    }

    #[test]
    fn test_static_dependency_rejects_literal() {
        let spec = InputSpec::declare(
            "list",
            InputOptions { kind: InputKind::StaticDependency, ..Default::default() },
        )
        .unwrap();
        assert!(matches!(
            spec.resolve_static(Some(value(1.0))),
            Err(ProblemKind::StaticDependencyNotName { .. })
        ));
        assert!(matches!(
            spec.resolve_static(None),
            Err(ProblemKind::MissingInput { .. })
        ));
    }

    #[test]
    fn test_missing_required_dynamic_input() {
        assert!(matches!(
            list_input().resolve_static(None),
            Err(ProblemKind::MissingInput { .. })
        ));
    }

    #[test]
    fn test_dynamic_falls_back_to_default_dependency() {
        let spec = InputSpec::declare(
            "data",
            InputOptions {
                type_: Some(ValueType::Array),
                default_dependency: Some("trackData".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(spec.resolve_static(None).unwrap(), None);

        let value = spec
            .resolve_dynamic("test", None, |name| {
                assert_eq!(name, "trackData");
                Ok(Value::list([Value::from(1.0)]))
            })
            .unwrap();
        assert_eq!(value, Value::list([Value::from(1.0)]));
    }

    #[test]
    fn test_dynamic_validation_error_names_input() {
        let err = list_input()
            .resolve_dynamic("with_mapped_list", Some(Value::from("nope")), |_| Ok(Value::Null))
            .unwrap_err();
        let CompositeError::Validation(err) = err else {
            panic!("expected validation error");
        };
        assert_eq!(err.input, "list");
        assert_eq!(err.template, "with_mapped_list");
        assert_eq!(err.failure.reason, "expected array, got string");
    }

    #[test]
    fn test_dynamic_null_is_rejected_unless_accepted() {
        assert!(list_input().resolve_dynamic("t", Some(Value::Null), |_| Ok(Value::Null)).is_err());

        let nullable = InputSpec::declare(
            "list",
            InputOptions { accepts_null: true, ..Default::default() },
        )
        .unwrap();
        assert_eq!(
            nullable.resolve_dynamic("t", None, |_| Ok(Value::Null)).unwrap(),
            Value::Null
        );
    }
}
