//! Error types for the composite engine.
//!
//! - [`ConfigurationError`]: composition time, aggregates every problem found
//! - [`ValidationError`]: invocation time, an input value failed its validator
//! - [`CompositeError`]: everything a property read or field set can return

use std::fmt;

use compact_str::CompactString;
use thiserror::Error;

use super::validate::ValidationFailure;

/// Result type alias using `CompositeError`
pub type Result<T, E = CompositeError> = std::result::Result<T, E>;

/// A single composition-time problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProblemKind {
    /// Step built without a compute function
    MissingCompute,
    /// Step lists the same dependency twice
    DuplicateDependency { name: CompactString },
    /// Input declares both a type and a validator
    TypeAndValidator { input: CompactString },
    /// Input declares both a default value and a default dependency
    DefaultAndDefaultDependency { input: CompactString },
    /// Template declares the same input twice
    DuplicateInput { input: CompactString },
    /// Required input not supplied at the call site
    MissingInput { input: CompactString },
    /// Call site supplies an input the template does not declare
    UnknownInput { input: CompactString },
    /// Static value input bound to something other than a literal
    StaticInputNotLiteral { input: CompactString, given: String },
    /// Static dependency input bound to something other than a name
    StaticDependencyNotName { input: CompactString },
    /// Static literal rejected by the input's validator
    InvalidStaticInput { input: CompactString, failure: ValidationFailure },
    /// Static input forwarded from a non-static input of the enclosing template
    ForwardedInputNotStatic { input: CompactString, outer: CompactString },
    /// Output remap names an output the template does not declare
    UnknownOutput { output: CompactString },
    /// `#name` read before any earlier step produced it
    UnresolvedDependency { name: CompactString },
    /// Plain dependency name that is not available in scope
    UnknownDependency { name: CompactString },
    /// Forwarded input that the enclosing template does not declare
    UnknownForwardedInput { input: CompactString },
    /// Declared template output never produced by its steps
    OutputNotProduced { output: CompactString },
    /// Raised output that the enclosing template does not declare
    RaisedOutputNotDeclared { output: CompactString },
    /// Output raised from a chain that is not inside a template
    RaiseOutsideTemplate,
    /// Update value read by a property without an update descriptor
    UpdateValueWithoutUpdate,
    /// Standalone composite whose last step does not expose a value
    NotExposing,
    /// Composite without steps
    EmptyComposite,
    /// Entity kind declares the same property twice
    DuplicateProperty { property: CompactString },
    /// Computed properties of one kind depend on each other in a cycle
    CyclicProperties { properties: Vec<CompactString> },
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCompute => write!(f, "step has no compute function"),
            Self::DuplicateDependency { name } => {
                write!(f, "dependency '{name}' is declared more than once")
            }
            Self::TypeAndValidator { input } => {
                write!(f, "input '{input}' declares both a type and a validator")
            }
            Self::DefaultAndDefaultDependency { input } => write!(
                f,
                "input '{input}' declares both a default value and a default dependency"
            ),
            Self::DuplicateInput { input } => write!(f, "input '{input}' is declared twice"),
            Self::MissingInput { input } => write!(f, "required input '{input}' is missing"),
            Self::UnknownInput { input } => write!(f, "unknown input '{input}'"),
            Self::StaticInputNotLiteral { input, given } => write!(
                f,
                "static input '{input}' needs a literal value, got {given}"
            ),
            Self::StaticDependencyNotName { input } => {
                write!(f, "static input '{input}' needs a dependency name")
            }
            Self::InvalidStaticInput { input, failure } => {
                write!(f, "static input '{input}' is invalid: {failure}")
            }
            Self::ForwardedInputNotStatic { input, outer } => write!(
                f,
                "static input '{input}' is fed by non-static input '{outer}'"
            ),
            Self::UnknownOutput { output } => write!(f, "unknown output '{output}'"),
            Self::UnresolvedDependency { name } => write!(
                f,
                "'{name}' is read before any earlier step provides it"
            ),
            Self::UnknownDependency { name } => write!(f, "unknown dependency '{name}'"),
            Self::UnknownForwardedInput { input } => {
                write!(f, "forwarded input '{input}' is not declared by the enclosing template")
            }
            Self::OutputNotProduced { output } => {
                write!(f, "declared output '{output}' is never produced")
            }
            Self::RaisedOutputNotDeclared { output } => {
                write!(f, "raised output '{output}' is not a declared output")
            }
            Self::RaiseOutsideTemplate => write!(f, "outputs can only be raised inside a template"),
            Self::UpdateValueWithoutUpdate => {
                write!(f, "reads the update value of a property that is not updatable")
            }
            Self::NotExposing => write!(f, "last step does not expose a value"),
            Self::EmptyComposite => write!(f, "composite has no steps"),
            Self::DuplicateProperty { property } => {
                write!(f, "property '{property}' is declared twice")
            }
            Self::CyclicProperties { properties } => {
                write!(f, "properties depend on each other in a cycle: {}", properties.join(", "))
            }
        }
    }
}

/// A problem together with the composite, template or step it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigProblem {
    pub context: CompactString,
    pub kind: ProblemKind,
}

impl ConfigProblem {
    pub fn new(context: impl Into<CompactString>, kind: ProblemKind) -> Self {
        Self { context: context.into(), kind }
    }
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.kind)
    }
}

/// Composition-time error, aggregating every problem found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    pub problems: Vec<ConfigProblem>,
}

impl ConfigurationError {
    pub fn single(context: impl Into<CompactString>, kind: ProblemKind) -> Self {
        Self { problems: vec![ConfigProblem::new(context, kind)] }
    }

    /// `Ok(())` when no problems were collected.
    pub fn check(problems: Vec<ConfigProblem>) -> Result<(), Self> {
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Self { problems })
        }
    }

    /// Whether any problem matches the predicate.
    pub fn has(&self, predicate: impl Fn(&ProblemKind) -> bool) -> bool {
        self.problems.iter().any(|problem| predicate(&problem.kind))
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.problems.as_slice() {
            [single] => write!(f, "configuration error in {single}"),
            problems => {
                write!(f, "{} configuration errors:", problems.len())?;
                for problem in problems {
                    write!(f, "\n  - {problem}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Invocation-time input validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value for input '{input}' of {template}: {failure}")]
pub struct ValidationError {
    pub template: CompactString,
    pub input: CompactString,
    pub failure: ValidationFailure,
}

/// Errors returned by composite invocation, property reads and field sets.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Direct field assignment rejected by the update validator
    #[error("cannot set {kind}.{property}: {failure}")]
    FieldType {
        kind: &'static str,
        property: CompactString,
        failure: ValidationFailure,
    },

    #[error("step '{step}' read undeclared dependency '{name}'")]
    UndeclaredDependency { step: CompactString, name: CompactString },

    #[error("step '{step}' produced undeclared output '{name}'")]
    UndeclaredOutput { step: CompactString, name: CompactString },

    #[error("{kind} has no property '{property}'")]
    UnknownProperty { kind: &'static str, property: CompactString },

    #[error("{kind}.{property} is not updatable")]
    NotUpdatable { kind: &'static str, property: CompactString },

    #[error("cyclic dependency while computing {kind}.{property}")]
    CyclicDependency { kind: &'static str, property: CompactString },

    #[error("{kind} has no directory to reference it by")]
    NoDirectory { kind: &'static str },

    #[error("{0} finished without exposing a value")]
    NothingExposed(CompactString),

    #[error("{0} raised outputs outside of a template")]
    StrayRaise(CompactString),

    /// Failure reported by a compute function
    #[error("{step}: {message}")]
    Compute { step: CompactString, message: String },
}

impl CompositeError {
    /// Create a compute failure for the named step.
    pub fn compute(step: impl Into<CompactString>, message: impl Into<String>) -> Self {
        Self::Compute { step: step.into(), message: message.into() }
    }
}
