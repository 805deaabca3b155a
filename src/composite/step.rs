//! Steps: the units a composite chain is made of.
//!
//! A [`Step`] is data, not a closure. Guards and expose steps are their own
//! variants so the compiler can check the chain without running anything;
//! only [`StepKind::Compute`] carries user code.
//!
//! ```ignore
//! let step = StepBuilder::new("count tracks")
//!     .dependency("#tracks")
//!     .output("#trackCount")
//!     .compute(|view| {
//!         let count = view.get("#tracks")?.as_list().map_or(0, <[_]>::len);
//!         Ok(Continuation::proceed([("#trackCount", Value::from(count as f64))]))
//!     })
//!     .build()?;
//! ```

use std::{fmt, sync::Arc};

use compact_str::CompactString;
use smallvec::SmallVec;

use super::{
    DepName,
    error::{ConfigProblem, ConfigurationError, ProblemKind, Result},
    input::Binding,
    runtime::View,
    template::TemplateCall,
    value::Value,
};

/// Outputs handed from a step to the pool.
pub type Outputs = SmallVec<[(DepName, Value); 2]>;

/// Compute function of a plain step.
pub type ComputeFn = Arc<dyn Fn(&View<'_>) -> Result<Continuation> + Send + Sync>;

// ============================================================================
// Continuation
// ============================================================================

/// What a compute function asks the runtime to do next.
#[derive(Debug, Clone)]
pub enum Continuation {
    /// Merge outputs into the pool and run the next step
    Proceed(Outputs),
    /// Stop the whole composite and expose this value
    Exit(Value),
    /// Stop the current template and hand these outputs to its caller
    Raise(Outputs),
}

impl Continuation {
    pub fn proceed<K: Into<DepName>>(outputs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Proceed(collect_outputs(outputs))
    }

    pub fn exit(value: impl Into<Value>) -> Self {
        Self::Exit(value.into())
    }

    pub fn raise<K: Into<DepName>>(outputs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Raise(collect_outputs(outputs))
    }
}

fn collect_outputs<K: Into<DepName>>(outputs: impl IntoIterator<Item = (K, Value)>) -> Outputs {
    outputs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

// ============================================================================
// Availability
// ============================================================================

/// How a guard decides whether a dependency is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Anything but null
    #[default]
    Null,
    /// Not null, and not an empty list
    Empty,
    /// Truthy: not null, false, zero, empty string or empty list
    Falsy,
    /// A non-negative number
    Index,
}

impl Mode {
    pub fn is_available(self, value: &Value) -> bool {
        match self {
            Self::Null => !value.is_null(),
            Self::Empty => match value {
                Value::Null => false,
                Value::List(items) => !items.is_empty(),
                _ => true,
            },
            Self::Falsy => value.is_truthy(),
            Self::Index => matches!(value, Value::Number(n) if *n >= 0.0),
        }
    }
}

// ============================================================================
// Steps
// ============================================================================

/// A plain compute step.
#[derive(Clone)]
pub struct ComputeStep {
    pub(crate) dependencies: SmallVec<[Binding; 4]>,
    pub(crate) outputs: SmallVec<[DepName; 2]>,
    pub(crate) compute: ComputeFn,
    /// Always ends the composite with [`Continuation::Exit`]
    pub(crate) exposes: bool,
}

impl fmt::Debug for ComputeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeStep")
            .field("dependencies", &self.dependencies)
            .field("outputs", &self.outputs)
            .field("exposes", &self.exposes)
            .finish_non_exhaustive()
    }
}

/// Step variants.
#[derive(Debug, Clone)]
pub enum StepKind {
    Compute(ComputeStep),
    /// Exit the whole composite with `value` when `dependency` is unavailable
    ExitWithout { dependency: Binding, mode: Mode, value: Binding },
    /// Raise `output` from the current template when `dependency` is unavailable
    RaiseWithout { dependency: Binding, mode: Mode, output: Vec<(DepName, Binding)> },
    /// Expose a pool value or a constant
    Expose(Binding),
    /// Expose `dependency` if available, otherwise fall through
    ExposeOrContinue { dependency: Binding, mode: Mode },
    /// Nested template call
    Call(TemplateCall),
}

/// One entry of a composite chain.
#[derive(Debug, Clone)]
pub struct Step {
    pub(crate) annotation: CompactString,
    pub(crate) kind: StepKind,
}

impl Step {
    pub fn new(annotation: impl Into<CompactString>, kind: StepKind) -> Self {
        Self { annotation: annotation.into(), kind }
    }

    #[inline]
    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    #[inline]
    pub const fn kind(&self) -> &StepKind {
        &self.kind
    }

    /// Every binding this step reads.
    pub fn reads(&self) -> SmallVec<[&Binding; 4]> {
        match &self.kind {
            StepKind::Compute(step) => step.dependencies.iter().collect(),
            StepKind::ExitWithout { dependency, value, .. } => [dependency, value].into_iter().collect(),
            StepKind::RaiseWithout { dependency, output, .. } => std::iter::once(dependency)
                .chain(output.iter().map(|(_, binding)| binding))
                .collect(),
            StepKind::Expose(binding) => std::iter::once(binding).collect(),
            StepKind::ExposeOrContinue { dependency, .. } => std::iter::once(dependency).collect(),
            StepKind::Call(call) => call.bindings().collect(),
        }
    }

    /// Whether this step always ends the chain with a value.
    pub fn is_exposing(&self) -> bool {
        match &self.kind {
            StepKind::Expose(_) => true,
            StepKind::Compute(step) => step.exposes,
            StepKind::Call(call) => call.template().is_exposing(),
            _ => false,
        }
    }
}

/// Anything that can be appended to a composite or template chain.
///
/// Implemented for fallible constructors too, so problems found while
/// building a step are aggregated with the chain's own problems.
pub trait IntoStep {
    fn into_step(self) -> Result<Step, ConfigurationError>;
}

impl IntoStep for Step {
    fn into_step(self) -> Result<Step, ConfigurationError> {
        Ok(self)
    }
}

impl IntoStep for TemplateCall {
    fn into_step(self) -> Result<Step, ConfigurationError> {
        Ok(self.into())
    }
}

impl<T: IntoStep> IntoStep for Result<T, ConfigurationError> {
    fn into_step(self) -> Result<Step, ConfigurationError> {
        self?.into_step()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for plain compute steps.
pub struct StepBuilder {
    annotation: CompactString,
    dependencies: Vec<Binding>,
    outputs: Vec<DepName>,
    compute: Option<ComputeFn>,
    exposes: bool,
}

impl StepBuilder {
    pub fn new(annotation: impl Into<CompactString>) -> Self {
        Self {
            annotation: annotation.into(),
            dependencies: Vec::new(),
            outputs: Vec::new(),
            compute: None,
            exposes: false,
        }
    }

    /// Declare one read.
    pub fn dependency(mut self, binding: impl Into<Binding>) -> Self {
        self.dependencies.push(binding.into());
        self
    }

    pub fn dependencies<B: Into<Binding>>(mut self, bindings: impl IntoIterator<Item = B>) -> Self {
        self.dependencies.extend(bindings.into_iter().map(Into::into));
        self
    }

    /// Declare one output this step may produce.
    pub fn output(mut self, name: impl Into<DepName>) -> Self {
        self.outputs.push(name.into());
        self
    }

    pub fn compute<F>(mut self, f: F) -> Self
    where
        F: Fn(&View<'_>) -> Result<Continuation> + Send + Sync + 'static,
    {
        self.compute = Some(Arc::new(f));
        self.exposes = false;
        self
    }

    /// Terminal compute: the returned value is the composite's result.
    pub fn expose<F>(mut self, f: F) -> Self
    where
        F: Fn(&View<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.compute = Some(Arc::new(move |view: &View<'_>| f(view).map(Continuation::Exit)));
        self.exposes = true;
        self
    }

    /// Fails if no compute function was given or a dependency repeats.
    pub fn build(self) -> Result<Step, ConfigurationError> {
        let mut problems = Vec::new();

        for (i, binding) in self.dependencies.iter().enumerate() {
            if self.dependencies[..i].contains(binding) {
                problems.push(ConfigProblem::new(
                    self.annotation.clone(),
                    ProblemKind::DuplicateDependency { name: binding.describe().into() },
                ));
            }
        }

        let Some(compute) = self.compute else {
            problems.push(ConfigProblem::new(self.annotation, ProblemKind::MissingCompute));
            return Err(ConfigurationError { problems });
        };
        ConfigurationError::check(problems)?;

        Ok(Step {
            annotation: self.annotation,
            kind: StepKind::Compute(ComputeStep {
                dependencies: self.dependencies.into(),
                outputs: self.outputs.into(),
                compute,
                exposes: self.exposes,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_compute() {
        let err = StepBuilder::new("no compute").dependency("trackData").build().unwrap_err();
        assert!(err.has(|k| matches!(k, ProblemKind::MissingCompute)));
    }

    #[test]
    fn test_build_rejects_duplicate_dependencies() {
        let err = StepBuilder::new("dupes")
            .dependencies(["trackData", "albumData", "trackData"])
            .compute(|_| Ok(Continuation::proceed::<DepName>([])))
            .build()
            .unwrap_err();
        assert_eq!(err.problems.len(), 1);
        assert_eq!(
            err.problems[0].kind,
            ProblemKind::DuplicateDependency { name: "dependency 'trackData'".into() }
        );
    }

    #[test]
    fn test_missing_compute_and_duplicates_are_aggregated() {
        let err = StepBuilder::new("both").dependencies(["a", "a"]).build().unwrap_err();
        assert_eq!(err.problems.len(), 2);
    }

    #[test]
    fn test_expose_marks_step_exposing() {
        let step = StepBuilder::new("exposer")
            .expose(|_| Ok(Value::from(1.0)))
            .build()
            .unwrap();
        assert!(step.is_exposing());

        let step = StepBuilder::new("plain")
            .compute(|_| Ok(Continuation::exit(1.0)))
            .build()
            .unwrap();
        assert!(!step.is_exposing());
    }

    #[test]
    fn test_availability_modes() {
        let empty = Value::empty_list();
        let zero = Value::from(0.0);

        assert!(!Mode::Null.is_available(&Value::Null));
        assert!(Mode::Null.is_available(&empty));

        assert!(!Mode::Empty.is_available(&empty));
        assert!(Mode::Empty.is_available(&zero));

        assert!(!Mode::Falsy.is_available(&zero));
        assert!(!Mode::Falsy.is_available(&Value::from("")));

        assert!(Mode::Index.is_available(&zero));
        assert!(!Mode::Index.is_available(&Value::from(-1.0)));
        assert!(!Mode::Index.is_available(&Value::from("0")));
    }

    #[test]
    fn test_reads_of_guard() {
        let step = Step::new(
            "guard",
            StepKind::ExitWithout {
                dependency: Binding::from("trackData"),
                mode: Mode::Empty,
                value: Binding::Value(Value::empty_list()),
            },
        );
        let reads = step.reads();
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[0], &Binding::from("trackData"));
    }
}
