//! Composite compilation.
//!
//! ```text
//! CompositeBuilder ──validate(scope)──► Validated ──compile──► Composite
//!   (Unvalidated)      every read checked        immutable, Arc-shared
//! ```
//!
//! Validation walks the chain in order, tracking which names earlier steps
//! produced, and recurses into nested template calls. Every problem found
//! is collected into one [`ConfigurationError`].

use std::{collections::BTreeSet, sync::Arc};

use compact_str::CompactString;
use rustc_hash::{FxHashSet, FxHashMap};

use super::{
    DepName,
    error::{ConfigProblem, ConfigurationError, ProblemKind, Result},
    input::Binding,
    is_local,
    runtime::{self, DependencySource},
    step::{IntoStep, Step, StepKind},
    template::{Template, TemplateCall},
    value::Value,
};

// ============================================================================
// Scope
// ============================================================================

/// Plain dependency names a composite may read.
#[derive(Debug, Clone)]
pub struct Scope {
    /// `None` accepts any plain name
    names: Option<FxHashSet<DepName>>,
    /// Whether the update value may be read
    updatable: bool,
}

impl Scope {
    /// Accept every plain name; used for templates and free-standing composites.
    pub fn open() -> Self {
        Self { names: None, updatable: true }
    }

    pub fn of<N: Into<DepName>>(names: impl IntoIterator<Item = N>, updatable: bool) -> Self {
        Self {
            names: Some(names.into_iter().map(Into::into).collect()),
            updatable,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.as_ref().is_none_or(|names| names.contains(name))
    }
}

// ============================================================================
// Checker
// ============================================================================

struct Checker<'a> {
    scope: &'a Scope,
    problems: &'a mut Vec<ConfigProblem>,
    /// Plain names read anywhere in the chain, nested templates included
    dependencies: BTreeSet<DepName>,
}

impl<'a> Checker<'a> {
    fn new(scope: &'a Scope, problems: &'a mut Vec<ConfigProblem>) -> Self {
        Self { scope, problems, dependencies: BTreeSet::new() }
    }

    fn problem(&mut self, context: &str, kind: ProblemKind) {
        self.problems.push(ConfigProblem::new(context, kind));
    }

    /// Check one chain and return the names it produces.
    fn chain(&mut self, context: &str, steps: &[Step], enclosing: Option<&Template>) -> FxHashSet<DepName> {
        let mut produced = FxHashSet::default();

        for step in steps {
            let context = format!("{context} > {}", step.annotation());
            for binding in step.reads() {
                self.read(&context, binding, &produced, enclosing);
            }

            match step.kind() {
                StepKind::Compute(compute) => produced.extend(compute.outputs.iter().cloned()),
                StepKind::RaiseWithout { output, .. } => match enclosing {
                    None => self.problem(&context, ProblemKind::RaiseOutsideTemplate),
                    Some(template) => {
                        for (name, _) in output {
                            if !template.outputs().contains(name) {
                                self.problem(
                                    &context,
                                    ProblemKind::RaisedOutputNotDeclared { output: name.clone() },
                                );
                            }
                        }
                    }
                },
                StepKind::Call(call) => {
                    self.call(&context, call, &produced, enclosing);
                    for output in call.template().outputs() {
                        produced.insert(call.external_name(output).clone());
                    }
                }
                StepKind::ExitWithout { .. }
                | StepKind::Expose(_)
                | StepKind::ExposeOrContinue { .. } => {}
            }
        }

        produced
    }

    fn read(
        &mut self,
        context: &str,
        binding: &Binding,
        produced: &FxHashSet<DepName>,
        enclosing: Option<&Template>,
    ) {
        match binding {
            Binding::Dependency(name) if produced.contains(name) => {}
            Binding::Dependency(name) if is_local(name) => {
                self.problem(context, ProblemKind::UnresolvedDependency { name: name.clone() });
            }
            Binding::Dependency(name) if !self.scope.contains(name) => {
                self.problem(context, ProblemKind::UnknownDependency { name: name.clone() });
            }
            Binding::Dependency(name) => {
                self.dependencies.insert(name.clone());
            }
            Binding::Input(name) if enclosing.and_then(|t| t.input(name)).is_none() => {
                self.problem(context, ProblemKind::UnknownForwardedInput { input: name.clone() });
            }
            Binding::UpdateValue if !self.scope.updatable => {
                self.problem(context, ProblemKind::UpdateValueWithoutUpdate);
            }
            _ => {}
        }
    }

    fn call(
        &mut self,
        context: &str,
        call: &TemplateCall,
        produced: &FxHashSet<DepName>,
        enclosing: Option<&Template>,
    ) {
        let template = call.template();

        for (spec, binding) in call.slots() {
            match binding {
                Some(Binding::Input(outer)) if spec.is_static() => {
                    if let Some(outer_spec) = enclosing.and_then(|t| t.input(outer))
                        && outer_spec.kind() != spec.kind()
                    {
                        self.problem(
                            context,
                            ProblemKind::ForwardedInputNotStatic {
                                input: spec.name().into(),
                                outer: outer.clone(),
                            },
                        );
                    }
                }
                None => {
                    if let Some(name) = spec.default_dependency() {
                        self.read(context, &Binding::Dependency(name.clone()), produced, enclosing);
                    }
                }
                Some(_) => {}
            }
        }

        for (internal, _) in call.remap() {
            if !template.outputs().contains(internal) {
                self.problem(context, ProblemKind::UnknownOutput { output: internal.clone() });
            }
        }

        self.template(context, template);
    }

    /// Check a template body in its own pool.
    fn template(&mut self, context: &str, template: &Template) {
        let produced = self.chain(context, template.steps(), Some(template));
        if template.is_exposing() {
            return;
        }
        for output in template.outputs() {
            if !produced.contains(output) {
                self.problem(context, ProblemKind::OutputNotProduced { output: output.clone() });
            }
        }
    }
}

/// Check a template body against the open scope.
pub(super) fn check_template(template: &Template, problems: &mut Vec<ConfigProblem>) {
    let scope = Scope::open();
    Checker::new(&scope, problems).template(template.annotation(), template);
}

// ============================================================================
// Builder
// ============================================================================

/// Unvalidated composite: an annotated list of steps.
///
/// # Example
///
/// ```ignore
/// let composite = CompositeBuilder::new("Album.tracks")
///     .step(exit_without_dependency("trackSections", Value::empty_list(), Mode::Empty))
///     .step(with_property_from_list("trackSections", "tracks"))
///     .step(expose_dependency("#values"))
///     .build_in(&scope)?;
/// ```
pub struct CompositeBuilder {
    annotation: CompactString,
    steps: Vec<Step>,
    problems: Vec<ConfigProblem>,
}

/// A composite whose chain passed every check.
struct Validated {
    annotation: CompactString,
    steps: Vec<Step>,
    dependencies: Vec<DepName>,
}

impl CompositeBuilder {
    pub fn new(annotation: impl Into<CompactString>) -> Self {
        Self {
            annotation: annotation.into(),
            steps: Vec::new(),
            problems: Vec::new(),
        }
    }

    pub fn step(mut self, step: impl IntoStep) -> Self {
        match step.into_step() {
            Ok(step) => self.steps.push(step),
            Err(err) => self.problems.extend(err.problems),
        }
        self
    }

    /// Compile against the open scope.
    pub fn build(self) -> Result<Composite, ConfigurationError> {
        self.build_in(&Scope::open())
    }

    /// Compile, rejecting plain reads outside `scope`.
    pub fn build_in(self, scope: &Scope) -> Result<Composite, ConfigurationError> {
        self.validate(scope).map(Validated::compile)
    }

    fn validate(self, scope: &Scope) -> Result<Validated, ConfigurationError> {
        let mut problems = self.problems;

        let dependencies = {
            let mut checker = Checker::new(scope, &mut problems);
            checker.chain(&self.annotation, &self.steps, None);
            checker.dependencies
        };

        match self.steps.last() {
            None => problems.push(ConfigProblem::new(self.annotation.clone(), ProblemKind::EmptyComposite)),
            Some(last) if !last.is_exposing() => problems.push(ConfigProblem::new(
                format!("{} > {}", self.annotation, last.annotation()),
                ProblemKind::NotExposing,
            )),
            Some(_) => {}
        }
        ConfigurationError::check(problems)?;

        Ok(Validated {
            annotation: self.annotation,
            steps: self.steps,
            dependencies: dependencies.into_iter().collect(),
        })
    }
}

impl Validated {
    fn compile(self) -> Composite {
        Composite {
            inner: Arc::new(CompiledChain {
                annotation: self.annotation,
                steps: self.steps.into_boxed_slice(),
                dependencies: self.dependencies.into_boxed_slice(),
            }),
        }
    }
}

// ============================================================================
// Compiled
// ============================================================================

#[derive(Debug)]
struct CompiledChain {
    annotation: CompactString,
    steps: Box<[Step]>,
    dependencies: Box<[DepName]>,
}

/// Compiled, immutable composite. Cheap to clone and share across threads.
#[derive(Debug, Clone)]
pub struct Composite {
    inner: Arc<CompiledChain>,
}

impl Composite {
    #[inline]
    pub fn annotation(&self) -> &str {
        &self.inner.annotation
    }

    /// Plain dependency names read anywhere in the chain, sorted.
    #[inline]
    pub fn dependencies(&self) -> &[DepName] {
        &self.inner.dependencies
    }

    #[inline]
    pub fn steps(&self) -> &[Step] {
        &self.inner.steps
    }

    /// Run the chain against `source` and return the exposed value.
    pub fn invoke(&self, source: &dyn DependencySource) -> Result<Value> {
        runtime::run(&self.inner.annotation, &self.inner.steps, source)
    }

    /// Run with plain name/value pairs as the pool.
    pub fn invoke_with<N: Into<DepName>>(&self, values: impl IntoIterator<Item = (N, Value)>) -> Result<Value> {
        let bindings: runtime::Bindings = values
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect::<FxHashMap<_, _>>()
            .into();
        self.invoke(&bindings)
    }
}
