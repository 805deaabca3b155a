//! Templates: reusable, parameterized step chains.
//!
//! A [`Template`] declares inputs and outputs around a list of steps.
//! Binding it produces a [`TemplateCall`], which is itself a step and can
//! be spliced into a parent chain. Static inputs are resolved at bind time;
//! dynamic inputs once per invocation.

use std::sync::Arc;

use compact_str::CompactString;
use smallvec::SmallVec;

use super::{
    DepName,
    compile::check_template,
    error::{ConfigProblem, ConfigurationError, ProblemKind},
    input::{Binding, InputSpec},
    step::{IntoStep, Step, StepKind},
};

/// A compiled, reusable step chain with declared inputs and outputs.
#[derive(Debug)]
pub struct Template {
    annotation: CompactString,
    inputs: Vec<InputSpec>,
    outputs: Vec<DepName>,
    steps: Vec<Step>,
}

impl Template {
    #[inline]
    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    #[inline]
    pub fn inputs(&self) -> &[InputSpec] {
        &self.inputs
    }

    #[inline]
    pub fn outputs(&self) -> &[DepName] {
        &self.outputs
    }

    #[inline]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|input| input.name() == name)
    }

    /// Whether the chain ends by exposing a value rather than outputs.
    pub fn is_exposing(&self) -> bool {
        self.steps.last().is_some_and(Step::is_exposing)
    }

    /// Bind call-site values to this template's inputs.
    ///
    /// Unknown, duplicated and missing inputs and static inputs given the
    /// wrong kind of binding are all reported together.
    pub fn bind<'a, B: Into<Binding>>(
        self: &Arc<Self>,
        bindings: impl IntoIterator<Item = (&'a str, B)>,
    ) -> Result<TemplateCall, ConfigurationError> {
        let context = format!("call to {}", self.annotation);
        let mut problems = Vec::new();
        let mut given: Vec<Option<Binding>> = vec![None; self.inputs.len()];

        for (name, binding) in bindings {
            match self.inputs.iter().position(|input| input.name() == name) {
                Some(index) if given[index].is_some() => problems.push(ConfigProblem::new(
                    context.as_str(),
                    ProblemKind::DuplicateInput { input: name.into() },
                )),
                Some(index) => given[index] = Some(binding.into()),
                None => problems.push(ConfigProblem::new(
                    context.as_str(),
                    ProblemKind::UnknownInput { input: name.into() },
                )),
            }
        }

        let mut resolved = Vec::with_capacity(self.inputs.len());
        for (spec, binding) in self.inputs.iter().zip(given) {
            match spec.resolve_static(binding) {
                Ok(binding) => resolved.push(binding),
                Err(kind) => problems.push(ConfigProblem::new(context.as_str(), kind)),
            }
        }
        ConfigurationError::check(problems)?;

        Ok(TemplateCall {
            template: Arc::clone(self),
            bindings: resolved,
            remap: SmallVec::new(),
        })
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Template`]s.
///
/// Problems from fallible inputs and steps are collected and reported
/// together by [`TemplateBuilder::build`].
pub struct TemplateBuilder {
    annotation: CompactString,
    inputs: Vec<InputSpec>,
    outputs: Vec<DepName>,
    steps: Vec<Step>,
    problems: Vec<ConfigProblem>,
}

impl TemplateBuilder {
    pub fn new(annotation: impl Into<CompactString>) -> Self {
        Self {
            annotation: annotation.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            steps: Vec::new(),
            problems: Vec::new(),
        }
    }

    pub fn input(mut self, input: Result<InputSpec, ConfigurationError>) -> Self {
        match input {
            Ok(input) => self.inputs.push(input),
            Err(err) => self.problems.extend(err.problems),
        }
        self
    }

    pub fn output(mut self, name: impl Into<DepName>) -> Self {
        self.outputs.push(name.into());
        self
    }

    pub fn step(mut self, step: impl IntoStep) -> Self {
        match step.into_step() {
            Ok(step) => self.steps.push(step),
            Err(err) => self.problems.extend(err.problems),
        }
        self
    }

    pub fn build(self) -> Result<Arc<Template>, ConfigurationError> {
        let mut problems = self.problems;

        for (i, input) in self.inputs.iter().enumerate() {
            if self.inputs[..i].iter().any(|other| other.name() == input.name()) {
                problems.push(ConfigProblem::new(
                    self.annotation.clone(),
                    ProblemKind::DuplicateInput { input: input.name().into() },
                ));
            }
        }
        if self.steps.is_empty() {
            problems.push(ConfigProblem::new(self.annotation.clone(), ProblemKind::EmptyComposite));
        }

        let template = Template {
            annotation: self.annotation,
            inputs: self.inputs,
            outputs: self.outputs,
            steps: self.steps,
        };
        if problems.is_empty() {
            check_template(&template, &mut problems);
        }
        ConfigurationError::check(problems)?;

        Ok(Arc::new(template))
    }
}

// ============================================================================
// Calls
// ============================================================================

/// A template bound at a call site, usable as a step.
#[derive(Debug, Clone)]
pub struct TemplateCall {
    template: Arc<Template>,
    /// One slot per template input; `None` resolves defaults per invocation
    bindings: Vec<Option<Binding>>,
    remap: SmallVec<[(DepName, DepName); 2]>,
}

impl TemplateCall {
    /// Rename template outputs as they land in the caller's pool.
    pub fn outputs<I, E>(mut self, pairs: impl IntoIterator<Item = (I, E)>) -> Self
    where
        I: Into<DepName>,
        E: Into<DepName>,
    {
        self.remap.extend(pairs.into_iter().map(|(i, e)| (i.into(), e.into())));
        self
    }

    #[inline]
    pub const fn template(&self) -> &Arc<Template> {
        &self.template
    }

    /// Bindings supplied (or statically defaulted) at the call site.
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter().flatten()
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = (&InputSpec, Option<&Binding>)> {
        self.template.inputs.iter().zip(self.bindings.iter().map(Option::as_ref))
    }

    #[inline]
    pub fn remap(&self) -> &[(DepName, DepName)] {
        &self.remap
    }

    /// Name an internal output lands under in the caller's pool.
    pub fn external_name<'a>(&'a self, internal: &'a DepName) -> &'a DepName {
        self.remap
            .iter()
            .find(|(from, _)| from == internal)
            .map_or(internal, |(_, to)| to)
    }
}

impl From<TemplateCall> for Step {
    fn from(call: TemplateCall) -> Self {
        Self::new(call.template.annotation.clone(), StepKind::Call(call))
    }
}

/// `.outputs(...)` directly on a fallible template call.
pub trait OutputsExt {
    #[must_use]
    fn outputs<I, E>(self, pairs: impl IntoIterator<Item = (I, E)>) -> Self
    where
        I: Into<DepName>,
        E: Into<DepName>;
}

impl OutputsExt for Result<TemplateCall, ConfigurationError> {
    fn outputs<I, E>(self, pairs: impl IntoIterator<Item = (I, E)>) -> Self
    where
        I: Into<DepName>,
        E: Into<DepName>,
    {
        self.map(|call| call.outputs(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::{
        Continuation, StepBuilder, Value,
        input::{self, InputOptions},
        validate::ValueType,
    };

    fn doubled() -> Arc<Template> {
        TemplateBuilder::new("doubled")
            .input(InputSpec::declare(
                "number",
                InputOptions { type_: Some(ValueType::Number), ..Default::default() },
            ))
            .output("#doubled")
            .step(
                StepBuilder::new("double")
                    .dependency(input::named("number"))
                    .output("#doubled")
                    .compute(|view| {
                        let n = view.input("number")?.as_number().unwrap_or_default();
                        Ok(Continuation::proceed([("#doubled", Value::from(n * 2.0))]))
                    })
                    .build(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_bind_reports_unknown_and_missing_together() {
        let err = doubled().bind([("numbr", Binding::from("count"))]).unwrap_err();
        assert_eq!(err.problems.len(), 2);
        assert!(err.has(|k| matches!(k, ProblemKind::UnknownInput { .. })));
        assert!(err.has(|k| matches!(k, ProblemKind::MissingInput { .. })));
    }

    #[test]
    fn test_bind_rejects_duplicate_binding() {
        let err = doubled().bind([("number", "a"), ("number", "b")]).unwrap_err();
        assert!(err.has(|k| matches!(k, ProblemKind::DuplicateInput { .. })));
    }

    #[test]
    fn test_external_name_follows_remap() {
        let call = doubled().bind([("number", "count")]).unwrap();
        let internal = DepName::from("#doubled");
        assert_eq!(call.external_name(&internal), "#doubled");

        let call = call.outputs([("#doubled", "#twice")]);
        assert_eq!(call.external_name(&internal), "#twice");
    }

    #[test]
    fn test_outputs_ext_on_result() {
        let call = doubled().bind([("number", "count")]).outputs([("#doubled", "#twice")]).unwrap();
        assert_eq!(call.remap().len(), 1);
    }

    #[test]
    fn test_declared_output_must_be_produced() {
        let err = TemplateBuilder::new("broken")
            .output("#result")
            .step(
                StepBuilder::new("noop")
                    .output("#other")
                    .compute(|_| Ok(Continuation::proceed([("#other", Value::Null)])))
                    .build(),
            )
            .build()
            .unwrap_err();
        assert!(err.has(|k| matches!(k, ProblemKind::OutputNotProduced { output } if output == "#result")));
    }

    #[test]
    fn test_duplicate_template_input() {
        let err = TemplateBuilder::new("twice")
            .input(InputSpec::declare("a", InputOptions::default()))
            .input(InputSpec::declare("a", InputOptions::default()))
            .step(
                StepBuilder::new("expose")
                    .dependency(input::named("a"))
                    .expose(|view| view.input("a").cloned())
                    .build(),
            )
            .build()
            .unwrap_err();
        assert!(err.has(|k| matches!(k, ProblemKind::DuplicateInput { .. })));
    }

    #[test]
    fn test_builder_collects_step_problems() {
        let err = TemplateBuilder::new("bad steps")
            .step(StepBuilder::new("a").build())
            .step(StepBuilder::new("b").build())
            .build()
            .unwrap_err();
        assert_eq!(
            err.problems.iter().filter(|p| p.kind == ProblemKind::MissingCompute).count(),
            2
        );
    }
}
