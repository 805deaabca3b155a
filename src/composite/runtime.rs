//! Composite invocation.
//!
//! A chain runs in a [`Frame`]: the caller's [`DependencySource`] plus a
//! local pool of step outputs. Template calls run in a child frame that
//! shares the source but starts with an empty pool; only declared outputs
//! are copied back into the parent.
//!
//! Compute steps never see the frame. They get a [`View`] holding exactly
//! the values they declared, so reading anything else is an error.

use std::sync::atomic::{AtomicBool, Ordering};

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::{
    DepName,
    error::{CompositeError, Result},
    input::Binding,
    is_local,
    step::{Continuation, Outputs, Step, StepKind},
    template::TemplateCall,
    value::Value,
};
use crate::logger;

/// Log every executed step.
static TRACE: AtomicBool = AtomicBool::new(false);

pub fn set_trace(enabled: bool) {
    TRACE.store(enabled, Ordering::Relaxed);
}

// ============================================================================
// Sources
// ============================================================================

/// Where plain dependency names are resolved from.
pub trait DependencySource {
    /// Value of a plain (non-`#`) dependency. Unknown names read as null.
    fn dependency(&self, name: &str) -> Result<Value>;

    /// The entity being computed for.
    fn myself(&self) -> Value {
        Value::Null
    }

    /// Stored update value of the property being computed.
    fn update_value(&self) -> Value {
        Value::Null
    }

    fn this_property(&self) -> Option<&str> {
        None
    }
}

/// Plain name/value pool, for invoking composites outside any entity.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: FxHashMap<DepName, Value>,
    myself: Value,
    update_value: Value,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<DepName>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn with_myself(mut self, value: impl Into<Value>) -> Self {
        self.myself = value.into();
        self
    }

    pub fn with_update_value(mut self, value: impl Into<Value>) -> Self {
        self.update_value = value.into();
        self
    }
}

impl From<FxHashMap<DepName, Value>> for Bindings {
    fn from(values: FxHashMap<DepName, Value>) -> Self {
        Self { values, ..Default::default() }
    }
}

impl DependencySource for Bindings {
    fn dependency(&self, name: &str) -> Result<Value> {
        Ok(self.values.get(name).cloned().unwrap_or_default())
    }

    fn myself(&self) -> Value {
        self.myself.clone()
    }

    fn update_value(&self) -> Value {
        self.update_value.clone()
    }
}

// ============================================================================
// View
// ============================================================================

/// The declared dependencies of one compute step, already resolved.
pub struct View<'a> {
    step: &'a str,
    values: SmallVec<[(&'a Binding, Value); 4]>,
}

impl<'a> View<'a> {
    fn find(&self, matches: impl Fn(&Binding) -> bool, describe: impl FnOnce() -> CompactString) -> Result<&Value> {
        self.values
            .iter()
            .find(|(binding, _)| matches(binding))
            .map(|(_, value)| value)
            .ok_or_else(|| CompositeError::UndeclaredDependency {
                step: self.step.into(),
                name: describe(),
            })
    }

    /// A declared pool entry.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.find(
            |binding| matches!(binding, Binding::Dependency(n) if n == name),
            || name.into(),
        )
    }

    /// A declared input of the enclosing template.
    pub fn input(&self, name: &str) -> Result<&Value> {
        self.find(
            |binding| matches!(binding, Binding::Input(n) if n == name),
            || compact_str::format_compact!("input '{name}'"),
        )
    }

    pub fn myself(&self) -> Result<&Value> {
        self.find(|binding| matches!(binding, Binding::Myself), || "myself".into())
    }

    pub fn update_value(&self) -> Result<&Value> {
        self.find(|binding| matches!(binding, Binding::UpdateValue), || "update value".into())
    }

    pub fn this_property(&self) -> Result<&Value> {
        self.find(|binding| matches!(binding, Binding::ThisProperty), || "this property".into())
    }

    /// Name of the running step, for error messages.
    #[inline]
    pub const fn step(&self) -> &'a str {
        self.step
    }
}

// ============================================================================
// Frames
// ============================================================================

struct Frame<'a> {
    source: &'a dyn DependencySource,
    context: &'a str,
    locals: FxHashMap<DepName, Value>,
    inputs: FxHashMap<CompactString, Value>,
}

/// How a chain ended.
enum ChainEnd {
    Finished,
    Exit(Value),
    Raise(Outputs),
}

impl<'a> Frame<'a> {
    fn new(source: &'a dyn DependencySource, context: &'a str) -> Self {
        Self {
            source,
            context,
            locals: FxHashMap::default(),
            inputs: FxHashMap::default(),
        }
    }

    fn read(&self, binding: &Binding) -> Result<Value> {
        Ok(match binding {
            Binding::Dependency(name) => match self.locals.get(name) {
                Some(value) => value.clone(),
                None if is_local(name) => Value::Null,
                None => return self.source.dependency(name),
            },
            Binding::Value(value) => value.clone(),
            Binding::Input(name) => self.inputs.get(name).cloned().unwrap_or_default(),
            Binding::Myself => self.source.myself(),
            Binding::UpdateValue => self.source.update_value(),
            Binding::ThisProperty => self.source.this_property().map(Value::string).unwrap_or_default(),
        })
    }

    fn run(&mut self, steps: &[Step]) -> Result<ChainEnd> {
        for (index, step) in steps.iter().enumerate() {
            if TRACE.load(Ordering::Relaxed) {
                logger::trace_step(self.context, index, step.annotation());
            }
            match self.step(step)? {
                ChainEnd::Finished => {}
                end => return Ok(end),
            }
        }
        Ok(ChainEnd::Finished)
    }

    fn step(&mut self, step: &Step) -> Result<ChainEnd> {
        match step.kind() {
            StepKind::Compute(compute) => {
                let values = compute
                    .dependencies
                    .iter()
                    .map(|binding| Ok((binding, self.read(binding)?)))
                    .collect::<Result<_>>()?;
                let view = View { step: step.annotation(), values };

                let check = |outputs: &Outputs| -> Result<()> {
                    match outputs.iter().find(|(name, _)| !compute.outputs.contains(name)) {
                        Some((name, _)) => Err(CompositeError::UndeclaredOutput {
                            step: step.annotation().into(),
                            name: name.clone(),
                        }),
                        None => Ok(()),
                    }
                };

                match (compute.compute)(&view)? {
                    Continuation::Proceed(outputs) => {
                        check(&outputs)?;
                        self.locals.extend(outputs);
                        Ok(ChainEnd::Finished)
                    }
                    Continuation::Exit(value) => Ok(ChainEnd::Exit(value)),
                    Continuation::Raise(outputs) => {
                        check(&outputs)?;
                        Ok(ChainEnd::Raise(outputs))
                    }
                }
            }

            StepKind::ExitWithout { dependency, mode, value } => {
                if mode.is_available(&self.read(dependency)?) {
                    Ok(ChainEnd::Finished)
                } else {
                    Ok(ChainEnd::Exit(self.read(value)?))
                }
            }

            StepKind::RaiseWithout { dependency, mode, output } => {
                if mode.is_available(&self.read(dependency)?) {
                    return Ok(ChainEnd::Finished);
                }
                let outputs = output
                    .iter()
                    .map(|(name, binding)| Ok((name.clone(), self.read(binding)?)))
                    .collect::<Result<_>>()?;
                Ok(ChainEnd::Raise(outputs))
            }

            StepKind::Expose(binding) => Ok(ChainEnd::Exit(self.read(binding)?)),

            StepKind::ExposeOrContinue { dependency, mode } => {
                let value = self.read(dependency)?;
                if mode.is_available(&value) {
                    Ok(ChainEnd::Exit(value))
                } else {
                    Ok(ChainEnd::Finished)
                }
            }

            StepKind::Call(call) => self.call(call),
        }
    }

    fn call(&mut self, call: &TemplateCall) -> Result<ChainEnd> {
        let template = call.template();

        let mut child = Frame::new(self.source, template.annotation());
        for (spec, binding) in call.slots() {
            let bound = binding.map(|binding| self.read(binding)).transpose()?;
            let value = spec.resolve_dynamic(template.annotation(), bound, |name| {
                self.read(&Binding::dependency(name))
            })?;
            child.inputs.insert(spec.name().into(), value);
        }

        let mut raised = match child.run(template.steps())? {
            ChainEnd::Finished => Outputs::new(),
            ChainEnd::Raise(outputs) => outputs,
            exit @ ChainEnd::Exit(_) => return Ok(exit),
        };

        for output in template.outputs() {
            let value = match raised.iter().position(|(name, _)| name == output) {
                Some(index) => raised.swap_remove(index).1,
                None => child.locals.remove(output).unwrap_or_default(),
            };
            self.locals.insert(call.external_name(output).clone(), value);
        }
        Ok(ChainEnd::Finished)
    }
}

/// Run a compiled chain to its exposed value.
pub(super) fn run(context: &str, steps: &[Step], source: &dyn DependencySource) -> Result<Value> {
    match Frame::new(source, context).run(steps)? {
        ChainEnd::Exit(value) => Ok(value),
        ChainEnd::Finished => Err(CompositeError::NothingExposed(context.into())),
        ChainEnd::Raise(_) => Err(CompositeError::StrayRaise(context.into())),
    }
}
