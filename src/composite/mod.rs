//! Composite dependency-computation engine.
//!
//! Computed properties are declared as ordered chains of steps. Each step
//! names what it reads; the chain is checked once, compiled, and then run
//! against a dependency pool per invocation.
//!
//! ```text
//! InputSpec ──► Template ──bind──► TemplateCall ─┐
//!                                                 ├─► CompositeBuilder ──build_in(scope)──► Composite
//! StepBuilder ──────────────────────► Step ──────┘        (Unvalidated → Validated → Compiled)
//!
//! Composite::invoke(source)
//!     pool = source values (lazy) + step locals
//!     step 1 ─► outputs merged ─► step 2 ─► ... ─► exposed value
//! ```
//!
//! # Naming
//!
//! | Name           | Meaning                                          |
//! |----------------|--------------------------------------------------|
//! | `trackData`    | entity state: a field, property or wiki array    |
//! | `#tracks`      | step-local, produced by an earlier step          |
//! | `input::named` | an input of the enclosing template               |

mod compile;
mod error;
pub mod input;
pub mod primitives;
mod runtime;
mod step;
mod template;
mod validate;
mod value;

use compact_str::CompactString;

pub use compile::{Composite, CompositeBuilder, Scope};
pub use error::{
    CompositeError, ConfigProblem, ConfigurationError, ProblemKind, Result, ValidationError,
};
pub use input::{Binding, InputKind, InputOptions, InputSpec};
pub use runtime::{Bindings, DependencySource, View, set_trace};
pub use step::{Continuation, IntoStep, Mode, Step, StepBuilder, StepKind};
pub use template::{OutputsExt, Template, TemplateBuilder, TemplateCall};
pub use validate::{RecordField, ValidationFailure, Validator, ValueType};
pub use value::{MapFn, Record, Value};

/// Dependency name, either entity state or a `#`-prefixed step local.
pub type DepName = CompactString;

/// Whether `name` is a step-local dependency.
#[inline]
pub fn is_local(name: &str) -> bool {
    name.starts_with('#')
}
