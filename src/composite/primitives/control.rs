//! Control-flow primitives: guards and expose steps.

use crate::composite::{
    Binding, ConfigurationError, Continuation, DepName, InputOptions, InputSpec, Mode, ProblemKind,
    Step, StepBuilder, StepKind, TemplateBuilder, TemplateCall, Value, input,
};

/// Expose `value` and skip the rest of the composite when `dependency` is
/// not available under `mode`.
pub fn exit_without_dependency(
    dependency: impl Into<Binding>,
    value: impl Into<Binding>,
    mode: Mode,
) -> Step {
    let dependency = dependency.into();
    Step::new(
        format!("exit without {}", dependency.describe()),
        StepKind::ExitWithout { dependency, mode, value: value.into() },
    )
}

/// Finish the enclosing template early with `output` when `dependency`
/// is not available under `mode`.
pub fn raise_output_without_dependency<N: Into<DepName>, B: Into<Binding>>(
    dependency: impl Into<Binding>,
    mode: Mode,
    output: impl IntoIterator<Item = (N, B)>,
) -> Step {
    let dependency = dependency.into();
    Step::new(
        format!("raise without {}", dependency.describe()),
        StepKind::RaiseWithout {
            dependency,
            mode,
            output: output.into_iter().map(|(n, b)| (n.into(), b.into())).collect(),
        },
    )
}

pub fn expose_dependency(dependency: impl Into<Binding>) -> Step {
    let dependency = dependency.into();
    Step::new(format!("expose {}", dependency.describe()), StepKind::Expose(dependency))
}

/// Expose a literal.
///
/// Only `input::value(...)` literals and forwarded inputs are accepted; a
/// bare dependency name is rejected at construction.
pub fn expose_constant(value: impl Into<Binding>) -> Result<Step, ConfigurationError> {
    match value.into() {
        binding @ (Binding::Value(_) | Binding::Input(_)) => {
            Ok(Step::new(format!("expose constant {}", binding.describe()), StepKind::Expose(binding)))
        }
        other => Err(ConfigurationError::single(
            "expose constant",
            ProblemKind::StaticInputNotLiteral { input: "value".into(), given: other.describe() },
        )),
    }
}

/// Expose `dependency` if available, otherwise continue with the next step.
pub fn expose_dependency_or_continue(dependency: impl Into<Binding>, mode: Mode) -> Step {
    let dependency = dependency.into();
    Step::new(
        format!("expose {} or continue", dependency.describe()),
        StepKind::ExposeOrContinue { dependency, mode },
    )
}

/// Expose the property's own update value if one was set.
pub fn expose_update_value_or_continue(mode: Mode) -> Step {
    Step::new(
        "expose update value or continue",
        StepKind::ExposeOrContinue { dependency: Binding::UpdateValue, mode },
    )
}

/// Output `#availability`: whether `from` is available under `mode`.
pub fn with_result_of_availability_check(
    from: impl Into<Binding>,
    mode: Mode,
) -> Result<TemplateCall, ConfigurationError> {
    let from: Binding = from.into();
    TemplateBuilder::new("with_result_of_availability_check")
        .input(InputSpec::declare("from", InputOptions { accepts_null: true, ..Default::default() }))
        .output("#availability")
        .step(
            StepBuilder::new("check availability")
                .dependency(input::named("from"))
                .output("#availability")
                .compute(move |view| {
                    let available = mode.is_available(view.input("from")?);
                    Ok(Continuation::proceed([("#availability", Value::from(available))]))
                })
                .build(),
        )
        .build()?
        .bind([("from", from)])
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::composite::{Bindings, CompositeBuilder};

    #[test]
    fn test_exit_without_dependency_skips_spy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let spy_calls = Arc::clone(&calls);

        let composite = CompositeBuilder::new("tracks")
            .step(exit_without_dependency("trackData", Value::empty_list(), Mode::Null))
            .step(
                StepBuilder::new("spy")
                    .dependency("trackData")
                    .expose(move |view| {
                        spy_calls.fetch_add(1, Ordering::SeqCst);
                        view.get("trackData").cloned()
                    })
                    .build(),
            )
            .build()
            .unwrap();

        assert_eq!(composite.invoke(&Bindings::new()).unwrap(), Value::empty_list());
        assert_eq!(
            composite.invoke(&Bindings::new().with("trackData", Value::Null)).unwrap(),
            Value::empty_list()
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let data = Value::list([Value::from("a")]);
        assert_eq!(composite.invoke(&Bindings::new().with("trackData", data.clone())).unwrap(), data);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exit_value_can_be_another_dependency() {
        let composite = CompositeBuilder::new("fallback")
            .step(exit_without_dependency("color", "albumColor", Mode::Null))
            .step(expose_dependency("color"))
            .build()
            .unwrap();
        let pool = Bindings::new().with("albumColor", "#ff0000");
        assert_eq!(composite.invoke(&pool).unwrap(), Value::from("#ff0000"));
    }

    #[test]
    fn test_expose_constant_literal() {
        let composite = CompositeBuilder::new("constant")
            .step(expose_constant(input::value("foo")))
            .build()
            .unwrap();
        assert!(composite.dependencies().is_empty());
        assert_eq!(composite.invoke(&Bindings::new()).unwrap(), Value::from("foo"));
        assert_eq!(
            composite.invoke(&Bindings::new().with("foo", "bar")).unwrap(),
            Value::from("foo")
        );
    }

    #[test]
    fn test_expose_constant_rejects_bare_name() {
        let err = expose_constant("bareName").unwrap_err();
        assert!(err.has(|k| matches!(k, ProblemKind::StaticInputNotLiteral { .. })));

        // and the problem surfaces from the composite builder too
        let err = CompositeBuilder::new("constant")
            .step(expose_constant("bareName"))
            .build()
            .unwrap_err();
        assert!(err.has(|k| matches!(k, ProblemKind::StaticInputNotLiteral { .. })));
    }

    #[test]
    fn test_expose_update_value_or_continue() {
        let composite = CompositeBuilder::new("directory")
            .step(expose_update_value_or_continue(Mode::Null))
            .step(expose_dependency("#fallback"))
            .build();
        // `#fallback` was never produced
        assert!(composite.is_err());

        let composite = CompositeBuilder::new("directory")
            .step(expose_update_value_or_continue(Mode::Falsy))
            .step(expose_constant(input::value("computed")))
            .build()
            .unwrap();
        assert_eq!(composite.invoke(&Bindings::new().with_update_value("")).unwrap(), Value::from("computed"));
        assert_eq!(composite.invoke(&Bindings::new().with_update_value("set")).unwrap(), Value::from("set"));
    }

    #[test]
    fn test_expose_dependency_or_continue() {
        let composite = CompositeBuilder::new("override")
            .step(expose_dependency_or_continue("override", Mode::Empty))
            .step(expose_constant(input::value(Value::empty_list())))
            .build()
            .unwrap();
        let given = Value::list([Value::from(1.0)]);
        assert_eq!(composite.invoke(&Bindings::new().with("override", given.clone())).unwrap(), given);
        assert_eq!(
            composite.invoke(&Bindings::new().with("override", Value::empty_list())).unwrap(),
            Value::empty_list()
        );
    }

    #[test]
    fn test_raise_output_inside_template_only() {
        let err = CompositeBuilder::new("raise")
            .step(raise_output_without_dependency("x", Mode::Null, [("#x", Value::Null)]))
            .step(expose_dependency("x"))
            .build()
            .unwrap_err();
        assert!(err.has(|k| matches!(k, ProblemKind::RaiseOutsideTemplate)));
    }

    #[test]
    fn test_availability_check() {
        let composite = CompositeBuilder::new("has tracks")
            .step(with_result_of_availability_check("tracks", Mode::Empty))
            .step(expose_dependency("#availability"))
            .build()
            .unwrap();
        assert_eq!(composite.invoke(&Bindings::new()).unwrap(), Value::from(false));
        assert_eq!(
            composite.invoke(&Bindings::new().with("tracks", Value::list([Value::Null]))).unwrap(),
            Value::from(true)
        );
    }
}
