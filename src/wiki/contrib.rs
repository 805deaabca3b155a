//! Artist contributions: `{ who, what }` records whose `who` is an
//! artist reference.

use crate::composite::{
    Binding, ConfigurationError, Continuation, InputOptions, InputSpec, Mode, RecordField,
    StepBuilder, TemplateBuilder, TemplateCall, Validator, Value, ValueType, input,
    primitives::{find_reference, raise_output_without_dependency},
};

/// Update validator for a contribution list.
pub fn contribs_validator() -> Validator {
    Validator::array_of(Validator::record([
        RecordField::required("who", Validator::Reference("artist")),
        RecordField::optional("what", Validator::ContentString),
    ]))
}

fn data_input() -> Result<InputSpec, ConfigurationError> {
    InputSpec::declare(
        "data",
        InputOptions { type_: Some(ValueType::Array), accepts_null: true, ..Default::default() },
    )
}

/// Output `#resolvedContribs`: `list` with each `who` resolved to its
/// artist in `data`. Contributions naming an unknown artist are dropped.
pub fn with_resolved_contribs(
    list: impl Into<Binding>,
    data: impl Into<Binding>,
) -> Result<TemplateCall, ConfigurationError> {
    let bindings: [(&str, Binding); 2] = [("list", list.into()), ("data", data.into())];
    TemplateBuilder::new("with_resolved_contribs")
        .input(InputSpec::declare(
            "list",
            InputOptions { validate: Some(contribs_validator()), accepts_null: true, ..Default::default() },
        ))
        .input(data_input())
        .output("#resolvedContribs")
        .step(raise_output_without_dependency(
            input::named("list"),
            Mode::Empty,
            [("#resolvedContribs", Value::empty_list())],
        ))
        .step(raise_output_without_dependency(
            input::named("data"),
            Mode::Null,
            [("#resolvedContribs", Value::empty_list())],
        ))
        .step(
            StepBuilder::new("resolve contributors")
                .dependencies([input::named("list"), input::named("data")])
                .output("#resolvedContribs")
                .compute(|view| {
                    let data = view.input("data")?.as_list().unwrap_or_default();

                    let mut resolved = Vec::new();
                    for contrib in view.input("list")?.as_list().unwrap_or_default() {
                        let Some(record) = contrib.as_record() else { continue };
                        let who = match record.get("who") {
                            Some(Value::String(reference)) => find_reference(data, reference, "artist")?,
                            Some(Value::Thing(thing)) => Some(thing.clone()),
                            _ => None,
                        };
                        if let Some(who) = who {
                            let what = record.get("what").cloned().unwrap_or_default();
                            resolved.push(Value::record([("who", Value::Thing(who)), ("what", what)]));
                        }
                    }
                    Ok(Continuation::proceed([("#resolvedContribs", Value::from(resolved))]))
                })
                .build(),
        )
        .build()?
        .bind(bindings)
}

/// Output `#reverseContributionList`: things in `data` whose contribution
/// list `list` credits the current thing.
pub fn with_reverse_contribution_list(
    data: impl Into<Binding>,
    list: &str,
) -> Result<TemplateCall, ConfigurationError> {
    let bindings: [(&str, Binding); 2] = [("data", data.into()), ("list", input::value(list))];
    TemplateBuilder::new("with_reverse_contribution_list")
        .input(data_input())
        .input(InputSpec::static_value("list", Validator::String))
        .output("#reverseContributionList")
        .step(raise_output_without_dependency(
            input::named("data"),
            Mode::Null,
            [("#reverseContributionList", Value::empty_list())],
        ))
        .step(
            StepBuilder::new("find crediting things")
                .dependencies([input::named("data"), input::named("list"), input::myself()])
                .output("#reverseContributionList")
                .compute(|view| {
                    let myself = view.myself()?;
                    let property = view.input("list")?.as_str().unwrap_or_default();

                    let mut crediting = Vec::new();
                    for entry in view.input("data")?.as_list().unwrap_or_default() {
                        let Value::Thing(thing) = entry else { continue };
                        let contribs = thing.get(property)?;
                        let credited = contribs.as_list().unwrap_or_default().iter().any(|contrib| {
                            contrib.as_record().and_then(|record| record.get("who")) == Some(myself)
                        });
                        if credited {
                            crediting.push(entry.clone());
                        }
                    }
                    Ok(Continuation::proceed([("#reverseContributionList", Value::from(crediting))]))
                })
                .build(),
        )
        .build()?
        .bind(bindings)
}
