//! Reference resolution against wiki data arrays.
//!
//! A reference is `"<type>:<directory>"` or a bare directory. It resolves
//! to the thing in the data array whose directory matches; a typed
//! reference must also match the expected reference type.

use compact_str::CompactString;

use crate::{
    composite::{
        Binding, ConfigurationError, Continuation, InputOptions, InputSpec, Mode, Result,
        StepBuilder, TemplateBuilder, TemplateCall, Validator, Value, ValueType, input,
        primitives::raise_output_without_dependency,
    },
    thing::ThingRef,
    utils::slug::slugify,
};

/// What to do with references that don't resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotFoundMode {
    /// Drop them from the list
    #[default]
    Filter,
    /// Keep a null in their place
    Null,
    /// Expose an empty list from the whole composite
    Exit,
}

/// Find the thing `reference` points at in `data`.
pub fn find_reference(data: &[Value], reference: &str, reference_type: &str) -> Result<Option<ThingRef>> {
    let directory = match reference.split_once(':') {
        Some((prefix, _)) if prefix != reference_type => return Ok(None),
        Some((_, directory)) => directory,
        None => reference,
    };
    for thing in data.iter().filter_map(Value::as_thing) {
        if thing.directory()?.as_deref() == Some(directory) {
            return Ok(Some(ThingRef::clone(thing)));
        }
    }
    Ok(None)
}

/// Resolve a reference value: strings are looked up, things pass through.
fn resolve(entry: &Value, data: &[Value], reference_type: &str) -> Result<Option<ThingRef>> {
    match entry {
        Value::String(reference) => find_reference(data, reference, reference_type),
        Value::Thing(thing) if thing.kind().reference_type() == reference_type => {
            Ok(Some(ThingRef::clone(thing)))
        }
        _ => Ok(None),
    }
}

fn data_input() -> Result<InputSpec, ConfigurationError> {
    InputSpec::declare(
        "data",
        InputOptions { type_: Some(ValueType::Array), accepts_null: true, ..Default::default() },
    )
}

fn reference_type_input() -> Result<InputSpec, ConfigurationError> {
    InputSpec::static_value("referenceType", Validator::String)
}

/// Output `#resolvedReference`: the thing `reference` names, or null.
pub fn with_resolved_reference(
    reference: impl Into<Binding>,
    data: impl Into<Binding>,
    reference_type: &'static str,
) -> Result<TemplateCall, ConfigurationError> {
    let bindings: [(&str, Binding); 3] = [
        ("ref", reference.into()),
        ("data", data.into()),
        ("referenceType", input::value(reference_type)),
    ];
    TemplateBuilder::new("with_resolved_reference")
        .input(InputSpec::declare(
            "ref",
            InputOptions {
                validate: Some(Validator::Reference(reference_type)),
                accepts_null: true,
                ..Default::default()
            },
        ))
        .input(data_input())
        .input(reference_type_input())
        .output("#resolvedReference")
        .step(
            StepBuilder::new("resolve reference")
                .dependencies([
                    input::named("ref"),
                    input::named("data"),
                    input::named("referenceType"),
                ])
                .output("#resolvedReference")
                .compute(|view| {
                    let data = view.input("data")?.as_list().unwrap_or_default();
                    let reference_type = view.input("referenceType")?.as_str().unwrap_or_default();
                    let found = resolve(view.input("ref")?, data, reference_type)?;
                    Ok(Continuation::proceed([("#resolvedReference", Value::from(found))]))
                })
                .build(),
        )
        .build()?
        .bind(bindings)
}

/// Output `#resolvedReferenceList`: every reference in `list` resolved
/// against `data`. Missing list or data gives an empty list.
pub fn with_resolved_reference_list(
    list: impl Into<Binding>,
    data: impl Into<Binding>,
    reference_type: &'static str,
    not_found: NotFoundMode,
) -> Result<TemplateCall, ConfigurationError> {
    let bindings: [(&str, Binding); 3] = [
        ("list", list.into()),
        ("data", data.into()),
        ("referenceType", input::value(reference_type)),
    ];
    TemplateBuilder::new("with_resolved_reference_list")
        .input(InputSpec::declare(
            "list",
            InputOptions {
                validate: Some(Validator::array_of(Validator::Reference(reference_type))),
                accepts_null: true,
                ..Default::default()
            },
        ))
        .input(data_input())
        .input(reference_type_input())
        .output("#resolvedReferenceList")
        .step(raise_output_without_dependency(
            input::named("list"),
            Mode::Empty,
            [("#resolvedReferenceList", Value::empty_list())],
        ))
        .step(raise_output_without_dependency(
            input::named("data"),
            Mode::Null,
            [("#resolvedReferenceList", Value::empty_list())],
        ))
        .step(
            StepBuilder::new("resolve references")
                .dependencies([
                    input::named("list"),
                    input::named("data"),
                    input::named("referenceType"),
                ])
                .output("#resolvedReferenceList")
                .compute(move |view| {
                    let data = view.input("data")?.as_list().unwrap_or_default();
                    let reference_type = view.input("referenceType")?.as_str().unwrap_or_default();

                    let mut resolved = Vec::new();
                    for entry in view.input("list")?.as_list().unwrap_or_default() {
                        match (resolve(entry, data, reference_type)?, not_found) {
                            (Some(thing), _) => resolved.push(Value::Thing(thing)),
                            (None, NotFoundMode::Filter) => {}
                            (None, NotFoundMode::Null) => resolved.push(Value::Null),
                            (None, NotFoundMode::Exit) => {
                                return Ok(Continuation::exit(Value::empty_list()));
                            }
                        }
                    }
                    Ok(Continuation::proceed([("#resolvedReferenceList", Value::from(resolved))]))
                })
                .build(),
        )
        .build()?
        .bind(bindings)
}

/// Output `#reverseReferenceList`: things in `data` whose `list` property
/// contains the current thing.
pub fn with_reverse_reference_list(
    data: impl Into<Binding>,
    list: &str,
) -> Result<TemplateCall, ConfigurationError> {
    let bindings: [(&str, Binding); 2] = [("data", data.into()), ("list", input::value(list))];
    TemplateBuilder::new("with_reverse_reference_list")
        .input(data_input())
        .input(InputSpec::static_value("list", Validator::String))
        .output("#reverseReferenceList")
        .step(raise_output_without_dependency(
            input::named("data"),
            Mode::Null,
            [("#reverseReferenceList", Value::empty_list())],
        ))
        .step(
            StepBuilder::new("find referencing things")
                .dependencies([input::named("data"), input::named("list"), input::myself()])
                .output("#reverseReferenceList")
                .compute(|view| {
                    let myself = view.myself()?;
                    let property = view.input("list")?.as_str().unwrap_or_default();

                    let mut referencing = Vec::new();
                    for entry in view.input("data")?.as_list().unwrap_or_default() {
                        let Value::Thing(thing) = entry else { continue };
                        if thing.get(property)?.as_list().is_some_and(|refs| refs.contains(myself)) {
                            referencing.push(entry.clone());
                        }
                    }
                    Ok(Continuation::proceed([("#reverseReferenceList", Value::from(referencing))]))
                })
                .build(),
        )
        .build()?
        .bind(bindings)
}

/// Output `#directory`: a URL-safe slug of `name`, or null.
pub fn with_directory_from_name(name: impl Into<Binding>) -> Result<TemplateCall, ConfigurationError> {
    let name: Binding = name.into();
    TemplateBuilder::new("with_directory_from_name")
        .input(InputSpec::declare(
            "name",
            InputOptions { validate: Some(Validator::String), accepts_null: true, ..Default::default() },
        ))
        .output("#directory")
        .step(
            StepBuilder::new("slugify name")
                .dependency(input::named("name"))
                .output("#directory")
                .compute(|view| {
                    let directory = view
                        .input("name")?
                        .as_str()
                        .map(|name| CompactString::from(slugify(name)));
                    Ok(Continuation::proceed([("#directory", Value::from(directory))]))
                })
                .build(),
        )
        .build()?
        .bind([("name", name)])
}
