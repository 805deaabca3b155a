//! Property extraction from records and things.

use crate::composite::{
    Binding, CompositeError, ConfigurationError, Continuation, InputOptions, InputSpec, Result,
    StepBuilder, TemplateBuilder, TemplateCall, Validator, Value, ValueType, input,
};

/// Read `property` off a record or thing. Null stays null.
pub(crate) fn property_of(object: &Value, property: &str, step: &str) -> Result<Value> {
    match object {
        Value::Null => Ok(Value::Null),
        Value::Record(record) => Ok(record.get(property).cloned().unwrap_or_default()),
        Value::Thing(thing) => thing.get(property),
        other => Err(CompositeError::compute(
            step,
            format!("cannot read '{property}' from {}", other.type_name()),
        )),
    }
}

fn property_input() -> Result<InputSpec, ConfigurationError> {
    InputSpec::static_value("property", Validator::String)
}

/// Output `#value`: `object[property]`, null when the object is null.
pub fn with_property_from_object(
    object: impl Into<Binding>,
    property: &str,
) -> Result<TemplateCall, ConfigurationError> {
    let bindings: [(&str, Binding); 2] = [("object", object.into()), ("property", input::value(property))];
    TemplateBuilder::new("with_property_from_object")
        .input(InputSpec::declare("object", InputOptions { accepts_null: true, ..Default::default() }))
        .input(property_input())
        .output("#value")
        .step(
            StepBuilder::new("read property")
                .dependencies([input::named("object"), input::named("property")])
                .output("#value")
                .compute(|view| {
                    let property = view.input("property")?.as_str().unwrap_or_default();
                    let value = property_of(view.input("object")?, property, view.step())?;
                    Ok(Continuation::proceed([("#value", value)]))
                })
                .build(),
        )
        .build()?
        .bind(bindings)
}

/// Output `#values`: `item[property]` for every item, null for null items.
/// A null list gives a null output.
pub fn with_property_from_list(
    list: impl Into<Binding>,
    property: &str,
) -> Result<TemplateCall, ConfigurationError> {
    let bindings: [(&str, Binding); 2] = [("list", list.into()), ("property", input::value(property))];
    TemplateBuilder::new("with_property_from_list")
        .input(InputSpec::declare(
            "list",
            InputOptions { type_: Some(ValueType::Array), accepts_null: true, ..Default::default() },
        ))
        .input(property_input())
        .output("#values")
        .step(
            StepBuilder::new("read property of each item")
                .dependencies([input::named("list"), input::named("property")])
                .output("#values")
                .compute(|view| {
                    let property = view.input("property")?.as_str().unwrap_or_default();
                    let values = match view.input("list")? {
                        Value::List(items) => Value::list(
                            items
                                .iter()
                                .map(|item| property_of(item, property, view.step()))
                                .collect::<Result<Vec<_>>>()?,
                        ),
                        _ => Value::Null,
                    };
                    Ok(Continuation::proceed([("#values", values)]))
                })
                .build(),
        )
        .build()?
        .bind(bindings)
}
