//! List and aggregate primitives.
//!
//! | Primitive                  | Output                                  |
//! |----------------------------|-----------------------------------------|
//! | `with_mapped_list`         | `#mappedList`                           |
//! | `with_filtered_list`       | `#filteredList`                         |
//! | `with_flattened_list`      | `#flattenedList`, `#flattenedIndices`   |
//! | `with_sum`                 | `#sum`                                  |
//! | `with_unique_items_only`   | `#uniqueItems`, or the list's own name  |

use crate::composite::{
    Binding, CompositeError, ConfigurationError, Continuation, InputOptions, InputSpec,
    StepBuilder, TemplateBuilder, TemplateCall, Value, ValueType, input,
};

fn list_input(name: &str) -> Result<InputSpec, ConfigurationError> {
    InputSpec::declare(name, InputOptions { type_: Some(ValueType::Array), ..Default::default() })
}

/// Apply `map` to every item of `list`, keeping order and length.
pub fn with_mapped_list(
    list: impl Into<Binding>,
    map: impl Into<Binding>,
) -> Result<TemplateCall, ConfigurationError> {
    let bindings: [(&str, Binding); 2] = [("list", list.into()), ("map", map.into())];
    TemplateBuilder::new("with_mapped_list")
        .input(list_input("list"))
        .input(InputSpec::declare(
            "map",
            InputOptions { type_: Some(ValueType::Function), ..Default::default() },
        ))
        .output("#mappedList")
        .step(
            StepBuilder::new("map list")
                .dependencies([input::named("list"), input::named("map")])
                .output("#mappedList")
                .compute(|view| {
                    let list = view.input("list")?.as_list().unwrap_or_default();
                    let Some(map) = view.input("map")?.as_func() else {
                        return Err(CompositeError::compute(view.step(), "map is not a function"));
                    };
                    let mapped = Value::list(list.iter().map(|item| map.call(item)));
                    Ok(Continuation::proceed([("#mappedList", mapped)]))
                })
                .build(),
        )
        .build()?
        .bind(bindings)
}

/// Keep the items of `list` whose entry in `filter` is truthy.
pub fn with_filtered_list(
    list: impl Into<Binding>,
    filter: impl Into<Binding>,
) -> Result<TemplateCall, ConfigurationError> {
    let bindings: [(&str, Binding); 2] = [("list", list.into()), ("filter", filter.into())];
    TemplateBuilder::new("with_filtered_list")
        .input(list_input("list"))
        .input(list_input("filter"))
        .output("#filteredList")
        .step(
            StepBuilder::new("filter list")
                .dependencies([input::named("list"), input::named("filter")])
                .output("#filteredList")
                .compute(|view| {
                    let list = view.input("list")?.as_list().unwrap_or_default();
                    let filter = view.input("filter")?.as_list().unwrap_or_default();
                    if list.len() != filter.len() {
                        return Err(CompositeError::compute(
                            view.step(),
                            format!("list has {} items but filter has {}", list.len(), filter.len()),
                        ));
                    }
                    let kept = list
                        .iter()
                        .zip(filter)
                        .filter(|(_, keep)| keep.is_truthy())
                        .map(|(item, _)| item.clone());
                    Ok(Continuation::proceed([("#filteredList", Value::list(kept))]))
                })
                .build(),
        )
        .build()?
        .bind(bindings)
}

/// Concatenate a list of lists. Null entries count as empty.
///
/// `#flattenedIndices` holds the offset each source list starts at.
pub fn with_flattened_list(list: impl Into<Binding>) -> Result<TemplateCall, ConfigurationError> {
    let list: Binding = list.into();
    TemplateBuilder::new("with_flattened_list")
        .input(list_input("list"))
        .output("#flattenedList")
        .output("#flattenedIndices")
        .step(
            StepBuilder::new("flatten list")
                .dependency(input::named("list"))
                .output("#flattenedList")
                .output("#flattenedIndices")
                .compute(|view| {
                    let mut flattened = Vec::new();
                    let mut indices = Vec::new();
                    for entry in view.input("list")?.as_list().unwrap_or_default() {
                        indices.push(Value::from(flattened.len() as i64));
                        match entry {
                            Value::Null => {}
                            Value::List(items) => flattened.extend(items.iter().cloned()),
                            other => {
                                return Err(CompositeError::compute(
                                    view.step(),
                                    format!("expected list entries, got {}", other.type_name()),
                                ));
                            }
                        }
                    }
                    Ok(Continuation::proceed([
                        ("#flattenedList", Value::from(flattened)),
                        ("#flattenedIndices", Value::from(indices)),
                    ]))
                })
                .build(),
        )
        .build()?
        .bind([("list", list)])
}

/// Sum the numeric entries of `values`; anything else is skipped.
pub fn with_sum(values: impl Into<Binding>) -> Result<TemplateCall, ConfigurationError> {
    let values: Binding = values.into();
    TemplateBuilder::new("with_sum")
        .input(list_input("values"))
        .output("#sum")
        .step(
            StepBuilder::new("sum values")
                .dependency(input::named("values"))
                .output("#sum")
                .compute(|view| {
                    let sum: f64 = view
                        .input("values")?
                        .as_list()
                        .unwrap_or_default()
                        .iter()
                        .filter_map(Value::as_number)
                        .sum();
                    Ok(Continuation::proceed([("#sum", Value::from(sum))]))
                })
                .build(),
        )
        .build()?
        .bind([("values", values)])
}

/// Drop repeated items, keeping first occurrences in order.
///
/// When `list` is a named dependency the result replaces it under the same
/// name; otherwise it lands in `#uniqueItems`.
pub fn with_unique_items_only(list: impl Into<Binding>) -> Result<TemplateCall, ConfigurationError> {
    let list: Binding = list.into();
    let target = match &list {
        Binding::Dependency(name) => Some(name.clone()),
        _ => None,
    };

    let call = TemplateBuilder::new("with_unique_items_only")
        .input(list_input("list"))
        .output("#uniqueItems")
        .step(
            StepBuilder::new("dedupe list")
                .dependency(input::named("list"))
                .output("#uniqueItems")
                .compute(|view| {
                    let mut unique: Vec<Value> = Vec::new();
                    for item in view.input("list")?.as_list().unwrap_or_default() {
                        if !unique.contains(item) {
                            unique.push(item.clone());
                        }
                    }
                    Ok(Continuation::proceed([("#uniqueItems", Value::from(unique))]))
                })
                .build(),
        )
        .build()?
        .bind([("list", list)])?;

    Ok(match target {
        Some(name) => call.outputs([("#uniqueItems", name)]),
        None => call,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::{Bindings, CompositeBuilder, primitives::expose_dependency};

    fn numbers(ns: &[f64]) -> Value {
        Value::list(ns.iter().copied().map(Value::from))
    }

    #[test]
    fn test_mapped_list_keeps_length_and_order() {
        let composite = CompositeBuilder::new("squares")
            .step(with_mapped_list(
                "values",
                input::value(Value::func(|v: &Value| {
                    Value::from(v.as_number().map(|n| n * n))
                })),
            ))
            .step(expose_dependency("#mappedList"))
            .build()
            .unwrap();

        let input = Value::list([Value::from(3.0), Value::Null, Value::from(-2.0)]);
        let result = composite.invoke(&Bindings::new().with("values", input.clone())).unwrap();
        let (input, result) = (input.as_list().unwrap(), result.as_list().unwrap());

        assert_eq!(result.len(), input.len());
        assert_eq!(result, [Value::from(9.0), Value::Null, Value::from(4.0)]);
    }

    #[test]
    fn test_mapped_list_rejects_non_list() {
        let composite = CompositeBuilder::new("bad")
            .step(with_mapped_list("values", input::value(Value::func(|v: &Value| v.clone()))))
            .step(expose_dependency("#mappedList"))
            .build()
            .unwrap();
        assert!(matches!(
            composite.invoke(&Bindings::new().with("values", 1.0)),
            Err(CompositeError::Validation(_))
        ));
    }

    #[test]
    fn test_filtered_list() {
        let composite = CompositeBuilder::new("filter")
            .step(with_filtered_list("items", "keep"))
            .step(expose_dependency("#filteredList"))
            .build()
            .unwrap();
        let pool = Bindings::new()
            .with("items", Value::list(["a", "b", "c"].map(Value::from)))
            .with("keep", Value::list([true, false, true].map(Value::from)));
        assert_eq!(
            composite.invoke(&pool).unwrap(),
            Value::list(["a", "c"].map(Value::from))
        );

        let mismatched = Bindings::new()
            .with("items", numbers(&[1.0]))
            .with("keep", Value::empty_list());
        assert!(matches!(composite.invoke(&mismatched), Err(CompositeError::Compute { .. })));
    }

    #[test]
    fn test_flattened_list_and_indices() {
        let composite = CompositeBuilder::new("flatten")
            .step(with_flattened_list("sections"))
            .step(
                StepBuilder::new("pair")
                    .dependencies(["#flattenedList", "#flattenedIndices"])
                    .expose(|view| {
                        Ok(Value::list([
                            view.get("#flattenedList")?.clone(),
                            view.get("#flattenedIndices")?.clone(),
                        ]))
                    })
                    .build(),
            )
            .build()
            .unwrap();

        let sections = Value::list([numbers(&[1.0, 2.0]), Value::Null, numbers(&[3.0])]);
        let result = composite.invoke(&Bindings::new().with("sections", sections)).unwrap();
        assert_eq!(
            result,
            Value::list([numbers(&[1.0, 2.0, 3.0]), numbers(&[0.0, 2.0, 2.0])])
        );
    }

    #[test]
    fn test_sum_skips_null_false_and_non_numbers() {
        let composite = CompositeBuilder::new("total")
            .step(with_sum("durations"))
            .step(expose_dependency("#sum"))
            .build()
            .unwrap();

        let durations = Value::list([
            Value::from(60.0),
            Value::Null,
            Value::from(false),
            Value::from("90"),
            Value::from(30.5),
        ]);
        assert_eq!(
            composite.invoke(&Bindings::new().with("durations", durations)).unwrap(),
            Value::from(90.5)
        );
        assert_eq!(
            composite.invoke(&Bindings::new().with("durations", Value::empty_list())).unwrap(),
            Value::from(0.0)
        );
    }

    #[test]
    fn test_unique_items_overwrites_named_list() {
        let call = with_unique_items_only("artTags").unwrap();
        assert_eq!(call.remap().len(), 1);

        let composite = CompositeBuilder::new("unique")
            .step(call)
            .step(expose_dependency("artTags"))
            .build()
            .unwrap();
        let tags = Value::list(["b", "a", "b", "c", "a"].map(Value::from));
        assert_eq!(
            composite.invoke(&Bindings::new().with("artTags", tags)).unwrap(),
            Value::list(["b", "a", "c"].map(Value::from))
        );
    }

    #[test]
    fn test_unique_items_fresh_slot_for_literal() {
        let call = with_unique_items_only(input::value(numbers(&[2.0, 2.0, 1.0]))).unwrap();
        assert!(call.remap().is_empty());

        let composite = CompositeBuilder::new("unique")
            .step(call)
            .step(expose_dependency("#uniqueItems"))
            .build()
            .unwrap();
        assert_eq!(composite.invoke(&Bindings::new()).unwrap(), numbers(&[2.0, 1.0]));
    }
}
