//! Album: track sections, credits, groups and art tags.

use std::sync::Arc;

use super::{contrib, named, resolved_list};
use crate::{
    composite::{
        ConfigurationError, Mode, RecordField, Validator, Value, input,
        primitives::{
            NotFoundMode, exit_without_dependency, expose_dependency, with_flattened_list,
            with_property_from_list, with_resolved_reference_list, with_sum,
        },
    },
    thing::{ThingKind, Update},
};

fn track_sections_validator() -> Validator {
    Validator::array_of(Validator::record([
        RecordField::optional("name", Validator::ContentString),
        RecordField::optional("tracks", Validator::array_of(Validator::Reference("track"))),
    ]))
}

pub(super) fn kind() -> Result<Arc<ThingKind>, ConfigurationError> {
    let builder = named("Album", "album")
        .wiki_data("trackData")
        .wiki_data("artistData")
        .wiki_data("groupData")
        .wiki_data("artTagData")
        .field("color", Update::new(Validator::Color))
        .field("date", Update::new(Validator::Date))
        .field("trackSections", Update::new(track_sections_validator()))
        .updatable("artistContribs", Update::new(contrib::contribs_validator()), |c| {
            c.step(contrib::with_resolved_contribs(input::update_value(), "artistData"))
                .step(expose_dependency("#resolvedContribs"))
        })
        // Section order, then track order within each section
        .computed("tracks", |c| {
            c.step(exit_without_dependency("trackSections", Value::empty_list(), Mode::Empty))
                .step(with_property_from_list("trackSections", "tracks"))
                .step(with_flattened_list("#values"))
                .step(with_resolved_reference_list(
                    "#flattenedList",
                    "trackData",
                    "track",
                    NotFoundMode::Filter,
                ))
                .step(expose_dependency("#resolvedReferenceList"))
        })
        .computed("duration", |c| {
            c.step(with_property_from_list("tracks", "duration"))
                .step(with_sum("#values"))
                .step(expose_dependency("#sum"))
        });

    let builder = resolved_list(builder, "groups", "groupData", "group");
    resolved_list(builder, "artTags", "artTagData", "artTag").build()
}
