//! Art tag: things whose cover art carries it.

use std::sync::Arc;

use super::named;
use crate::{
    composite::{
        ConfigurationError, Continuation, OutputsExt, StepBuilder, Validator, Value,
        primitives::{expose_dependency, with_reverse_reference_list, with_unique_items_only},
    },
    thing::{ThingKind, Update},
};

pub(super) fn kind() -> Result<Arc<ThingKind>, ConfigurationError> {
    named("ArtTag", "artTag")
        .wiki_data("albumData")
        .wiki_data("trackData")
        .field("color", Update::new(Validator::Color))
        .computed("taggedInThings", |c| {
            c.step(
                with_reverse_reference_list("albumData", "artTags")
                    .outputs([("#reverseReferenceList", "#albums")]),
            )
            .step(
                with_reverse_reference_list("trackData", "artTags")
                    .outputs([("#reverseReferenceList", "#tracks")]),
            )
            .step(
                StepBuilder::new("albums then tracks")
                    .dependencies(["#albums", "#tracks"])
                    .output("#things")
                    .compute(|view| {
                        let albums = view.get("#albums")?.as_list().unwrap_or_default();
                        let tracks = view.get("#tracks")?.as_list().unwrap_or_default();
                        let things = Value::list(albums.iter().chain(tracks).cloned());
                        Ok(Continuation::proceed([("#things", things)]))
                    })
                    .build(),
            )
            .step(with_unique_items_only("#things"))
            .step(expose_dependency("#things"))
        })
        .build()
}
