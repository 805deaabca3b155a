//! Artist: everything credited to them.

use std::sync::Arc;

use super::{contrib::with_reverse_contribution_list, named};
use crate::{
    composite::{
        ConfigurationError,
        primitives::{expose_dependency, with_property_from_list, with_sum},
    },
    thing::ThingKind,
};

pub(super) fn kind() -> Result<Arc<ThingKind>, ConfigurationError> {
    named("Artist", "artist")
        .wiki_data("albumData")
        .wiki_data("trackData")
        .computed("tracksAsArtist", |c| {
            c.step(with_reverse_contribution_list("trackData", "artistContribs"))
                .step(expose_dependency("#reverseContributionList"))
        })
        .computed("albumsAsArtist", |c| {
            c.step(with_reverse_contribution_list("albumData", "artistContribs"))
                .step(expose_dependency("#reverseContributionList"))
        })
        .computed("totalDuration", |c| {
            c.step(with_property_from_list("tracksAsArtist", "duration"))
                .step(with_sum("#values"))
                .step(expose_dependency("#sum"))
        })
        .build()
}
