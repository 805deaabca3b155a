use std::sync::Arc;

use super::{named, resolved_list};
use crate::{
    composite::{ConfigurationError, Validator},
    thing::{ThingKind, Update},
};

pub(super) fn kind() -> Result<Arc<ThingKind>, ConfigurationError> {
    let builder = named("Flash", "flash")
        .wiki_data("trackData")
        .field("page", Update::new(Validator::Directory))
        .field("date", Update::new(Validator::Date));
    resolved_list(builder, "featuredTracks", "trackData", "track").build()
}
