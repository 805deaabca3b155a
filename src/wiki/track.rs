//! Track: falls back to its album for color, date and credits.

use std::sync::Arc;

use super::{contrib, named, resolved_list};
use crate::{
    composite::{
        ConfigurationError, Mode, StepBuilder, Validator, Value, input,
        primitives::{
            exit_without_dependency, expose_dependency, expose_dependency_or_continue,
            expose_update_value_or_continue, with_property_from_object, with_reverse_reference_list,
        },
    },
    thing::{ThingKind, ThingKindBuilder, Update},
};

/// Own update value if set, otherwise the album's `property`.
fn inherited(builder: ThingKindBuilder, property: &'static str, validator: Validator) -> ThingKindBuilder {
    builder.updatable(property, Update::new(validator), |c| {
        c.step(expose_update_value_or_continue(Mode::Null))
            .step(with_property_from_object("album", property))
            .step(expose_dependency("#value"))
    })
}

pub(super) fn kind() -> Result<Arc<ThingKind>, ConfigurationError> {
    let builder = named("Track", "track")
        .wiki_data("albumData")
        .wiki_data("trackData")
        .wiki_data("artistData")
        .wiki_data("artTagData")
        .wiki_data("flashData")
        .field("duration", Update::new(Validator::Duration))
        .computed("album", |c| {
            c.step(with_reverse_reference_list("albumData", "tracks"))
                .step(
                    StepBuilder::new("first album")
                        .dependency("#reverseReferenceList")
                        .expose(|view| {
                            let albums = view.get("#reverseReferenceList")?;
                            Ok(albums.as_list().and_then(<[Value]>::first).cloned().unwrap_or_default())
                        })
                        .build(),
                )
        })
        .updatable("artistContribs", Update::new(contrib::contribs_validator()), |c| {
            c.step(contrib::with_resolved_contribs(input::update_value(), "artistData"))
                .step(expose_dependency_or_continue("#resolvedContribs", Mode::Empty))
                .step(exit_without_dependency("album", Value::empty_list(), Mode::Null))
                .step(with_property_from_object("album", "artistContribs"))
                .step(expose_dependency("#value"))
        })
        .computed("referencedByTracks", |c| {
            c.step(with_reverse_reference_list("trackData", "referencedTracks"))
                .step(expose_dependency("#reverseReferenceList"))
        })
        .computed("featuredInFlashes", |c| {
            c.step(with_reverse_reference_list("flashData", "featuredTracks"))
                .step(expose_dependency("#reverseReferenceList"))
        });

    let builder = inherited(builder, "color", Validator::Color);
    let builder = inherited(builder, "date", Validator::Date);
    let builder = resolved_list(builder, "referencedTracks", "trackData", "track");
    resolved_list(builder, "artTags", "artTagData", "artTag").build()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::super::tests::{Fixture, contribs, refs};
    use crate::composite::Value;

    #[test]
    fn test_album_is_reverse_of_sections() {
        let mut fx = Fixture::new();
        let track = fx.track("t1", 60.0);
        let orphan = fx.track("t2", 60.0);
        let album = fx.album_with_tracks("a", &["t1"]);
        fx.link();

        assert_eq!(track.get("album").unwrap(), Value::Thing(album));
        assert_eq!(orphan.get("album").unwrap(), Value::Null);
    }

    #[test]
    fn test_color_and_date_fall_back_to_album() {
        let mut fx = Fixture::new();
        let plain = fx.track("plain", 60.0);
        let custom = fx.track("custom", 60.0);
        let album = fx.album_with_tracks("a", &["plain", "custom"]);
        album.set("color", "#ff0000").unwrap();
        album.set("date", NaiveDate::from_ymd_opt(2009, 4, 13).unwrap()).unwrap();
        custom.set("color", "#00ff00").unwrap();
        fx.link();

        assert_eq!(plain.get("color").unwrap(), Value::from("#ff0000"));
        assert_eq!(custom.get("color").unwrap(), Value::from("#00ff00"));
        assert_eq!(custom.get("date").unwrap(), album.get("date").unwrap());

        let loose = fx.track("loose", 60.0);
        assert_eq!(loose.get("color").unwrap(), Value::Null);
    }

    #[test]
    fn test_credits_fall_back_to_album() {
        let mut fx = Fixture::new();
        let composer = fx.artist("composer");
        let guest = fx.artist("guest");
        let plain = fx.track("plain", 60.0);
        let featured = fx.track("featured", 60.0);
        let album = fx.album_with_tracks("a", &["plain", "featured"]);
        album.set("artistContribs", contribs(&["artist:composer"])).unwrap();
        featured.set("artistContribs", contribs(&["guest"])).unwrap();
        fx.link();

        let who = |track: &crate::thing::ThingRef| -> Vec<Value> {
            let contribs = track.get("artistContribs").unwrap();
            contribs
                .as_list()
                .unwrap()
                .iter()
                .map(|c| c.as_record().unwrap()["who"].clone())
                .collect()
        };
        assert_eq!(who(&plain), vec![Value::Thing(composer)]);
        assert_eq!(who(&featured), vec![Value::Thing(guest)]);
    }

    #[test]
    fn test_references_and_reverse_references() {
        let mut fx = Fixture::new();
        let original = fx.track("original", 60.0);
        let remix = fx.track("remix", 60.0);
        remix.set("referencedTracks", refs(&["track:original", "track:gone"])).unwrap();
        let flash = fx.flash("f1");
        flash.set("featuredTracks", refs(&["remix"])).unwrap();
        fx.link();

        assert_eq!(remix.get("referencedTracks").unwrap(), Value::list([Value::Thing(original.clone())]));
        assert_eq!(original.get("referencedByTracks").unwrap(), Value::list([Value::Thing(remix.clone())]));
        assert_eq!(remix.get("featuredInFlashes").unwrap(), Value::list([Value::Thing(flash)]));
        assert_eq!(original.get("featuredInFlashes").unwrap(), Value::empty_list());
    }
}
