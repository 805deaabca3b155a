//! Print resolved thing properties as JSON.

use crate::{
    config::WikiConfig,
    data::load_wiki,
    thing::ThingRef,
    wiki::Kinds,
};
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value as Json};

/// Load the wiki and print `reference` (or one of its properties).
pub fn dump_thing(config: &WikiConfig, reference: &str, property: Option<&str>) -> Result<()> {
    let kinds = Kinds::build()?;
    let wiki = load_wiki(&config.data.directory, &kinds, config.cache.invalidation)?;

    let Some(thing) = wiki.find(reference)? else {
        bail!("no thing matches `{reference}`");
    };
    let json = render(&thing, property)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// Every property in declaration order, or just `property`.
fn render(thing: &ThingRef, property: Option<&str>) -> Result<Json> {
    if let Some(property) = property {
        let value = thing.get(property)?;
        return Ok(serde_json::to_value(value)?);
    }

    let reference = thing.reference()?;
    let mut object = Map::new();
    for property in thing.kind().properties() {
        let value = thing
            .get(property.name())
            .with_context(|| format!("failed to compute {reference}.{}", property.name()))?;
        object.insert(property.name().to_owned(), serde_json::to_value(value)?);
    }
    Ok(Json::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        composite::Value,
        thing::{InvalidationPolicy, Thing, WikiData},
    };
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_render_thing() {
        let kinds = Kinds::build().unwrap();
        let track = Thing::new(&kinds.track);
        track.set("name", "Showtime").unwrap();
        track.set("duration", 90.0).unwrap();
        let album = Thing::new(&kinds.album);
        album.set("name", "Vol 1").unwrap();
        album.set("color", "#abc").unwrap();
        album
            .set("trackSections", Value::list([Value::record([("tracks", Value::list([Value::from("showtime")]))])]))
            .unwrap();

        let wiki = WikiData::new(InvalidationPolicy::Automatic);
        wiki.link("albumData", [Arc::clone(&album)]);
        wiki.link("trackData", [Arc::clone(&track)]);

        assert_eq!(render(&track, Some("album")).unwrap(), json!("album:vol-1"));
        assert_eq!(render(&album, Some("tracks")).unwrap(), json!(["track:showtime"]));

        let all = render(&track, None).unwrap();
        assert_eq!(all["name"], json!("Showtime"));
        assert_eq!(all["directory"], json!("showtime"));
        assert_eq!(all["duration"], json!(90));
        assert_eq!(all["color"], json!("#abc"));
        assert_eq!(all["featuredInFlashes"], json!([]));
    }

    #[test]
    fn test_render_unknown_property() {
        let kinds = Kinds::build().unwrap();
        let track = Thing::new(&kinds.track);
        let err = render(&track, Some("lyrics")).unwrap_err();
        assert!(err.to_string().contains("lyrics"));
    }
}
