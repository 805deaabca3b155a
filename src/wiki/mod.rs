//! Wiki entity kinds, declared entirely through the composite engine.
//!
//! ```text
//!   Album ──trackSections──► Track ◄──featuredTracks── Flash
//!     │ groups   │ artTags     │ artTags, referencedTracks
//!     ▼          ▼             ▼
//!   Group      ArtTag        Track
//!
//!   artistContribs (Album, Track) ──who──► Artist
//! ```
//!
//! Forward references are stored as `"<type>:<directory>"` strings and
//! resolved on read; reverse lists (`Track.album`, `Group.albums`, ...)
//! scan the matching wiki data array.

mod album;
mod art_tag;
mod artist;
mod contrib;
mod flash;
mod group;
mod track;

use std::sync::Arc;

use crate::{
    composite::{
        ConfigurationError, Mode, Validator, input,
        primitives::{
            NotFoundMode, expose_dependency, expose_update_value_or_continue,
            with_directory_from_name, with_resolved_reference_list,
        },
    },
    thing::{ThingKind, ThingKindBuilder, Update},
};

// ============================================================================
// Shared property shapes
// ============================================================================

/// Kind with `name` and a `directory` that defaults to the slugged name.
fn named(name: &'static str, reference_type: &'static str) -> ThingKindBuilder {
    ThingKindBuilder::new(name, reference_type)
        .field("name", Update::new(Validator::ContentString))
        .updatable("directory", Update::new(Validator::Directory), |c| {
            c.step(expose_update_value_or_continue(Mode::Null))
                .step(with_directory_from_name("name"))
                .step(expose_dependency("#directory"))
        })
}

/// Updatable reference list, resolved against `data` on read.
fn resolved_list(
    builder: ThingKindBuilder,
    property: &str,
    data: &'static str,
    reference_type: &'static str,
) -> ThingKindBuilder {
    builder.updatable(
        property,
        Update::new(Validator::array_of(Validator::Reference(reference_type))),
        |c| {
            c.step(with_resolved_reference_list(
                input::update_value(),
                data,
                reference_type,
                NotFoundMode::Filter,
            ))
            .step(expose_dependency("#resolvedReferenceList"))
        },
    )
}

// ============================================================================
// Registry
// ============================================================================

/// Every entity kind of the wiki.
#[derive(Debug)]
pub struct Kinds {
    pub album: Arc<ThingKind>,
    pub track: Arc<ThingKind>,
    pub artist: Arc<ThingKind>,
    pub group: Arc<ThingKind>,
    pub art_tag: Arc<ThingKind>,
    pub flash: Arc<ThingKind>,
}

impl Kinds {
    /// Compile every kind, reporting the problems of all of them together.
    pub fn build() -> Result<Self, ConfigurationError> {
        let mut problems = Vec::new();
        let mut take = |result: Result<Arc<ThingKind>, ConfigurationError>| match result {
            Ok(kind) => Some(kind),
            Err(err) => {
                problems.extend(err.problems);
                None
            }
        };

        let album = take(album::kind());
        let track = take(track::kind());
        let artist = take(artist::kind());
        let group = take(group::kind());
        let art_tag = take(art_tag::kind());
        let flash = take(flash::kind());

        match (album, track, artist, group, art_tag, flash) {
            (Some(album), Some(track), Some(artist), Some(group), Some(art_tag), Some(flash)) => {
                Ok(Self { album, track, artist, group, art_tag, flash })
            }
            _ => Err(ConfigurationError { problems }),
        }
    }

    /// All kinds, in data loading order.
    pub fn all(&self) -> [&Arc<ThingKind>; 6] {
        [&self.album, &self.track, &self.artist, &self.group, &self.art_tag, &self.flash]
    }

    /// Kind by reference type, which doubles as its data table name.
    pub fn by_reference_type(&self, reference_type: &str) -> Option<&Arc<ThingKind>> {
        self.all().into_iter().find(|kind| kind.reference_type() == reference_type)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        composite::Value,
        thing::{InvalidationPolicy, Thing, ThingRef, WikiData},
    };

    pub fn refs(refs: &[&str]) -> Value {
        Value::list(refs.iter().map(|r| Value::from(*r)))
    }

    pub fn contribs(artists: &[&str]) -> Value {
        Value::list(artists.iter().map(|who| Value::record([("who", Value::from(*who))])))
    }

    /// Things created per kind, linked into one wiki on demand.
    pub struct Fixture {
        kinds: Kinds,
        pub wiki: Arc<WikiData>,
        arrays: BTreeMap<String, Vec<ThingRef>>,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self::with_policy(InvalidationPolicy::Automatic)
        }

        pub fn with_policy(policy: InvalidationPolicy) -> Self {
            Self {
                kinds: Kinds::build().unwrap(),
                wiki: WikiData::new(policy),
                arrays: BTreeMap::new(),
            }
        }

        fn make(&mut self, kind: Arc<ThingKind>, directory: &str) -> ThingRef {
            let thing = Thing::new(&kind);
            thing.set("directory", directory).unwrap();
            self.arrays.entry(kind.data_name().to_owned()).or_default().push(Arc::clone(&thing));
            thing
        }

        pub fn track(&mut self, directory: &str, duration: f64) -> ThingRef {
            let track = self.make(Arc::clone(&self.kinds.track), directory);
            track.set("duration", duration).unwrap();
            track
        }

        pub fn album(&mut self, directory: &str) -> ThingRef {
            self.make(Arc::clone(&self.kinds.album), directory)
        }

        pub fn album_with_tracks(&mut self, directory: &str, tracks: &[&str]) -> ThingRef {
            let album = self.album(directory);
            album.set("trackSections", Value::list([Value::record([("tracks", refs(tracks))])])).unwrap();
            album
        }

        pub fn artist(&mut self, directory: &str) -> ThingRef {
            self.make(Arc::clone(&self.kinds.artist), directory)
        }

        pub fn group(&mut self, directory: &str) -> ThingRef {
            self.make(Arc::clone(&self.kinds.group), directory)
        }

        pub fn art_tag(&mut self, directory: &str) -> ThingRef {
            self.make(Arc::clone(&self.kinds.art_tag), directory)
        }

        pub fn flash(&mut self, directory: &str) -> ThingRef {
            self.make(Arc::clone(&self.kinds.flash), directory)
        }

        /// Link every array created so far.
        pub fn link(&self) {
            for (name, things) in &self.arrays {
                self.wiki.link(name.as_str(), things.iter().cloned());
            }
        }
    }

    #[test]
    fn test_all_kinds_compile() {
        let kinds = Kinds::build().unwrap();
        assert_eq!(kinds.by_reference_type("artTag").map(|k| k.name()), Some("ArtTag"));
        assert_eq!(kinds.by_reference_type("flash").map(|k| k.data_name()), Some("flashData"));
        assert!(kinds.by_reference_type("page").is_none());
    }

    #[test]
    fn test_directory_defaults_to_slugged_name() {
        let kinds = Kinds::build().unwrap();
        let album = Thing::new(&kinds.album);
        album.set("name", "Homestuck Vol. 5").unwrap();
        assert_eq!(album.get("directory").unwrap(), Value::from("homestuck-vol-5"));
        album.set("directory", "vol5").unwrap();
        assert_eq!(album.get("directory").unwrap(), Value::from("vol5"));
    }
}
