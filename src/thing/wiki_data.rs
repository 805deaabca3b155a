//! Shared container of wiki data arrays (`albumData`, `trackData`, ...).

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{Thing, ThingRef};
use crate::composite::{DepName, Result, Value, primitives::find_reference};

/// When cached computed values are invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationPolicy {
    /// Only explicit decache calls; stale values are served until then
    Manual,
    /// Field sets and relinks also invalidate
    #[default]
    Automatic,
}

/// Named arrays of things, linked so composites can read them.
#[derive(Debug)]
pub struct WikiData {
    arrays: RwLock<FxHashMap<DepName, Value>>,
    generation: AtomicU64,
    policy: InvalidationPolicy,
}

impl WikiData {
    pub fn new(policy: InvalidationPolicy) -> Arc<Self> {
        Arc::new(Self {
            arrays: RwLock::default(),
            generation: AtomicU64::new(0),
            policy,
        })
    }

    #[inline]
    pub const fn policy(&self) -> InvalidationPolicy {
        self.policy
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn touch(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Bind `things` under `name` and link each of them back to this wiki.
    ///
    /// Relinking replaces the previous array. Under the manual policy the
    /// caller must decache afterwards.
    pub fn link(self: &Arc<Self>, name: impl Into<DepName>, things: impl IntoIterator<Item = ThingRef>) {
        let things: Vec<Value> = things
            .into_iter()
            .map(|thing| {
                thing.link(self);
                Value::Thing(thing)
            })
            .collect();
        self.arrays.write().insert(name.into(), Value::from(things));

        if self.policy == InvalidationPolicy::Automatic {
            self.touch();
        }
    }

    /// The array bound under `name`, as a list value.
    pub fn data(&self, name: &str) -> Option<Value> {
        self.arrays.read().get(name).cloned()
    }

    pub fn things(&self, name: &str) -> Vec<ThingRef> {
        self.data(name)
            .as_ref()
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_thing).cloned().collect())
            .unwrap_or_default()
    }

    /// Every linked thing, arrays in name order.
    pub fn all_things(&self) -> Vec<ThingRef> {
        let arrays = self.arrays.read();
        let mut names: Vec<&DepName> = arrays.keys().collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|name| arrays[name].as_list())
            .flatten()
            .filter_map(Value::as_thing)
            .cloned()
            .collect()
    }

    /// Find a thing by `<type>:<directory>` reference across all arrays.
    pub fn find(&self, reference: &str) -> Result<Option<ThingRef>> {
        let Some((reference_type, _)) = reference.split_once(':') else {
            return Ok(None);
        };
        let arrays: Vec<Value> = self.arrays.read().values().cloned().collect();
        for array in &arrays {
            let items = array.as_list().unwrap_or_default();
            let matches_type = items
                .first()
                .and_then(Value::as_thing)
                .is_some_and(|thing| thing.kind().reference_type() == reference_type);
            if matches_type && let Some(thing) = find_reference(items, reference, reference_type)? {
                return Ok(Some(thing));
            }
        }
        Ok(None)
    }

    /// Invalidate every cached value of every linked thing.
    pub fn decache(&self) {
        self.touch();
        super::decache(&self.all_things());
    }
}

impl Drop for WikiData {
    /// Cached values hold strong references between things; clearing
    /// them lets the things drop with the wiki.
    fn drop(&mut self) {
        for array in self.arrays.get_mut().values() {
            for thing in array.as_list().unwrap_or_default().iter().filter_map(Value::as_thing) {
                Thing::clear_cache(thing);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        composite::{
            Mode, OutputsExt, Validator,
            primitives::{
                NotFoundMode, exit_without_dependency, expose_dependency, with_resolved_reference,
                with_resolved_reference_list, with_reverse_reference_list,
            },
        },
        thing::{ThingKind, ThingKindBuilder, Update},
    };

    fn kinds() -> (Arc<ThingKind>, Arc<ThingKind>) {
        let track = ThingKindBuilder::new("Track", "track")
            .wiki_data("albumData")
            .field("directory", Update::new(Validator::Directory))
            .computed("album", |c| {
                c.step(with_reverse_reference_list("albumData", "tracks"))
                    .step(expose_dependency("#reverseReferenceList"))
            })
            .build()
            .unwrap();
        let album = ThingKindBuilder::new("Album", "album")
            .wiki_data("trackData")
            .field("directory", Update::new(Validator::Directory))
            .field("trackRefs", Update::new(Validator::array_of(Validator::Reference("track"))))
            .field("coverTrack", Update::new(Validator::Reference("track")))
            .computed("tracks", |c| {
                c.step(exit_without_dependency("trackRefs", Value::empty_list(), Mode::Empty))
                    .step(with_resolved_reference_list("trackRefs", "trackData", "track", NotFoundMode::Filter))
                    .step(expose_dependency("#resolvedReferenceList"))
            })
            .computed("cover", |c| {
                c.step(with_resolved_reference("coverTrack", "trackData", "track").outputs([("#resolvedReference", "#cover")]))
                    .step(expose_dependency("#cover"))
            })
            .build()
            .unwrap();
        (track, album)
    }

    fn thing(kind: &Arc<ThingKind>, directory: &str) -> ThingRef {
        let thing = Thing::new(kind);
        thing.set("directory", directory).unwrap();
        thing
    }

    #[test]
    fn test_references_resolve_across_arrays() {
        let (track_kind, album_kind) = kinds();
        let wiki = WikiData::new(InvalidationPolicy::Automatic);

        let a = thing(&track_kind, "a");
        let b = thing(&track_kind, "b");
        let album = thing(&album_kind, "first");
        album.set("trackRefs", Value::list(["track:b", "a", "track:missing"].map(Value::from))).unwrap();
        album.set("coverTrack", "track:a").unwrap();

        wiki.link("trackData", [Arc::clone(&a), Arc::clone(&b)]);
        wiki.link("albumData", [Arc::clone(&album)]);

        assert_eq!(
            album.get("tracks").unwrap(),
            Value::list([Value::Thing(Arc::clone(&b)), Value::Thing(Arc::clone(&a))])
        );
        assert_eq!(album.get("cover").unwrap(), Value::Thing(Arc::clone(&a)));
        assert_eq!(a.get("album").unwrap(), Value::list([Value::Thing(Arc::clone(&album))]));

        let found = wiki.find("album:first").unwrap();
        assert!(found.is_some_and(|found| Arc::ptr_eq(&found, &album)));
        assert!(wiki.find("track:nope").unwrap().is_none());
        assert_eq!(wiki.all_things().len(), 3);
    }

    #[test]
    fn test_unlinked_data_reads_as_empty() {
        let (_, album_kind) = kinds();
        let album = thing(&album_kind, "lonely");
        album.set("trackRefs", Value::list([Value::from("track:a")])).unwrap();
        assert_eq!(album.get("tracks").unwrap(), Value::empty_list());
    }

    #[test]
    fn test_wiki_decache_recomputes_after_relink() {
        let (track_kind, album_kind) = kinds();
        let wiki = WikiData::new(InvalidationPolicy::Manual);
        let a = thing(&track_kind, "a");
        let album = thing(&album_kind, "first");
        album.set("trackRefs", Value::list([Value::from("a")])).unwrap();

        wiki.link("trackData", []);
        assert_eq!(album.get("tracks").unwrap(), Value::empty_list());

        wiki.link("trackData", [Arc::clone(&a)]);
        assert_eq!(album.get("tracks").unwrap(), Value::empty_list());

        wiki.decache();
        assert_eq!(album.get("tracks").unwrap(), Value::list([Value::Thing(a)]));
    }
}
