//! Entities with lazily computed, cached properties.
//!
//! A [`Thing`] stores validated field values and caches computed ones.
//! Every cache entry carries the generation stamp it was computed under:
//!
//! ```text
//! stamp = (thing generation, wiki generation)
//!
//! get(p):  cache[p].stamp == current stamp ? cached : recompute
//! decache: bump thing generation        (one thing)
//!          bump wiki generation         (everything linked to the wiki)
//! set(p):  Automatic policy bumps both; Manual leaves stale values in place
//! ```

mod kind;
mod wiki_data;

use std::{
    cell::RefCell,
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use compact_str::CompactString;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::composite::{CompositeError, DependencySource, Result, Value};

pub use kind::{Expose, Property, ThingKind, ThingKindBuilder, Update};
pub use wiki_data::{InvalidationPolicy, WikiData};

/// Shared handle to a thing.
pub type ThingRef = Arc<Thing>;

/// Generation stamp of a cache entry: (thing, wiki).
type Stamp = (u64, u64);

struct CacheEntry {
    stamp: Stamp,
    value: Value,
}

/// One entity: an album, a track, an artist, ...
pub struct Thing {
    kind: Arc<ThingKind>,
    fields: RwLock<FxHashMap<CompactString, Value>>,
    cache: RwLock<FxHashMap<CompactString, CacheEntry>>,
    generation: AtomicU64,
    wiki: RwLock<Weak<WikiData>>,
}

impl fmt::Debug for Thing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thing")
            .field("kind", &self.kind.name())
            .field("fields", &self.fields.read().len())
            .finish_non_exhaustive()
    }
}

impl Thing {
    pub fn new(kind: &Arc<ThingKind>) -> ThingRef {
        Arc::new(Self {
            kind: Arc::clone(kind),
            fields: RwLock::default(),
            cache: RwLock::default(),
            generation: AtomicU64::new(0),
            wiki: RwLock::new(Weak::new()),
        })
    }

    #[inline]
    pub fn kind(&self) -> &ThingKind {
        &self.kind
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn wiki(&self) -> Option<Arc<WikiData>> {
        self.wiki.read().upgrade()
    }

    fn stamp(&self) -> Stamp {
        (self.generation(), self.wiki().map_or(0, |wiki| wiki.generation()))
    }

    fn property(&self, name: &str) -> Result<&Property> {
        self.kind.property(name).ok_or_else(|| CompositeError::UnknownProperty {
            kind: self.kind.name(),
            property: name.into(),
        })
    }

    /// Read a property.
    ///
    /// Stored fields return their value (or default). Computed properties
    /// are served from cache while the stamp matches, otherwise the
    /// composite runs against this thing's current state.
    pub fn get(self: &Arc<Self>, name: &str) -> Result<Value> {
        let property = self.property(name)?;
        let composite = match property.expose() {
            Expose::Stored => return Ok(self.update_value(name)),
            Expose::Computed(composite) => composite,
        };

        let stamp = self.stamp();
        if let Some(entry) = self.cache.read().get(name)
            && entry.stamp == stamp
        {
            return Ok(entry.value.clone());
        }

        let _guard = EvaluationGuard::enter(self, property)?;
        let source = ThingSource { thing: self, property, wiki: self.wiki() };
        let value = composite.invoke(&source)?;

        self.cache
            .write()
            .insert(name.into(), CacheEntry { stamp, value: value.clone() });
        Ok(value)
    }

    /// Stored value of an updatable property, or its default.
    pub fn update_value(&self, name: &str) -> Value {
        if let Some(value) = self.fields.read().get(name) {
            return value.clone();
        }
        self.kind
            .property(name)
            .and_then(Property::update)
            .and_then(|update| update.default.clone())
            .unwrap_or_default()
    }

    /// Assign a field, validating it against the property's update
    /// descriptor. Null clears the field.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let property = self.property(name)?;
        let Some(update) = property.update() else {
            return Err(CompositeError::NotUpdatable {
                kind: self.kind.name(),
                property: name.into(),
            });
        };
        if !value.is_null()
            && let Err(failure) = update.validator.check(&value)
        {
            return Err(CompositeError::FieldType {
                kind: self.kind.name(),
                property: name.into(),
                failure,
            });
        }

        {
            let mut fields = self.fields.write();
            if value.is_null() {
                fields.remove(name);
            } else {
                fields.insert(name.into(), value);
            }
        }

        let wiki = self.wiki();
        let policy = wiki.as_ref().map_or_else(InvalidationPolicy::default, |w| w.policy());
        if policy == InvalidationPolicy::Automatic {
            self.generation.fetch_add(1, Ordering::AcqRel);
            if let Some(wiki) = wiki {
                wiki.touch();
            }
        }
        Ok(())
    }

    /// Drop every cached computed value of this thing.
    pub fn decache(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.write().clear();
    }

    pub(crate) fn clear_cache(&self) {
        self.cache.write().clear();
    }

    pub(crate) fn link(&self, wiki: &Arc<WikiData>) {
        *self.wiki.write() = Arc::downgrade(wiki);
    }

    /// Directory, if this kind has one and it is set or computable.
    pub fn directory(self: &Arc<Self>) -> Result<Option<CompactString>> {
        if self.kind.property("directory").is_none() {
            return Ok(None);
        }
        Ok(self.get("directory")?.as_str().map(CompactString::from))
    }

    /// `<type>:<directory>` reference string.
    ///
    /// Fails when the directory can't be computed or the kind has none.
    pub fn reference(self: &Arc<Self>) -> Result<String> {
        let Some(directory) = self.directory()? else {
            return Err(CompositeError::NoDirectory { kind: self.kind.name() });
        };
        Ok(format!("{}:{directory}", self.kind.reference_type()))
    }
}

/// Invalidate every cached value of `things`.
pub fn decache<'a>(things: impl IntoIterator<Item = &'a ThingRef>) {
    for thing in things {
        thing.decache();
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Pool source for one property computation.
struct ThingSource<'a> {
    thing: &'a ThingRef,
    property: &'a Property,
    wiki: Option<Arc<WikiData>>,
}

impl DependencySource for ThingSource<'_> {
    fn dependency(&self, name: &str) -> Result<Value> {
        let kind = self.thing.kind();
        if kind.property(name).is_some() {
            return self.thing.get(name);
        }
        if kind.wiki_data().iter().any(|data| data == name) {
            return Ok(self.wiki.as_ref().and_then(|wiki| wiki.data(name)).unwrap_or_default());
        }
        Ok(Value::Null)
    }

    fn myself(&self) -> Value {
        Value::Thing(Arc::clone(self.thing))
    }

    fn update_value(&self) -> Value {
        self.thing.update_value(self.property.name())
    }

    fn this_property(&self) -> Option<&str> {
        Some(self.property.name())
    }
}

thread_local! {
    /// Properties being computed on this thread, innermost last.
    static EVALUATING: RefCell<Vec<(usize, CompactString)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a property as being computed for the guard's lifetime.
struct EvaluationGuard;

impl EvaluationGuard {
    fn enter(thing: &ThingRef, property: &Property) -> Result<Self> {
        let key = (Arc::as_ptr(thing) as usize, CompactString::from(property.name()));
        EVALUATING.with_borrow_mut(|stack| {
            if stack.contains(&key) {
                return Err(CompositeError::CyclicDependency {
                    kind: thing.kind().name(),
                    property: key.1.clone(),
                });
            }
            stack.push(key);
            Ok(Self)
        })
    }
}

impl Drop for EvaluationGuard {
    fn drop(&mut self) {
        EVALUATING.with_borrow_mut(|stack| {
            stack.pop();
        });
    }
}
