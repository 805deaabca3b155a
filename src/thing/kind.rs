//! Entity kinds: the property table shared by every thing of one kind.
//!
//! ```text
//! ThingKindBuilder::new("Album", "album")
//!     .wiki_data("trackData")                  // readable by composites
//!     .field("name", Update::new(...))         // stored, validated on set
//!     .computed("tracks", |c| c.step(...))     // composite, read-only
//!     .updatable("color", Update, |c| ...)     // composite over a stored value
//!     .build()?                                // checks every composite + cycles
//! ```

use std::{
    collections::VecDeque,
    sync::Arc,
};

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::composite::{
    Composite, CompositeBuilder, ConfigProblem, ConfigurationError, DepName, ProblemKind, Scope,
    Validator, Value,
};

/// Update descriptor: a stored, validated value.
#[derive(Debug, Clone)]
pub struct Update {
    pub validator: Validator,
    pub default: Option<Value>,
}

impl Update {
    pub const fn new(validator: Validator) -> Self {
        Self { validator, default: None }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// How a property's value is exposed.
#[derive(Debug, Clone)]
pub enum Expose {
    /// The stored update value (or its default)
    Stored,
    /// A composite over the thing's other properties
    Computed(Composite),
}

/// One property of a kind.
#[derive(Debug, Clone)]
pub struct Property {
    name: CompactString,
    update: Option<Update>,
    expose: Expose,
}

impl Property {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub const fn update(&self) -> Option<&Update> {
        self.update.as_ref()
    }

    #[inline]
    pub const fn expose(&self) -> &Expose {
        &self.expose
    }

    pub const fn composite(&self) -> Option<&Composite> {
        match &self.expose {
            Expose::Computed(composite) => Some(composite),
            Expose::Stored => None,
        }
    }
}

/// Property table of one entity kind.
#[derive(Debug)]
pub struct ThingKind {
    name: &'static str,
    reference_type: &'static str,
    data_name: DepName,
    wiki_data: Vec<DepName>,
    properties: Vec<Property>,
    index: FxHashMap<CompactString, usize>,
}

impl ThingKind {
    /// Display name, e.g. `Album`.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Reference prefix, e.g. `album` in `album:some-directory`.
    #[inline]
    pub const fn reference_type(&self) -> &'static str {
        self.reference_type
    }

    /// Name of the wiki data array holding things of this kind.
    #[inline]
    pub fn data_name(&self) -> &str {
        &self.data_name
    }

    /// Wiki data arrays composites of this kind may read.
    #[inline]
    pub fn wiki_data(&self) -> &[DepName] {
        &self.wiki_data
    }

    #[inline]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.index.get(name).map(|&index| &self.properties[index])
    }
}

// ============================================================================
// Builder
// ============================================================================

enum Pending {
    Stored,
    Computed(CompositeBuilder),
}

/// Builder for [`ThingKind`].
pub struct ThingKindBuilder {
    name: &'static str,
    reference_type: &'static str,
    data_name: DepName,
    wiki_data: Vec<DepName>,
    properties: Vec<(CompactString, Option<Update>, Pending)>,
}

impl ThingKindBuilder {
    /// `data_name` defaults to `<reference_type>Data`.
    pub fn new(name: &'static str, reference_type: &'static str) -> Self {
        Self {
            name,
            reference_type,
            data_name: compact_str::format_compact!("{reference_type}Data"),
            wiki_data: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Make a wiki data array readable by this kind's composites.
    pub fn wiki_data(mut self, name: impl Into<DepName>) -> Self {
        self.wiki_data.push(name.into());
        self
    }

    /// Stored, validated field.
    pub fn field(mut self, name: &str, update: Update) -> Self {
        self.properties.push((name.into(), Some(update), Pending::Stored));
        self
    }

    /// Read-only computed property.
    pub fn computed(mut self, name: &str, build: impl FnOnce(CompositeBuilder) -> CompositeBuilder) -> Self {
        let composite = build(CompositeBuilder::new(format!("{}.{name}", self.name)));
        self.properties.push((name.into(), None, Pending::Computed(composite)));
        self
    }

    /// Computed property that also stores a validated update value.
    pub fn updatable(
        mut self,
        name: &str,
        update: Update,
        build: impl FnOnce(CompositeBuilder) -> CompositeBuilder,
    ) -> Self {
        let composite = build(CompositeBuilder::new(format!("{}.{name}", self.name)));
        self.properties.push((name.into(), Some(update), Pending::Computed(composite)));
        self
    }

    /// Compile every composite against this kind's scope.
    ///
    /// Reports duplicate properties, composite problems and cycles between
    /// computed properties together.
    pub fn build(self) -> Result<Arc<ThingKind>, ConfigurationError> {
        let mut problems = Vec::new();

        let mut index = FxHashMap::default();
        for (i, (name, ..)) in self.properties.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                problems.push(ConfigProblem::new(
                    self.name,
                    ProblemKind::DuplicateProperty { property: name.clone() },
                ));
            }
        }

        let names: Vec<DepName> = self
            .properties
            .iter()
            .map(|(name, ..)| name.clone())
            .chain(self.wiki_data.iter().cloned())
            .collect();

        let mut properties = Vec::with_capacity(self.properties.len());
        for (name, update, pending) in self.properties {
            let expose = match pending {
                Pending::Stored => Expose::Stored,
                Pending::Computed(builder) => {
                    let scope = Scope::of(names.iter().cloned(), update.is_some());
                    match builder.build_in(&scope) {
                        Ok(composite) => Expose::Computed(composite),
                        Err(err) => {
                            problems.extend(err.problems);
                            continue;
                        }
                    }
                }
            };
            properties.push(Property { name, update, expose });
        }

        if problems.is_empty() {
            detect_cycles(self.name, &properties, &mut problems);
        }
        ConfigurationError::check(problems)?;

        Ok(Arc::new(ThingKind {
            name: self.name,
            reference_type: self.reference_type,
            data_name: self.data_name,
            wiki_data: self.wiki_data,
            properties,
            index,
        }))
    }
}

/// Kahn's algorithm over computed properties; whatever is left is cyclic.
fn detect_cycles(kind: &str, properties: &[Property], problems: &mut Vec<ConfigProblem>) {
    let computed: FxHashMap<&str, &Composite> = properties
        .iter()
        .filter_map(|p| p.composite().map(|c| (p.name(), c)))
        .collect();

    // edge: dependency -> dependent
    let mut in_degree: FxHashMap<&str, usize> = computed.keys().map(|&name| (name, 0)).collect();
    let mut dependents: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for (&name, composite) in &computed {
        for dependency in composite.dependencies() {
            if let Some((&dependency, _)) = computed.get_key_value(dependency.as_str()) {
                *in_degree.entry(name).or_insert(0) += 1;
                dependents.entry(dependency).or_default().push(name);
            }
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&name, _)| name)
        .collect();
    while let Some(name) = queue.pop_front() {
        for &dependent in dependents.get(name).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    let mut cyclic: Vec<CompactString> = in_degree
        .into_iter()
        .filter(|&(_, degree)| degree > 0)
        .map(|(name, _)| name.into())
        .collect();
    if !cyclic.is_empty() {
        cyclic.sort();
        problems.push(ConfigProblem::new(kind, ProblemKind::CyclicProperties { properties: cyclic }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::{
        StepBuilder,
        primitives::{expose_constant, expose_dependency},
        input,
    };

    #[test]
    fn test_duplicate_property() {
        let err = ThingKindBuilder::new("Album", "album")
            .field("name", Update::new(Validator::String))
            .field("name", Update::new(Validator::String))
            .build()
            .unwrap_err();
        assert!(err.has(|k| matches!(k, ProblemKind::DuplicateProperty { property } if property == "name")));
    }

    #[test]
    fn test_composites_checked_against_kind_scope() {
        let err = ThingKindBuilder::new("Album", "album")
            .field("name", Update::new(Validator::String))
            .computed("loud", |c| c.step(expose_dependency("nmae")))
            .computed("color", |c| c.step(expose_dependency(input::update_value())))
            .build()
            .unwrap_err();
        assert_eq!(err.problems.len(), 2);
        assert!(err.has(|k| matches!(k, ProblemKind::UnknownDependency { name } if name == "nmae")));
        assert!(err.has(|k| matches!(k, ProblemKind::UpdateValueWithoutUpdate)));
        assert!(err.problems.iter().any(|p| p.context.starts_with("Album.loud")));
    }

    #[test]
    fn test_wiki_data_is_in_scope() {
        let kind = ThingKindBuilder::new("Album", "album")
            .wiki_data("trackData")
            .computed("allTracks", |c| c.step(expose_dependency("trackData")))
            .build()
            .unwrap();
        assert_eq!(kind.data_name(), "albumData");
        assert_eq!(
            kind.property("allTracks").and_then(Property::composite).map(Composite::dependencies),
            Some(&[DepName::from("trackData")][..])
        );
    }

    #[test]
    fn test_cyclic_properties_rejected() {
        let err = ThingKindBuilder::new("Track", "track")
            .computed("a", |c| c.step(expose_dependency("b")))
            .computed("b", |c| c.step(expose_dependency("c")))
            .computed("c", |c| c.step(expose_dependency("a")))
            .computed("d", |c| c.step(expose_dependency("a")))
            .computed("e", |c| c.step(expose_constant(input::value(1.0))))
            .build()
            .unwrap_err();
        assert_eq!(err.problems.len(), 1);
        assert_eq!(
            err.problems[0].kind,
            ProblemKind::CyclicProperties { properties: vec!["a".into(), "b".into(), "c".into(), "d".into()] }
        );
    }

    #[test]
    fn test_acyclic_chain_builds() {
        let kind = ThingKindBuilder::new("Track", "track")
            .field("duration", Update::new(Validator::Duration))
            .computed("minutes", |c| {
                c.step(
                    StepBuilder::new("minutes")
                        .dependency("duration")
                        .expose(|view| {
                            Ok(Value::from(view.get("duration")?.as_number().map(|s| (s / 60.0).floor())))
                        })
                        .build(),
                )
            })
            .computed("label", |c| c.step(expose_dependency("minutes")))
            .build()
            .unwrap();
        assert_eq!(kind.properties().len(), 3);
        assert!(kind.property("minutes").is_some());
    }
}
