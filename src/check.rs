//! Whole-wiki check.
//!
//! ```text
//! check_wiki()
//!     │
//!     ├── Kinds::build()   ──► every composite checked, all problems at once
//!     │
//!     ├── load_wiki()      ──► every field validated, all failures at once
//!     │
//!     └── evaluate_all()   ──► every property of every thing read (rayon)
//! ```

use crate::{
    composite::set_trace,
    config::WikiConfig,
    data::load_wiki,
    log,
    logger::ProgressBars,
    thing::{ThingRef, WikiData},
    wiki::Kinds,
};
use anyhow::{Result, bail};
use rayon::prelude::*;

/// Compile, load and evaluate the whole wiki.
pub fn check_wiki(config: &WikiConfig) -> Result<()> {
    set_trace(config.check.trace);

    let kinds = Kinds::build()?;
    log!("check"; "compiled {} kinds", kinds.all().len());

    let wiki = load_wiki(&config.data.directory, &kinds, config.cache.invalidation)?;
    let failures = evaluate_all(&wiki, &kinds, config.check.parallel);

    if failures.is_empty() {
        log!("check"; "all properties of {} things evaluated", wiki.all_things().len());
        return Ok(());
    }

    for failure in &failures {
        log!("error"; "{failure}");
    }
    bail!("{} properties failed to evaluate", failures.len())
}

/// Read every property of every thing, returning one line per failure.
pub fn evaluate_all(wiki: &WikiData, kinds: &Kinds, parallel: bool) -> Vec<String> {
    let things = wiki.all_things();

    let counts: Vec<(&'static str, usize)> = kinds
        .all()
        .into_iter()
        .map(|kind| (kind.name(), wiki.things(kind.data_name()).len()))
        .collect();
    let progress = ProgressBars::for_kinds(&counts);

    let evaluate = |thing: &ThingRef| -> Vec<String> {
        let failures = evaluate_thing(thing);
        if let Some(progress) = &progress {
            progress.tick(thing.kind().name());
        }
        failures
    };

    let failures = if parallel {
        things.par_iter().flat_map_iter(evaluate).collect()
    } else {
        things.iter().flat_map(evaluate).collect()
    };

    if let Some(progress) = progress {
        progress.finish();
    }
    failures
}

fn evaluate_thing(thing: &ThingRef) -> Vec<String> {
    let mut failures = Vec::new();
    let label = thing.reference().unwrap_or_else(|err| {
        failures.push(format!("{}: {err}", thing.kind().name()));
        thing.kind().name().to_owned()
    });

    for property in thing.kind().properties() {
        if let Err(err) = thing.get(property.name()) {
            failures.push(format!("{label}.{}: {err}", property.name()));
        }
    }
    failures
}
