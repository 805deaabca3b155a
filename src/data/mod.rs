//! Wiki data loading.
//!
//! ```text
//!   data/                          WikiData
//!   ├── albums/homestuck.toml ──┐   ├── albumData  [Album, ...]
//!   ├── tracks.toml ────────────┼─► ├── trackData  [Track, ...]
//!   └── artists.toml ───────────┘   └── artistData [Artist, ...]
//!
//!   [[album]]                      Thing::new(kinds.album)
//!   name = "Homestuck Vol. 1"  ──►   .set("name", ...)     validated
//!   date = 2009-06-12                .set("date", ...)     toml date → Date
//! ```
//!
//! Every document is read in full before anything is reported: all field
//! failures of all files come back together.

mod convert;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use rustc_hash::FxHashMap;
use walkdir::WalkDir;

use crate::{
    log,
    thing::{InvalidationPolicy, Thing, ThingRef, WikiData},
    wiki::Kinds,
};

pub use convert::from_toml;

/// Collect every `*.toml` file below `dir`, in path order.
fn collect_data_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "toml"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Things read from one document, and what went wrong with it.
#[derive(Default)]
struct Document {
    things: Vec<(String, ThingRef)>,
    problems: Vec<String>,
}

fn parse_document(content: &str, kinds: &Kinds) -> Result<Document> {
    let table: toml::Table = toml::from_str(content)?;
    let mut document = Document::default();

    for (key, entries) in &table {
        let Some(kind) = kinds.by_reference_type(key) else {
            document.problems.push(format!("unknown table `[[{key}]]`"));
            continue;
        };
        let Some(entries) = entries.as_array() else {
            document.problems.push(format!("`{key}` must be an array of tables (`[[{key}]]`)"));
            continue;
        };

        for (index, entry) in entries.iter().enumerate() {
            let Some(fields) = entry.as_table() else {
                document.problems.push(format!("{key}[{index}] is not a table"));
                continue;
            };
            let thing = Thing::new(kind);
            for (field, value) in fields {
                if let Err(err) = thing.set(field, from_toml(value)) {
                    document.problems.push(format!("{key}[{index}]: {err}"));
                }
            }
            document.things.push((kind.data_name().to_owned(), thing));
        }
    }

    Ok(document)
}

/// Load every data file under `dir` and link the things into a new wiki.
pub fn load_wiki(dir: &Path, kinds: &Kinds, policy: InvalidationPolicy) -> Result<Arc<WikiData>> {
    let wiki = WikiData::new(policy);
    reload_wiki(&wiki, dir, kinds)?;
    Ok(wiki)
}

/// Read every data file under `dir` again and relink all of the wiki's
/// arrays, then decache so things still held from an earlier load see the
/// new arrays under either policy.
///
/// Nothing is relinked if any file fails; the wiki keeps its old data.
pub fn reload_wiki(wiki: &Arc<WikiData>, dir: &Path, kinds: &Kinds) -> Result<()> {
    let files = collect_data_files(dir);
    let mut arrays: FxHashMap<String, Vec<ThingRef>> = FxHashMap::default();
    let mut report = Vec::new();

    for path in &files {
        let content =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let document = parse_document(&content, kinds)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        for (data_name, thing) in document.things {
            arrays.entry(data_name).or_default().push(thing);
        }
        if !document.problems.is_empty() {
            report.push(format!("{}:\n  {}", path.display(), document.problems.join("\n  ")));
        }
    }

    if !report.is_empty() {
        bail!("invalid wiki data\n{}", report.join("\n"));
    }

    let mut total = 0;
    for kind in kinds.all() {
        let things = arrays.remove(kind.data_name()).unwrap_or_default();
        total += things.len();
        wiki.link(kind.data_name(), things);
    }
    wiki.decache();

    log!("data"; "linked {} things from {} files", total, files.len());
    Ok(())
}
