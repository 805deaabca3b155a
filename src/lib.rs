//! musicwiki - music wiki data with composite computed properties.
//!
//! The library is the authoring surface: [`composite`] declares computed
//! properties, [`thing`] binds them to entity kinds, [`wiki`] holds the
//! music wiki's kinds and [`data`] loads them from TOML. The `musicwiki`
//! binary drives it through [`check`] and [`dump`].
//!
//! ```ignore
//! use musicwiki::{data::load_wiki, thing::InvalidationPolicy, wiki::Kinds};
//!
//! let kinds = Kinds::build()?;
//! let wiki = load_wiki(Path::new("data"), &kinds, InvalidationPolicy::Automatic)?;
//! let album = wiki.find("album:homestuck-vol-1")?.unwrap();
//! println!("{}", album.get("duration")?);
//! ```

pub mod check;
pub mod cli;
pub mod composite;
pub mod config;
pub mod data;
pub mod dump;
pub mod logger;
pub mod thing;
pub mod utils;
pub mod wiki;
