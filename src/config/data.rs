//! `[data]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[data]` section in musicwiki.toml - where the wiki's content lives.
///
/// # Example
/// ```toml
/// [data]
/// directory = "wiki-data"  # every *.toml below it is loaded
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Data directory, relative to the project root.
    #[serde(default = "defaults::data::directory")]
    #[educe(Default = defaults::data::directory())]
    pub directory: PathBuf,
}
