//! `[cache]` and `[check]` section configuration.

use super::defaults;
use crate::thing::InvalidationPolicy;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[cache]` section in musicwiki.toml - computed property caching.
///
/// # Example
/// ```toml
/// [cache]
/// invalidation = "manual"  # only explicit decache refreshes values
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// `automatic` (default): field sets invalidate cached values.
    /// `manual`: stale values are served until a decache.
    #[serde(default = "defaults::cache::invalidation")]
    #[educe(Default = defaults::cache::invalidation())]
    pub invalidation: InvalidationPolicy,
}

/// `[check]` section in musicwiki.toml - the `check` command.
///
/// # Example
/// ```toml
/// [check]
/// parallel = false  # evaluate kinds one after another
/// trace = true      # log every composite step
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    /// Evaluate things in parallel with rayon.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub parallel: bool,

    /// Log each composite step as it runs.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub trace: bool,
}
