//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

use crate::thing::InvalidationPolicy;

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [data] Section Defaults
// ============================================================================

pub mod data {
    use std::path::PathBuf;

    pub fn directory() -> PathBuf {
        "data".into()
    }
}

// ============================================================================
// [cache] Section Defaults
// ============================================================================

pub mod cache {
    use super::InvalidationPolicy;

    pub fn invalidation() -> InvalidationPolicy {
        InvalidationPolicy::Automatic
    }
}
