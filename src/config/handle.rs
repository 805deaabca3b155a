//! Global config handle.
//!
//! Uses `arc-swap` for lock-free reads from rayon workers.
//!
//! ```text
//!   main ── init_config(config) ──► CONFIG (ArcSwap)
//!                                      │
//!                 ┌────────────────────┼────────────────────┐
//!                 ▼                    ▼                    ▼
//!               cfg()                cfg()                cfg()
//!             (check)            (rayon worker)          (dump)
//! ```

use super::WikiConfig;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

// =============================================================================
// Global State
// =============================================================================

/// Global config storage, default until `init_config` runs.
pub static CONFIG: LazyLock<ArcSwap<WikiConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(WikiConfig::default()));

// =============================================================================
// Public API
// =============================================================================

/// Get current config as `Arc<WikiConfig>`.
///
/// Lock-free read via atomic load. Suitable for rayon parallel contexts.
#[inline]
pub fn cfg() -> Arc<WikiConfig> {
    CONFIG.load_full()
}

/// Initialize global config (called once at startup).
#[inline]
pub fn init_config(config: WikiConfig) {
    CONFIG.store(Arc::new(config));
}
