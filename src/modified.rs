//! Modification timestamps
//!
//! Frames are stamped on every mutation. Dependents compare stamps to decide
//! whether a cached aggregate has to be re-derived.

use std::sync::atomic::{AtomicU64, Ordering};

static CLOCK: AtomicU64 = AtomicU64::new(1);

/// A point on the process-wide modification clock
///
/// Later stamps always compare greater than earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModifiedTime(u64);

impl ModifiedTime {
    /// The stamp preceding every real modification
    pub const ZERO: ModifiedTime = ModifiedTime(0);

    /// Draw a fresh stamp from the clock
    pub fn now() -> Self {
        ModifiedTime(CLOCK.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw counter value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for ModifiedTime {
    fn default() -> Self {
        Self::now()
    }
}
