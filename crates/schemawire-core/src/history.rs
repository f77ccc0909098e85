//! A bounded, lossy, lock-free debug history of recent decode/encode
//! outcomes: concurrent readers may observe an in-flight
//! insert mid-write, so this is for debug inspection only, never for
//! correctness-sensitive logic.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use arc_swap::ArcSwapOption;

use crate::value::Value;

const CAPACITY: usize = 10;

/// One recorded decode or encode outcome.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// The protocol name the packet matched, if known.
    pub protocol: Option<String>,
    /// `true` for a successful decode/encode, `false` on error.
    pub ok: bool,
    /// A short, human-readable description (an error message, or the
    /// decoded field count).
    pub summary: String,
    /// The decoded fields, if this entry records a successful decode.
    pub fields: Option<Value>,
}

/// A fixed-capacity ring of the last `CAPACITY` [`HistoryEntry`] values.
///
/// Writes never block readers and readers never block writers; a reader
/// racing an in-flight `push` may see a torn snapshot (some slots from
/// before the write, some after) but never a partially constructed entry.
#[derive(Debug)]
pub struct History {
    slots: Vec<ArcSwapOption<HistoryEntry>>,
    next: AtomicUsize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Build an empty history ring.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: (0..CAPACITY).map(|_| ArcSwapOption::empty()).collect(),
            next: AtomicUsize::new(0),
        }
    }

    /// Record a new entry, evicting the oldest once the ring is full.
    pub fn push(&self, entry: HistoryEntry) {
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % CAPACITY;
        self.slots[slot].store(Some(Arc::new(entry)));
    }

    /// A snapshot of the currently recorded entries, oldest-observed
    /// first. Length may be less than `CAPACITY` before the ring has
    /// filled, and entries aren't guaranteed strictly time-ordered under
    /// concurrent writers.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<HistoryEntry>> {
        self.slots.iter().filter_map(|slot| slot.load_full()).collect()
    }
}
