use crate::move_order::ColumnOrder;

/// Default number of slots in a move cache
pub const DEFAULT_CACHE_SIZE: usize = (1 << 16) + 1; // prime value

#[derive(Copy, Clone)]
struct Entry {
    this: u64,
    that: u64,
    order: ColumnOrder,
}

/// Fixed-size cache of move orders for one decision
///
/// Each position maps to a single slot and a newer entry replaces whatever
/// occupied it. Entries keep both bit planes of their position, the side to
/// move first, so a lookup only answers for the exact position it was
/// stored for.
#[derive(Clone)]
pub struct MoveCache {
    entries: Vec<Option<Entry>>,
    len: usize,
    hits: usize,
}

impl MoveCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_SIZE)
    }

    /// Creates a cache with `capacity` slots, at least one
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: vec![None; capacity.max(1)],
            len: 0,
            hits: 0,
        }
    }

    fn index(&self, this: u64, that: u64) -> usize {
        let key = (this ^ that.rotate_left(32)).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ that;
        (key % self.entries.len() as u64) as usize
    }

    pub fn set(&mut self, this: u64, that: u64, order: ColumnOrder) {
        let i = self.index(this, that);
        if self.entries[i].is_none() {
            self.len += 1;
        }
        self.entries[i] = Some(Entry { this, that, order });
    }

    pub fn get(&mut self, this: u64, that: u64) -> Option<ColumnOrder> {
        let i = self.index(this, that);
        match self.entries[i] {
            Some(entry) if entry.this == this && entry.that == that => {
                self.hits += 1;
                Some(entry.order)
            }
            _ => None,
        }
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of lookups answered from the cache so far (for diagnostics only)
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = None;
        }
        self.len = 0;
        self.hits = 0;
    }
}

impl Default for MoveCache {
    fn default() -> Self {
        Self::new()
    }
}
