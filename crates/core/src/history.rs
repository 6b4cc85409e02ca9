/// Most-recent-first list with a hard capacity. Backing storage for the
/// alert and diff history files: pushing beyond the cap drops the
/// oldest entries (last-writer-wins, no locking — the store guarantees
/// single-writer-per-run).
#[derive(Clone, Debug, PartialEq)]
pub struct BoundedHistory<T> {
    capacity: usize,
    entries: Vec<T>,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), entries: Vec::new() }
    }

    /// Rebuilds from persisted entries, truncating anything beyond the
    /// capacity in case the cap was lowered between runs.
    pub fn from_entries(capacity: usize, mut entries: Vec<T>) -> Self {
        let capacity = capacity.max(1);
        entries.truncate(capacity);
        Self { capacity, entries }
    }

    pub fn push_front(&mut self, entry: T) {
        self.entries.insert(0, entry);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<T> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
