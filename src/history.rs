use heapless::{String, Vec};

/// Configuration for command history
#[derive(Clone, Copy, Default)]
pub struct HistoryConfig {
    /// Whether to skip a line identical to the newest entry
    pub deduplicate: bool,
}

/// Fixed-depth ring of completed lines with up/down recall.
///
/// Slots are written in order and overwritten oldest-first once all `DEPTH`
/// are used. Recall walks a separate cursor that never lands on an unwritten
/// slot and never wraps from the oldest entry back to the newest.
pub struct History<const BUF_SIZE: usize, const DEPTH: usize> {
    slots: Vec<String<BUF_SIZE>, DEPTH>,
    write_index: usize,
    recall_index: Option<usize>,
    config: HistoryConfig,
}

impl<const BUF_SIZE: usize, const DEPTH: usize> History<BUF_SIZE, DEPTH> {
    /// Create a new history ring
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            slots: Vec::new(),
            write_index: 0,
            recall_index: None,
            config,
        }
    }

    /// Store a completed line. Blank lines are ignored.
    ///
    /// Returns `true` if the line was stored.
    pub fn record(&mut self, line: &str) -> bool {
        if DEPTH == 0 || line.trim_matches(|c: char| c.is_ascii_whitespace()).is_empty() {
            return false;
        }

        if self.config.deduplicate && self.newest() == Some(line) {
            return false;
        }

        let Ok(entry) = String::try_from(line) else {
            log::warn!("line of {} bytes does not fit a history slot", line.len());
            return false;
        };

        if self.slots.len() < DEPTH {
            // write_index == len until the ring is full
            let _ = self.slots.push(entry);
        } else {
            self.slots[self.write_index] = entry;
        }
        self.write_index = (self.write_index + 1) % DEPTH;
        self.recall_index = None;
        true
    }

    /// Step back to the next older entry.
    ///
    /// Returns `None`, leaving the recall cursor where it was, when there is
    /// nothing older.
    pub fn recall_previous(&mut self) -> Option<&str> {
        if self.slots.is_empty() {
            return None;
        }

        let target = match self.recall_index {
            None => self.step_back(self.write_index),
            Some(i) if i == self.oldest() => return None,
            Some(i) => self.step_back(i),
        };
        if target >= self.slots.len() {
            return None;
        }

        self.recall_index = Some(target);
        Some(self.slots[target].as_str())
    }

    /// Step forward to the next newer entry.
    ///
    /// Returns `None` when not recalling, or when the step would reach the
    /// write index (there is nothing newer than the newest entry).
    pub fn recall_next(&mut self) -> Option<&str> {
        let current = self.recall_index?;
        let target = (current + 1) % DEPTH;
        if target == self.write_index || target >= self.slots.len() {
            return None;
        }

        self.recall_index = Some(target);
        Some(self.slots[target].as_str())
    }

    /// Whether a recall is in progress
    pub fn is_recalling(&self) -> bool {
        self.recall_index.is_some()
    }

    /// Reset the recall cursor to inactive
    pub fn reset_recall(&mut self) {
        self.recall_index = None;
    }

    /// Get the number of entries in history
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if history is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.slots.clear();
        self.write_index = 0;
        self.recall_index = None;
    }

    /// The most recently recorded line
    pub fn newest(&self) -> Option<&str> {
        if self.slots.is_empty() {
            return None;
        }
        Some(self.slots[self.step_back(self.write_index)].as_str())
    }

    /// Get an iterator over history entries (oldest to newest)
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let (newer, older) = self.slots.split_at(self.oldest());
        older.iter().chain(newer.iter()).map(|s| s.as_str())
    }

    fn oldest(&self) -> usize {
        if self.slots.len() < DEPTH {
            0
        } else {
            self.write_index
        }
    }

    fn step_back(&self, index: usize) -> usize {
        (index + DEPTH - 1) % DEPTH
    }
}

impl<const BUF_SIZE: usize, const DEPTH: usize> Default for History<BUF_SIZE, DEPTH> {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}
