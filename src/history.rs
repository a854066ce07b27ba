//! Draw history
//!
//! Completed draws, most recent first, capped at `MAX_HISTORY`. Stored as a
//! JSON list under a single storage key.

use serde::{Deserialize, Serialize};

use crate::error::LottoResult;
use crate::persistence::Storage;
use crate::variant::{DrawOrdering, LotteryVariant};

/// Maximum number of draws to keep
pub const MAX_HISTORY: usize = 100;

/// A finished draw. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawResult {
    pub variant: LotteryVariant,
    /// Unix timestamp (ms) when the draw finished
    pub timestamp: f64,
    pub primary: Vec<u32>,
    #[serde(default)]
    pub secondary: Vec<u32>,
}

impl DrawResult {
    /// Build a result from numbers in extraction order.
    ///
    /// Set-choice variants are sorted ascending within each category here
    /// and only here; positional variants keep extraction order.
    pub fn new(variant: LotteryVariant, timestamp: f64, mut primary: Vec<u32>, mut secondary: Vec<u32>) -> Self {
        if variant.config().ordering == DrawOrdering::Set {
            primary.sort_unstable();
            secondary.sort_unstable();
        }
        Self {
            variant,
            timestamp,
            primary,
            secondary,
        }
    }

    /// "03 07 12 + 05" style rendering
    pub fn display_string(&self) -> String {
        let fmt = |nums: &[u32]| {
            nums.iter()
                .map(|n| format!("{:02}", n))
                .collect::<Vec<_>>()
                .join(" ")
        };
        if self.secondary.is_empty() {
            fmt(&self.primary)
        } else {
            format!("{} + {}", fmt(&self.primary), fmt(&self.secondary))
        }
    }
}

/// Bounded most-recent-first log of draws
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    pub entries: Vec<DrawResult>,
    #[serde(skip, default = "default_cap")]
    cap: usize,
}

fn default_cap() -> usize {
    MAX_HISTORY
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Storage key
    const STORAGE_KEY: &'static str = "lotto_mixer_history";

    pub fn new() -> Self {
        Self::with_cap(MAX_HISTORY)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            cap: cap.max(1),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Insert at the front, evicting the oldest entries past the cap
    pub fn add(&mut self, result: DrawResult) {
        self.entries.insert(0, result);
        self.entries.truncate(self.cap);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent draw (if any)
    pub fn latest(&self) -> Option<&DrawResult> {
        self.entries.first()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Load history, starting fresh on missing or corrupt data
    pub fn load(storage: &dyn Storage) -> Self {
        Self::load_with_cap(storage, MAX_HISTORY)
    }

    pub fn load_with_cap(storage: &dyn Storage, cap: usize) -> Self {
        let mut history = match storage.get_item(Self::STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<DrawResult>>(&json) {
                Ok(entries) => {
                    log::info!("Loaded {} history entries", entries.len());
                    Self {
                        entries,
                        cap: cap.max(1),
                    }
                }
                Err(e) => {
                    log::warn!("Discarding unreadable history: {}", e);
                    Self::with_cap(cap)
                }
            },
            Ok(None) => {
                log::info!("No history found, starting fresh");
                Self::with_cap(cap)
            }
            Err(e) => {
                log::warn!("History unavailable: {}", e);
                Self::with_cap(cap)
            }
        };
        history.entries.truncate(history.cap);
        history
    }

    pub fn save(&self, storage: &mut dyn Storage) -> LottoResult<()> {
        let json = serde_json::to_string(&self.entries)?;
        storage.set_item(Self::STORAGE_KEY, &json)?;
        log::info!("History saved ({} entries)", self.entries.len());
        Ok(())
    }

    /// Clear entries in memory and in storage
    pub fn clear_stored(&mut self, storage: &mut dyn Storage) -> LottoResult<()> {
        self.clear();
        storage.remove_item(Self::STORAGE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;
    use proptest::prelude::*;

    fn result(n: u32) -> DrawResult {
        DrawResult::new(LotteryVariant::Arrangement3, n as f64, vec![n % 10, 0, 0], Vec::new())
    }

    #[test]
    fn test_set_variant_sorted_at_construction() {
        let r = DrawResult::new(LotteryVariant::DoubleColor, 0.0, vec![30, 2, 17, 5, 9, 1], vec![12]);
        assert_eq!(r.primary, vec![1, 2, 5, 9, 17, 30]);
        assert_eq!(r.secondary, vec![12]);
        assert_eq!(r.display_string(), "01 02 05 09 17 30 + 12");
    }

    #[test]
    fn test_positional_variant_keeps_order() {
        let r = DrawResult::new(LotteryVariant::Arrangement3, 0.0, vec![7, 0, 7], Vec::new());
        assert_eq!(r.primary, vec![7, 0, 7]);
        assert_eq!(r.display_string(), "07 00 07");
    }

    #[test]
    fn test_most_recent_first_and_fifo_eviction() {
        let mut h = History::with_cap(3);
        for i in 0..5 {
            h.add(result(i));
        }
        assert_eq!(h.len(), h.cap());
        let stamps: Vec<f64> = h.entries.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![4.0, 3.0, 2.0]);
        assert_eq!(h.latest().map(|e| e.timestamp), Some(4.0));
    }

    #[test]
    fn test_save_load_clear() {
        let mut storage = MemoryStorage::new();
        let mut h = History::new();
        h.add(result(1));
        h.add(DrawResult::new(LotteryVariant::SuperLotto, 2.0, vec![5, 4, 3, 2, 1], vec![9, 8]));
        h.save(&mut storage).unwrap();

        let loaded = History::load(&storage);
        assert_eq!(loaded.entries, h.entries);
        assert_eq!(loaded.entries[0].secondary, vec![8, 9]);

        let mut loaded = loaded;
        loaded.clear_stored(&mut storage).unwrap();
        assert!(loaded.is_empty());
        assert!(History::load(&storage).is_empty());
    }

    #[test]
    fn test_cap_is_at_least_one() {
        assert_eq!(History::new().cap(), MAX_HISTORY);
        let mut h = History::with_cap(0);
        assert_eq!(h.cap(), 1);
        h.add(result(1));
        h.add(result(2));
        assert_eq!(h.len(), 1);
        assert_eq!(h.latest().map(|e| e.timestamp), Some(2.0));
    }

    #[test]
    fn test_corrupt_history_starts_fresh() {
        let mut storage = MemoryStorage::new();
        storage.set_item(History::STORAGE_KEY, "{ nope").unwrap();
        assert!(History::load(&storage).is_empty());
    }

    #[test]
    fn test_load_truncates_to_cap() {
        let mut storage = MemoryStorage::new();
        let mut h = History::with_cap(10);
        for i in 0..10 {
            h.add(result(i));
        }
        h.save(&mut storage).unwrap();
        let small = History::load_with_cap(&storage, 4);
        assert_eq!(small.len(), 4);
        assert_eq!(small.entries[0].timestamp, 9.0);
    }

    proptest! {
        #[test]
        fn prop_history_never_exceeds_cap(cap in 1usize..20, inserts in 0u32..60) {
            let mut h = History::with_cap(cap);
            for i in 0..inserts {
                h.add(result(i));
                prop_assert!(h.len() <= cap);
            }
            prop_assert_eq!(h.len(), (inserts as usize).min(cap));
            if inserts > 0 {
                // Newest first, contiguous run of the most recent inserts
                let expected: Vec<f64> = (0..inserts).rev().take(cap).map(|i| i as f64).collect();
                let stamps: Vec<f64> = h.entries.iter().map(|e| e.timestamp).collect();
                prop_assert_eq!(stamps, expected);
            }
        }
    }
}
