use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::Verdict;

/// A recorded playlist entry, as written back out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub title: String,
    pub url: String,
}

/// Group name -> entries in recording order.
pub type GroupedEntries = BTreeMap<String, Vec<StoredEntry>>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultSnapshot {
    pub live: GroupedEntries,
    pub dead: GroupedEntries,
}

impl ResultSnapshot {
    pub fn live_count(&self) -> usize {
        self.live.values().map(Vec::len).sum()
    }

    pub fn dead_count(&self) -> usize {
        self.dead.values().map(Vec::len).sum()
    }

    pub fn total(&self) -> usize {
        self.live_count() + self.dead_count()
    }

    /// Every group present in either mapping, ascending.
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = self
            .live
            .keys()
            .chain(self.dead.keys())
            .map(String::as_str)
            .collect();
        groups.sort_unstable();
        groups.dedup();
        groups
    }
}

/// Shared, append-only accumulator for verdicts.
///
/// All mutation goes through one lock. The completed counter is bumped while
/// the lock is held, so it never runs ahead of the recorded entries; readers
/// of [`ResultStore::completed`] do not take the lock.
#[derive(Debug, Default)]
pub struct ResultStore {
    buckets: Mutex<ResultSnapshot>,
    completed: AtomicUsize,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, verdict: &Verdict) {
        let entry = StoredEntry {
            title: verdict.item.title.clone(),
            url: verdict.item.url.clone(),
        };
        let mut buckets = self.buckets.lock();
        let target = if verdict.is_live {
            &mut buckets.live
        } else {
            &mut buckets.dead
        };
        target
            .entry(verdict.item.group.clone())
            .or_default()
            .push(entry);
        self.completed.fetch_add(1, Ordering::Release);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ResultSnapshot {
        self.buckets.lock().clone()
    }
}
