//! Bounded in-memory entry store.
//!
//! Entries are kept most-recent-first in a ring buffer of fixed capacity.
//! Inserting into a full store drops the oldest entry. All mutation happens
//! under a single write lock, so concurrent inserts and clears always leave
//! the buffer in a consistent state and readers never see a half-applied
//! insert.

use crate::entry::{now_millis, Entry, EntryDraft};
use crate::stats::Stats;
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct StoreState {
    entries: VecDeque<Entry>,
    next_seq: u64,
    last_captured_at: u64,
}

/// Ring buffer of captured entries.
#[derive(Debug)]
pub struct EventStore {
    state: RwLock<StoreState>,
    capacity: usize,
}

impl EventStore {
    /// Create a store holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: RwLock::new(StoreState {
                entries: VecDeque::with_capacity(capacity.min(1024) + 1),
                next_seq: 0,
                last_captured_at: 0,
            }),
            capacity,
        }
    }

    /// Maximum number of entries held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store a new entry and return it.
    ///
    /// The entry gets a fresh id and a capture timestamp that never goes
    /// backwards relative to earlier inserts. If the store is full the
    /// oldest entry is evicted.
    pub fn insert(&self, draft: EntryDraft) -> Entry {
        let mut state = self.write();

        let seq = state.next_seq;
        state.next_seq += 1;
        let captured_at = now_millis().max(state.last_captured_at);
        state.last_captured_at = captured_at;

        let entry = Entry::from_draft(generate_id(captured_at, seq), captured_at, draft);
        state.entries.push_front(entry.clone());
        state.entries.truncate(self.capacity);

        entry
    }

    /// All entries, most recent first.
    pub fn list(&self) -> Vec<Entry> {
        self.read().entries.iter().cloned().collect()
    }

    /// The `limit` most recent entries.
    pub fn recent(&self, limit: usize) -> Vec<Entry> {
        self.read().entries.iter().take(limit).cloned().collect()
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &str) -> Option<Entry> {
        self.read().entries.iter().find(|e| e.id == id).cloned()
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Remove every entry. Capacity and id generation are unaffected.
    pub fn clear(&self) {
        self.write().entries.clear();
    }

    /// Remove entries captured before `cutoff` (milliseconds since epoch).
    ///
    /// Returns the number of entries removed.
    pub fn evict_older_than(&self, cutoff: u64) -> usize {
        let mut state = self.write();
        let before = state.entries.len();
        // timestamps are non-decreasing from back to front
        while state
            .entries
            .back()
            .is_some_and(|oldest| oldest.captured_at < cutoff)
        {
            state.entries.pop_back();
        }
        before - state.entries.len()
    }

    /// Aggregate statistics over the current contents.
    pub fn stats(&self) -> Stats {
        Stats::from_entries(self.read().entries.iter())
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Time component, per-store sequence and a random suffix.
fn generate_id(millis: u64, seq: u64) -> String {
    let suffix: u32 = rand::random();
    format!("{:x}-{:x}-{:08x}", millis, seq, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryKind, ExceptionDetail, RequestDetail, ResponseDetail};
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn request(path: &str, ms: u64, ip: &str) -> EntryDraft {
        EntryDraft::Request {
            request: RequestDetail {
                method: "GET".into(),
                url: path.into(),
                path: path.into(),
                query: None,
                params: Default::default(),
                headers: None,
                cookies: Default::default(),
                body: None,
                ip: Some(ip.into()),
                user_agent: Some("test-agent".into()),
                referer: None,
                origin: None,
                hostname: "localhost".into(),
                protocol: "http".into(),
                timestamp: 0,
            },
            response: ResponseDetail {
                status_code: 200,
                status_message: "OK".into(),
                headers: None,
                body: None,
                response_time: ms,
            },
        }
    }

    fn exception(message: &str) -> EntryDraft {
        EntryDraft::Exception {
            exception: ExceptionDetail {
                name: "Error".into(),
                message: message.into(),
                stack: String::new(),
                status_code: 500,
                timestamp: 0,
            },
            request: None,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = EventStore::new(10);
        let entry = store.insert(request("/users/42", 37, "10.0.0.5"));

        let found = store.get(&entry.id).unwrap();
        assert_eq!(found, entry);
        assert_eq!(found.kind, EntryKind::Request);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_most_recent_first() {
        let store = EventStore::new(10);
        let first = store.insert(request("/a", 1, "1.1.1.1"));
        let second = store.insert(exception("boom"));

        let entries = store.list();
        assert_eq!(entries[0].id, second.id);
        assert_eq!(entries[1].id, first.id);
        assert!(entries[0].captured_at >= entries[1].captured_at);
    }

    #[test]
    fn test_eviction_drops_oldest() {
        let store = EventStore::new(3);
        let ids: Vec<String> = (0..4)
            .map(|i| store.insert(request(&format!("/{}", i), 1, "ip")).id)
            .collect();

        assert_eq!(store.len(), 3);
        assert!(store.get(&ids[0]).is_none());
        let listed: Vec<String> = store.list().into_iter().map(|e| e.id).collect();
        assert_eq!(listed, vec![ids[3].clone(), ids[2].clone(), ids[1].clone()]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = EventStore::new(5);
        store.insert(request("/a", 1, "ip"));
        store.insert(exception("e"));

        store.clear();
        assert!(store.list().is_empty());
        store.clear();
        assert!(store.list().is_empty());
        assert_eq!(store.stats().total, 0);

        // capacity and inserts still work after a clear
        store.insert(request("/b", 1, "ip"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.capacity(), 5);
    }

    #[test]
    fn test_list_is_a_copy() {
        let store = EventStore::new(5);
        store.insert(request("/a", 1, "ip"));

        let mut copy = store.list();
        copy.clear();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_recent_limit() {
        let store = EventStore::new(10);
        for i in 0..5 {
            store.insert(request(&format!("/{}", i), 1, "ip"));
        }
        let recent = store.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].path(), Some("/4"));
    }

    #[test]
    fn test_evict_older_than() {
        let store = EventStore::new(10);
        store.insert(request("/a", 1, "ip"));
        store.insert(request("/b", 1, "ip"));

        assert_eq!(store.evict_older_than(0), 0);
        assert_eq!(store.len(), 2);

        assert_eq!(store.evict_older_than(u64::MAX), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_ids_unique() {
        let store = EventStore::new(1000);
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            ids.insert(store.insert(exception("x")).id);
        }
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let store = EventStore::new(0);
        store.insert(exception("a"));
        let latest = store.insert(exception("b"));
        assert_eq!(store.list(), vec![latest]);
    }

    #[test]
    fn test_concurrent_inserts() {
        let store = Arc::new(EventStore::new(100));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..10)
                        .map(|i| {
                            let path = format!("/{}/{}", t, i);
                            store.insert(request(&path, 1, "ip")).id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let inserted: HashSet<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(inserted.len(), 80);
        let listed: HashSet<String> = store.list().into_iter().map(|e| e.id).collect();
        assert_eq!(listed, inserted);
    }

    #[test]
    fn test_concurrent_clear_and_insert() {
        let store = Arc::new(EventStore::new(50));
        for _ in 0..50 {
            store.insert(exception("old"));
        }

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || store.insert(exception("new")).id)
        };
        store.clear();
        let new_id = writer.join().unwrap();

        let remaining = store.list();
        // either the insert landed after the clear, or the clear removed it
        let only_new = remaining.len() == 1 && remaining[0].id == new_id;
        assert!(remaining.is_empty() || only_new);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_bounded_retention(capacity in 1usize..20, inserts in 0usize..60) {
            let store = EventStore::new(capacity);
            let ids: Vec<String> = (0..inserts)
                .map(|i| store.insert(exception(&i.to_string())).id)
                .collect();

            let listed: Vec<String> = store.list().into_iter().map(|e| e.id).collect();
            let expected: Vec<String> = ids.iter().rev().take(capacity).cloned().collect();

            prop_assert_eq!(listed.len(), inserts.min(capacity));
            prop_assert_eq!(listed, expected);
        }

        #[test]
        fn prop_latest_insert_is_first(capacity in 1usize..10, inserts in 1usize..30) {
            let store = EventStore::new(capacity);
            for i in 0..inserts {
                let entry = store.insert(exception(&i.to_string()));
                prop_assert_eq!(&store.list()[0].id, &entry.id);
            }
        }
    }
}
