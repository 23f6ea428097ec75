use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::{DayBook, DayKey};

pub type SharedDayBook = Arc<RwLock<DayBook>>;

/// Reservation rows, partitioned into one page per (room, day).
///
/// The store is mechanical: it hands out page handles and keeps the
/// id → page index. It carries no business invariant — the engine
/// enforces no-overlap by holding a page's write lock across check
/// and commit, and keeps `index` consistent with page contents under
/// that same lock.
pub struct ReservationStore {
    pages: DashMap<DayKey, SharedDayBook>,
    index: DashMap<Ulid, DayKey>,
}

impl Default for ReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationStore {
    pub fn new() -> Self {
        Self {
            pages: DashMap::new(),
            index: DashMap::new(),
        }
    }

    pub fn page(&self, key: &DayKey) -> Option<SharedDayBook> {
        self.pages.get(key).map(|e| e.value().clone())
    }

    /// Existing page for `key`, or a fresh empty one.
    pub fn page_or_default(&self, key: DayKey) -> SharedDayBook {
        self.pages
            .entry(key)
            .or_insert_with(|| Arc::new(RwLock::new(DayBook::new(key))))
            .value()
            .clone()
    }

    /// Which page a reservation lives on, per the index.
    pub fn key_of(&self, id: &Ulid) -> Option<DayKey> {
        self.index.get(id).map(|e| *e.value())
    }

    pub(crate) fn map(&self, id: Ulid, key: DayKey) {
        self.index.insert(id, key);
    }

    pub(crate) fn unmap(&self, id: &Ulid) {
        self.index.remove(id);
    }

    /// Snapshot of all page handles; callers lock each page themselves.
    pub fn pages(&self) -> Vec<SharedDayBook> {
        self.pages.iter().map(|e| e.value().clone()).collect()
    }

    pub fn reservation_count(&self) -> usize {
        self.index.len()
    }

    #[allow(dead_code)]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
