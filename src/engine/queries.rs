use ulid::Ulid;

use crate::model::*;

use super::{Engine, EngineError};

impl Engine {
    /// All rooms, order not significant.
    pub fn list_rooms(&self) -> Vec<Room> {
        self.catalog.list()
    }

    pub fn get_room(&self, id: &Ulid) -> Option<Room> {
        self.catalog.get(id)
    }

    pub fn find_room(&self, name: &str) -> Option<Room> {
        self.catalog.find_by_name(name)
    }

    pub async fn get_reservation(&self, id: Ulid) -> Result<Reservation, EngineError> {
        let book = self.resolve_read(&id).await?;
        book.get(id)
            .cloned()
            .ok_or(EngineError::ReservationNotFound(id))
    }

    /// Every committed reservation, ordered by day then start time.
    /// Each page is read under its own lock, so the result is a union
    /// of committed per-page snapshots — never a half-written row.
    pub async fn list_reservations(&self) -> Vec<Reservation> {
        let mut rows = Vec::new();
        for page in self.store.pages() {
            let book = page.read().await;
            rows.extend(book.reservations.iter().cloned());
        }
        rows.sort_by(|a, b| (a.day, a.slot.start, a.id).cmp(&(b.day, b.slot.start, b.id)));
        rows
    }

    /// The candidate set for one room on one day, ordered by start
    /// time. Empty when the room has no bookings that day.
    pub async fn reservations_for(&self, room_id: Ulid, day: Day) -> Vec<Reservation> {
        let key = DayKey { room_id, day };
        match self.store.page(&key) {
            Some(page) => page.read().await.reservations.clone(),
            None => Vec::new(),
        }
    }

    pub fn reservation_count(&self) -> usize {
        self.store.reservation_count()
    }
}
