use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::conflict::{find_conflict, validate_slot};
use super::{Engine, EngineError};

impl Engine {
    /// Add a room to the catalog. Names are unique: the name is
    /// claimed before the WAL append and released again if the append
    /// fails, so a duplicate can never commit.
    pub async fn create_room(&self, name: &str) -> Result<Room, EngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidName("room name cannot be blank"));
        }
        if name.len() > MAX_ROOM_NAME_LEN {
            return Err(EngineError::InvalidName("room name too long"));
        }
        if self.catalog.len() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }

        let id = Ulid::new();
        if !self.catalog.claim_name(name, id) {
            return Err(EngineError::DuplicateRoomName(name.to_string()));
        }

        let event = Event::RoomAdded {
            id,
            name: name.to_string(),
        };
        if let Err(e) = self.wal_append(&event).await {
            self.catalog.release_name(name);
            return Err(e);
        }

        let room = Room {
            id,
            name: name.to_string(),
        };
        self.catalog.insert(room.clone());
        metrics::gauge!(observability::ROOMS_ACTIVE).set(self.catalog.len() as f64);
        info!(%id, name, "room created");
        Ok(room)
    }

    /// Book a slot. The conflict check and the insert run under the
    /// (room, day) page write lock as one step: between observing "no
    /// conflict" and committing, no other mutation of that page can
    /// interleave.
    pub async fn create_reservation(
        &self,
        room_name: &str,
        day: Day,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<Reservation, EngineError> {
        let slot = validate_slot(start, end)?;
        let room = self
            .catalog
            .find_by_name(room_name)
            .ok_or_else(|| EngineError::RoomNotFound(room_name.to_string()))?;

        let key = DayKey {
            room_id: room.id,
            day,
        };
        let page = self.store.page_or_default(key);
        let mut book = page.write().await;

        if book.len() >= MAX_RESERVATIONS_PER_DAY {
            return Err(EngineError::LimitExceeded("too many reservations on that day"));
        }
        if find_conflict(&book.reservations, &slot, None).is_some() {
            metrics::counter!(observability::SLOT_CONFLICTS_TOTAL).increment(1);
            debug!(room = room_name, %day, "slot rejected: overlap");
            return Err(EngineError::SlotTaken);
        }

        let reservation = Reservation {
            id: Ulid::new(),
            room_id: room.id,
            day,
            slot,
        };
        let event = Event::ReservationBooked {
            id: reservation.id,
            room_id: room.id,
            day,
            slot,
        };
        self.wal_append(&event).await?;
        book.insert(reservation.clone());
        self.store.map(reservation.id, key);

        metrics::counter!(observability::RESERVATIONS_BOOKED_TOTAL).increment(1);
        metrics::gauge!(observability::RESERVATIONS_ACTIVE)
            .set(self.store.reservation_count() as f64);
        Ok(reservation)
    }

    /// Replace a reservation's day and slot. The row never collides
    /// with its own prior state. When the day changes the row moves
    /// pages, and both page locks are taken in sorted key order so two
    /// opposite-direction moves cannot deadlock.
    pub async fn update_reservation(
        &self,
        id: Ulid,
        day: Day,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<Reservation, EngineError> {
        if self.store.key_of(&id).is_none() {
            return Err(EngineError::ReservationNotFound(id));
        }
        let slot = validate_slot(start, end)?;

        loop {
            let (cur_key, mut book) = self.resolve_write(&id).await?;
            let new_key = DayKey {
                room_id: cur_key.room_id,
                day,
            };

            if new_key == cur_key {
                if find_conflict(&book.reservations, &slot, Some(id)).is_some() {
                    metrics::counter!(observability::SLOT_CONFLICTS_TOTAL).increment(1);
                    return Err(EngineError::SlotTaken);
                }
                let event = Event::ReservationMoved { id, day, slot };
                self.wal_append(&event).await?;
                let row = book
                    .replace(id, day, slot)
                    .ok_or(EngineError::ReservationNotFound(id))?;
                metrics::counter!(observability::RESERVATIONS_MOVED_TOTAL).increment(1);
                return Ok(row);
            }

            // The day changes: lock old and new page together, then
            // confirm the row didn't move while we waited.
            drop(book);
            let Some(old_page) = self.store.page(&cur_key) else {
                continue;
            };
            let new_page = self.store.page_or_default(new_key);
            let (mut old_book, mut new_book) = if cur_key < new_key {
                let a = old_page.write_owned().await;
                let b = new_page.write_owned().await;
                (a, b)
            } else {
                let b = new_page.write_owned().await;
                let a = old_page.write_owned().await;
                (a, b)
            };
            if self.store.key_of(&id) != Some(cur_key) {
                continue;
            }

            if new_book.len() >= MAX_RESERVATIONS_PER_DAY {
                return Err(EngineError::LimitExceeded("too many reservations on that day"));
            }
            if find_conflict(&new_book.reservations, &slot, Some(id)).is_some() {
                metrics::counter!(observability::SLOT_CONFLICTS_TOTAL).increment(1);
                return Err(EngineError::SlotTaken);
            }

            let event = Event::ReservationMoved { id, day, slot };
            self.wal_append(&event).await?;
            let Some(mut row) = old_book.remove(id) else {
                return Err(EngineError::ReservationNotFound(id));
            };
            row.day = day;
            row.slot = slot;
            new_book.insert(row.clone());
            self.store.map(id, new_key);
            metrics::counter!(observability::RESERVATIONS_MOVED_TOTAL).increment(1);
            return Ok(row);
        }
    }

    /// Remove a reservation. Returns the removed row; a second delete
    /// of the same id reports `ReservationNotFound`.
    pub async fn delete_reservation(&self, id: Ulid) -> Result<Reservation, EngineError> {
        let (_key, mut book) = self.resolve_write(&id).await?;
        let event = Event::ReservationCancelled { id };
        self.wal_append(&event).await?;
        let removed = book.remove(id).ok_or(EngineError::ReservationNotFound(id))?;
        self.store.unmap(&id);

        metrics::counter!(observability::RESERVATIONS_CANCELLED_TOTAL).increment(1);
        metrics::gauge!(observability::RESERVATIONS_ACTIVE)
            .set(self.store.reservation_count() as f64);
        Ok(removed)
    }
}
