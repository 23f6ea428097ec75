use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Calendar day of a reservation. No timezone attached; the engine
/// only ever compares days for equality and ordering.
pub type Day = NaiveDate;

/// Wall-clock time of day.
pub type TimeOfDay = NaiveTime;

/// Half-open time-of-day interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Slot {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        debug_assert!(start < end, "Slot start must be before end");
        Self { start, end }
    }

    /// Half-open overlap test. Slots that merely touch
    /// (`self.end == other.start`) do not overlap.
    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }

    #[allow(dead_code)]
    pub fn contains_instant(&self, t: TimeOfDay) -> bool {
        self.start <= t && t < self.end
    }
}

/// A bookable meeting room. Immutable once created; addressed by id,
/// resolvable by exact name through the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Ulid,
    pub name: String,
}

/// One committed booking: a room, a day, and a slot on that day.
/// `room_id` is assigned at creation and never changes; `day` and
/// `slot` are replaced together on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub room_id: Ulid,
    pub day: Day,
    pub slot: Slot,
}

/// Partition key: one room on one day. Conflict checks and mutations
/// for a key run under that key's page lock, so bookings for other
/// rooms, or other days of the same room, never contend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayKey {
    pub room_id: Ulid,
    pub day: Day,
}

/// Every reservation of one room on one day, sorted by `slot.start`.
/// This is the candidate set a conflict check has to examine.
#[derive(Debug, Clone)]
pub struct DayBook {
    pub room_id: Ulid,
    pub day: Day,
    pub reservations: Vec<Reservation>,
}

impl DayBook {
    pub fn new(key: DayKey) -> Self {
        Self {
            room_id: key.room_id,
            day: key.day,
            reservations: Vec::new(),
        }
    }

    /// Insert a row, keeping the list sorted by `slot.start`.
    pub fn insert(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.slot.start, |r| r.slot.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    /// Remove a row by id.
    pub fn remove(&mut self, id: Ulid) -> Option<Reservation> {
        let pos = self.reservations.iter().position(|r| r.id == id)?;
        Some(self.reservations.remove(pos))
    }

    /// Overwrite the mutable fields of a row, keeping sort order.
    /// Identifier and room are untouched.
    pub fn replace(&mut self, id: Ulid, day: Day, slot: Slot) -> Option<Reservation> {
        let mut row = self.remove(id)?;
        row.day = day;
        row.slot = slot;
        self.insert(row.clone());
        Some(row)
    }

    pub fn get(&self, id: Ulid) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RoomAdded {
        id: Ulid,
        name: String,
    },
    ReservationBooked {
        id: Ulid,
        room_id: Ulid,
        day: Day,
        slot: Slot,
    },
    /// Day and slot replaced in one step. The owning room never changes.
    ReservationMoved {
        id: Ulid,
        day: Day,
        slot: Slot,
    },
    ReservationCancelled {
        id: Ulid,
    },
}
