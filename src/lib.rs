//! Meeting-room reservation engine.
//!
//! Rooms are booked for a calendar day and a half-open time-of-day
//! interval; the engine guarantees that two reservations for the same
//! room on the same day never overlap. Conflict check and commit run
//! as one atomic step under a per-(room, day) lock, and every
//! committed mutation is durably logged before it becomes visible.

pub mod engine;
pub mod fields;
pub mod limits;
pub mod logging;
pub mod model;
pub mod observability;
pub mod wal;

pub use engine::{Engine, EngineError};
pub use model::{Day, Reservation, Room, Slot, TimeOfDay};
