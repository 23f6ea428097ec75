//! Transport-boundary helpers.
//!
//! The engine never sees text: a transport layer parses request fields
//! with these functions before calling in, and formats rows with them
//! on the way out. The row mappings are explicit tables — every
//! response field is spelled out here, including the room-name join a
//! caller performs on `room_id`.

use chrono::{NaiveDate, NaiveTime};
use serde_json::{Value, json};

use crate::engine::EngineError;
use crate::model::{Day, Reservation, Room, TimeOfDay};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// A request field that failed to parse. `field` names the offending
/// request field so the transport can echo it back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub expected: &'static str,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} must be in {} format", self.field, self.expected)
    }
}

impl std::error::Error for FieldError {}

pub fn parse_date(value: &str, field: &'static str) -> Result<Day, FieldError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| FieldError {
        field,
        expected: "YYYY-MM-DD",
    })
}

pub fn parse_time(value: &str, field: &'static str) -> Result<TimeOfDay, FieldError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| FieldError {
        field,
        expected: "HH:MM",
    })
}

pub fn format_date(day: Day) -> String {
    day.format(DATE_FORMAT).to_string()
}

pub fn format_time(t: TimeOfDay) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Response mapping for a room.
pub fn room_row(room: &Room) -> Value {
    json!({
        "id": room.id.to_string(),
        "name": room.name,
    })
}

/// Response mapping for a reservation. `room_name` is resolved by the
/// caller through the catalog — an explicit join, not a traversal.
pub fn reservation_row(r: &Reservation, room_name: &str) -> Value {
    json!({
        "id": r.id.to_string(),
        "room_name": room_name,
        "reservation_date": format_date(r.day),
        "start_hour": format_time(r.slot.start),
        "end_hour": format_time(r.slot.end),
    })
}

/// HTTP status a transport should report for each engine outcome.
pub fn status(err: &EngineError) -> u16 {
    match err {
        EngineError::InvalidRange
        | EngineError::InvalidName(_)
        | EngineError::LimitExceeded(_) => 400,
        EngineError::RoomNotFound(_) | EngineError::ReservationNotFound(_) => 404,
        EngineError::SlotTaken | EngineError::DuplicateRoomName(_) => 409,
        EngineError::WalError(_) => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Slot;
    use ulid::Ulid;

    #[test]
    fn parse_date_accepts_iso() {
        let day = parse_date("2021-10-21", "reservation_date").unwrap();
        assert_eq!(format_date(day), "2021-10-21");
    }

    #[test]
    fn parse_date_rejects_garbage() {
        let err = parse_date("21/10/2021", "reservation_date").unwrap_err();
        assert_eq!(err.field, "reservation_date");
        assert_eq!(
            err.to_string(),
            "reservation_date must be in YYYY-MM-DD format"
        );
    }

    #[test]
    fn parse_time_accepts_hour_minute() {
        let t = parse_time("11:00", "start_hour").unwrap();
        assert_eq!(format_time(t), "11:00");
    }

    #[test]
    fn parse_time_rejects_garbage() {
        let err = parse_time("11h00", "end_hour").unwrap_err();
        assert_eq!(err.to_string(), "end_hour must be in HH:MM format");
        assert!(parse_time("25:00", "end_hour").is_err());
    }

    #[test]
    fn reservation_row_mapping() {
        let r = Reservation {
            id: Ulid::new(),
            room_id: Ulid::new(),
            day: parse_date("2021-10-21", "reservation_date").unwrap(),
            slot: Slot::new(
                parse_time("11:00", "start_hour").unwrap(),
                parse_time("13:00", "end_hour").unwrap(),
            ),
        };
        let row = reservation_row(&r, "Sala 201");
        assert_eq!(row["id"], r.id.to_string());
        assert_eq!(row["room_name"], "Sala 201");
        assert_eq!(row["reservation_date"], "2021-10-21");
        assert_eq!(row["start_hour"], "11:00");
        assert_eq!(row["end_hour"], "13:00");
    }

    #[test]
    fn room_row_mapping() {
        let room = Room {
            id: Ulid::new(),
            name: "Sala 201".into(),
        };
        let row = room_row(&room);
        assert_eq!(row["id"], room.id.to_string());
        assert_eq!(row["name"], "Sala 201");
    }

    #[test]
    fn status_table() {
        assert_eq!(status(&EngineError::InvalidRange), 400);
        assert_eq!(status(&EngineError::InvalidName("blank")), 400);
        assert_eq!(status(&EngineError::LimitExceeded("rooms")), 400);
        assert_eq!(status(&EngineError::RoomNotFound("Sala 201".into())), 404);
        assert_eq!(status(&EngineError::ReservationNotFound(Ulid::new())), 404);
        assert_eq!(status(&EngineError::SlotTaken), 409);
        assert_eq!(status(&EngineError::DuplicateRoomName("Sala 201".into())), 409);
        assert_eq!(status(&EngineError::WalError("disk full".into())), 500);
    }
}
