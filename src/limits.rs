//! Hard caps on catalog and store growth.

/// Longest accepted room name, in bytes.
pub const MAX_ROOM_NAME_LEN: usize = 80;

/// Rooms one catalog will hold.
pub const MAX_ROOMS: usize = 10_000;

/// Reservations one room will take on a single day.
pub const MAX_RESERVATIONS_PER_DAY: usize = 1_000;
