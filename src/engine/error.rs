use ulid::Ulid;

#[derive(Debug)]
pub enum EngineError {
    /// Proposed start is not strictly before the proposed end.
    InvalidRange,
    RoomNotFound(String),
    ReservationNotFound(Ulid),
    /// The proposed slot overlaps a committed reservation for the same
    /// room and day. Which one is deliberately not reported.
    SlotTaken,
    DuplicateRoomName(String),
    InvalidName(&'static str),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidRange => {
                write!(f, "start hour must be earlier than end hour")
            }
            EngineError::RoomNotFound(name) => write!(f, "meeting room does not exist: {name}"),
            EngineError::ReservationNotFound(id) => write!(f, "reservation not found: {id}"),
            EngineError::SlotTaken => write!(f, "time slot already reserved"),
            EngineError::DuplicateRoomName(name) => {
                write!(f, "room name already taken: {name}")
            }
            EngineError::InvalidName(msg) => write!(f, "invalid room name: {msg}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
