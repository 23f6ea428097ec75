use ulid::Ulid;

use crate::model::{Reservation, Slot, TimeOfDay};

use super::EngineError;

/// Reject a proposed interval whose start is not strictly before its end.
pub(crate) fn validate_slot(start: TimeOfDay, end: TimeOfDay) -> Result<Slot, EngineError> {
    if start < end {
        Ok(Slot::new(start, end))
    } else {
        Err(EngineError::InvalidRange)
    }
}

/// First committed reservation the proposed slot collides with, if any.
///
/// `excluding` skips one id so an update never collides with the row it
/// is replacing. Candidates that merely touch the proposed slot at an
/// endpoint are not conflicts. Pure; which conflicting row comes back
/// does not matter, any single one is enough to reject.
pub(crate) fn find_conflict<'a>(
    candidates: &'a [Reservation],
    slot: &Slot,
    excluding: Option<Ulid>,
) -> Option<&'a Reservation> {
    candidates
        .iter()
        .find(|r| excluding != Some(r.id) && r.slot.overlaps(slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Day;

    fn hm(h: u32, m: u32) -> TimeOfDay {
        TimeOfDay::from_hms_opt(h, m, 0).unwrap()
    }

    fn row(start: (u32, u32), end: (u32, u32)) -> Reservation {
        Reservation {
            id: Ulid::new(),
            room_id: Ulid::new(),
            day: Day::from_ymd_opt(2021, 10, 21).unwrap(),
            slot: Slot::new(hm(start.0, start.1), hm(end.0, end.1)),
        }
    }

    #[test]
    fn validate_rejects_empty_and_reversed() {
        assert!(matches!(
            validate_slot(hm(11, 0), hm(11, 0)),
            Err(EngineError::InvalidRange)
        ));
        assert!(matches!(
            validate_slot(hm(13, 0), hm(11, 0)),
            Err(EngineError::InvalidRange)
        ));
        let slot = validate_slot(hm(11, 0), hm(13, 0)).unwrap();
        assert_eq!(slot, Slot::new(hm(11, 0), hm(13, 0)));
    }

    #[test]
    fn finds_overlapping_candidate() {
        let rows = vec![row((9, 0), (10, 0)), row((11, 0), (13, 0))];
        let hit = find_conflict(&rows, &Slot::new(hm(12, 0), hm(14, 0)), None);
        assert_eq!(hit.map(|r| r.id), Some(rows[1].id));
    }

    #[test]
    fn adjacent_is_not_conflict() {
        let rows = vec![row((11, 0), (13, 0))];
        assert!(find_conflict(&rows, &Slot::new(hm(13, 0), hm(14, 0)), None).is_none());
        assert!(find_conflict(&rows, &Slot::new(hm(10, 0), hm(11, 0)), None).is_none());
    }

    #[test]
    fn exclusion_skips_own_row() {
        let rows = vec![row((11, 0), (13, 0))];
        let own = rows[0].id;
        // Only overlaps itself — not a conflict when excluded.
        assert!(find_conflict(&rows, &Slot::new(hm(11, 30), hm(12, 30)), Some(own)).is_none());
        // Still a conflict for anyone else.
        assert!(find_conflict(&rows, &Slot::new(hm(11, 30), hm(12, 30)), Some(Ulid::new())).is_some());
    }

    #[test]
    fn exclusion_does_not_mask_other_rows() {
        let rows = vec![row((11, 0), (13, 0)), row((14, 0), (15, 0))];
        let hit = find_conflict(&rows, &Slot::new(hm(14, 30), hm(16, 0)), Some(rows[0].id));
        assert_eq!(hit.map(|r| r.id), Some(rows[1].id));
    }

    #[test]
    fn empty_candidates_never_conflict() {
        assert!(find_conflict(&[], &Slot::new(hm(0, 0), hm(23, 59)), None).is_none());
    }
}
