use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use ulid::Ulid;

use crate::model::Room;

/// Known rooms, addressable by id or by exact name.
///
/// Rooms are immutable once created, so reads never coordinate with
/// reservation mutation. Name uniqueness is enforced here: a name is
/// claimed in `by_name` before the room is committed, and released if
/// the commit fails, so two concurrent creates of the same name cannot
/// both win.
pub struct RoomCatalog {
    rooms: DashMap<Ulid, Room>,
    by_name: DashMap<String, Ulid>,
}

impl Default for RoomCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomCatalog {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            by_name: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn get(&self, id: &Ulid) -> Option<Room> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn find_by_name(&self, name: &str) -> Option<Room> {
        let id = *self.by_name.get(name)?;
        self.get(&id)
    }

    /// All rooms, order not significant.
    pub fn list(&self) -> Vec<Room> {
        self.rooms.iter().map(|e| e.value().clone()).collect()
    }

    /// Atomically claim `name` for `id`. False if already claimed.
    pub(crate) fn claim_name(&self, name: &str, id: Ulid) -> bool {
        match self.by_name.entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(id);
                true
            }
        }
    }

    pub(crate) fn release_name(&self, name: &str) {
        self.by_name.remove(name);
    }

    pub(crate) fn insert(&self, room: Room) {
        self.rooms.insert(room.id, room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(catalog: &RoomCatalog, name: &str) -> Room {
        let room = Room {
            id: Ulid::new(),
            name: name.to_string(),
        };
        assert!(catalog.claim_name(name, room.id));
        catalog.insert(room.clone());
        room
    }

    #[test]
    fn find_by_name_resolves() {
        let catalog = RoomCatalog::new();
        let room = put(&catalog, "Sala 201");
        assert_eq!(catalog.find_by_name("Sala 201"), Some(room));
        assert_eq!(catalog.find_by_name("Sala 202"), None);
    }

    #[test]
    fn claim_is_exclusive() {
        let catalog = RoomCatalog::new();
        put(&catalog, "Sala 201");
        assert!(!catalog.claim_name("Sala 201", Ulid::new()));
    }

    #[test]
    fn release_reopens_name() {
        let catalog = RoomCatalog::new();
        assert!(catalog.claim_name("Sala 201", Ulid::new()));
        catalog.release_name("Sala 201");
        assert!(catalog.claim_name("Sala 201", Ulid::new()));
    }

    #[test]
    fn list_returns_all() {
        let catalog = RoomCatalog::new();
        put(&catalog, "Sala 201");
        put(&catalog, "Sala 202");
        assert_eq!(catalog.len(), 2);
        let mut names: Vec<_> = catalog.list().into_iter().map(|r| r.name).collect();
        names.sort();
        assert_eq!(names, vec!["Sala 201", "Sala 202"]);
    }
}
