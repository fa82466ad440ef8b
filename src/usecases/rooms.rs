//! Room registry: creation, password-gated join, visibility filtering.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::identity::Identity;
use crate::domain::room::Room;
use crate::infra::contracts::SessionStore;
use crate::usecases::access::AccessLevel;

/// Result of a join attempt. A wrong password is a recoverable rejection,
/// never an interruption the caller has to catch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    Rejected,
    UnknownRoom,
}

/// Visible rooms split into the caller's rooms and the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView<'a> {
    pub mine: Vec<&'a Room>,
    pub available: Vec<&'a Room>,
}

pub struct RoomRegistry {
    rooms: Vec<Room>,
}

impl RoomRegistry {
    pub fn load(store: &dyn SessionStore) -> Result<Self> {
        Ok(Self {
            rooms: store.load_rooms()?,
        })
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn find(&self, id: &str) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }

    pub fn create(
        &mut self,
        store: &mut dyn SessionStore,
        owner: &Identity,
        name: &str,
        password: &str,
        is_private: bool,
        description: Option<String>,
        retention_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<Room> {
        let room = Room::new(
            &owner.id,
            name,
            password,
            is_private,
            description,
            retention_hours,
            now,
        );
        self.rooms.push(room.clone());
        store.save_rooms(&self.rooms)?;
        tracing::debug!(room = %room.name, private = is_private, "room created");
        Ok(room)
    }

    /// Membership is idempotent; `last_activity` is bumped only when the
    /// member list actually grows.
    pub fn join(
        &mut self,
        store: &mut dyn SessionStore,
        room_id: &str,
        supplied_password: &str,
        identity_id: &str,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome> {
        let Some(room) = self.rooms.iter_mut().find(|room| room.id == room_id) else {
            return Ok(JoinOutcome::UnknownRoom);
        };

        if room.password != supplied_password {
            return Ok(JoinOutcome::Rejected);
        }

        if room.has_member(identity_id) {
            return Ok(JoinOutcome::AlreadyMember);
        }

        room.members.push(identity_id.to_owned());
        room.last_activity = now;
        store.save_rooms(&self.rooms)?;
        Ok(JoinOutcome::Joined)
    }

    /// Visibility rule: admin sees everything, room-restricted sessions
    /// see only their room, public sessions see non-private rooms.
    pub fn visible_to(&self, access: AccessLevel, restricted_room_id: Option<&str>) -> Vec<&Room> {
        self.rooms
            .iter()
            .filter(|room| match access {
                AccessLevel::Admin => true,
                AccessLevel::Room => Some(room.id.as_str()) == restricted_room_id,
                AccessLevel::Public => !room.is_private,
            })
            .collect()
    }

    /// Derived display view over [`Self::visible_to`].
    pub fn view_for(
        &self,
        access: AccessLevel,
        restricted_room_id: Option<&str>,
        identity_id: &str,
    ) -> RoomView<'_> {
        let (mine, available) = self
            .visible_to(access, restricted_room_id)
            .into_iter()
            .partition(|room| room.has_member(identity_id));
        RoomView { mine, available }
    }

    /// Removes a member. Callers gate this behind the `leave_room`
    /// feature flag; the operation itself is unconditional.
    pub fn leave(
        &mut self,
        store: &mut dyn SessionStore,
        room_id: &str,
        identity_id: &str,
    ) -> Result<bool> {
        let Some(room) = self.rooms.iter_mut().find(|room| room.id == room_id) else {
            return Ok(false);
        };

        let before = room.members.len();
        room.members.retain(|member| member != identity_id);
        if room.members.len() == before {
            return Ok(false);
        }

        store.save_rooms(&self.rooms)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::stubs::MemorySessionStore;

    fn owner() -> Identity {
        Identity::new("owner", false, Utc::now())
    }

    fn registry_with_room(store: &mut MemorySessionStore) -> (RoomRegistry, Room) {
        let mut registry = RoomRegistry::load(store).expect("load");
        let room = registry
            .create(store, &owner(), "den", "hunter2", true, None, 48, Utc::now())
            .expect("create");
        (registry, room)
    }

    #[test]
    fn create_persists_room_with_owner_membership() {
        let mut store = MemorySessionStore::default();
        let (_registry, room) = registry_with_room(&mut store);

        assert_eq!(store.rooms.len(), 1);
        assert!(store.rooms[0].has_member(&room.owner_id));
    }

    #[test]
    fn join_with_wrong_password_is_rejected_not_fatal() {
        let mut store = MemorySessionStore::default();
        let (mut registry, room) = registry_with_room(&mut store);

        let outcome = registry
            .join(&mut store, &room.id, "wrong", "visitor", Utc::now())
            .expect("join must not error");

        assert_eq!(outcome, JoinOutcome::Rejected);
        assert!(!store.rooms[0].has_member("visitor"));
    }

    #[test]
    fn joining_twice_yields_a_single_membership() {
        let mut store = MemorySessionStore::default();
        let (mut registry, room) = registry_with_room(&mut store);

        let first = registry
            .join(&mut store, &room.id, "hunter2", "visitor", Utc::now())
            .expect("join");
        let second = registry
            .join(&mut store, &room.id, "hunter2", "visitor", Utc::now())
            .expect("join");

        assert_eq!(first, JoinOutcome::Joined);
        assert_eq!(second, JoinOutcome::AlreadyMember);
        let occurrences = store.rooms[0]
            .members
            .iter()
            .filter(|member| *member == "visitor")
            .count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn join_bumps_last_activity_only_on_membership_growth() {
        let mut store = MemorySessionStore::default();
        let (mut registry, room) = registry_with_room(&mut store);

        let join_time = Utc::now() + chrono::Duration::hours(1);
        registry
            .join(&mut store, &room.id, "hunter2", "visitor", join_time)
            .expect("join");
        assert_eq!(registry.find(&room.id).expect("room").last_activity, join_time);

        let revisit = join_time + chrono::Duration::hours(1);
        registry
            .join(&mut store, &room.id, "hunter2", "visitor", revisit)
            .expect("join");
        assert_eq!(registry.find(&room.id).expect("room").last_activity, join_time);
    }

    #[test]
    fn room_restricted_session_sees_only_its_room() {
        let mut store = MemorySessionStore::default();
        let mut registry = RoomRegistry::load(&store).expect("load");
        let restricted = registry
            .create(&mut store, &owner(), "den", "pw1", true, None, 24, Utc::now())
            .expect("create");
        registry
            .create(&mut store, &owner(), "lobby", "pw2", false, None, 24, Utc::now())
            .expect("create");

        let visible = registry.visible_to(AccessLevel::Room, Some(&restricted.id));

        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, restricted.id);
    }

    #[test]
    fn public_session_sees_only_public_rooms_and_admin_sees_all() {
        let mut store = MemorySessionStore::default();
        let mut registry = RoomRegistry::load(&store).expect("load");
        registry
            .create(&mut store, &owner(), "den", "pw1", true, None, 24, Utc::now())
            .expect("create");
        let lobby = registry
            .create(&mut store, &owner(), "lobby", "pw2", false, None, 24, Utc::now())
            .expect("create");

        let public = registry.visible_to(AccessLevel::Public, None);
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, lobby.id);

        assert_eq!(registry.visible_to(AccessLevel::Admin, None).len(), 2);
    }

    #[test]
    fn view_partitions_membership() {
        let mut store = MemorySessionStore::default();
        let mut registry = RoomRegistry::load(&store).expect("load");
        let owner = owner();
        let mine = registry
            .create(&mut store, &owner, "mine", "pw1", false, None, 24, Utc::now())
            .expect("create");
        let other = Identity::new("other", false, Utc::now());
        let available = registry
            .create(&mut store, &other, "theirs", "pw2", false, None, 24, Utc::now())
            .expect("create");

        let view = registry.view_for(AccessLevel::Public, None, &owner.id);

        assert_eq!(view.mine.len(), 1);
        assert_eq!(view.mine[0].id, mine.id);
        assert_eq!(view.available.len(), 1);
        assert_eq!(view.available[0].id, available.id);
    }

    #[test]
    fn leave_removes_membership_once() {
        let mut store = MemorySessionStore::default();
        let (mut registry, room) = registry_with_room(&mut store);
        registry
            .join(&mut store, &room.id, "hunter2", "visitor", Utc::now())
            .expect("join");

        assert!(registry
            .leave(&mut store, &room.id, "visitor")
            .expect("leave"));
        assert!(!registry
            .leave(&mut store, &room.id, "visitor")
            .expect("leave again"));
        assert!(!store.rooms[0].has_member("visitor"));
    }
}
