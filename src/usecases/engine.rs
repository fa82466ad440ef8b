//! The session state machine composing the login flow, room registry, and
//! message ledger, and the operation surface the presentation layer calls.
//!
//! The engine owns the authoritative in-memory snapshot for the lifetime
//! of a session and is the only writer back to the store. Operations are
//! synchronous and run to completion; mutations hit the store before the
//! in-memory state is considered committed.

use anyhow::Result;
use chrono::{Duration, Utc};

use crate::domain::context::ChatContext;
use crate::domain::identity::Identity;
use crate::domain::message::Message;
use crate::domain::room::Room;
use crate::infra::config::FeatureConfig;
use crate::infra::contracts::SessionStore;
use crate::usecases::access::{AccessLevel, LoginSession};
use crate::usecases::ledger::MessageLedger;
use crate::usecases::rooms::{JoinOutcome, RoomRegistry, RoomView};

/// Per-session state held only while authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub access: AccessLevel,
    pub restricted_room_id: Option<String>,
    pub active: ChatContext,
}

pub struct ChatEngine<S> {
    store: S,
    features: FeatureConfig,
    ledger: MessageLedger,
    registry: RoomRegistry,
    session: Option<Session>,
    /// Transient reply draft; never persisted, consumed on send.
    reply_target: Option<String>,
}

impl<S: SessionStore> ChatEngine<S> {
    pub fn new(mut store: S, features: FeatureConfig) -> Result<Self> {
        let ledger = MessageLedger::load(&mut store, Utc::now())?;
        let registry = RoomRegistry::load(&store)?;

        Ok(Self {
            store,
            features,
            ledger,
            registry,
            session: None,
            reply_target: None,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Direct store access for the interactive login flow, which writes
    /// through the same store the engine owns.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Enters the authenticated state. The initial context is the
    /// restricted room for room-level access, the general chat otherwise.
    pub fn login(&mut self, login: LoginSession) -> Result<()> {
        self.ledger = MessageLedger::load(&mut self.store, Utc::now())?;
        self.registry = RoomRegistry::load(&self.store)?;

        let active = match login.grant.restricted_room_id.as_deref() {
            Some(room_id) => {
                let name = self
                    .registry
                    .find(room_id)
                    .map(|room| room.name.clone())
                    .unwrap_or_else(|| "Room".to_owned());
                ChatContext::room(room_id, &name)
            }
            None => ChatContext::general(),
        };

        self.session = Some(Session {
            identity: login.identity,
            access: login.grant.level,
            restricted_room_id: login.grant.restricted_room_id,
            active,
        });
        self.reply_target = None;
        Ok(())
    }

    /// Marks the identity offline by removing it from the presence
    /// collection and clears the current identity. History is kept.
    pub fn logout(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            let users: Vec<Identity> = self
                .store
                .load_users()?
                .into_iter()
                .filter(|user| user.id != session.identity.id)
                .collect();
            self.store.save_users(&users)?;
        }
        self.store.clear_current_identity()?;
        self.reply_target = None;
        Ok(())
    }

    // -- messaging ---------------------------------------------------------

    /// Sends into the active context, consuming any pending reply target
    /// when no explicit one is given. Returns `None` while logged out.
    pub fn send_message(&mut self, body: &str, reply_to: Option<String>) -> Result<Option<Message>> {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };

        let reply_to = reply_to.or_else(|| self.reply_target.take());
        self.reply_target = None;

        let admin_config = self.store.load_admin_config()?;
        let message = self.ledger.send(
            &mut self.store,
            &session.identity,
            &session.active.id,
            body,
            reply_to,
            self.registry.rooms(),
            admin_config.as_ref(),
            Utc::now(),
        )?;
        Ok(Some(message))
    }

    pub fn edit_message(&mut self, id: &str, new_body: &str) -> Result<bool> {
        let Some(session) = self.session.as_ref() else {
            return Ok(false);
        };
        let identity = session.identity.clone();
        self.ledger
            .edit(&mut self.store, id, new_body, &identity, Utc::now())
    }

    pub fn react_to_message(&mut self, id: &str, emoji: &str) -> Result<bool> {
        let Some(session) = self.session.as_ref() else {
            return Ok(false);
        };
        let identity_id = session.identity.id.clone();
        self.ledger.react(&mut self.store, id, &identity_id, emoji)
    }

    pub fn delete_message(&mut self, id: &str) -> Result<bool> {
        if self.session.is_none() {
            return Ok(false);
        }
        self.ledger.soft_delete(&mut self.store, id)
    }

    pub fn pin_message(&mut self, id: &str) -> Result<bool> {
        if self.session.is_none() {
            return Ok(false);
        }
        self.ledger.pin(&mut self.store, id)
    }

    pub fn unpin_message(&mut self, id: &str) -> Result<bool> {
        if self.session.is_none() {
            return Ok(false);
        }
        let admin_config = self.store.load_admin_config()?;
        self.ledger.unpin(
            &mut self.store,
            id,
            self.registry.rooms(),
            admin_config.as_ref(),
            Utc::now(),
        )
    }

    /// Sweeps lazily, then returns the active context's messages in
    /// insertion order. Empty while logged out.
    pub fn list_visible_messages(&mut self) -> Result<Vec<Message>> {
        let Some(session) = self.session.as_ref() else {
            return Ok(Vec::new());
        };
        let context_id = session.active.id.clone();

        self.ledger.sweep(&mut self.store, Utc::now())?;
        Ok(self
            .ledger
            .list_for(&context_id)
            .into_iter()
            .cloned()
            .collect())
    }

    // -- reply draft -------------------------------------------------------

    /// Records a reply target; unknown ids are ignored.
    pub fn set_reply_target(&mut self, id: &str) {
        if self
            .ledger
            .messages()
            .iter()
            .any(|message| message.id == id)
        {
            self.reply_target = Some(id.to_owned());
        }
    }

    pub fn clear_reply_target(&mut self) {
        self.reply_target = None;
    }

    pub fn reply_target(&self) -> Option<&str> {
        self.reply_target.as_deref()
    }

    // -- contexts ----------------------------------------------------------

    /// Pure state replace. Clearing the reply draft on a context switch
    /// is the shell's contract, not the engine's.
    pub fn switch_context(&mut self, context: ChatContext) {
        if let Some(session) = self.session.as_mut() {
            session.active = context;
        }
    }

    pub fn active_context(&self) -> Option<&ChatContext> {
        self.session.as_ref().map(|session| &session.active)
    }

    /// No-op for room-restricted sessions.
    pub fn start_direct_message(&mut self, partner: &Identity) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.access == AccessLevel::Room {
            return false;
        }
        session.active = ChatContext::direct(&partner.id, &partner.username);
        true
    }

    // -- rooms -------------------------------------------------------------

    /// Creates a room and makes it the active context. Room-restricted
    /// sessions cannot create rooms.
    pub fn create_room(
        &mut self,
        name: &str,
        password: &str,
        is_private: bool,
        description: Option<String>,
        retention_hours: i64,
    ) -> Result<Option<Room>> {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };
        if session.access == AccessLevel::Room {
            return Ok(None);
        }
        let owner = session.identity.clone();

        let room = self.registry.create(
            &mut self.store,
            &owner,
            name,
            password,
            is_private,
            description,
            retention_hours,
            Utc::now(),
        )?;

        self.switch_context(ChatContext::room(&room.id, &room.name));
        Ok(Some(room))
    }

    /// Joins (idempotently) and switches the active context on success.
    pub fn join_room(&mut self, room_id: &str, password: &str) -> Result<JoinOutcome> {
        let Some(session) = self.session.as_ref() else {
            return Ok(JoinOutcome::Rejected);
        };
        let identity_id = session.identity.id.clone();

        let outcome =
            self.registry
                .join(&mut self.store, room_id, password, &identity_id, Utc::now())?;

        if matches!(outcome, JoinOutcome::Joined | JoinOutcome::AlreadyMember) {
            if let Some(room) = self.registry.find(room_id) {
                let context = ChatContext::room(&room.id, &room.name);
                self.switch_context(context);
            }
        }
        Ok(outcome)
    }

    pub fn visible_rooms(&self) -> Vec<&Room> {
        match self.session.as_ref() {
            Some(session) => self
                .registry
                .visible_to(session.access, session.restricted_room_id.as_deref()),
            None => Vec::new(),
        }
    }

    pub fn room_view(&self) -> Option<RoomView<'_>> {
        self.session.as_ref().map(|session| {
            self.registry.view_for(
                session.access,
                session.restricted_room_id.as_deref(),
                &session.identity.id,
            )
        })
    }

    /// Gated behind the `leave_room` feature flag; a disabled flag makes
    /// this a no-op.
    pub fn leave_room(&mut self, room_id: &str) -> Result<bool> {
        if !self.features.leave_room {
            return Ok(false);
        }
        let Some(session) = self.session.as_ref() else {
            return Ok(false);
        };
        let identity_id = session.identity.id.clone();
        self.registry.leave(&mut self.store, room_id, &identity_id)
    }

    // -- admin -------------------------------------------------------------

    /// Admin-only; silently ignored for other callers (the engine
    /// re-checks even though the shell hides the control). Updates the
    /// stored default and re-targets unpinned general messages.
    pub fn update_retention(&mut self, hours: i64) -> Result<bool> {
        if !self.is_admin() {
            return Ok(false);
        }

        if let Some(mut config) = self.store.load_admin_config()? {
            config.default_retention_hours = hours;
            self.store.save_admin_config(&config)?;
        }
        self.ledger
            .retarget_general_retention(&mut self.store, hours, Utc::now())?;
        Ok(true)
    }

    /// Admin-only; silently ignored for other callers.
    pub fn update_admin_password(&mut self, new_password: &str) -> Result<bool> {
        if !self.is_admin() {
            return Ok(false);
        }

        if let Some(mut config) = self.store.load_admin_config()? {
            config.admin_password = new_password.to_owned();
            self.store.save_admin_config(&config)?;
        }
        Ok(true)
    }

    fn is_admin(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.identity.is_admin)
    }

    // -- presence ----------------------------------------------------------

    pub fn present_users(&self) -> Result<Vec<Identity>> {
        self.store.load_users()
    }

    /// Gated behind `presence_timeout_minutes`: drops identities (other
    /// than the current one) unseen for longer than the timeout. Returns
    /// the number removed.
    pub fn sweep_presence(&mut self) -> Result<usize> {
        let Some(minutes) = self.features.presence_timeout_minutes else {
            return Ok(0);
        };
        let current_id = self
            .session
            .as_ref()
            .map(|session| session.identity.id.clone());
        let cutoff = Utc::now() - Duration::minutes(minutes as i64);

        let users = self.store.load_users()?;
        let before = users.len();
        let retained: Vec<Identity> = users
            .into_iter()
            .filter(|user| Some(&user.id) == current_id.as_ref() || user.last_seen >= cutoff)
            .collect();

        let removed = before - retained.len();
        if removed > 0 {
            self.store.save_users(&retained)?;
            tracing::debug!(removed, "stale presence entries swept");
        }
        Ok(removed)
    }
}
