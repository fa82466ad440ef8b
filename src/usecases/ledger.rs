//! Message lifecycle: send, edit, soft-delete, pin/unpin, react, and the
//! lazy expiration sweep.
//!
//! The ledger owns the in-memory message collection; every mutation is
//! written through the store before it is considered committed.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::domain::admin::{AdminConfig, DEFAULT_RETENTION_HOURS};
use crate::domain::context::GENERAL_CONTEXT_ID;
use crate::domain::identity::Identity;
use crate::domain::message::Message;
use crate::domain::room::Room;
use crate::infra::contracts::SessionStore;

pub struct MessageLedger {
    messages: Vec<Message>,
}

impl MessageLedger {
    /// Loads the collection, sweeping expired messages on the way in.
    pub fn load(store: &mut dyn SessionStore, now: DateTime<Utc>) -> Result<Self> {
        let mut ledger = Self {
            messages: store.load_messages()?,
        };
        ledger.sweep(store, now)?;
        Ok(ledger)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages for one context, in insertion order. Callers partition
    /// pinned vs. unpinned for display; that is a derived view.
    pub fn list_for(&self, context_id: &str) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|message| message.context_id == context_id)
            .collect()
    }

    pub fn send(
        &mut self,
        store: &mut dyn SessionStore,
        author: &Identity,
        context_id: &str,
        body: &str,
        reply_to: Option<String>,
        rooms: &[Room],
        admin_config: Option<&AdminConfig>,
        now: DateTime<Utc>,
    ) -> Result<Message> {
        let expires_at = expiry_for(context_id, rooms, admin_config, now);
        let message = Message::new(author, context_id, body, reply_to, expires_at, now);
        self.messages.push(message.clone());
        store.save_messages(&self.messages)?;
        Ok(message)
    }

    /// Author-only edit; a mismatched actor or unknown id is a no-op.
    /// Editing never touches expiration.
    pub fn edit(
        &mut self,
        store: &mut dyn SessionStore,
        id: &str,
        new_body: &str,
        acting: &Identity,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(message) = self
            .messages
            .iter_mut()
            .find(|message| message.id == id && message.author_id == acting.id)
        else {
            return Ok(false);
        };

        message.body = new_body.to_owned();
        message.is_edited = true;
        message.edited_at = Some(now);
        store.save_messages(&self.messages)?;
        Ok(true)
    }

    /// Tombstones the message: id, metadata, and ordering survive, the
    /// body is never rendered again.
    pub fn soft_delete(&mut self, store: &mut dyn SessionStore, id: &str) -> Result<bool> {
        let Some(message) = self.messages.iter_mut().find(|message| message.id == id) else {
            return Ok(false);
        };

        message.is_deleted = true;
        store.save_messages(&self.messages)?;
        Ok(true)
    }

    /// Pinning exempts the message from expiration entirely.
    pub fn pin(&mut self, store: &mut dyn SessionStore, id: &str) -> Result<bool> {
        let Some(message) = self.messages.iter_mut().find(|message| message.id == id) else {
            return Ok(false);
        };

        message.is_pinned = true;
        message.expires_at = None;
        store.save_messages(&self.messages)?;
        Ok(true)
    }

    /// Unpinning grants a fresh full retention window computed at unpin
    /// time, not from the original send time.
    pub fn unpin(
        &mut self,
        store: &mut dyn SessionStore,
        id: &str,
        rooms: &[Room],
        admin_config: Option<&AdminConfig>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(message) = self.messages.iter_mut().find(|message| message.id == id) else {
            return Ok(false);
        };

        message.is_pinned = false;
        message.expires_at = expiry_for(&message.context_id, rooms, admin_config, now);
        store.save_messages(&self.messages)?;
        Ok(true)
    }

    /// Idempotent reaction toggle.
    pub fn react(
        &mut self,
        store: &mut dyn SessionStore,
        id: &str,
        identity_id: &str,
        emoji: &str,
    ) -> Result<bool> {
        let Some(message) = self.messages.iter_mut().find(|message| message.id == id) else {
            return Ok(false);
        };

        message.toggle_reaction(identity_id, emoji);
        store.save_messages(&self.messages)?;
        Ok(true)
    }

    /// Applies a changed default retention to every unpinned
    /// general-context message.
    pub fn retarget_general_retention(
        &mut self,
        store: &mut dyn SessionStore,
        hours: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        for message in &mut self.messages {
            if message.context_id == GENERAL_CONTEXT_ID && !message.is_pinned {
                message.expires_at = Some(now + Duration::hours(hours));
            }
        }
        store.save_messages(&self.messages)
    }

    /// Prunes expired messages and writes the compacted collection back
    /// when anything was removed. Returns the pruned count.
    pub fn sweep(&mut self, store: &mut dyn SessionStore, now: DateTime<Utc>) -> Result<usize> {
        let before = self.messages.len();
        self.messages.retain(|message| message.is_retained(now));
        let pruned = before - self.messages.len();

        if pruned > 0 {
            tracing::debug!(pruned, "expired messages swept");
            store.save_messages(&self.messages)?;
        }
        Ok(pruned)
    }
}

/// Retention rule: rooms carry their own window, the general context uses
/// the admin default (24h fallback), direct messages get no expiry.
fn expiry_for(
    context_id: &str,
    rooms: &[Room],
    admin_config: Option<&AdminConfig>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if context_id == GENERAL_CONTEXT_ID {
        let hours = admin_config
            .map(|config| config.default_retention_hours)
            .unwrap_or(DEFAULT_RETENTION_HOURS);
        return Some(now + Duration::hours(hours));
    }

    rooms
        .iter()
        .find(|room| room.id == context_id)
        .map(|room| now + Duration::hours(room.retention_hours))
}
