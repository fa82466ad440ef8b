use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identity::{new_id, Identity};

/// A single chat message. Author name and color are denormalized at send
/// time and never re-derived from the users collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub color: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    /// Target context: the general id, a room id, or a DM partner's id.
    pub context_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub reply_to: Option<String>,
    /// emoji -> ids of identities that reacted. Entries are unique per emoji.
    pub reactions: BTreeMap<String, Vec<String>>,
    pub is_deleted: bool,
    pub is_pinned: bool,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(
        author: &Identity,
        context_id: &str,
        body: &str,
        reply_to: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            author_id: author.id.clone(),
            author_name: author.username.clone(),
            color: author.color.clone(),
            body: body.to_owned(),
            sent_at: now,
            context_id: context_id.to_owned(),
            expires_at,
            reply_to,
            reactions: BTreeMap::new(),
            is_deleted: false,
            is_pinned: false,
            is_edited: false,
            edited_at: None,
        }
    }

    /// A message survives a sweep iff it never expires, has not expired
    /// yet, or is pinned.
    pub fn is_retained(&self, now: DateTime<Utc>) -> bool {
        self.is_pinned || self.expires_at.map_or(true, |expiry| expiry > now)
    }

    /// Body text suitable for rendering. Tombstoned messages keep their
    /// body in the collection but must never show it.
    pub fn display_body(&self) -> Option<&str> {
        if self.is_deleted {
            None
        } else {
            Some(&self.body)
        }
    }

    /// Toggles `identity_id` under `emoji`: removes it when present (and
    /// drops the emoji key when emptied), adds it otherwise.
    pub fn toggle_reaction(&mut self, identity_id: &str, emoji: &str) {
        let entries = self.reactions.entry(emoji.to_owned()).or_default();
        match entries.iter().position(|id| id == identity_id) {
            Some(index) => {
                entries.remove(index);
                if entries.is_empty() {
                    self.reactions.remove(emoji);
                }
            }
            None => entries.push(identity_id.to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        let author = Identity::new("ada", false, Utc::now());
        Message::new(&author, "general", "hello", None, None, Utc::now())
    }

    #[test]
    fn message_without_expiry_is_always_retained() {
        let msg = message();

        assert!(msg.is_retained(Utc::now() + chrono::Duration::days(365)));
    }

    #[test]
    fn expired_message_is_not_retained() {
        let mut msg = message();
        msg.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));

        assert!(!msg.is_retained(Utc::now()));
    }

    #[test]
    fn pinned_message_is_retained_past_expiry() {
        let mut msg = message();
        msg.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        msg.is_pinned = true;

        assert!(msg.is_retained(Utc::now()));
    }

    #[test]
    fn tombstoned_body_is_hidden() {
        let mut msg = message();
        assert_eq!(msg.display_body(), Some("hello"));

        msg.is_deleted = true;
        assert_eq!(msg.display_body(), None);
        assert_eq!(msg.body, "hello");
    }

    #[test]
    fn reaction_toggle_is_its_own_inverse() {
        let mut msg = message();

        msg.toggle_reaction("u1", "👍");
        assert_eq!(msg.reactions["👍"], vec!["u1".to_owned()]);

        msg.toggle_reaction("u1", "👍");
        assert!(msg.reactions.is_empty());
    }

    #[test]
    fn distinct_reactors_accumulate_under_one_emoji() {
        let mut msg = message();

        msg.toggle_reaction("u1", "🎉");
        msg.toggle_reaction("u2", "🎉");

        assert_eq!(msg.reactions["🎉"].len(), 2);

        msg.toggle_reaction("u1", "🎉");
        assert_eq!(msg.reactions["🎉"], vec!["u2".to_owned()]);
    }
}
