use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Username that escalates a login to admin access.
pub const ADMIN_USERNAME: &str = "admin";

/// Fixed palette used for identity colors; also the color every admin
/// identity gets at bootstrap (first entry).
pub const COLOR_PALETTE: [&str; 15] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7", "#DDA0DD", "#98D8C8", "#F7DC6F",
    "#BB8FCE", "#85C1E9", "#F8C471", "#82E0AA", "#AED6F1", "#D7BDE2", "#F9E79F",
];

/// Locally recorded presence. There is no heartbeat behind this; it only
/// changes through login, logout, or the optional presence sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[default]
    Online,
    Away,
    Busy,
}

/// A chat participant's durable profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub color: String,
    pub is_admin: bool,
    pub status: PresenceStatus,
    pub joined_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Identity {
    /// Mints a fresh identity with a random palette color.
    pub fn new(username: &str, is_admin: bool, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            username: username.to_owned(),
            color: pick_color(),
            is_admin,
            status: PresenceStatus::Online,
            joined_at: now,
            last_seen: now,
        }
    }

    /// Case-insensitive username comparison, the uniqueness rule for both
    /// present identities and saved-identity lookups.
    pub fn has_username(&self, username: &str) -> bool {
        self.username.eq_ignore_ascii_case(username)
    }

    /// Refreshes a restored identity for a new session: timestamps are
    /// renewed and presence is forced online, id and color are preserved.
    pub fn refreshed(mut self, now: DateTime<Utc>) -> Self {
        self.joined_at = now;
        self.last_seen = now;
        self.status = PresenceStatus::Online;
        self
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn pick_color() -> String {
    COLOR_PALETTE
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(COLOR_PALETTE[0])
        .to_owned()
}
