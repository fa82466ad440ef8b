use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identity::new_id;

/// A chat room. The password is a plaintext equality credential, kept as
/// observed behavior (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub password: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub members: Vec<String>,
    pub is_private: bool,
    pub description: Option<String>,
    pub retention_hours: i64,
    pub last_activity: DateTime<Utc>,
}

impl Room {
    /// Creates a room with the owner already in the member list.
    pub fn new(
        owner_id: &str,
        name: &str,
        password: &str,
        is_private: bool,
        description: Option<String>,
        retention_hours: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            name: name.to_owned(),
            password: password.to_owned(),
            owner_id: owner_id.to_owned(),
            created_at: now,
            members: vec![owner_id.to_owned()],
            is_private,
            description,
            retention_hours,
            last_activity: now,
        }
    }

    pub fn has_member(&self, identity_id: &str) -> bool {
        self.members.iter().any(|id| id == identity_id)
    }
}
