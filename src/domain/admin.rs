use serde::{Deserialize, Serialize};

/// Retention applied to general-chat messages when no admin config exists.
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Process-wide admin configuration. Written exactly once when the first
/// admin login completes setup; its existence is the signal that admin
/// bootstrap has happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    pub admin_password: String,
    pub default_retention_hours: i64,
    pub allow_room_creation: bool,
    pub max_rooms_per_member: u32,
    pub welcome_message: Option<String>,
}

impl AdminConfig {
    pub fn bootstrap(admin_password: &str) -> Self {
        Self {
            admin_password: admin_password.to_owned(),
            default_retention_hours: DEFAULT_RETENTION_HOURS,
            allow_room_creation: true,
            max_rooms_per_member: 5,
            welcome_message: Some("Welcome to the parlor!".to_owned()),
        }
    }
}
