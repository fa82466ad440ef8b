use serde::{Deserialize, Serialize};

/// Id of the always-available general chat context.
pub const GENERAL_CONTEXT_ID: &str = "general";
pub const GENERAL_CONTEXT_NAME: &str = "General Chat";

/// Kind of target a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    #[default]
    General,
    Direct,
    Room,
}

/// The active chat context: the general chat, a room, or a direct-message
/// pairing (where `id` is the partner's identity id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    pub id: String,
    pub kind: ContextKind,
    pub name: String,
}

impl ChatContext {
    pub fn general() -> Self {
        Self {
            id: GENERAL_CONTEXT_ID.to_owned(),
            kind: ContextKind::General,
            name: GENERAL_CONTEXT_NAME.to_owned(),
        }
    }

    pub fn room(id: &str, name: &str) -> Self {
        Self {
            id: id.to_owned(),
            kind: ContextKind::Room,
            name: name.to_owned(),
        }
    }

    pub fn direct(partner_id: &str, partner_name: &str) -> Self {
        Self {
            id: partner_id.to_owned(),
            kind: ContextKind::Direct,
            name: partner_name.to_owned(),
        }
    }
}
