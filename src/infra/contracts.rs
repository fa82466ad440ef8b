use std::collections::BTreeMap;
use std::io;

use anyhow::Result;

use crate::domain::{admin::AdminConfig, identity::Identity, message::Message, room::Room};

/// Durable persistence contract: one load/save pair per collection, each
/// collection read and replaced as a whole. No business rules live here.
pub trait SessionStore {
    fn load_messages(&self) -> Result<Vec<Message>>;
    fn save_messages(&mut self, messages: &[Message]) -> Result<()>;

    fn load_users(&self) -> Result<Vec<Identity>>;
    fn save_users(&mut self, users: &[Identity]) -> Result<()>;

    fn load_current_identity(&self) -> Result<Option<Identity>>;
    fn save_current_identity(&mut self, identity: &Identity) -> Result<()>;
    fn clear_current_identity(&mut self) -> Result<()>;

    fn load_rooms(&self) -> Result<Vec<Room>>;
    fn save_rooms(&mut self, rooms: &[Room]) -> Result<()>;

    /// Mapping of lowercase username to its saved identity. Append or
    /// overwrite only, never pruned.
    fn load_saved_identities(&self) -> Result<BTreeMap<String, Identity>>;
    fn save_saved_identities(&mut self, identities: &BTreeMap<String, Identity>) -> Result<()>;

    fn load_admin_config(&self) -> Result<Option<AdminConfig>>;
    fn save_admin_config(&mut self, config: &AdminConfig) -> Result<()>;
}

/// Line-oriented terminal used by the interactive shell.
pub trait ChatTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()>;
    /// Returns `None` on EOF.
    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>>;
}
