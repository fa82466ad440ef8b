//! In-memory [`SessionStore`] fake used by unit tests.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::domain::{admin::AdminConfig, identity::Identity, message::Message, room::Room};
use crate::infra::contracts::SessionStore;

#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    pub messages: Vec<Message>,
    pub users: Vec<Identity>,
    pub current_identity: Option<Identity>,
    pub rooms: Vec<Room>,
    pub saved_identities: BTreeMap<String, Identity>,
    pub admin_config: Option<AdminConfig>,
}

impl SessionStore for MemorySessionStore {
    fn load_messages(&self) -> Result<Vec<Message>> {
        Ok(self.messages.clone())
    }

    fn save_messages(&mut self, messages: &[Message]) -> Result<()> {
        self.messages = messages.to_vec();
        Ok(())
    }

    fn load_users(&self) -> Result<Vec<Identity>> {
        Ok(self.users.clone())
    }

    fn save_users(&mut self, users: &[Identity]) -> Result<()> {
        self.users = users.to_vec();
        Ok(())
    }

    fn load_current_identity(&self) -> Result<Option<Identity>> {
        Ok(self.current_identity.clone())
    }

    fn save_current_identity(&mut self, identity: &Identity) -> Result<()> {
        self.current_identity = Some(identity.clone());
        Ok(())
    }

    fn clear_current_identity(&mut self) -> Result<()> {
        self.current_identity = None;
        Ok(())
    }

    fn load_rooms(&self) -> Result<Vec<Room>> {
        Ok(self.rooms.clone())
    }

    fn save_rooms(&mut self, rooms: &[Room]) -> Result<()> {
        self.rooms = rooms.to_vec();
        Ok(())
    }

    fn load_saved_identities(&self) -> Result<BTreeMap<String, Identity>> {
        Ok(self.saved_identities.clone())
    }

    fn save_saved_identities(&mut self, identities: &BTreeMap<String, Identity>) -> Result<()> {
        self.saved_identities = identities.clone();
        Ok(())
    }

    fn load_admin_config(&self) -> Result<Option<AdminConfig>> {
        Ok(self.admin_config.clone())
    }

    fn save_admin_config(&mut self, config: &AdminConfig) -> Result<()> {
        self.admin_config = Some(config.clone());
        Ok(())
    }
}
