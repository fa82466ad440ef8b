//! Durable [`SessionStore`] backed by one JSON file per collection.
//!
//! Writes go through a temp file plus rename so a crash mid-write never
//! leaves a half-serialized collection behind. A missing or corrupt file
//! loads as an empty collection; corruption is logged, not surfaced.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::{admin::AdminConfig, identity::Identity, message::Message, room::Room};
use crate::infra::{contracts::SessionStore, error::AppError, storage_layout::StorageLayout};

const MESSAGES_FILE: &str = "messages.json";
const USERS_FILE: &str = "users.json";
const CURRENT_IDENTITY_FILE: &str = "current_identity.json";
const ROOMS_FILE: &str = "rooms.json";
const SAVED_IDENTITIES_FILE: &str = "saved_identities.json";
const ADMIN_CONFIG_FILE: &str = "admin_config.json";

pub struct JsonSessionStore {
    layout: StorageLayout,
}

impl JsonSessionStore {
    pub fn open(layout: StorageLayout) -> Result<Self, AppError> {
        layout.ensure_dirs()?;
        tracing::debug!(dir = %layout.data_dir.display(), "session store opened");
        Ok(Self { layout })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.layout.data_dir.join(file)
    }

    fn read<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, AppError> {
        let path = self.path(file);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => return Err(AppError::CollectionRead { path, source }),
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "corrupt collection file, treating as empty"
                );
                Ok(T::default())
            }
        }
    }

    fn write<T: Serialize>(&self, file: &'static str, value: &T) -> Result<(), AppError> {
        let path = self.path(file);
        let encoded = serde_json::to_string_pretty(value).map_err(|source| {
            AppError::CollectionEncode {
                collection: file,
                source,
            }
        })?;

        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, encoded).map_err(|source| AppError::CollectionWrite {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| AppError::CollectionWrite { path, source })
    }

    fn remove(&self, file: &str) -> Result<(), AppError> {
        let path = self.path(file);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AppError::CollectionWrite { path, source }),
        }
    }
}

impl SessionStore for JsonSessionStore {
    fn load_messages(&self) -> Result<Vec<Message>> {
        Ok(self.read(MESSAGES_FILE)?)
    }

    fn save_messages(&mut self, messages: &[Message]) -> Result<()> {
        Ok(self.write(MESSAGES_FILE, &messages)?)
    }

    fn load_users(&self) -> Result<Vec<Identity>> {
        Ok(self.read(USERS_FILE)?)
    }

    fn save_users(&mut self, users: &[Identity]) -> Result<()> {
        Ok(self.write(USERS_FILE, &users)?)
    }

    fn load_current_identity(&self) -> Result<Option<Identity>> {
        Ok(self.read(CURRENT_IDENTITY_FILE)?)
    }

    fn save_current_identity(&mut self, identity: &Identity) -> Result<()> {
        Ok(self.write(CURRENT_IDENTITY_FILE, &Some(identity))?)
    }

    fn clear_current_identity(&mut self) -> Result<()> {
        Ok(self.remove(CURRENT_IDENTITY_FILE)?)
    }

    fn load_rooms(&self) -> Result<Vec<Room>> {
        Ok(self.read(ROOMS_FILE)?)
    }

    fn save_rooms(&mut self, rooms: &[Room]) -> Result<()> {
        Ok(self.write(ROOMS_FILE, &rooms)?)
    }

    fn load_saved_identities(&self) -> Result<BTreeMap<String, Identity>> {
        Ok(self.read(SAVED_IDENTITIES_FILE)?)
    }

    fn save_saved_identities(&mut self, identities: &BTreeMap<String, Identity>) -> Result<()> {
        Ok(self.write(SAVED_IDENTITIES_FILE, identities)?)
    }

    fn load_admin_config(&self) -> Result<Option<AdminConfig>> {
        Ok(self.read(ADMIN_CONFIG_FILE)?)
    }

    fn save_admin_config(&mut self, config: &AdminConfig) -> Result<()> {
        Ok(self.write(ADMIN_CONFIG_FILE, &Some(config))?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn store() -> (tempfile::TempDir, JsonSessionStore) {
        let dir = tempfile::tempdir().expect("temp dir should be creatable");
        let store = JsonSessionStore::open(StorageLayout::at(dir.path().to_path_buf()))
            .expect("store should open");
        (dir, store)
    }

    #[test]
    fn missing_collections_load_as_empty() {
        let (_dir, store) = store();

        assert!(store.load_messages().expect("load").is_empty());
        assert!(store.load_users().expect("load").is_empty());
        assert!(store.load_rooms().expect("load").is_empty());
        assert!(store.load_saved_identities().expect("load").is_empty());
        assert!(store.load_admin_config().expect("load").is_none());
        assert!(store.load_current_identity().expect("load").is_none());
    }

    #[test]
    fn saved_rooms_survive_reopen() {
        let (dir, mut store) = store();
        let room = Room::new("owner", "den", "pw", true, None, 48, Utc::now());
        store.save_rooms(std::slice::from_ref(&room)).expect("save");
        drop(store);

        let reopened = JsonSessionStore::open(StorageLayout::at(dir.path().to_path_buf()))
            .expect("store should reopen");
        assert_eq!(reopened.load_rooms().expect("load"), vec![room]);
    }

    #[test]
    fn corrupt_collection_loads_as_empty() {
        let (dir, store) = store();
        fs::write(dir.path().join(MESSAGES_FILE), "{not json").expect("fixture write");

        assert!(store.load_messages().expect("load").is_empty());
    }

    #[test]
    fn clearing_current_identity_is_idempotent() {
        let (_dir, mut store) = store();
        let identity = Identity::new("ada", false, Utc::now());

        store.save_current_identity(&identity).expect("save");
        assert_eq!(
            store.load_current_identity().expect("load"),
            Some(identity)
        );

        store.clear_current_identity().expect("clear");
        store.clear_current_identity().expect("clear twice");
        assert!(store.load_current_identity().expect("load").is_none());
    }

    #[test]
    fn saved_identities_are_keyed_and_overwritten() {
        let (_dir, mut store) = store();
        let first = Identity::new("Ada", false, Utc::now());
        let second = Identity::new("Ada", false, Utc::now());

        let mut map = BTreeMap::new();
        map.insert("ada".to_owned(), first);
        store.save_saved_identities(&map).expect("save");

        map.insert("ada".to_owned(), second.clone());
        store.save_saved_identities(&map).expect("save again");

        let loaded = store.load_saved_identities().expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["ada"], second);
    }
}
