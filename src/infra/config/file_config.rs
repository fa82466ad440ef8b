use std::path::PathBuf;

use serde::Deserialize;

use crate::infra::config::{AppConfig, AuthConfig, FeatureConfig, LogConfig, StorageConfig};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub auth: Option<FileAuthConfig>,
    pub storage: Option<FileStorageConfig>,
    pub features: Option<FileFeatureConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(auth) = self.auth {
            auth.merge_into(&mut config.auth);
        }

        if let Some(storage) = self.storage {
            storage.merge_into(&mut config.storage);
        }

        if let Some(features) = self.features {
            features.merge_into(&mut config.features);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileAuthConfig {
    pub master_password: Option<String>,
}

impl FileAuthConfig {
    fn merge_into(self, config: &mut AuthConfig) {
        if let Some(master_password) = self.master_password {
            config.master_password = master_password;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileStorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl FileStorageConfig {
    fn merge_into(self, config: &mut StorageConfig) {
        if let Some(data_dir) = self.data_dir {
            config.data_dir = Some(data_dir);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileFeatureConfig {
    pub leave_room: Option<bool>,
    pub presence_timeout_minutes: Option<u64>,
}

impl FileFeatureConfig {
    fn merge_into(self, config: &mut FeatureConfig) {
        if let Some(leave_room) = self.leave_room {
            config.leave_room = leave_room;
        }

        if let Some(minutes) = self.presence_timeout_minutes {
            config.presence_timeout_minutes = Some(minutes);
        }
    }
}
