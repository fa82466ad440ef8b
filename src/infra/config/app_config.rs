use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub features: FeatureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    /// Master passphrase granting public access. Compared by plain
    /// equality, like room passwords.
    pub master_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            master_password: "let-me-in".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StorageConfig {
    /// Overrides the platform data directory when set.
    pub data_dir: Option<PathBuf>,
}

/// Hook points that exist in the engine but are deliberately off until
/// product sign-off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FeatureConfig {
    pub leave_room: bool,
    /// When set, identities unseen for this many minutes are dropped from
    /// the presence collection by the presence sweep.
    pub presence_timeout_minutes: Option<u64>,
}
