use std::{env, fs, path::PathBuf};

use crate::infra::error::AppError;

const APP_DIR_NAME: &str = "parlor";

/// Where durable collections live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub data_dir: PathBuf,
}

impl StorageLayout {
    pub fn resolve() -> Result<Self, AppError> {
        let data_base = env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(dirs::data_dir)
            .ok_or_else(|| AppError::StoragePathResolution {
                details: "unable to resolve data base directory (XDG_DATA_HOME/HOME)".into(),
            })?;

        Ok(Self {
            data_dir: data_base.join(APP_DIR_NAME),
        })
    }

    /// Uses an explicit directory instead of the platform default.
    pub fn at(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| AppError::StorageDirCreate {
            path: self.data_dir.clone(),
            source,
        })
    }
}
