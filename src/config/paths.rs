use std::path::PathBuf;

use chrono::NaiveDate;

use super::config::{APP_DATA_VAR, Config};
use crate::error::BackupError;

/// `DD-MM-YYYY`, the date token embedded in every backup name.
pub const BACKUP_DATE_FORMAT: &str = "%d-%m-%Y";

/// Well-known local locations for one world.
#[derive(Debug, Clone)]
pub struct WorldPaths {
    world_name: String,
    app_data_root: Option<PathBuf>,
    saves_dir: Option<PathBuf>,
}

impl WorldPaths {
    pub fn new(world_name: impl Into<String>, app_data_root: Option<PathBuf>) -> Self {
        WorldPaths {
            world_name: world_name.into(),
            app_data_root,
            saves_dir: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        WorldPaths {
            world_name: config.world_name.clone(),
            app_data_root: config.app_data_root.clone(),
            saves_dir: config.saves_dir.clone(),
        }
    }

    /// Uses `dir` as the saves root instead of deriving it from app data.
    pub fn with_saves_dir(mut self, dir: PathBuf) -> Self {
        self.saves_dir = Some(dir);
        self
    }

    pub fn world_name(&self) -> &str {
        &self.world_name
    }

    pub fn saves_root(&self) -> Result<PathBuf, BackupError> {
        if let Some(ref dir) = self.saves_dir {
            return Ok(dir.clone());
        }
        match self.app_data_root {
            Some(ref root) => Ok(root.join(".minecraft").join("saves")),
            None => Err(BackupError::MissingAppData(APP_DATA_VAR)),
        }
    }

    pub fn save_directory(&self) -> Result<PathBuf, BackupError> {
        Ok(self.saves_root()?.join(&self.world_name))
    }

    pub fn backup_name(&self, today: NaiveDate) -> String {
        format!(
            "{}_Backup_{}",
            self.world_name,
            today.format(BACKUP_DATE_FORMAT)
        )
    }

    /// Archive path without the `.zip` extension.
    pub fn backup_base(&self, today: NaiveDate) -> Result<PathBuf, BackupError> {
        Ok(self.saves_root()?.join(self.backup_name(today)))
    }

    pub fn backup_archive(&self, today: NaiveDate) -> Result<PathBuf, BackupError> {
        Ok(self
            .saves_root()?
            .join(format!("{}.zip", self.backup_name(today))))
    }
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
