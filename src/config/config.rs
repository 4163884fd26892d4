use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::debug;

use crate::cli::Cli;

pub const DEFAULT_WORLD_NAME: &str = "The_Typical_Solution";
pub const DEFAULT_DRIVE_FOLDER_ID: &str = "1QGyK3cJAaQUejn9PyQPiUvdLdKEVaU6Y";
pub const APP_DATA_VAR: &str = "APPDATA";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub world_name: String,
    pub app_data_root: Option<PathBuf>,
    pub saves_dir: Option<PathBuf>,
    pub drive_folder_id: String,
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub request_timeout: Duration,
    pub transfer_timeout: Duration,
}

impl Config {
    /// Defaults rooted at `working_dir`, with no app-data root.
    pub fn defaults(working_dir: PathBuf) -> Self {
        Config {
            world_name: DEFAULT_WORLD_NAME.to_string(),
            app_data_root: None,
            saves_dir: None,
            drive_folder_id: DEFAULT_DRIVE_FOLDER_ID.to_string(),
            credentials_path: working_dir.join("credentials.json"),
            token_path: working_dir.join("token.json"),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            transfer_timeout: Duration::from_secs(DEFAULT_TRANSFER_TIMEOUT_SECS),
        }
    }

    /// Defaults overridden by the process environment. A `.env` file in the
    /// working directory is loaded first if there is one.
    pub fn from_env() -> anyhow::Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => debug!("No .env file, using process environment"),
            Err(e) => return Err(e).context("Failed to load .env file"),
        }

        let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
        Self::from_lookup(cwd, |key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(working_dir: PathBuf, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::defaults(working_dir);
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("WORLD_NAME") {
            config.world_name = v;
        }
        config.app_data_root = get(APP_DATA_VAR).map(PathBuf::from);
        config.saves_dir = get("MINECRAFT_SAVES_DIR").map(PathBuf::from);
        if let Some(v) = get("DRIVE_FOLDER_ID") {
            config.drive_folder_id = v;
        }
        if let Some(v) = get("GOOGLE_CREDENTIALS_PATH") {
            config.credentials_path = PathBuf::from(v);
        }
        if let Some(v) = get("GOOGLE_TOKEN_PATH") {
            config.token_path = PathBuf::from(v);
        }
        if let Some(v) = get("DRIVE_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("DRIVE_REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("DRIVE_TRANSFER_TIMEOUT_SECS") {
            config.transfer_timeout = parse_secs("DRIVE_TRANSFER_TIMEOUT_SECS", &v)?;
        }

        Ok(config)
    }

    /// Command-line flags win over the environment.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(ref world) = cli.world {
            self.world_name = world.clone();
        }
        if let Some(ref dir) = cli.saves_dir {
            self.saves_dir = Some(dir.clone());
        }
        if let Some(ref id) = cli.folder_id {
            self.drive_folder_id = id.clone();
        }
        if let Some(ref path) = cli.credentials {
            self.credentials_path = path.clone();
        }
        if let Some(ref path) = cli.token {
            self.token_path = path.clone();
        }
        if let Some(secs) = cli.request_timeout {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = cli.transfer_timeout {
            self.transfer_timeout = Duration::from_secs(secs);
        }
    }
}

fn parse_secs(key: &str, value: &str) -> anyhow::Result<Duration> {
    match value.trim().parse::<u64>() {
        Ok(0) => bail!("{key} must be greater than zero"),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => bail!("{key} must be a whole number of seconds, got '{value}': {e}"),
    }
}
