use std::path::PathBuf;

use clap::Parser;

/// Without flags the tool starts the interactive menu with settings taken
/// from the environment (and `.env`).
#[derive(Parser, Debug, Default)]
#[command(
    name = "world-drive-backup",
    version,
    about = "Back up a Minecraft world to Google Drive and restore the latest backup"
)]
pub struct Cli {
    /// World (save directory) name
    #[arg(long)]
    pub world: Option<String>,

    /// Saves directory, instead of <APPDATA>/.minecraft/saves
    #[arg(long, value_name = "DIR")]
    pub saves_dir: Option<PathBuf>,

    /// Google Drive folder holding the backups
    #[arg(long, value_name = "ID")]
    pub folder_id: Option<String>,

    /// OAuth client secret file
    #[arg(long, value_name = "FILE")]
    pub credentials: Option<PathBuf>,

    /// Cached credential file
    #[arg(long, value_name = "FILE")]
    pub token: Option<PathBuf>,

    /// Timeout for Drive metadata requests, in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub request_timeout: Option<u64>,

    /// Timeout for uploads, downloads and the consent flow, in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub transfer_timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_means_no_overrides() {
        let cli = Cli::parse_from(["world-drive-backup"]);
        assert!(cli.world.is_none());
        assert!(cli.folder_id.is_none());
        assert!(cli.request_timeout.is_none());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = Cli::try_parse_from(["world-drive-backup", "--request-timeout", "0"]);
        assert!(result.is_err());
    }
}
