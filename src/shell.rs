use std::io::{BufRead, Write};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backup::minecraft::compress_world;
use crate::backup::transfer::{UploadResult, download_backup, upload_backup};
use crate::config::paths::{WorldPaths, today};
use crate::drive::{RemoteFile, StoreProvider};
use crate::error::{AuthError, BackupError};

const BANNER: &str = "world-drive-backup (World uploader based on Google Drive)";
const MENU: &str = "
    [1] Upload world to Drive
    [2] Download world from Drive
    [3] Exit";
const PROMPT: &str = ">>> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Upload,
    Download,
    Exit,
    Invalid,
}

impl MenuChoice {
    /// Exact match on the line without its terminator.
    pub fn parse(line: &str) -> Self {
        match line {
            "1" => MenuChoice::Upload,
            "2" => MenuChoice::Download,
            "3" => MenuChoice::Exit,
            _ => MenuChoice::Invalid,
        }
    }
}

/// The interactive menu loop.
pub struct Shell<R, W, P> {
    input: R,
    output: W,
    provider: P,
    paths: WorldPaths,
    folder_id: String,
    cancel: CancellationToken,
}

impl<R, W, P> Shell<R, W, P>
where
    R: BufRead,
    W: Write,
    P: StoreProvider,
{
    pub fn new(
        input: R,
        output: W,
        provider: P,
        paths: WorldPaths,
        folder_id: String,
        cancel: CancellationToken,
    ) -> Self {
        Shell {
            input,
            output,
            provider,
            paths,
            folder_id,
            cancel,
        }
    }

    /// Runs until the user exits, input ends, or the token is cancelled.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        writeln!(self.output, "{BANNER}")?;
        info!(world = self.paths.world_name(), folder_id = %self.folder_id, "Menu started");

        loop {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested, leaving menu");
                break;
            }

            writeln!(self.output, "{MENU}")?;
            write!(self.output, "{PROMPT}")?;
            self.output.flush()?;

            let Some(line) = self.read_line()? else {
                info!("Input closed, leaving menu");
                break;
            };
            // ctrl-c during the blocking read only takes effect once the line arrives.
            if self.cancel.is_cancelled() {
                info!("Cancellation requested, leaving menu");
                break;
            }

            match MenuChoice::parse(&line) {
                MenuChoice::Upload => {
                    let outcome = self.upload().await;
                    self.report(outcome.map(|r| format!("Upload complete! Link: {}", r.public_url)))?;
                }
                MenuChoice::Download => {
                    let outcome = self.download().await;
                    self.report(outcome.map(|(file, dir)| {
                        format!("{} restored to {}", file.name, dir.display())
                    }))?;
                }
                MenuChoice::Exit => {
                    info!("Exit selected");
                    break;
                }
                MenuChoice::Invalid => {
                    warn!(choice = %line, "Invalid menu option");
                    writeln!(self.output, "[ERROR] Invalid option!")?;
                }
            }
        }

        Ok(())
    }

    /// One line without its terminator, or `None` at end of input.
    fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.strip_suffix('\n').unwrap_or(&line);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
        Ok(Some(trimmed.to_string()))
    }

    async fn upload(&mut self) -> anyhow::Result<UploadResult> {
        let today = today();
        let save_dir = self.paths.save_directory()?;
        let base = self.paths.backup_base(today)?;

        let archive = match compress_world(&save_dir, &base).await? {
            Some(path) => path,
            None => return Err(BackupError::SaveDirectoryNotFound(save_dir).into()),
        };
        writeln!(self.output, "[OK] World compressed: {}", archive.display())?;

        let store = self.connect().await?;
        upload_backup(&store, &archive, &self.folder_id).await
    }

    async fn download(&mut self) -> anyhow::Result<(RemoteFile, std::path::PathBuf)> {
        let save_dir = self.paths.save_directory()?;
        let staging = self.paths.backup_archive(today())?;

        let store = self.connect().await?;
        let restored = download_backup(&store, &self.folder_id, &staging, &save_dir).await?;
        Ok((restored, save_dir))
    }

    /// Connects and prints any warnings the provider raised on the way.
    async fn connect(&mut self) -> anyhow::Result<P::Store> {
        let connection = self.provider.connect().await?;
        for warning in &connection.warnings {
            warn!(warning = %warning, "Connected with a warning");
            writeln!(self.output, "[WARN] {warning}")?;
        }
        Ok(connection.store)
    }

    fn report(&mut self, outcome: anyhow::Result<String>) -> anyhow::Result<()> {
        match outcome {
            Ok(message) => {
                writeln!(self.output, "[OK] {message}")?;
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "Menu action failed");
                writeln!(self.output, "[ERROR] {e:#}")?;
                if let Some(AuthError::MissingClientSecret(_)) = e.downcast_ref::<AuthError>() {
                    write!(self.output, "Press Enter to return to the menu {PROMPT}")?;
                    self.output.flush()?;
                    self.read_line()?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{BufReader, Cursor, Read};
    use std::path::Path;

    use super::*;
    use crate::testutil::FakeProvider;

    fn shell(
        input: &str,
        saves: &Path,
        provider: FakeProvider,
    ) -> Shell<Cursor<Vec<u8>>, Vec<u8>, FakeProvider> {
        Shell::new(
            Cursor::new(input.as_bytes().to_vec()),
            Vec::new(),
            provider,
            WorldPaths::new("World", None).with_saves_dir(saves.to_path_buf()),
            "folder".to_string(),
            CancellationToken::new(),
        )
    }

    fn printed<P>(shell: &Shell<Cursor<Vec<u8>>, Vec<u8>, P>) -> String {
        String::from_utf8(shell.output.clone()).unwrap()
    }

    #[test]
    fn parses_exact_choices_only() {
        assert_eq!(MenuChoice::parse("1"), MenuChoice::Upload);
        assert_eq!(MenuChoice::parse("2"), MenuChoice::Download);
        assert_eq!(MenuChoice::parse("3"), MenuChoice::Exit);
        assert_eq!(MenuChoice::parse(" 1"), MenuChoice::Invalid);
        assert_eq!(MenuChoice::parse(""), MenuChoice::Invalid);
        assert_eq!(MenuChoice::parse("exit"), MenuChoice::Invalid);
    }

    #[tokio::test]
    async fn invalid_choice_then_exit() {
        let tmp = tempfile::tempdir().unwrap();
        let mut shell = shell("9\n3\n", tmp.path(), FakeProvider::new());

        shell.run().await.unwrap();

        let out = printed(&shell);
        assert_eq!(out.matches("[ERROR] Invalid option!").count(), 1);
        assert_eq!(shell.provider.connect_count(), 0);
        assert!(shell.provider.store.uploaded_names().is_empty());
    }

    #[tokio::test]
    async fn end_of_input_exits() {
        let tmp = tempfile::tempdir().unwrap();
        let mut shell = shell("", tmp.path(), FakeProvider::new());

        shell.run().await.unwrap();

        assert!(printed(&shell).contains("[3] Exit"));
    }

    #[tokio::test]
    async fn windows_line_endings_are_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let mut shell = shell("3\r\n9\n", tmp.path(), FakeProvider::new());

        shell.run().await.unwrap();

        assert!(!printed(&shell).contains("Invalid option"));
    }

    #[tokio::test]
    async fn upload_without_world_reports_and_returns_to_menu() {
        let tmp = tempfile::tempdir().unwrap();
        let mut shell = shell("1\n3\n", tmp.path(), FakeProvider::new());

        shell.run().await.unwrap();

        let out = printed(&shell);
        assert!(out.contains("[ERROR] world save directory not found"));
        assert_eq!(out.matches(PROMPT).count(), 2);
        assert_eq!(shell.provider.connect_count(), 0);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn upload_compresses_and_prints_link() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("World")).unwrap();
        fs::write(tmp.path().join("World").join("level.dat"), b"level").unwrap();
        let mut shell = shell("1\n3\n", tmp.path(), FakeProvider::new());

        shell.run().await.unwrap();

        let expected_name = format!("World_Backup_{}.zip", today().format("%d-%m-%Y"));
        let store = &shell.provider.store;
        assert_eq!(store.uploaded_names(), vec![expected_name.clone()]);
        assert!(tmp.path().join(&expected_name).exists());

        let id = store.shared_ids().pop().unwrap();
        assert!(printed(&shell).contains(&format!(
            "[OK] Upload complete! Link: https://drive.google.com/file/d/{id}/view"
        )));
    }

    #[tokio::test]
    async fn download_restores_world() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("level.dat"), b"from drive").unwrap();
        let zip = compress_world(&source, &tmp.path().join("remote"))
            .await
            .unwrap()
            .unwrap();

        let saves = tmp.path().join("saves");
        fs::create_dir_all(saves.join("World")).unwrap();
        fs::write(saves.join("World").join("level.dat"), b"local").unwrap();

        let provider = FakeProvider::new();
        provider
            .store
            .insert("folder", "World_Backup_01-05-2026.zip", fs::read(&zip).unwrap());
        let mut shell = shell("2\n3\n", &saves, provider);

        shell.run().await.unwrap();

        assert!(printed(&shell).contains("[OK] World_Backup_01-05-2026.zip restored to"));
        assert_eq!(
            fs::read(saves.join("World").join("level.dat")).unwrap(),
            b"from drive"
        );
        assert_eq!(shell.provider.connect_count(), 1);
    }

    #[tokio::test]
    async fn download_without_backups_reports_no_valid_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let mut shell = shell("2\n3\n", tmp.path(), FakeProvider::new());

        shell.run().await.unwrap();

        assert!(printed(&shell).contains("[ERROR] no valid backup found in Drive folder folder"));
        assert_eq!(shell.provider.connect_count(), 1);
    }

    #[tokio::test]
    async fn missing_client_secret_waits_for_acknowledgement() {
        let tmp = tempfile::tempdir().unwrap();
        let secret = tmp.path().join("credentials.json");
        // The blank line is the acknowledgement, not a menu choice.
        let mut shell = shell("2\n\n3\n", tmp.path(), FakeProvider::missing_secret(&secret));

        shell.run().await.unwrap();

        let out = printed(&shell);
        assert!(out.contains("[ERROR] client secret file not found"));
        assert!(out.contains("Press Enter to return to the menu"));
        assert!(!out.contains("Invalid option"));
    }

    /// Cancels the token as soon as it is read from, like ctrl-c at the prompt.
    struct InterruptedInput {
        inner: Cursor<Vec<u8>>,
        cancel: CancellationToken,
    }

    impl Read for InterruptedInput {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.cancel.cancel();
            self.inner.read(buf)
        }
    }

    #[tokio::test]
    async fn interrupt_during_prompt_discards_the_line() {
        let tmp = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let input = BufReader::new(InterruptedInput {
            inner: Cursor::new(b"9\n1\n".to_vec()),
            cancel: cancel.clone(),
        });
        let mut shell = Shell::new(
            input,
            Vec::new(),
            FakeProvider::new(),
            WorldPaths::new("World", None).with_saves_dir(tmp.path().to_path_buf()),
            "folder".to_string(),
            cancel,
        );

        shell.run().await.unwrap();

        let out = String::from_utf8(shell.output.clone()).unwrap();
        assert_eq!(out.matches(PROMPT).count(), 1);
        assert!(!out.contains("Invalid option"));
        assert_eq!(shell.provider.connect_count(), 0);
    }

    #[tokio::test]
    async fn connection_warning_is_printed_before_result() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("World")).unwrap();
        fs::write(tmp.path().join("World").join("level.dat"), b"level").unwrap();
        let provider = FakeProvider::with_warning("could not save credential cache to token.json");
        let mut shell = shell("1\n3\n", tmp.path(), provider);

        shell.run().await.unwrap();

        let out = printed(&shell);
        let warn_at = out.find("[WARN] could not save credential cache to token.json").unwrap();
        let ok_at = out.find("[OK] Upload complete!").unwrap();
        assert!(warn_at < ok_at);
        assert_eq!(shell.provider.store.uploaded_names().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_shell_stops_before_reading() {
        let tmp = tempfile::tempdir().unwrap();
        let mut shell = shell("1\n", tmp.path(), FakeProvider::new());
        shell.cancel.cancel();

        shell.run().await.unwrap();

        assert!(!printed(&shell).contains(PROMPT));
        assert_eq!(shell.provider.connect_count(), 0);
    }
}
