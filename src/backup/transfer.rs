use std::path::Path;

use tracing::{error, info};

use super::minecraft::extract_world;
use crate::drive::select::select_latest;
use crate::drive::{RemoteFile, RemoteStore};
use crate::error::BackupError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub remote_id: String,
    pub public_url: String,
}

pub fn share_url(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view", file_id)
}

/// Upload `archive` into `folder_id` and make it readable by link.
pub async fn upload_backup<S: RemoteStore + ?Sized>(
    store: &S,
    archive: &Path,
    folder_id: &str,
) -> anyhow::Result<UploadResult> {
    if !archive.exists() {
        error!(path = %archive.display(), "Backup archive not found");
        return Err(BackupError::ArchiveNotFound(archive.to_path_buf()).into());
    }

    info!(archive = %archive.display(), folder_id = folder_id, "Uploading backup");

    let remote_id = store.upload_file(folder_id, archive).await?;
    store.share_public(&remote_id).await?;

    let public_url = share_url(&remote_id);
    info!(drive_file_id = %remote_id, url = %public_url, "Backup uploaded");

    Ok(UploadResult {
        remote_id,
        public_url,
    })
}

/// Fetch the latest backup in `folder_id` and restore it over `save_dir`.
///
/// The archive is staged at `local_archive` and removed once extracted.
pub async fn download_backup<S: RemoteStore + ?Sized>(
    store: &S,
    folder_id: &str,
    local_archive: &Path,
    save_dir: &Path,
) -> anyhow::Result<RemoteFile> {
    let files = store.list_folder(folder_id).await?;

    let latest = match select_latest(&files) {
        Some(f) => f,
        None => {
            error!(folder_id = folder_id, listed = files.len(), "No valid backup found");
            return Err(BackupError::NoValidBackup(folder_id.to_string()).into());
        }
    };

    info!(
        file_name = %latest.name,
        drive_file_id = %latest.id,
        "Downloading latest backup"
    );

    if let Err(e) = store.download_file(&latest.id, local_archive).await {
        remove_partial(local_archive).await;
        return Err(e);
    }

    extract_world(local_archive, save_dir).await?;

    Ok(latest)
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        error!(
            error = %e,
            path = %path.display(),
            "Failed to clean up partial download"
        );
    }
}
