use std::io::BufReader;
use std::path::Path;

use anyhow::bail;
use google_drive3::api::{File as DriveFile, Permission, Scope};
use tracing::{error, info};

use super::auth::DriveHub;
use super::guard::NetworkLimits;

/// Upload a local file to a specific Google Drive folder using resumable upload.
/// Returns the new file's id.
pub async fn upload_file(
    hub: &DriveHub,
    folder_id: &str,
    file_path: &Path,
    limits: &NetworkLimits,
) -> anyhow::Result<String> {
    let file_name = match file_path.file_name() {
        Some(name) => match name.to_str() {
            Some(s) => s.to_string(),
            None => {
                error!(path = ?file_path, "File name is not valid UTF-8");
                bail!("File name is not valid UTF-8: {:?}", file_path);
            }
        },
        None => {
            error!(path = %file_path.display(), "Cannot determine file name from path");
            bail!(
                "Cannot determine file name from path: {}",
                file_path.display()
            );
        }
    };

    let file_size = match tokio::fs::metadata(file_path).await {
        Ok(m) => m.len(),
        Err(e) => {
            error!(error = %e, path = %file_path.display(), "Failed to stat file for upload");
            bail!("Failed to stat {}: {}", file_path.display(), e);
        }
    };

    info!(
        file_name = %file_name,
        file_size_bytes = file_size,
        folder_id = folder_id,
        "Starting resumable upload to Google Drive"
    );

    let file_metadata = DriveFile {
        name: Some(file_name.clone()),
        parents: Some(vec![folder_id.to_string()]),
        ..Default::default()
    };

    let raw_file = match std::fs::File::open(file_path) {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, path = %file_path.display(), "Failed to open file for upload");
            bail!("Failed to open {}: {}", file_path.display(), e);
        }
    };
    let reader = BufReader::with_capacity(512 * 1024, raw_file);

    let mime_type: mime::Mime = match "application/zip".parse() {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "Failed to parse upload MIME type");
            bail!("Failed to parse upload MIME type: {}", e);
        }
    };

    let result = limits
        .transfer("upload", async {
            anyhow::Ok(hub
                .files()
                .create(file_metadata)
                .param("fields", "id, name, size")
                .add_scope(Scope::Full)
                .upload_resumable(reader, mime_type)
                .await?)
        })
        .await;

    match result {
        Ok((_, uploaded)) => match uploaded.id {
            Some(id) => {
                info!(
                    file_name = %file_name,
                    drive_file_id = %id,
                    file_size_bytes = file_size,
                    "Upload completed"
                );
                Ok(id)
            }
            None => {
                error!(file_name = %file_name, "Google Drive accepted the upload but returned no ID");
                bail!("Google Drive accepted '{}' but returned no ID", file_name);
            }
        },
        Err(e) => {
            error!(
                error = %e,
                file_name = %file_name,
                "Failed to upload file to Google Drive"
            );
            bail!("Failed to upload '{}' to Google Drive: {:#}", file_name, e);
        }
    }
}

/// Grant read access to anyone with the link.
pub async fn share_public(
    hub: &DriveHub,
    file_id: &str,
    limits: &NetworkLimits,
) -> anyhow::Result<()> {
    let permission = Permission {
        type_: Some("anyone".to_string()),
        role: Some("reader".to_string()),
        ..Default::default()
    };

    let result = limits
        .request("share", async {
            anyhow::Ok(hub
                .permissions()
                .create(permission, file_id)
                .add_scope(Scope::Full)
                .doit()
                .await?)
        })
        .await;

    match result {
        Ok(_) => {
            info!(drive_file_id = file_id, "Shared file with anyone holding the link");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, drive_file_id = file_id, "Failed to set public permission");
            bail!("Failed to share '{}': {:#}", file_id, e);
        }
    }
}
