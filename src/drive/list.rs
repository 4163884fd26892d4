use anyhow::bail;
use google_drive3::api::Scope;
use tracing::{error, info, warn};

use super::RemoteFile;
use super::auth::DriveHub;
use super::guard::NetworkLimits;

/// List all non-folder files in a Drive folder, handling pagination.
pub async fn list_folder_files(
    hub: &DriveHub,
    folder_id: &str,
    limits: &NetworkLimits,
) -> anyhow::Result<Vec<RemoteFile>> {
    let query = format!(
        "'{}' in parents and trashed = false and mimeType != 'application/vnd.google-apps.folder'",
        folder_id.replace('\\', "\\\\").replace('\'', "\\'")
    );

    let mut all_files: Vec<RemoteFile> = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut request = hub
            .files()
            .list()
            .q(&query)
            .spaces("drive")
            .param("fields", "nextPageToken, files(id, name)")
            .page_size(1000)
            .add_scope(Scope::Full);

        if let Some(ref token) = page_token {
            request = request.page_token(token);
        }

        let result = limits
            .request("list backups", async { anyhow::Ok(request.doit().await?) })
            .await;

        let (_, file_list) = match result {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, folder_id = folder_id, "Failed to list files in Drive folder");
                bail!("Failed to list files in folder '{}': {:#}", folder_id, e);
            }
        };

        for file in file_list.files.unwrap_or_default() {
            match (file.id, file.name) {
                (Some(id), Some(name)) => all_files.push(RemoteFile { id, name }),
                (id, name) => warn!(file_id = ?id, file_name = ?name, "Skipping listing entry without id or name"),
            }
        }

        match file_list.next_page_token {
            Some(token) if !token.is_empty() => {
                page_token = Some(token);
            }
            _ => break,
        }
    }

    info!(
        folder_id = folder_id,
        total_files = all_files.len(),
        "Listed Drive folder"
    );

    Ok(all_files)
}
