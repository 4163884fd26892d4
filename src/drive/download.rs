use std::path::Path;

use anyhow::bail;
use google_drive3::api::Scope;
use http_body_util::BodyExt;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use super::auth::DriveHub;
use super::guard::NetworkLimits;

/// Stream the content of `file_id` into `dest`, returning the bytes written.
pub async fn download_file(
    hub: &DriveHub,
    file_id: &str,
    dest: &Path,
    limits: &NetworkLimits,
) -> anyhow::Result<u64> {
    info!(
        drive_file_id = file_id,
        dest = %dest.display(),
        "Starting download from Google Drive"
    );

    let result = limits
        .transfer("download", async {
            let (response, _) = hub
                .files()
                .get(file_id)
                .param("alt", "media")
                .add_scope(Scope::Full)
                .doit()
                .await?;

            if !response.status().is_success() {
                bail!("Drive returned status {}", response.status());
            }

            let mut file = tokio::fs::File::create(dest).await?;
            let mut body = response.into_body();
            let mut written: u64 = 0;

            while let Some(frame) = body.frame().await {
                let frame = frame?;
                if let Ok(data) = frame.into_data() {
                    file.write_all(&data).await?;
                    written += data.len() as u64;
                }
            }
            file.flush().await?;

            anyhow::Ok(written)
        })
        .await;

    match result {
        Ok(size) => {
            info!(
                drive_file_id = file_id,
                size_bytes = size,
                "Download completed"
            );
            Ok(size)
        }
        Err(e) => {
            error!(error = %e, drive_file_id = file_id, "Failed to download file from Google Drive");
            bail!("Failed to download '{}': {:#}", file_id, e);
        }
    }
}
