use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::bail;
use tracing::{error, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::BackupError;

/// Zip every entry below `source` into `<dest_base>.zip`.
///
/// Returns `Ok(None)` without writing anything when `source` does not exist.
/// An existing archive with the same name is overwritten.
pub async fn compress_world(source: &Path, dest_base: &Path) -> anyhow::Result<Option<PathBuf>> {
    if !source.exists() {
        error!(path = %source.display(), "World save directory does not exist");
        return Ok(None);
    }

    let mut archive_name = dest_base.as_os_str().to_owned();
    archive_name.push(".zip");
    let output_path = PathBuf::from(archive_name);

    info!(
        source = %source.display(),
        output = %output_path.display(),
        "Compressing world"
    );

    let out = output_path.clone();
    let src = source.to_path_buf();

    // zip is synchronous - run in a blocking thread
    let result = tokio::task::spawn_blocking(move || write_zip(&src, &out)).await;

    let size_bytes = match result {
        Ok(Ok(size)) => size,
        Ok(Err(e)) => {
            error!(error = %e, output = %output_path.display(), "World compression failed");
            cleanup_temp_file(&output_path).await;
            return Err(e);
        }
        Err(e) => {
            cleanup_temp_file(&output_path).await;
            error!(error = %e, "World compression task panicked");
            bail!("World compression blocking task panicked: {}", e);
        }
    };

    info!(
        path = %output_path.display(),
        size_bytes = size_bytes,
        "World compressed"
    );

    Ok(Some(output_path))
}

fn write_zip(source: &Path, output: &Path) -> anyhow::Result<u64> {
    let file = match File::create(output) {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, path = %output.display(), "Failed to create archive file");
            bail!("Failed to create archive file {}: {}", output.display(), e);
        }
    };
    let mut zip = ZipWriter::new(BufWriter::with_capacity(512 * 1024, file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    // Symlinks are not followed so nothing outside the world gets archived.
    for entry in WalkDir::new(source)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                error!(error = %e, source = %source.display(), "Failed to walk world directory");
                bail!("Failed to walk {}: {}", source.display(), e);
            }
        };

        let name = match archive_entry_name(source, entry.path()) {
            Some(n) => n,
            None => {
                error!(path = ?entry.path(), "Path cannot be stored in a zip archive");
                bail!("Path cannot be stored in a zip archive: {:?}", entry.path());
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            zip.add_directory(name, options)?;
        } else if file_type.is_file() {
            zip.start_file(name, options)?;
            let mut input = match File::open(entry.path()) {
                Ok(f) => BufReader::new(f),
                Err(e) => {
                    error!(error = %e, path = %entry.path().display(), "Failed to open world file");
                    bail!("Failed to open {}: {}", entry.path().display(), e);
                }
            };
            std::io::copy(&mut input, &mut zip)?;
        } else {
            warn!(path = %entry.path().display(), "Skipping symlink or special file");
        }
    }

    let writer = match zip.finish() {
        Ok(w) => w,
        Err(e) => {
            error!(error = %e, "Failed to finalize zip archive");
            bail!("Failed to finalize zip archive: {}", e);
        }
    };

    let file = match writer.into_inner() {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, "Failed to flush archive buffer");
            bail!("Failed to flush archive buffer: {}", e);
        }
    };

    Ok(file.metadata()?.len())
}

/// Forward-slash path of `path` relative to `root`.
fn archive_entry_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

/// Replace `dest` with the contents of `archive`, then delete the archive.
///
/// Entries are extracted into a staging directory next to `dest`; `dest` is
/// only replaced once every entry has been decompressed.
pub async fn extract_world(archive: &Path, dest: &Path) -> anyhow::Result<()> {
    if !archive.exists() {
        error!(path = %archive.display(), "Backup archive does not exist");
        return Err(BackupError::ArchiveNotFound(archive.to_path_buf()).into());
    }

    info!(
        archive = %archive.display(),
        dest = %dest.display(),
        "Extracting world"
    );

    let arc = archive.to_path_buf();
    let out = dest.to_path_buf();

    let result = tokio::task::spawn_blocking(move || read_zip(&arc, &out)).await;

    let entries = match result {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            error!(error = %e, archive = %archive.display(), "World extraction failed");
            return Err(e);
        }
        Err(e) => {
            error!(error = %e, "World extraction task panicked");
            bail!("World extraction blocking task panicked: {}", e);
        }
    };

    if let Err(e) = tokio::fs::remove_file(archive).await {
        error!(error = %e, path = %archive.display(), "Failed to remove archive after extraction");
        bail!("Failed to remove {}: {}", archive.display(), e);
    }

    info!(dest = %dest.display(), entries = entries, "World restored");

    Ok(())
}

fn read_zip(archive: &Path, dest: &Path) -> anyhow::Result<usize> {
    let file = match File::open(archive) {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, path = %archive.display(), "Failed to open archive");
            bail!("Failed to open archive {}: {}", archive.display(), e);
        }
    };

    let mut zip = match ZipArchive::new(BufReader::new(file)) {
        Ok(z) => z,
        Err(e) => {
            error!(error = %e, path = %archive.display(), "Not a valid zip archive");
            bail!("{} is not a valid zip archive: {}", archive.display(), e);
        }
    };

    // Entries are decompressed into a sibling directory first, so corrupt
    // entry data never touches `dest`.
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let staging = match tempfile::Builder::new()
        .prefix(".restore-")
        .tempdir_in(parent)
    {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, path = %parent.display(), "Failed to create staging directory");
            bail!("Failed to create staging directory in {}: {}", parent.display(), e);
        }
    };

    // Entries with absolute or `..` paths are rejected by `extract`.
    if let Err(e) = zip.extract(staging.path()) {
        error!(error = %e, archive = %archive.display(), "Failed to extract archive");
        bail!("Failed to extract {}: {}", archive.display(), e);
    }

    if dest.exists()
        && let Err(e) = std::fs::remove_dir_all(dest)
    {
        error!(error = %e, path = %dest.display(), "Failed to clear existing world directory");
        bail!("Failed to clear {}: {}", dest.display(), e);
    }

    // After the rename the staging guard has nothing left to remove.
    if let Err(e) = std::fs::rename(staging.path(), dest) {
        error!(error = %e, dest = %dest.display(), "Failed to move restored world into place");
        bail!("Failed to move restored world into {}: {}", dest.display(), e);
    }

    Ok(zip.len())
}

async fn cleanup_temp_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        error!(
            error = %e,
            path = %path.display(),
            "Failed to clean up partial archive"
        );
    }
}
