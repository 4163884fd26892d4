//! In-memory remote store for workflow tests.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::bail;
use async_trait::async_trait;

use crate::drive::{Connection, RemoteFile, RemoteStore, StoreProvider};
use crate::error::AuthError;

struct StoredFile {
    folder_id: String,
    file: RemoteFile,
    contents: Vec<u8>,
}

#[derive(Default)]
pub struct FakeStore {
    files: Mutex<Vec<StoredFile>>,
    uploaded: Mutex<Vec<String>>,
    shared: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    failing_downloads: AtomicBool,
}

impl FakeStore {
    pub fn insert(&self, folder_id: &str, name: &str, contents: Vec<u8>) -> String {
        let id = format!("file-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.files.lock().unwrap().push(StoredFile {
            folder_id: folder_id.to_string(),
            file: RemoteFile {
                id: id.clone(),
                name: name.to_string(),
            },
            contents,
        });
        id
    }

    pub fn fail_downloads(&self) {
        self.failing_downloads.store(true, Ordering::SeqCst);
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn shared_ids(&self) -> Vec<String> {
        self.shared.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn list_folder(&self, folder_id: &str) -> anyhow::Result<Vec<RemoteFile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.folder_id == folder_id)
            .map(|f| f.file.clone())
            .collect())
    }

    async fn upload_file(&self, folder_id: &str, file_path: &Path) -> anyhow::Result<String> {
        let name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .to_string();
        let contents = std::fs::read(file_path)?;
        self.uploaded.lock().unwrap().push(name.clone());
        Ok(self.insert(folder_id, &name, contents))
    }

    async fn share_public(&self, file_id: &str) -> anyhow::Result<()> {
        self.shared.lock().unwrap().push(file_id.to_string());
        Ok(())
    }

    async fn download_file(&self, file_id: &str, dest: &Path) -> anyhow::Result<u64> {
        if self.failing_downloads.load(Ordering::SeqCst) {
            std::fs::write(dest, b"partial")?;
            bail!("connection reset");
        }
        let files = self.files.lock().unwrap();
        let Some(stored) = files.iter().find(|f| f.file.id == file_id) else {
            bail!("no such file: {file_id}");
        };
        std::fs::write(dest, &stored.contents)?;
        Ok(stored.contents.len() as u64)
    }
}

/// Hands out one shared `FakeStore` per connect, or a fixed auth failure.
pub struct FakeProvider {
    pub store: std::sync::Arc<FakeStore>,
    pub connects: AtomicUsize,
    missing_secret: Option<std::path::PathBuf>,
    warnings: Vec<String>,
}

impl FakeProvider {
    pub fn new() -> Self {
        FakeProvider {
            store: std::sync::Arc::new(FakeStore::default()),
            connects: AtomicUsize::new(0),
            missing_secret: None,
            warnings: Vec::new(),
        }
    }

    /// Every connect succeeds but reports `warning`.
    pub fn with_warning(warning: &str) -> Self {
        FakeProvider {
            warnings: vec![warning.to_string()],
            ..Self::new()
        }
    }

    pub fn missing_secret(path: &Path) -> Self {
        FakeProvider {
            missing_secret: Some(path.to_path_buf()),
            ..Self::new()
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for std::sync::Arc<FakeStore> {
    async fn list_folder(&self, folder_id: &str) -> anyhow::Result<Vec<RemoteFile>> {
        self.as_ref().list_folder(folder_id).await
    }

    async fn upload_file(&self, folder_id: &str, file_path: &Path) -> anyhow::Result<String> {
        self.as_ref().upload_file(folder_id, file_path).await
    }

    async fn share_public(&self, file_id: &str) -> anyhow::Result<()> {
        self.as_ref().share_public(file_id).await
    }

    async fn download_file(&self, file_id: &str, dest: &Path) -> anyhow::Result<u64> {
        self.as_ref().download_file(file_id, dest).await
    }
}

#[async_trait]
impl StoreProvider for FakeProvider {
    type Store = std::sync::Arc<FakeStore>;

    async fn connect(&self) -> Result<Connection<Self::Store>, AuthError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.missing_secret {
            Some(ref path) => Err(AuthError::MissingClientSecret(path.clone())),
            None => Ok(Connection {
                store: self.store.clone(),
                warnings: self.warnings.clone(),
            }),
        }
    }
}
