//! Google Drive access: authentication, the folder primitives the backup
//! workflows need, and latest-backup selection.

pub mod auth;
pub mod download;
pub mod guard;
pub mod list;
pub mod select;
pub mod upload;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use self::auth::DriveHub;
use self::guard::NetworkLimits;
use crate::error::AuthError;

/// One entry of a remote folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// Folder-level operations against the remote store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_folder(&self, folder_id: &str) -> anyhow::Result<Vec<RemoteFile>>;

    /// Upload `file_path` under `folder_id`, named by its file name. Returns the new id.
    async fn upload_file(&self, folder_id: &str, file_path: &Path) -> anyhow::Result<String>;

    async fn share_public(&self, file_id: &str) -> anyhow::Result<()>;

    /// Write the content of `file_id` to `dest`. Returns bytes written.
    async fn download_file(&self, file_id: &str, dest: &Path) -> anyhow::Result<u64>;
}

/// A connected store and the non-fatal problems met while connecting.
pub struct Connection<S> {
    pub store: S,
    pub warnings: Vec<String>,
}

/// Produces an authenticated store, or says why it could not.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    type Store: RemoteStore;

    async fn connect(&self) -> Result<Connection<Self::Store>, AuthError>;
}

pub struct DriveStore {
    hub: DriveHub,
    limits: NetworkLimits,
}

impl DriveStore {
    pub fn new(hub: DriveHub, limits: NetworkLimits) -> Self {
        DriveStore { hub, limits }
    }
}

#[async_trait]
impl RemoteStore for DriveStore {
    async fn list_folder(&self, folder_id: &str) -> anyhow::Result<Vec<RemoteFile>> {
        list::list_folder_files(&self.hub, folder_id, &self.limits).await
    }

    async fn upload_file(&self, folder_id: &str, file_path: &Path) -> anyhow::Result<String> {
        upload::upload_file(&self.hub, folder_id, file_path, &self.limits).await
    }

    async fn share_public(&self, file_id: &str) -> anyhow::Result<()> {
        upload::share_public(&self.hub, file_id, &self.limits).await
    }

    async fn download_file(&self, file_id: &str, dest: &Path) -> anyhow::Result<u64> {
        download::download_file(&self.hub, file_id, dest, &self.limits).await
    }
}

/// Authenticates on every `connect`, the way each menu action starts fresh.
pub struct DriveConnector {
    credentials_path: PathBuf,
    token_path: PathBuf,
    limits: NetworkLimits,
}

impl DriveConnector {
    pub fn new(credentials_path: PathBuf, token_path: PathBuf, limits: NetworkLimits) -> Self {
        DriveConnector {
            credentials_path,
            token_path,
            limits,
        }
    }
}

#[async_trait]
impl StoreProvider for DriveConnector {
    type Store = DriveStore;

    async fn connect(&self) -> Result<Connection<DriveStore>, AuthError> {
        let authorized =
            auth::authorize(&self.credentials_path, &self.token_path, &self.limits).await?;
        Ok(Connection {
            store: DriveStore::new(authorized.hub, self.limits.clone()),
            warnings: authorized.cache_warning.into_iter().collect(),
        })
    }
}
