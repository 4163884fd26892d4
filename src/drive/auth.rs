use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use yup_oauth2::storage::{TokenInfo, TokenStorage};

use super::guard::NetworkLimits;
use crate::error::AuthError;

pub type DriveHub = google_drive3::DriveHub<
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
>;

type DriveAuthenticator = yup_oauth2::authenticator::Authenticator<
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
>;

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// On-disk credential cache, Google's `authorized_user` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedCredential {
    #[serde(rename = "type")]
    pub key_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl CachedCredential {
    pub fn new(client_id: String, client_secret: String, refresh_token: String) -> Self {
        CachedCredential {
            key_type: "authorized_user".to_string(),
            client_id,
            client_secret,
            refresh_token,
        }
    }
}

/// Keeps the token issued by the consent flow so its refresh token can be
/// written to the credential cache.
#[derive(Clone, Default)]
struct CapturedToken(Arc<Mutex<Option<TokenInfo>>>);

impl CapturedToken {
    fn refresh_token(&self) -> Option<String> {
        let slot = self.0.lock().ok()?;
        slot.as_ref()?.refresh_token.clone()
    }
}

#[async_trait]
impl TokenStorage for CapturedToken {
    async fn set(&self, _scopes: &[&str], token: TokenInfo) -> anyhow::Result<()> {
        match self.0.lock() {
            Ok(mut slot) => {
                *slot = Some(token);
                Ok(())
            }
            Err(_) => anyhow::bail!("token slot lock poisoned"),
        }
    }

    async fn get(&self, _target_scopes: &[&str]) -> Option<TokenInfo> {
        self.0.lock().ok()?.clone()
    }
}

/// An authenticated hub plus anything the user should know about the session.
pub struct Authorized {
    pub hub: DriveHub,
    /// Set when the consent flow succeeded but the credential cache could not be written.
    pub cache_warning: Option<String>,
}

/// Build an authenticated Drive hub.
///
/// Uses the cached credential at `token_path` when it still yields an access
/// token, otherwise runs the installed-app consent flow with the client
/// secret at `credentials_path` and rewrites the cache.
pub async fn authorize(
    credentials_path: &Path,
    token_path: &Path,
    limits: &NetworkLimits,
) -> Result<Authorized, AuthError> {
    info!(
        credentials = %credentials_path.display(),
        token = %token_path.display(),
        "Authenticating with Google Drive"
    );

    // Install the rustls crypto provider before any TLS operations.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        debug!(error = ?e, "CryptoProvider already installed, continuing");
    }

    if let Some(auth) = load_cached(token_path, limits).await {
        info!("Using cached Google Drive credential");
        return Ok(Authorized {
            hub: build_hub(auth)?,
            cache_warning: None,
        });
    }

    let (auth, cache_warning) = run_consent_flow(credentials_path, token_path, limits).await?;
    Ok(Authorized {
        hub: build_hub(auth)?,
        cache_warning,
    })
}

async fn load_cached(token_path: &Path, limits: &NetworkLimits) -> Option<DriveAuthenticator> {
    if !token_path.exists() {
        info!(path = %token_path.display(), "No cached credential");
        return None;
    }

    let secret = match yup_oauth2::read_authorized_user_secret(token_path).await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, path = %token_path.display(), "Cached credential is malformed");
            return None;
        }
    };

    let auth = match yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
        .build()
        .await
    {
        Ok(a) => a,
        Err(e) => {
            warn!(error = %e, "Failed to build authenticator from cached credential");
            return None;
        }
    };

    let refreshed = limits
        .request("token refresh", async {
            auth.token(&[DRIVE_SCOPE]).await?;
            anyhow::Ok(())
        })
        .await;

    match refreshed {
        Ok(()) => Some(auth),
        Err(e) => {
            warn!(error = %e, "Cached credential is no longer valid");
            None
        }
    }
}

async fn run_consent_flow(
    credentials_path: &Path,
    token_path: &Path,
    limits: &NetworkLimits,
) -> Result<(DriveAuthenticator, Option<String>), AuthError> {
    if !credentials_path.exists() {
        error!(path = %credentials_path.display(), "Client secret file not found");
        return Err(AuthError::MissingClientSecret(credentials_path.to_path_buf()));
    }

    let secret = match yup_oauth2::read_application_secret(credentials_path).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, path = %credentials_path.display(), "Failed to read client secret");
            return Err(AuthError::InvalidClientSecret {
                path: credentials_path.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };

    info!("Starting interactive authorization, follow the link printed below");

    let captured = CapturedToken::default();
    let auth = match yup_oauth2::InstalledFlowAuthenticator::builder(
        secret.clone(),
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .with_storage(Box::new(captured.clone()))
    .build()
    .await
    {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "Failed to build installed-flow authenticator");
            return Err(AuthError::Client(e.to_string()));
        }
    };

    let granted = limits
        .transfer("authorization", async {
            auth.token(&[DRIVE_SCOPE]).await?;
            anyhow::Ok(())
        })
        .await;
    if let Err(e) = granted {
        error!(error = %e, "Authorization flow failed");
        return Err(AuthError::Consent(format!("{e:#}")));
    }

    let refresh_token = match captured.refresh_token() {
        Some(t) => t,
        None => {
            error!("Authorization succeeded but no refresh token was issued");
            return Err(AuthError::Consent("no refresh token was issued".to_string()));
        }
    };

    let credential = CachedCredential::new(secret.client_id, secret.client_secret, refresh_token);
    let cache_warning = persist_credential(token_path, &credential).await;

    Ok((auth, cache_warning))
}

/// Writes the cache, turning a failure into a message for the user. The
/// session still has a valid token either way.
async fn persist_credential(path: &Path, credential: &CachedCredential) -> Option<String> {
    match save_cached_credential(path, credential).await {
        Ok(()) => None,
        Err(e) => {
            error!(error = %e, path = %path.display(), "Failed to save credential cache");
            Some(format!(
                "could not save credential cache to {}: {e:#}; authorization will be asked again next run",
                path.display()
            ))
        }
    }
}

pub async fn save_cached_credential(path: &Path, credential: &CachedCredential) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(credential)?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), "Saved credential cache");
    Ok(())
}

fn build_hub(auth: DriveAuthenticator) -> Result<DriveHub, AuthError> {
    let connector = match hyper_rustls::HttpsConnectorBuilder::new().with_native_roots() {
        Ok(builder) => builder.https_only().enable_http1().enable_http2().build(),
        Err(e) => {
            error!(error = %e, "Failed to load native TLS root certificates");
            return Err(AuthError::Client(format!(
                "failed to load native TLS root certificates: {e}"
            )));
        }
    };

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(connector);

    let hub = google_drive3::DriveHub::new(client, auth);

    info!("Google Drive authentication successful");

    Ok(hub)
}
