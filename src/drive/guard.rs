use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::error::BackupError;

/// Timeout and cancellation applied to every network call.
#[derive(Debug, Clone)]
pub struct NetworkLimits {
    pub request_timeout: Duration,
    pub transfer_timeout: Duration,
    pub cancel: CancellationToken,
}

impl NetworkLimits {
    pub fn new(
        request_timeout: Duration,
        transfer_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        NetworkLimits {
            request_timeout,
            transfer_timeout,
            cancel,
        }
    }

    pub async fn request<T, F>(&self, operation: &str, fut: F) -> anyhow::Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        guarded(operation, self.request_timeout, &self.cancel, fut).await
    }

    pub async fn transfer<T, F>(&self, operation: &str, fut: F) -> anyhow::Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        guarded(operation, self.transfer_timeout, &self.cancel, fut).await
    }
}

/// Run `fut` until it finishes, `timeout` elapses, or `cancel` fires.
pub async fn guarded<T, F>(
    operation: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            error!(operation = operation, "Operation cancelled");
            Err(BackupError::Cancelled(operation.to_string()).into())
        }
        res = tokio::time::timeout(timeout, fut) => match res {
            Ok(inner) => inner,
            Err(_) => {
                error!(
                    operation = operation,
                    timeout_secs = timeout.as_secs(),
                    "Operation timed out"
                );
                Err(BackupError::Timeout {
                    operation: operation.to_string(),
                    seconds: timeout.as_secs(),
                }
                .into())
            }
        },
    }
}
