//! Background retry of object-store deletions that failed inline.

use std::time::Duration;

use rapshare_common::SharedStorage;
use rapshare_common::config::CleanupConfig;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Retry configuration with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&CleanupConfig::default())
    }
}

impl From<&CleanupConfig> for RetryConfig {
    fn from(config: &CleanupConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_secs(config.initial_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate delay for the given attempt number (0-indexed).
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt >= self.max_retries {
            return self.max_delay;
        }

        let delay_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let delay = Duration::from_secs_f64(delay_secs);

        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }

    /// Check if we should retry after the given number of attempts.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Handle for queueing storage keys whose deletion failed.
///
/// Cloning is cheap; the worker stops once every handle is dropped and the
/// in-flight retries have finished.
#[derive(Clone)]
pub struct StorageCleanup {
    pub(crate) tx: Option<mpsc::Sender<String>>,
}

impl StorageCleanup {
    /// Spawn the cleanup worker on the current runtime.
    #[must_use]
    pub fn start(
        storage: SharedStorage,
        retry: RetryConfig,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run(storage, retry, rx));
        (Self { tx: Some(tx) }, worker)
    }

    /// A handle that only logs. Leaked keys are not retried.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { tx: None }
    }

    /// Queue `key` for another deletion attempt.
    pub fn enqueue(&self, key: String) {
        let Some(tx) = &self.tx else {
            tracing::warn!(storage_key = %key, "Storage cleanup disabled, file left in storage");
            return;
        };

        if let Err(e) = tx.try_send(key) {
            let key = match e {
                mpsc::error::TrySendError::Full(key) | mpsc::error::TrySendError::Closed(key) => {
                    key
                }
            };
            tracing::error!(storage_key = %key, "Storage cleanup queue unavailable, file leaked");
        }
    }
}

async fn run(storage: SharedStorage, retry: RetryConfig, mut rx: mpsc::Receiver<String>) {
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            key = rx.recv() => match key {
                Some(key) => {
                    tasks.spawn(retry_delete(storage.clone(), retry.clone(), key));
                }
                None => break,
            },
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    while tasks.join_next().await.is_some() {}
    tracing::debug!("Storage cleanup worker stopped");
}

async fn retry_delete(storage: SharedStorage, retry: RetryConfig, key: String) {
    let mut attempt = 0;

    loop {
        tokio::time::sleep(retry.delay_for_attempt(attempt)).await;
        attempt += 1;

        match storage.delete(&key).await {
            Ok(()) => {
                tracing::info!(storage_key = %key, attempt, "Deleted file from storage on retry");
                return;
            }
            Err(e) if retry.should_retry(attempt) => {
                tracing::warn!(storage_key = %key, attempt, error = %e, "Storage delete retry failed");
            }
            Err(e) => {
                tracing::error!(
                    storage_key = %key,
                    attempts = attempt,
                    error = %e,
                    "Giving up on storage delete, file leaked"
                );
                return;
            }
        }
    }
}
