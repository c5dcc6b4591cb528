use crate::coordinator::streaming::{CancellationToken, StreamingCoordinator};
use crate::error::{ProcessingError, Result};
use crate::models::IngestionResults;
use crate::readers::DataSource;
use crate::utils::progress::ProgressReporter;
use crate::utils::Settings;
use std::io::Read;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

/// An ingestion running on tokio's blocking pool.
pub struct IngestionTask {
    token: CancellationToken,
    handle: Option<JoinHandle<Result<IngestionResults>>>,
    grace: Duration,
}

impl IngestionTask {
    /// Open `source` and ingest it off the async executor.
    pub fn spawn(source: DataSource, settings: Settings, progress: Option<ProgressReporter>) -> Self {
        Self::spawn_with(settings, progress, move |settings| source.open(settings))
    }

    pub fn spawn_reader<R>(reader: R, settings: Settings, progress: Option<ProgressReporter>) -> Self
    where
        R: Read + Send + 'static,
    {
        Self::spawn_with(settings, progress, move |_| Ok(reader))
    }

    fn spawn_with<R, F>(settings: Settings, progress: Option<ProgressReporter>, open: F) -> Self
    where
        R: Read,
        F: FnOnce(&Settings) -> Result<R> + Send + 'static,
    {
        let token = CancellationToken::new();
        let grace = settings.cancel_grace();
        let task_token = token.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let result = open(&settings).and_then(|reader| {
                StreamingCoordinator::with_token(settings, task_token)
                    .ingest(reader, progress.as_ref())
            });

            if let Some(p) = &progress {
                match &result {
                    Ok(results) => p.finish_with_message(&format!(
                        "Processed {} locations",
                        results.monitoring_locations.len()
                    )),
                    Err(_) => p.abandon(),
                }
            }
            result
        });

        Self {
            token,
            handle: Some(handle),
            grace,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request cancellation. Has no effect once the ingestion has produced its result.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the outcome.
    ///
    /// Once the token is cancelled, by `cancel` or through a clone from
    /// `cancellation_token`, the wait is bounded by the grace period; past that the
    /// blocking thread is detached and `Cancelled` is returned.
    pub async fn wait(&mut self) -> Result<IngestionResults> {
        let token = self.token.clone();
        let grace = self.grace;
        let handle = self.handle.as_mut().ok_or_else(|| {
            ProcessingError::Worker("ingestion outcome was already taken".to_string())
        })?;

        let finished = tokio::select! {
            joined = &mut *handle => Some(joined),
            _ = token.cancelled() => None,
        };
        let joined = match finished {
            Some(joined) => Some(joined),
            None => tokio::time::timeout(grace, &mut *handle).await.ok(),
        };

        self.handle = None;
        match joined {
            Some(joined) => joined?,
            None => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    "Ingestion did not stop within grace period, detaching"
                );
                Err(ProcessingError::Cancelled)
            }
        }
    }
}
