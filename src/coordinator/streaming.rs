use crate::error::{ProcessingError, Result};
use crate::models::IngestionResults;
use crate::processors::TemperatureAccumulator;
use crate::readers::{normalize_headers, ColumnIndex};
use crate::utils::constants::PROGRESS_INTERVAL;
use crate::utils::progress::ProgressReporter;
use crate::utils::Settings;
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation flag shared between a caller and a running ingestion.
///
/// Blocking code polls `is_cancelled`; async code can await `cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call repeatedly or after the ingestion finished.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called on any clone of this token.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag check so a concurrent cancel is not missed.
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionState {
    Idle,
    ValidatingHeader,
    Accumulating,
    Completed,
    Failed,
    Cancelled,
}

/// Drives one ingestion: tokenizer, header validation, accumulation and aggregation.
///
/// A coordinator is single-use; all state is dropped with it.
pub struct StreamingCoordinator {
    settings: Settings,
    token: CancellationToken,
    state: IngestionState,
    rows_read: u64,
}

impl StreamingCoordinator {
    pub fn new(settings: Settings) -> Self {
        Self::with_token(settings, CancellationToken::new())
    }

    pub fn with_token(settings: Settings, token: CancellationToken) -> Self {
        Self {
            settings,
            token,
            state: IngestionState::Idle,
            rows_read: 0,
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn state(&self) -> IngestionState {
        self.state
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Consume `source` to the end and return the aggregated results.
    ///
    /// The source and tokenizer are dropped before this returns, on every path.
    pub fn ingest<R: Read>(
        &mut self,
        source: R,
        progress: Option<&ProgressReporter>,
    ) -> Result<IngestionResults> {
        if self.state != IngestionState::Idle {
            return Err(ProcessingError::Config(
                "a coordinator can only run one ingestion".to_string(),
            ));
        }

        let outcome = self.run(source, progress);
        self.state = match &outcome {
            Ok(_) => IngestionState::Completed,
            Err(ProcessingError::Cancelled) => IngestionState::Cancelled,
            Err(_) => IngestionState::Failed,
        };

        match &outcome {
            Ok(results) => info!(
                rows = self.rows_read,
                locations = results.monitoring_locations.len(),
                "Ingestion completed"
            ),
            Err(e) if e.is_cancelled() => info!(rows = self.rows_read, "Ingestion cancelled"),
            Err(e) => debug!(rows = self.rows_read, error = %e, "Ingestion failed"),
        }

        outcome
    }

    fn run<R: Read>(
        &mut self,
        source: R,
        progress: Option<&ProgressReporter>,
    ) -> Result<IngestionResults> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .buffer_capacity(self.settings.buffer_capacity)
            .from_reader(source);
        let mut row = StringRecord::new();

        self.check_cancelled()?;
        if !reader.read_record(&mut row)? {
            self.check_cancelled()?;
            return Err(ProcessingError::HeaderMissing);
        }

        self.state = IngestionState::ValidatingHeader;
        let headers = normalize_headers(&row.iter().collect::<Vec<_>>())?;
        let columns = ColumnIndex::resolve(&headers)?;
        debug!(columns = headers.len(), "Header validated");

        self.state = IngestionState::Accumulating;
        if let Some(p) = progress {
            p.set_message("Accumulating temperature readings...");
        }

        let mut accumulator = TemperatureAccumulator::new();
        loop {
            self.check_cancelled()?;
            if !reader.read_record(&mut row)? {
                break;
            }

            accumulator.add(&columns.record(&row));
            self.rows_read += 1;

            if self.rows_read % PROGRESS_INTERVAL == 0 {
                if let Some(p) = progress {
                    p.update(self.rows_read);
                }
            }
        }
        drop(reader);

        debug!(
            accepted = accumulator.accepted_count(),
            skipped = accumulator.skipped_count(),
            "Stream exhausted"
        );

        let results = accumulator.compute_results();

        // Cancellation wins over completion until the result leaves this function.
        self.check_cancelled()?;

        if let Some(p) = progress {
            p.update(self.rows_read);
        }
        Ok(results)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.token.is_cancelled() {
            Err(ProcessingError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Run a complete ingestion over `source` with default progress handling.
pub fn ingest_reader<R: Read>(
    source: R,
    settings: Settings,
    token: CancellationToken,
) -> Result<IngestionResults> {
    StreamingCoordinator::with_token(settings, token).ingest(source, None)
}
