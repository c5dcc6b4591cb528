//! Off-thread ingestion driven by a strict request/response message protocol.
//!
//! The caller never shares accumulation state with the worker: requests carry owned
//! bytes or a path, and responses carry fully materialized results. Every message is
//! serde-serializable so the same protocol can cross a process boundary as JSON.

use crate::coordinator::streaming::{ingest_reader, CancellationToken};
use crate::error::{ProcessingError, Result};
use crate::models::IngestionResults;
use crate::readers::{ChunkReader, DataSource};
use crate::utils::Settings;
use crossbeam::channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerRequest {
    /// Begin a session fed by `Chunk` messages
    Start,
    /// Next slice of the byte stream; `done` closes the stream after these bytes
    Chunk { bytes: Vec<u8>, done: bool },
    /// Begin a session reading a local file
    File { path: PathBuf },
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerResponse {
    Success { results: IngestionResults },
    Error { error: WorkerError },
    Cancelled,
}

/// Transportable form of a fatal ingestion error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WorkerError {
    HeaderMissing,
    MissingColumn { column: String },
    Parse { message: String },
    Io { message: String },
    /// A session is already running; the rejected request had no effect on it.
    Busy,
    Other { message: String },
}

impl WorkerRequest {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl WorkerResponse {
    pub fn from_result(result: Result<IngestionResults>) -> Self {
        match result {
            Ok(results) => WorkerResponse::Success { results },
            Err(e) if e.is_cancelled() => WorkerResponse::Cancelled,
            Err(e) => WorkerResponse::Error {
                error: WorkerError::from(&e),
            },
        }
    }

    pub fn into_result(self) -> Result<IngestionResults> {
        match self {
            WorkerResponse::Success { results } => Ok(results),
            WorkerResponse::Error { error } => Err(error.into()),
            WorkerResponse::Cancelled => Err(ProcessingError::Cancelled),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<&ProcessingError> for WorkerError {
    fn from(error: &ProcessingError) -> Self {
        match error {
            ProcessingError::HeaderMissing => WorkerError::HeaderMissing,
            ProcessingError::MissingColumn { column } => WorkerError::MissingColumn {
                column: column.clone(),
            },
            ProcessingError::Csv(e) if e.is_io_error() => WorkerError::Io {
                message: e.to_string(),
            },
            ProcessingError::Csv(e) => WorkerError::Parse {
                message: e.to_string(),
            },
            ProcessingError::Malformed(message) => WorkerError::Parse {
                message: message.clone(),
            },
            ProcessingError::Io(e) => WorkerError::Io {
                message: e.to_string(),
            },
            other => WorkerError::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<WorkerError> for ProcessingError {
    fn from(error: WorkerError) -> Self {
        match error {
            WorkerError::HeaderMissing => ProcessingError::HeaderMissing,
            WorkerError::MissingColumn { column } => ProcessingError::MissingColumn { column },
            WorkerError::Parse { message } => ProcessingError::Malformed(message),
            WorkerError::Io { message } => {
                ProcessingError::Io(io::Error::new(io::ErrorKind::Other, message))
            }
            WorkerError::Busy => {
                ProcessingError::Worker("an ingestion is already running".to_string())
            }
            WorkerError::Other { message } => ProcessingError::Worker(message),
        }
    }
}

/// Handle to a worker thread. Dropping it cancels any running session and joins the thread.
pub struct IngestionWorker {
    requests: Option<Sender<WorkerRequest>>,
    responses: Receiver<WorkerResponse>,
    router: Option<JoinHandle<()>>,
}

impl IngestionWorker {
    pub fn spawn(settings: Settings) -> Result<Self> {
        let (request_tx, request_rx) = unbounded();
        let (response_tx, response_rx) = unbounded();

        let router = thread::Builder::new()
            .name("ingestion-worker".to_string())
            .spawn(move || Router::new(settings, response_tx).run(request_rx))?;

        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            router: Some(router),
        })
    }

    pub fn send(&self, request: WorkerRequest) -> Result<()> {
        self.requests
            .as_ref()
            .ok_or_else(|| ProcessingError::Worker("worker has shut down".to_string()))?
            .send(request)
            .map_err(|_| ProcessingError::Worker("worker has shut down".to_string()))
    }

    pub fn recv(&self) -> Result<WorkerResponse> {
        self.responses
            .recv()
            .map_err(|_| ProcessingError::Worker("worker has shut down".to_string()))
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<WorkerResponse>> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Ok(Some(response)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(ProcessingError::Worker("worker has shut down".to_string()))
            }
        }
    }

    /// Run a file session to completion and return its outcome.
    pub fn ingest_file(&self, path: impl Into<PathBuf>) -> Result<IngestionResults> {
        self.send(WorkerRequest::File { path: path.into() })?;
        self.recv()?.into_result()
    }
}

impl Drop for IngestionWorker {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(router) = self.router.take() {
            if router.join().is_err() {
                warn!("Ingestion worker thread panicked");
            }
        }
    }
}

enum SessionInput {
    Chunks(Receiver<Vec<u8>>),
    File(PathBuf),
}

struct Session {
    token: CancellationToken,
    chunks: Option<Sender<Vec<u8>>>,
    /// Disconnects when the session thread exits; nothing is ever sent on it.
    finished: Receiver<()>,
    delivered: Arc<AtomicBool>,
}

impl Session {
    /// A session is over once its response is out, even if its thread is still unwinding.
    fn is_running(&self) -> bool {
        !self.delivered.load(Ordering::SeqCst)
            && matches!(self.finished.try_recv(), Err(TryRecvError::Empty))
    }
}

/// Publish a session's single response; later attempts are dropped.
fn deliver(delivered: &AtomicBool, responses: &Sender<WorkerResponse>, response: WorkerResponse) {
    if delivered
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        // The caller may already have dropped its handle.
        let _ = responses.send(response);
    }
}

struct Router {
    settings: Settings,
    responses: Sender<WorkerResponse>,
    session: Option<Session>,
}

impl Router {
    fn new(settings: Settings, responses: Sender<WorkerResponse>) -> Self {
        Self {
            settings,
            responses,
            session: None,
        }
    }

    fn run(mut self, requests: Receiver<WorkerRequest>) {
        for request in requests.iter() {
            match request {
                WorkerRequest::Start => {
                    let (tx, rx) = unbounded();
                    self.start(SessionInput::Chunks(rx), Some(tx));
                }
                WorkerRequest::File { path } => self.start(SessionInput::File(path), None),
                WorkerRequest::Chunk { bytes, done } => self.forward_chunk(bytes, done),
                WorkerRequest::Cancel => self.cancel(),
            }
        }

        if let Some(mut session) = self.session.take() {
            session.token.cancel();
            session.chunks.take();
        }
        debug!("Ingestion worker stopped");
    }

    fn start(&mut self, input: SessionInput, chunks: Option<Sender<Vec<u8>>>) {
        if self.session.as_ref().map_or(false, Session::is_running) {
            debug!("Start rejected: an ingestion is already running");
            let _ = self.responses.send(WorkerResponse::Error {
                error: WorkerError::Busy,
            });
            return;
        }

        let token = CancellationToken::new();
        let delivered = Arc::new(AtomicBool::new(false));
        let (finished_tx, finished_rx) = bounded::<()>(0);

        let settings = self.settings.clone();
        let responses = self.responses.clone();
        let session_token = token.clone();
        let session_delivered = delivered.clone();

        let spawned = thread::Builder::new()
            .name("ingestion-session".to_string())
            .spawn(move || {
                let _finished = finished_tx;
                let outcome = run_session(input, settings, session_token);
                deliver(
                    &session_delivered,
                    &responses,
                    WorkerResponse::from_result(outcome),
                );
            });

        if let Err(e) = spawned {
            deliver(
                &delivered,
                &self.responses,
                WorkerResponse::Error {
                    error: WorkerError::Other {
                        message: format!("failed to spawn ingestion thread: {}", e),
                    },
                },
            );
            return;
        }

        debug!("Ingestion session started");
        self.session = Some(Session {
            token,
            chunks,
            finished: finished_rx,
            delivered,
        });
    }

    fn forward_chunk(&mut self, bytes: Vec<u8>, done: bool) {
        let Some(session) = self.session.as_mut() else {
            debug!("Chunk ignored: no ingestion session");
            return;
        };

        if let Some(chunks) = &session.chunks {
            if !bytes.is_empty() && chunks.send(bytes).is_err() {
                debug!("Chunk ignored: session already finished");
            }
        }
        if done {
            session.chunks.take();
        }
    }

    fn cancel(&mut self) {
        let Some(session) = self.session.as_mut().filter(|s| s.is_running()) else {
            debug!("Cancel ignored: no ingestion running");
            return;
        };

        session.token.cancel();
        session.chunks.take();

        if let Err(RecvTimeoutError::Timeout) =
            session.finished.recv_timeout(self.settings.cancel_grace())
        {
            warn!(
                grace_ms = self.settings.cancel_grace_ms,
                "Ingestion did not stop within grace period, forcing teardown"
            );
            deliver(
                &session.delivered,
                &self.responses,
                WorkerResponse::Cancelled,
            );
        }
    }
}

fn run_session(
    input: SessionInput,
    settings: Settings,
    token: CancellationToken,
) -> Result<IngestionResults> {
    let reader: Box<dyn Read + Send> = match input {
        SessionInput::Chunks(rx) => Box::new(ChunkReader::new(rx)),
        SessionInput::File(path) => DataSource::Path(path).open(&settings)?,
    };
    ingest_reader(reader, settings, token)
}
