pub mod streaming;
pub mod task;
pub mod worker;

pub use streaming::{ingest_reader, CancellationToken, IngestionState, StreamingCoordinator};
pub use task::IngestionTask;
pub use worker::{IngestionWorker, WorkerError, WorkerRequest, WorkerResponse};
