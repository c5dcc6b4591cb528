pub mod chunk_reader;
pub mod header_normalizer;
pub mod source;

pub use chunk_reader::ChunkReader;
pub use header_normalizer::{normalize_headers, ColumnIndex};
pub use source::DataSource;
