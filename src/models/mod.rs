pub mod record;
pub mod results;

pub use record::{ColumnName, WaterQualityRecord};
pub use results::{IngestionResults, LocationResult};
