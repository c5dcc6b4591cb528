pub mod accumulator;
pub mod aggregator;

pub use accumulator::{Histogram, TemperatureAccumulator};
pub use aggregator::compute_results;
