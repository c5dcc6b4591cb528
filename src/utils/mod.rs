pub mod constants;
pub mod progress;
pub mod settings;

pub use constants::*;
pub use progress::ProgressReporter;
pub use settings::Settings;
