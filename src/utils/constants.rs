/// The only characteristic retained during ingestion (compared case-insensitively)
pub const TARGET_CHARACTERISTICS: [&str; 1] = ["Temperature, water"];

/// Pseudo-location ID holding the count-weighted average across all locations
pub const ALL_LOCATIONS_ID: &str = "-ALL-";

/// Quantization factor: degrees to integer millidegrees
pub const MILLIDEGREES_PER_DEGREE: f64 = 1000.0;

/// Processing defaults
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const DEFAULT_CANCEL_GRACE_MS: u64 = 2000;
pub const MAX_CANCEL_GRACE_MS: u64 = 60_000;
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Environment variable prefix for settings overrides
pub const SETTINGS_ENV_PREFIX: &str = "WATER_TEMP";
