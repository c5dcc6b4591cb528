use crate::error::Result;
use crate::utils::constants::{
    DEFAULT_BUFFER_SIZE, DEFAULT_CANCEL_GRACE_MS, MAX_CANCEL_GRACE_MS, SETTINGS_ENV_PREFIX,
};
use config::{Config, Environment};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Runtime knobs for an ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Settings {
    /// Read buffer handed to the CSV tokenizer
    #[validate(range(min = 1))]
    pub buffer_capacity: usize,

    /// How long a cancelled ingestion may take to wind down before forced teardown
    #[validate(range(min = 1, max = 60000))]
    pub cancel_grace_ms: u64,

    /// Memory-map local files instead of buffered reads
    pub use_mmap: bool,
}

impl Settings {
    /// Defaults overridden by `WATER_TEMP_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(Environment::with_prefix(SETTINGS_ENV_PREFIX).try_parsing(true))
    }

    fn load_from(environment: Environment) -> Result<Self> {
        let settings: Settings = Config::builder()
            .set_default("buffer_capacity", DEFAULT_BUFFER_SIZE as i64)?
            .set_default("cancel_grace_ms", DEFAULT_CANCEL_GRACE_MS as i64)?
            .set_default("use_mmap", false)?
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace_ms = (grace.as_millis() as u64).clamp(1, MAX_CANCEL_GRACE_MS);
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_SIZE,
            cancel_grace_ms: DEFAULT_CANCEL_GRACE_MS,
            use_mmap: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn environment(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(SETTINGS_ENV_PREFIX)
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn test_defaults_without_overrides() {
        let settings = Settings::load_from(environment(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.cancel_grace(), Duration::from_millis(2000));
    }

    #[test]
    fn test_environment_overrides() {
        let settings = Settings::load_from(environment(&[
            ("WATER_TEMP_CANCEL_GRACE_MS", "250"),
            ("WATER_TEMP_USE_MMAP", "true"),
        ]))
        .unwrap();

        assert_eq!(settings.cancel_grace_ms, 250);
        assert!(settings.use_mmap);
        assert_eq!(settings.buffer_capacity, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let result = Settings::load_from(environment(&[("WATER_TEMP_BUFFER_CAPACITY", "0")]));
        assert!(result.is_err());

        let settings = Settings::default().with_buffer_capacity(0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_grace_is_clamped() {
        let settings = Settings::default().with_cancel_grace(Duration::from_secs(3600));
        assert_eq!(settings.cancel_grace_ms, MAX_CANCEL_GRACE_MS);
        assert!(settings.validate().is_ok());
    }
}
