use serde::{Deserialize, Serialize};
use std::fmt;

/// Columns every water-quality export must carry, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnName {
    ResultValue,
    CharacteristicName,
    MonitoringLocationId,
    MonitoringLocationName,
}

impl ColumnName {
    pub const REQUIRED: [ColumnName; 4] = [
        ColumnName::ResultValue,
        ColumnName::CharacteristicName,
        ColumnName::MonitoringLocationId,
        ColumnName::MonitoringLocationName,
    ];

    pub fn canonical(&self) -> &'static str {
        match self {
            ColumnName::ResultValue => "ResultValue",
            ColumnName::CharacteristicName => "CharacteristicName",
            ColumnName::MonitoringLocationId => "MonitoringLocationID",
            ColumnName::MonitoringLocationName => "MonitoringLocationName",
        }
    }

    /// Case-insensitive match of a raw header cell against this column.
    pub fn matches(&self, header: &str) -> bool {
        header.trim().eq_ignore_ascii_case(self.canonical())
    }

    pub fn from_header(header: &str) -> Option<Self> {
        Self::REQUIRED.into_iter().find(|column| column.matches(header))
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// One CSV row, borrowed from the tokenizer's buffer for the duration of a single `add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaterQualityRecord<'a> {
    pub result_value: &'a str,
    pub characteristic_name: &'a str,
    pub monitoring_location_id: &'a str,
    pub monitoring_location_name: &'a str,
}

impl<'a> WaterQualityRecord<'a> {
    pub fn new(
        result_value: &'a str,
        characteristic_name: &'a str,
        monitoring_location_id: &'a str,
        monitoring_location_name: &'a str,
    ) -> Self {
        Self {
            result_value,
            characteristic_name,
            monitoring_location_id,
            monitoring_location_name,
        }
    }

    pub fn field(&self, column: ColumnName) -> &'a str {
        match column {
            ColumnName::ResultValue => self.result_value,
            ColumnName::CharacteristicName => self.characteristic_name,
            ColumnName::MonitoringLocationId => self.monitoring_location_id,
            ColumnName::MonitoringLocationName => self.monitoring_location_name,
        }
    }
}
