use crate::error::{ProcessingError, Result};
use crate::models::{ColumnName, WaterQualityRecord};
use csv::StringRecord;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Validate the header row and rewrite required columns to their canonical spelling.
///
/// Every required column must be present (case-insensitive, surrounding whitespace
/// ignored). Unknown columns pass through untouched and order is preserved.
pub fn normalize_headers<S: AsRef<str>>(raw: &[S]) -> Result<Vec<String>> {
    let cleaned: Vec<&str> = raw
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let header = header.as_ref();
            if i == 0 {
                header.trim_start_matches(BYTE_ORDER_MARK)
            } else {
                header
            }
        })
        .collect();

    if let Some(missing) = ColumnName::REQUIRED
        .iter()
        .find(|column| !cleaned.iter().any(|header| column.matches(header)))
    {
        return Err(ProcessingError::MissingColumn {
            column: missing.canonical().to_string(),
        });
    }

    Ok(cleaned
        .into_iter()
        .map(|header| match ColumnName::from_header(header) {
            Some(column) => column.canonical().to_string(),
            None => header.to_string(),
        })
        .collect())
}

/// Positions of the required columns within a normalized header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    result_value: usize,
    characteristic_name: usize,
    monitoring_location_id: usize,
    monitoring_location_name: usize,
}

impl ColumnIndex {
    /// Resolve column positions. When a column appears more than once the last one wins.
    pub fn resolve<S: AsRef<str>>(normalized: &[S]) -> Result<Self> {
        let position = |column: ColumnName| {
            normalized
                .iter()
                .rposition(|header| header.as_ref() == column.canonical())
                .ok_or_else(|| ProcessingError::MissingColumn {
                    column: column.canonical().to_string(),
                })
        };

        Ok(Self {
            result_value: position(ColumnName::ResultValue)?,
            characteristic_name: position(ColumnName::CharacteristicName)?,
            monitoring_location_id: position(ColumnName::MonitoringLocationId)?,
            monitoring_location_name: position(ColumnName::MonitoringLocationName)?,
        })
    }

    pub fn position(&self, column: ColumnName) -> usize {
        match column {
            ColumnName::ResultValue => self.result_value,
            ColumnName::CharacteristicName => self.characteristic_name,
            ColumnName::MonitoringLocationId => self.monitoring_location_id,
            ColumnName::MonitoringLocationName => self.monitoring_location_name,
        }
    }

    /// Borrow the required fields out of a raw row. Missing cells read as empty.
    pub fn record<'r>(&self, row: &'r StringRecord) -> WaterQualityRecord<'r> {
        let field = |idx: usize| row.get(idx).unwrap_or("");
        WaterQualityRecord::new(
            field(self.result_value),
            field(self.characteristic_name),
            field(self.monitoring_location_id),
            field(self.monitoring_location_name),
        )
    }
}
