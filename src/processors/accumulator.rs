use crate::models::{IngestionResults, WaterQualityRecord};
use crate::processors::aggregator;
use crate::utils::constants::{MILLIDEGREES_PER_DEGREE, TARGET_CHARACTERISTICS};
use std::collections::HashMap;

/// Millidegree value to number of occurrences.
pub type Histogram = HashMap<i64, u64>;

#[derive(Debug, Clone)]
struct LocationEntry {
    id: String,
    name: String,
    histogram: Histogram,
}

/// Per-ingestion accumulation state: the location registry and one histogram per location.
///
/// Locations are kept in first-seen order so results can be emitted in that order.
#[derive(Debug, Clone, Default)]
pub struct TemperatureAccumulator {
    entries: Vec<LocationEntry>,
    index: HashMap<String, usize>,
    accepted: u64,
    skipped: u64,
}

impl TemperatureAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one record. Returns whether it contributed to a histogram.
    ///
    /// Records with another characteristic or a non-numeric value are skipped silently.
    pub fn add(&mut self, record: &WaterQualityRecord<'_>) -> bool {
        if !is_target_characteristic(record.characteristic_name) {
            self.skipped += 1;
            return false;
        }

        let Some(millidegrees) = parse_millidegrees(record.result_value) else {
            self.skipped += 1;
            return false;
        };

        let slot = match self.index.get(record.monitoring_location_id) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.entries.push(LocationEntry {
                    id: record.monitoring_location_id.to_string(),
                    name: record.monitoring_location_name.to_string(),
                    histogram: Histogram::new(),
                });
                self.index
                    .insert(record.monitoring_location_id.to_string(), slot);
                slot
            }
        };

        *self.entries[slot].histogram.entry(millidegrees).or_insert(0) += 1;
        self.accepted += 1;
        true
    }

    pub fn location_name(&self, location_id: &str) -> Option<&str> {
        self.index
            .get(location_id)
            .map(|&slot| self.entries[slot].name.as_str())
    }

    /// Location registry as `(id, name)` in first-seen order.
    pub fn locations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|entry| (entry.id.as_str(), entry.name.as_str()))
    }

    pub fn histogram(&self, location_id: &str) -> Option<&Histogram> {
        self.index
            .get(location_id)
            .map(|&slot| &self.entries[slot].histogram)
    }

    /// Every location's histogram in first-seen order.
    pub fn histograms(&self) -> impl Iterator<Item = (&str, &Histogram)> {
        self.entries
            .iter()
            .map(|entry| (entry.id.as_str(), &entry.histogram))
    }

    pub fn location_count(&self) -> usize {
        self.entries.len()
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted
    }

    pub fn skipped_count(&self) -> u64 {
        self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn compute_results(&self) -> IngestionResults {
        aggregator::compute_results(self)
    }
}

fn is_target_characteristic(characteristic: &str) -> bool {
    let characteristic = characteristic.trim();
    TARGET_CHARACTERISTICS
        .iter()
        .any(|target| characteristic.eq_ignore_ascii_case(target))
}

/// Parse a reading and quantize it to `floor(value * 1000)`.
pub fn parse_millidegrees(value: &str) -> Option<i64> {
    let value = value.trim().parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }

    let scaled = (value * MILLIDEGREES_PER_DEGREE).floor();
    if scaled < i64::MIN as f64 || scaled >= i64::MAX as f64 {
        return None;
    }
    Some(scaled as i64)
}
