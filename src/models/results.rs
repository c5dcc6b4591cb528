use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::constants::ALL_LOCATIONS_ID;

/// Average and reading count for one location, or for `-ALL-`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationResult {
    pub average: f64,
    pub count: u64,
}

impl LocationResult {
    /// Converts an integer millidegree sum back to degrees exactly once.
    pub fn from_millidegrees(sum_millidegrees: i128, count: u64) -> Self {
        Self {
            average: sum_millidegrees as f64 / 1000.0 / count as f64,
            count,
        }
    }
}

/// Final output of one ingestion.
///
/// Both maps serialize as arrays of `[key, value]` pairs sorted by key so the
/// structure can cross thread or process boundaries as plain JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResults {
    #[serde(with = "pairs")]
    pub monitoring_locations: HashMap<String, String>,
    #[serde(with = "pairs")]
    pub monitoring_location_results: HashMap<String, LocationResult>,
}

impl IngestionResults {
    pub fn overall(&self) -> Option<&LocationResult> {
        self.monitoring_location_results.get(ALL_LOCATIONS_ID)
    }

    pub fn location_name(&self, location_id: &str) -> Option<&str> {
        self.monitoring_locations.get(location_id).map(String::as_str)
    }

    /// Results ordered by location ID for display.
    pub fn sorted_results(&self) -> Vec<(&str, &LocationResult)> {
        let mut results: Vec<(&str, &LocationResult)> = self
            .monitoring_location_results
            .iter()
            .map(|(id, result)| (id.as_str(), result))
            .collect();
        results.sort_by(|a, b| a.0.cmp(b.0));
        results
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

mod pairs {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;
    use std::hash::Hash;

    pub fn serialize<K, V, S>(map: &HashMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize + Ord,
        V: Serialize,
        S: Serializer,
    {
        let mut entries: Vec<(&K, &V)> = map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<HashMap<K, V>, D::Error>
    where
        K: DeserializeOwned + Eq + Hash,
        V: DeserializeOwned,
        D: Deserializer<'de>,
    {
        let entries: Vec<(K, V)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_results() -> IngestionResults {
        let mut results = IngestionResults::default();
        results
            .monitoring_locations
            .insert("B".to_string(), "Site B".to_string());
        results
            .monitoring_locations
            .insert("A".to_string(), "Site A".to_string());
        results
            .monitoring_location_results
            .insert("A".to_string(), LocationResult::from_millidegrees(10_000, 1));
        results
            .monitoring_location_results
            .insert("B".to_string(), LocationResult::from_millidegrees(20_000, 1));
        results.monitoring_location_results.insert(
            ALL_LOCATIONS_ID.to_string(),
            LocationResult::from_millidegrees(30_000, 2),
        );
        results
    }

    #[test]
    fn test_maps_serialize_as_sorted_pairs() {
        let json = serde_json::to_value(sample_results()).unwrap();

        assert_eq!(
            json["monitoringLocations"],
            serde_json::json!([["A", "Site A"], ["B", "Site B"]])
        );
        assert_eq!(
            json["monitoringLocationResults"][0],
            serde_json::json!(["-ALL-", { "average": 15.0, "count": 2 }])
        );
    }

    #[test]
    fn test_json_round_trip_preserves_maps() {
        let original = sample_results();
        let restored = IngestionResults::from_json(&original.to_json().unwrap()).unwrap();

        assert_eq!(restored, original);
        assert_eq!(restored.location_name("A"), Some("Site A"));
        assert_eq!(restored.overall().map(|r| r.count), Some(2));
    }

    #[test]
    fn test_sorted_results_puts_sentinel_first() {
        let results = sample_results();
        let ids: Vec<&str> = results.sorted_results().into_iter().map(|(id, _)| id).collect();

        assert_eq!(ids, vec!["-ALL-", "A", "B"]);
    }
}
