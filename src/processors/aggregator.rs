use crate::models::{IngestionResults, LocationResult};
use crate::processors::accumulator::{Histogram, TemperatureAccumulator};
use crate::utils::constants::ALL_LOCATIONS_ID;
use std::collections::HashMap;

/// Millidegree sum and reading count of one histogram.
///
/// The sum is widened to `i128` so any `i64` key times any count fits.
pub fn histogram_totals(histogram: &Histogram) -> (i128, u64) {
    histogram
        .iter()
        .fold((0i128, 0u64), |(sum, count), (&millidegrees, &occurrences)| {
            (
                sum + millidegrees as i128 * occurrences as i128,
                count + occurrences,
            )
        })
}

/// Derive per-location averages plus the count-weighted `-ALL-` average.
///
/// Sums stay in integer millidegrees until the single division per reported average.
/// Does not modify the accumulator, so calling it twice yields the same results.
pub fn compute_results(accumulator: &TemperatureAccumulator) -> IngestionResults {
    let mut monitoring_location_results =
        HashMap::with_capacity(accumulator.location_count() + 1);
    let mut overall_sum = 0i128;
    let mut overall_count = 0u64;

    for (location_id, histogram) in accumulator.histograms() {
        let (sum, count) = histogram_totals(histogram);
        if count == 0 {
            continue;
        }

        overall_sum += sum;
        overall_count += count;
        monitoring_location_results.insert(
            location_id.to_string(),
            LocationResult::from_millidegrees(sum, count),
        );
    }

    if overall_count > 0 {
        monitoring_location_results.insert(
            ALL_LOCATIONS_ID.to_string(),
            LocationResult::from_millidegrees(overall_sum, overall_count),
        );
    }

    let monitoring_locations = accumulator
        .locations()
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .collect();

    IngestionResults {
        monitoring_locations,
        monitoring_location_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WaterQualityRecord;
    use pretty_assertions::assert_eq;

    fn add(accumulator: &mut TemperatureAccumulator, value: &str, id: &str) {
        accumulator.add(&WaterQualityRecord::new(
            value,
            "Temperature, water",
            id,
            &format!("Site {}", id),
        ));
    }

    #[test]
    fn test_two_locations() {
        let mut accumulator = TemperatureAccumulator::new();
        add(&mut accumulator, "10.0", "A");
        add(&mut accumulator, "20.0", "B");

        let results = compute_results(&accumulator);

        let expected: HashMap<String, LocationResult> = [
            ("A", LocationResult { average: 10.0, count: 1 }),
            ("B", LocationResult { average: 20.0, count: 1 }),
            ("-ALL-", LocationResult { average: 15.0, count: 2 }),
        ]
        .into_iter()
        .map(|(id, result)| (id.to_string(), result))
        .collect();

        assert_eq!(results.monitoring_location_results, expected);
        assert_eq!(results.location_name("B"), Some("Site B"));
    }

    #[test]
    fn test_overall_is_count_weighted() {
        let mut accumulator = TemperatureAccumulator::new();
        for _ in 0..3 {
            add(&mut accumulator, "10.0", "A");
        }
        add(&mut accumulator, "30.0", "B");

        let results = compute_results(&accumulator);
        let overall = results.overall().unwrap();

        // (10 * 3 + 30 * 1) / 4, not the mean of 10 and 30
        assert_eq!(overall.count, 4);
        assert!((overall.average - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_value_average() {
        let mut accumulator = TemperatureAccumulator::new();
        for _ in 0..5 {
            add(&mut accumulator, "15.5", "LOC-001");
        }

        let results = accumulator.compute_results();
        let location = results.monitoring_location_results["LOC-001"];
        assert_eq!(location.count, 5);
        assert!((location.average - 15.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_has_no_sentinel() {
        let results = compute_results(&TemperatureAccumulator::new());

        assert!(results.monitoring_location_results.is_empty());
        assert!(results.overall().is_none());
    }

    #[test]
    fn test_compute_is_repeatable() {
        let mut accumulator = TemperatureAccumulator::new();
        add(&mut accumulator, "-2.25", "A");
        add(&mut accumulator, "4.75", "A");

        let first = compute_results(&accumulator);
        let second = compute_results(&accumulator);

        assert_eq!(first, second);
        assert!((first.monitoring_location_results["A"].average - 1.25).abs() < 1e-9);
        assert_eq!(histogram_totals(accumulator.histogram("A").unwrap()), (2500, 2));
    }

    #[test]
    fn test_extreme_readings_do_not_overflow() {
        let mut accumulator = TemperatureAccumulator::new();
        add(&mut accumulator, "9000000000000000", "A");
        add(&mut accumulator, "9000000000000000", "A");
        add(&mut accumulator, "-9000000000000000", "B");

        let results = compute_results(&accumulator);

        let a = results.monitoring_location_results["A"];
        assert_eq!(a.count, 2);
        assert!((a.average - 9.0e15).abs() / 9.0e15 < 1e-9);

        let overall = results.overall().unwrap();
        assert_eq!(overall.count, 3);
        assert!((overall.average - 3.0e15).abs() / 3.0e15 < 1e-9);
    }
}
