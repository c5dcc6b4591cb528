use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;
use water_temp_processor::coordinator::{
    ingest_reader, CancellationToken, IngestionTask, IngestionWorker,
};
use water_temp_processor::readers::DataSource;
use water_temp_processor::utils::Settings;
use water_temp_processor::ProcessingError;

fn write_export(rows: &[(&str, &str, &str, &str)]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(
        temp_file,
        "OrganizationIdentifier,MonitoringLocationID,MonitoringLocationName,ActivityStartDate,CharacteristicName,ResultValue,ResultUnit"
    )
    .unwrap();
    for (id, name, characteristic, value) in rows {
        writeln!(
            temp_file,
            "ORG,{},\"{}\",2023-07-15,\"{}\",{},deg C",
            id, name, characteristic, value
        )
        .unwrap();
    }
    temp_file
}

#[tokio::test]
async fn test_file_ingestion_end_to_end() {
    let export = write_export(&[
        ("LOC-001", "Upper Creek", "Temperature, water", "15.5"),
        ("LOC-001", "Upper Creek", "Temperature, water", "15.5"),
        ("LOC-002", "Lower Creek", "TEMPERATURE, WATER", "18.25"),
        ("LOC-002", "Lower Creek", "Dissolved oxygen (DO)", "9.1"),
        ("LOC-003", "Reservoir", "Temperature, water", "not recorded"),
    ]);

    let mut task = IngestionTask::spawn(DataSource::path(export.path()), Settings::default(), None);
    let results = task.wait().await.unwrap();

    assert_eq!(results.monitoring_locations.len(), 2);
    assert_eq!(results.location_name("LOC-002"), Some("Lower Creek"));
    assert!(results.location_name("LOC-003").is_none());

    let upper = results.monitoring_location_results["LOC-001"];
    assert_eq!(upper.count, 2);
    assert!((upper.average - 15.5).abs() < 1e-9);

    let overall = results.overall().unwrap();
    assert_eq!(overall.count, 3);
    assert!((overall.average - (15.5 * 2.0 + 18.25) / 3.0).abs() < 1e-9);
}

#[test]
fn test_weighted_average_law() {
    let mut rows = Vec::new();
    let values = [("A", "12.0", 7), ("B", "3.5", 2), ("C", "-1.25", 11)];
    for (id, value, count) in values {
        for _ in 0..count {
            rows.push((id, "Site", "Temperature, water", value));
        }
    }
    let export = write_export(&rows);

    let results = IngestionWorker::spawn(Settings::default())
        .unwrap()
        .ingest_file(export.path())
        .unwrap();

    let weighted: f64 = (12.0 * 7.0 + 3.5 * 2.0 - 1.25 * 11.0) / 20.0;
    let unweighted: f64 = (12.0 + 3.5 - 1.25) / 3.0;
    let overall = results.overall().unwrap();

    assert_eq!(overall.count, 20);
    assert!((overall.average - weighted).abs() < 1e-9);
    assert!((overall.average - unweighted).abs() > 1e-3);
}

#[test]
fn test_mmap_and_buffered_sources_agree() {
    let export = write_export(&[
        ("X", "Dock", "Temperature, water", "21.3"),
        ("Y", "Pier", "Temperature, water", "19.9"),
        ("X", "Dock", "Temperature, water", "22.7"),
    ]);

    let buffered = DataSource::path(export.path())
        .open(&Settings::default())
        .unwrap();
    let mapped = DataSource::path(export.path())
        .open(&Settings::default().with_mmap(true))
        .unwrap();

    let from_buffered =
        ingest_reader(buffered, Settings::default(), CancellationToken::new()).unwrap();
    let from_mapped = ingest_reader(mapped, Settings::default(), CancellationToken::new()).unwrap();

    assert_eq!(from_buffered, from_mapped);
}

#[test]
fn test_error_messages_are_distinct() {
    let empty = NamedTempFile::new().unwrap();
    let header_missing = IngestionWorker::spawn(Settings::default())
        .unwrap()
        .ingest_file(empty.path())
        .unwrap_err();

    let mut no_value = NamedTempFile::new().unwrap();
    writeln!(no_value, "MonitoringLocationID,MonitoringLocationName,CharacteristicName").unwrap();
    let missing_column = IngestionWorker::spawn(Settings::default())
        .unwrap()
        .ingest_file(no_value.path())
        .unwrap_err();

    assert!(matches!(header_missing, ProcessingError::HeaderMissing));
    assert_eq!(
        missing_column.to_string(),
        "Missing required column: ResultValue"
    );
    assert_ne!(header_missing.to_string(), missing_column.to_string());
    assert_ne!(
        header_missing.to_string(),
        ProcessingError::Cancelled.to_string()
    );
}
