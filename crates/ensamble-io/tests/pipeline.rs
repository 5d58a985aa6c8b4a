//! End-to-end integration tests: CSV -> dataset -> input validation -> JSON reports.

use std::fs;
use std::path::{Path, PathBuf};

use ensamble_io::{
    ClassNames, DEFAULT_FEATURE_COUNT, DatasetReader, FeatureVector, IoError, ModelInfo,
    Prediction, ResultWriter, UNKNOWN_CLASS,
};
use tempfile::TempDir;

/// Path to the bundled Iris CSV at the workspace root.
fn iris_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("data")
        .join("iris.csv")
}

#[test]
fn bundled_iris_loads() {
    let dataset = DatasetReader::new(&iris_path())
        .read()
        .expect("bundled dataset should parse");

    assert_eq!(dataset.n_samples(), 150);
    assert_eq!(dataset.n_features(), DEFAULT_FEATURE_COUNT);
    assert_eq!(
        dataset.feature_names(),
        &["sepal_length", "sepal_width", "petal_length", "petal_width"]
    );

    let names = ClassNames::iris();
    for code in dataset.labels() {
        assert_ne!(names.name(*code), UNKNOWN_CLASS);
    }
    assert_eq!(dataset.features()[0], vec![5.1, 3.5, 1.4, 0.2]);
}

#[test]
fn every_iris_row_is_a_valid_prediction_input() {
    let dataset = DatasetReader::new(&iris_path()).read().unwrap();
    for row in dataset.features() {
        let vector = FeatureVector::new(row.clone(), dataset.n_features()).unwrap();
        assert_eq!(vector.as_slice(), row.as_slice());
    }
}

#[test]
fn reports_round_trip_through_writer() {
    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path()).unwrap();

    let info = ModelInfo {
        app_name: "Ensamble API".to_string(),
        version: "1.0.0".to_string(),
        team: "pi".to_string(),
        model: "RandomForestClassifier".to_string(),
        n_estimators: 50,
        max_features: "sqrt".to_string(),
        max_depth: Some(8),
        criterion: "gini".to_string(),
        min_samples_split: 2,
        min_samples_leaf: 1,
        n_features: 4,
        classes: vec![0, 1, 2],
        oob_score: None,
    };
    let path = writer.write("info", &info).unwrap();
    let back: ModelInfo = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back, info);

    let prediction = Prediction {
        prediction: ClassNames::iris().name(7).to_string(),
    };
    let path = writer.write("prediction", &prediction).unwrap();
    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["prediction"], "unknown");
}

#[test]
fn writer_fails_when_dir_is_a_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("occupied");
    fs::write(&file, b"x").unwrap();
    let err = ResultWriter::new(&file.join("sub")).err().unwrap();
    assert!(matches!(err, IoError::OutputDirCreate { .. }));
}
