//! Drives the `ensamble` binary end to end on the bundled Iris CSV.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn iris_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("iris.csv")
}

fn ensamble(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ensamble"))
        .args(args)
        .args(["--quiet"])
        .env_remove("ENSAMBLE_MODEL")
        .env_remove("ENSAMBLE_CLASS_NAMES")
        .env_remove("ENSAMBLE_MODEL_TEAM")
        .env_remove("ENSAMBLE_CRITERION")
        .output()
        .expect("binary should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn train(dir: &TempDir) -> PathBuf {
    let model = dir.path().join("iris.bin");
    let output = ensamble(&[
        "train",
        "--data",
        iris_path().to_str().unwrap(),
        "--output",
        model.to_str().unwrap(),
        "--n-estimators",
        "50",
        "--oob",
        "--report-dir",
        dir.path().to_str().unwrap(),
    ]);
    let summary = stdout_json(&output);
    assert_eq!(summary["n_samples"], 150);
    assert_eq!(summary["n_features"], 4);
    assert_eq!(summary["n_classes"], 3);
    assert_eq!(summary["n_estimators"], 50);
    assert!(summary["oob_score"].as_f64().unwrap() > 0.85);
    assert!(dir.path().join("iris_train.json").exists());
    model
}

#[test]
fn train_then_predict_setosa() {
    let dir = TempDir::new().unwrap();
    let model = train(&dir);

    let output = ensamble(&[
        "predict",
        "--model",
        model.to_str().unwrap(),
        "--features",
        "5.1,3.5,1.4,0.2",
    ]);
    assert_eq!(stdout_json(&output), serde_json::json!({ "prediction": "setosa" }));
}

#[test]
fn unmapped_class_reports_unknown() {
    let dir = TempDir::new().unwrap();
    let model = train(&dir);

    let output = ensamble(&[
        "predict",
        "--model",
        model.to_str().unwrap(),
        "--features",
        "5.1,3.5,1.4,0.2",
        "--class-names",
        ",versicolor,virginica",
    ]);
    assert_eq!(stdout_json(&output)["prediction"], "unknown");
}

#[test]
fn invalid_inputs_fail() {
    let dir = TempDir::new().unwrap();
    let model = train(&dir);
    let model = model.to_str().unwrap();

    for features in [
        "5.1,3.5,1.4",
        "5.1,-3.5,1.4,0.2",
        "5.1,x,1.4,0.2",
        "5.1,,3.5,1.4,0.2",
        ",5.1,3.5,1.4,0.2",
    ] {
        let output = ensamble(&["predict", "--model", model, "--features", features]);
        assert!(!output.status.success(), "accepted {features}");
    }
}

#[test]
fn info_and_health() {
    let dir = TempDir::new().unwrap();
    let model = train(&dir);

    let info = stdout_json(&ensamble(&["info", "--model", model.to_str().unwrap()]));
    assert_eq!(info["team"], "pi");
    assert_eq!(info["model"], "RandomForestClassifier");
    assert_eq!(info["n_estimators"], 50);
    assert_eq!(info["max_features"], "sqrt");
    assert_eq!(info["max_depth"], 8);
    assert_eq!(info["criterion"], "gini");
    assert_eq!(info["min_samples_leaf"], 1);
    assert_eq!(info["classes"], serde_json::json!([0, 1, 2]));

    let health = stdout_json(&ensamble(&["health", "--model", model.to_str().unwrap()]));
    assert_eq!(health["status"], "ok");
}

#[test]
fn missing_model_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.bin");
    let output = ensamble(&["health", "--model", missing.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn tree_settings_reach_the_saved_model() {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("entropy.bin");
    let model = model.to_str().unwrap();
    let output = ensamble(&[
        "train",
        "--data",
        iris_path().to_str().unwrap(),
        "--output",
        model,
        "--n-estimators",
        "20",
        "--criterion",
        "entropy",
        "--min-samples-leaf",
        "3",
    ]);
    stdout_json(&output);

    let info = stdout_json(&ensamble(&["info", "--model", model]));
    assert_eq!(info["criterion"], "entropy");
    assert_eq!(info["min_samples_split"], 2);
    assert_eq!(info["min_samples_leaf"], 3);

    let output = ensamble(&["predict", "--model", model, "--features", "5.1,3.5,1.4,0.2"]);
    assert_eq!(stdout_json(&output)["prediction"], "setosa");
}

#[test]
fn invalid_tree_settings_fail() {
    let dir = TempDir::new().unwrap();
    let model = dir.path().join("bad.bin");
    for (flag, value) in [("--criterion", "mse"), ("--min-samples-leaf", "0")] {
        let output = ensamble(&[
            "train",
            "--data",
            iris_path().to_str().unwrap(),
            "--output",
            model.to_str().unwrap(),
            flag,
            value,
        ]);
        assert!(!output.status.success(), "accepted {flag} {value}");
    }
    assert!(!model.exists());
}
