#![cfg(feature = "cli")]

mod common;

use std::path::Path;

use assert_cmd::Command;
use calib_accuracy::EvaluateReport;
use predicates::prelude::*;
use serde_json::json;

use common::{square_scene, to_png_buffer};

fn write_inputs(dir: &Path, corners: Vec<[f32; 2]>) -> std::path::PathBuf {
    let scene = square_scene();
    let image_path = dir.join("target.png");
    to_png_buffer(&scene.image).save(&image_path).unwrap();

    let cfg = json!({
        "image_path": image_path,
        "physical": { "width": 172.2, "height": 114.8, "spacing": 14.65 },
        "corners": corners,
        "output_path": dir.join("report.json"),
        "rectified_path": dir.join("rectified.png"),
        "mask_path": dir.join("mask.png"),
    });
    let cfg_path = dir.join("config.json");
    std::fs::write(&cfg_path, serde_json::to_string_pretty(&cfg).unwrap()).unwrap();
    cfg_path
}

#[test]
fn evaluates_synthetic_target() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_path = write_inputs(
        dir.path(),
        vec![[11.0, 9.0], [189.0, 11.0], [190.0, 188.0], [12.0, 190.0]],
    );

    Command::cargo_bin("calib-accuracy")
        .unwrap()
        .arg("--config")
        .arg(&cfg_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("77 markers"));

    let report = EvaluateReport::load_json(dir.path().join("report.json")).unwrap();
    assert!(report.error.is_none());
    assert_eq!(report.errors.len(), 77);
    assert_eq!(report.corners.len(), 4);
    assert!(report.summary.unwrap().max < 1.0);
    assert!(dir.path().join("rectified.png").exists());
    assert!(dir.path().join("mask.png").exists());
}

#[test]
fn reports_unmatched_click_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_path = write_inputs(
        dir.path(),
        vec![[11.0, 9.0], [100.0, 100.0], [190.0, 188.0], [12.0, 190.0]],
    );

    Command::cargo_bin("calib-accuracy")
        .unwrap()
        .arg("--config")
        .arg(&cfg_path)
        .assert()
        .failure();

    let report = EvaluateReport::load_json(dir.path().join("report.json")).unwrap();
    let error = report.error.expect("error recorded");
    assert!(error.contains("no marker center"), "unexpected error: {error}");
    assert_eq!(report.corners.len(), 1);
    assert!(report.errors.is_empty());
    assert!(!dir.path().join("rectified.png").exists());
}

#[test]
fn missing_config_fails() {
    Command::cargo_bin("calib-accuracy")
        .unwrap()
        .arg("--config")
        .arg("/nonexistent/config.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}
