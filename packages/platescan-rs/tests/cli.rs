//! Integration tests for the CLI commands

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_version_command() {
    let mut cmd = cargo_bin_cmd!("platescan");
    cmd.arg("version");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("platescan "));
}

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("platescan");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("platescan "));
}

#[test]
fn test_extract_prints_best_plate() {
    let mut cmd = cargo_bin_cmd!("platescan");
    cmd.args(["extract", "platesmania.com NCM-27-04 www."]);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("NCM-27-04 (score 110)"));
}

#[test]
fn test_extract_ranks_across_arguments() {
    let mut cmd = cargo_bin_cmd!("platescan");
    cmd.args(["extract", "XXX-111-A", "ABC-12-34"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("ABC-12-34 (score 110)"))
        .stdout(predicate::str::contains("80 XXX-111-A"));
}

#[test]
fn test_extract_without_plate() {
    let mut cmd = cargo_bin_cmd!("platescan");
    cmd.args(["extract", "AB-12"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No plate found"));
}

#[test]
fn test_extract_single_field_threshold() {
    let mut cmd = cargo_bin_cmd!("platescan");
    cmd.args(["extract", "--single-field", "AB123"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("AB123"));
}

#[test]
fn test_extract_json_from_observations_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("observations.json");
    fs::write(
        &path,
        r#"[
            {"text": "GZW-002-A", "confidence": 0.4, "source_label": "focused@psm7"},
            {"text": "SZH-002-", "confidence": 0.9, "source_label": "upscaled@psm8"}
        ]"#,
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("platescan");
    cmd.arg("extract").arg("--json").arg("--observations").arg(&path);

    let output = cmd.assert().success().get_output().stdout.clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["best_plate"], "GZW-002-A");
    assert_eq!(value["candidates"][0]["score"], 100);
    assert_eq!(value["all_observations"].as_array().unwrap().len(), 2);
}

#[test]
fn test_extract_rejects_malformed_observations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("observations.json");
    fs::write(&path, r#"[{"text": "GZW-002-A", "confidence": 7.0, "source_label": "focused"}]"#).unwrap();

    let mut cmd = cargo_bin_cmd!("platescan");
    cmd.arg("extract").arg("--observations").arg(&path);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid observation #0"));
}

#[test]
fn test_gallery_lists_images() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("car.jpg"), b"x").unwrap();
    fs::write(dir.path().join("notes.txt"), b"x").unwrap();

    let mut cmd = cargo_bin_cmd!("platescan");
    cmd.arg("gallery").arg(dir.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("car.jpg"))
        .stdout(predicate::str::contains("notes.txt").not());
}

#[test]
fn test_read_missing_image_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("platescan.toml");
    fs::write(&config, "[ocr]\nprogram = \"sh\"\n").unwrap();

    let mut cmd = cargo_bin_cmd!("platescan");
    cmd.arg("read")
        .arg(dir.path().join("missing.jpg"))
        .arg("--config")
        .arg(&config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
