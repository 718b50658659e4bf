//! Command-line behavior of the `mime-sleuth` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn sleuth_cmd() -> Command {
    Command::cargo_bin("mime-sleuth").unwrap()
}

#[test]
fn test_identify_png_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("picture.dat");
    std::fs::write(&path, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").unwrap();

    sleuth_cmd()
        .arg("identify")
        .arg(&path)
        .arg("--most-specific")
        .assert()
        .success()
        .stdout(predicate::str::contains("picture.dat: image/png"));
}

#[test]
fn test_identify_stdin_json() {
    let output = sleuth_cmd()
        .args(["identify", "-", "--format", "json"])
        .write_stdin("GIF89a\x01\x00\x01\x00")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["input"], "-");
    assert_eq!(json[0]["most_specific"], "image/gif");
}

#[test]
fn test_identify_missing_file_warns() {
    sleuth_cmd()
        .args(["identify", "/definitely/not/here.png"])
        .assert()
        .success()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_identify_with_extra_rules() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("custom.magic");
    std::fs::write(&rules, "0\tstring\tSLTH\tapplication/x-sleuth\n").unwrap();
    let data = dir.path().join("sample");
    std::fs::write(&data, b"SLTH payload").unwrap();

    sleuth_cmd()
        .arg("identify")
        .arg(&data)
        .arg("--magic")
        .arg(&rules)
        .args(["--detector", "magic", "--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("application/x-sleuth\t1"));
}

#[test]
fn test_negotiate() {
    sleuth_cmd()
        .args([
            "negotiate",
            "--accept",
            "text/*;q=0.5, application/json",
            "--provide",
            "text/html,application/json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("application/json\n"));
}

#[test]
fn test_negotiate_rejects_bad_quality() {
    sleuth_cmd()
        .args(["negotiate", "--accept", "text/html;q=abc", "--provide", "text/html,text/plain"])
        .assert()
        .failure();
}

#[test]
fn test_rules_reports_rejected_groups() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("rules.magic");
    std::fs::write(
        &rules,
        "0\tstring\tABCD\tapplication/x-abcd\n\
         >4\tbeshort\t1\tapplication/x-abcd-v1\n\
         0\tnosuchtype\t1\tapplication/x-broken\n",
    )
    .unwrap();

    sleuth_cmd()
        .arg("rules")
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("application/x-abcd"))
        .stdout(predicate::str::contains("(+1 nested)"))
        .stdout(predicate::str::contains("Rejected:"));
}

#[test]
fn test_rules_json_lists_nested() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("rules.magic");
    std::fs::write(
        &rules,
        "0\tstring\tABCD\tapplication/x-abcd\n>4\tbeshort\t1\tapplication/x-abcd-v1\n",
    )
    .unwrap();

    let output = sleuth_cmd()
        .arg("rules")
        .arg(&rules)
        .args(["--all", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let listed = json["rules"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[1]["type"], "beint2");
    assert!(json["rejected"].as_array().unwrap().is_empty());
}

#[test]
fn test_detectors_json() {
    let output = sleuth_cmd()
        .args(["detectors", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(!json["detectors"].as_array().unwrap().is_empty());
    assert_eq!(json["unknown_mime_type"], "application/octet-stream");
}

#[test]
fn test_unknown_detector_id_fails() {
    sleuth_cmd()
        .args(["detectors", "--detector", "telepathy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("telepathy"));
}
