//! Command-line surface: output formats and exit codes.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

struct Fixture {
    _tmp: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().to_path_buf();
        let registry = json!([
            {"name": "ALPHA SECURITIES", "registration_number": "INZ00000101"},
            {"name": "Registrar CA", "registration_number": "INZ00000999"}
        ]);
        fs::write(root.join("brokers.json"), registry.to_string()).expect("write registry");
        Self { _tmp: tmp, root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn write_bundle(&self, name: &str, bundle: &Value) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, bundle.to_string()).expect("write bundle");
        path
    }

    fn genuine_bundle(&self) -> PathBuf {
        self.write_bundle(
            "genuine.json",
            &json!({
                "text": "Broker Name: ALPHA SECURITIES\nRegistration INZ00000101\n",
                "metadata": {
                    "/Author": "Registrar of Brokers",
                    "/Producer": "ReportLab PDF Library",
                    "/CreationDate": "D:20240105100000Z",
                    "/ModDate": "D:20240105100000Z"
                },
                "signature": {"present": true, "signer": "Registrar CA"}
            }),
        )
    }
}

fn docrisk() -> Command {
    cargo_bin_cmd!("docrisk")
}

fn as_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

#[test]
fn assess_json_bundle_outputs_assessment() {
    let fx = Fixture::new();
    let doc = fx.genuine_bundle();
    let registry = fx.path("brokers.json");

    let out = docrisk()
        .args(["-f", "json", "assess", as_str(&doc), "--registry", as_str(&registry)])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&out).expect("valid json output");
    assert_eq!(value["risk_score"], json!(0.0));
    let signals: Vec<&str> = value["signals"]
        .as_array()
        .expect("signals array")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(
        signals,
        vec![
            "text_analysis_unavailable",
            "document_modified: false",
            "legitimacy_score: 1.00",
            "degraded: text_risk (classifier not configured)",
        ]
    );
}

#[test]
fn detailed_json_includes_components() {
    let fx = Fixture::new();
    let doc = fx.genuine_bundle();
    let registry = fx.path("brokers.json");

    let out = docrisk()
        .args([
            "-f",
            "json",
            "assess",
            as_str(&doc),
            "--registry",
            as_str(&registry),
            "--detailed",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&out).expect("valid json output");
    assert_eq!(value["legitimacy"]["broker_verified"], json!(true));
    assert_eq!(value["tamper"]["flag"], json!(false));
    assert_eq!(value["degraded"][0]["component"], json!("text_risk"));
    assert_eq!(value["document_sha256"].as_str().map(str::len), Some(64));
}

#[test]
fn text_output_lists_signals() {
    let fx = Fixture::new();
    let doc = fx.genuine_bundle();

    docrisk()
        .args(["assess", as_str(&doc)])
        .assert()
        .success()
        .stdout(predicate::str::contains("RISK ASSESSMENT"))
        .stdout(predicate::str::contains("document_modified: false"))
        .stdout(predicate::str::contains("verification_unavailable"));
}

#[test]
fn sidecar_bundle_is_found_for_pdf() {
    let fx = Fixture::new();
    let pdf = fx.path("certificate.pdf");
    fs::write(&pdf, b"%PDF-1.7").expect("write pdf");
    fx.write_bundle(
        "certificate.pdf.extract.json",
        &json!({"text": "", "metadata": {}, "signature": {"present": false}}),
    );

    let out = docrisk()
        .args(["-f", "json", "assess", as_str(&pdf)])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&out).expect("valid json output");
    // Tampered (missing author and producer), no text, neutral legitimacy:
    // 0.25*0 + 0.50*100 + 0.25*50
    assert_eq!(value["risk_score"], json!(62.5));
    assert_eq!(value["signals"][0], json!("no_text_detected"));
}

#[test]
fn missing_document_exits_2() {
    let fx = Fixture::new();
    docrisk()
        .args(["assess", as_str(&fx.path("absent.pdf"))])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Cannot read document"));
}

#[test]
fn out_of_range_threshold_exits_2() {
    let fx = Fixture::new();
    let doc = fx.genuine_bundle();
    docrisk()
        .args(["assess", as_str(&doc), "--threshold", "1.5"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("phishing_threshold"));
}

#[test]
fn invalid_config_file_exits_2() {
    let fx = Fixture::new();
    let config = fx.path("docrisk.toml");
    fs::write(
        &config,
        "[weights.clean]\nocr = 0.9\nmodification = 0.2\nlegitimacy = 0.4\n",
    )
    .expect("write config");

    docrisk()
        .args(["--config", as_str(&config), "config"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("weights must sum to 1.0"));
}

#[test]
fn unreadable_bundle_exits_3() {
    let fx = Fixture::new();
    let doc = fx.path("broken.json");
    fs::write(&doc, "{ not json").expect("write bundle");

    docrisk()
        .args(["assess", as_str(&doc)])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No content could be extracted"));
}

#[test]
fn config_prints_effective_values() {
    let fx = Fixture::new();
    let config = fx.path("docrisk.toml");
    fs::write(&config, "[text]\nphishing_threshold = 0.9\n").expect("write config");

    docrisk()
        .args(["--config", as_str(&config), "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("phishing_threshold = 0.9"))
        .stdout(predicate::str::contains("chunk_size = 500"));
}
