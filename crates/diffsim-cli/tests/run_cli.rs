use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const SPHERE_CONFIG: &str = r#"
{
  "source": {
    "wavelength": 1.0e-9,
    "focus_diameter": 2.0e-6,
    "pulse_energy_mean": 1.0e-3,
    "pulse_energy_variation": "normal",
    "pulse_energy_spread": 1.0e-4,
    "profile_model": "gaussian"
  },
  "sample": {
    "sample_type": "uniform_sphere",
    "diameter": 1.0e-7,
    "material_type": "virus",
    "number_of_images": 2
  },
  "detector": {
    "distance": 0.5,
    "pixel_size": 4.0e-4,
    "nx": 16,
    "ny": 16,
    "binning": 2
  }
}
"#;

fn diffsim(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_diffsim"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("diffsim should run")
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent directory should be created");
    }
    fs::write(path, content).expect("file should be written");
}

#[test]
fn run_command_writes_a_seeded_report() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config_path = temp.path().join("sphere.json");
    let report_path = temp.path().join("reports/run.json");
    write_file(&config_path, SPHERE_CONFIG);

    let output = diffsim(&[
        "run",
        "--config",
        config_path.to_str().expect("utf-8 path"),
        "--seed",
        "42",
        "--report",
        report_path.to_str().expect("utf-8 path"),
    ]);
    assert!(
        output.status.success(),
        "run should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Simulated 2 image(s) of a uniform_sphere sample"));
    assert!(stdout.contains("JSON report:"));

    let report: Value = serde_json::from_str(
        &fs::read_to_string(&report_path).expect("report should be written"),
    )
    .expect("report should be valid JSON");
    assert_eq!(report["seed"], 42);
    assert_eq!(report["detector_shape"], serde_json::json!([8, 8]));
    let shots = report["shots"].as_array().expect("shots array");
    assert_eq!(shots.len(), 2);
    for shot in shots {
        assert!(shot["total_photons"].as_f64().expect("photons") > 0.0);
        assert!(shot["pulse"]["pulse_energy"].as_f64().expect("energy") > 0.0);
        assert!(shot["euler_angles"].is_null());
    }
    assert!(report["linear_sampling_ratio"].as_f64().expect("ratio") > 0.0);
}

#[test]
fn same_seed_gives_identical_reports() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config_path = temp.path().join("sphere.json");
    write_file(&config_path, SPHERE_CONFIG);

    let reports: Vec<Value> = ["first.json", "second.json"]
        .iter()
        .map(|name| {
            let report_path = temp.path().join(name);
            let output = diffsim(&[
                "run",
                "--config",
                config_path.to_str().expect("utf-8 path"),
                "--seed",
                "7",
                "--report",
                report_path.to_str().expect("utf-8 path"),
            ]);
            assert!(output.status.success());
            serde_json::from_str(&fs::read_to_string(&report_path).expect("report"))
                .expect("valid JSON")
        })
        .collect();
    assert_eq!(reports[0], reports[1]);
}

#[test]
fn large_seeds_are_reported_unchanged() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config_path = temp.path().join("sphere.json");
    let report_path = temp.path().join("large-seed.json");
    write_file(&config_path, SPHERE_CONFIG);
    let seed = u64::MAX - 1;

    let output = diffsim(&[
        "run",
        "--config",
        config_path.to_str().expect("utf-8 path"),
        "--seed",
        &seed.to_string(),
        "--report",
        report_path.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success());
    let report: Value =
        serde_json::from_str(&fs::read_to_string(&report_path).expect("report"))
            .expect("valid JSON");
    assert_eq!(report["seed"].as_u64(), Some(seed));
}

#[test]
fn invalid_sample_type_exits_with_configuration_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config_path = temp.path().join("cylinder.json");
    write_file(
        &config_path,
        &SPHERE_CONFIG.replace("uniform_sphere", "uniform_cylinder"),
    );

    let output = diffsim(&["run", "--config", config_path.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("ERROR: [CONFIG.INVALID_CHOICE]"),
        "unexpected stderr: {stderr}"
    );
    assert!(stderr.contains("FATAL EXIT CODE: 2"));
}

#[test]
fn missing_configuration_file_is_an_io_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let missing = temp.path().join("absent.json");

    let output = diffsim(&["run", "--config", missing.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("FATAL EXIT CODE: 3"));
}

#[test]
fn unknown_flags_are_usage_errors() {
    let output = diffsim(&["run", "--bogus"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[CONFIG.CLI_USAGE]"));
}

#[test]
fn defaults_command_prints_the_default_configuration() {
    let output = diffsim(&["defaults"]);
    assert!(output.status.success());
    let defaults: Value =
        serde_json::from_slice(&output.stdout).expect("defaults should be valid JSON");
    assert_eq!(defaults["detector"]["noise"], "none");
    assert_eq!(defaults["source"]["profile_model"], "none");
    assert_eq!(defaults["sample"]["number_of_images"], 1);
}
