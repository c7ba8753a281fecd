//! End-to-end runs of the `gridnav` binary against recorded fix files.

use gridnav_core::spatial::cell_center;
use gridnav_core::ublox::{encode_nav_posllh, NavPosLlh};
use gridnav_core::{GeoPoint, GridCell};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn fix_at(point: &GeoPoint) -> NavPosLlh {
    NavPosLlh {
        itow_ms: 1_000,
        lat: (point.lat * 1e7).round() as i32,
        lon: (point.lon * 1e7).round() as i32,
        height_mm: 920_000,
        ..NavPosLlh::default()
    }
}

fn hex_line(fix: &NavPosLlh) -> String {
    encode_nav_posllh(fix)
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn run(dir: &Path, fixes: &str, extra: &[&str]) -> (Output, std::path::PathBuf) {
    run_with_env(dir, fixes, extra, &[])
}

fn run_with_env(
    dir: &Path,
    fixes: &str,
    extra: &[&str],
    vars: &[(&str, &str)],
) -> (Output, std::path::PathBuf) {
    let input = dir.join("gps.txt");
    let output = dir.join("commands.txt");
    fs::write(&input, fixes).expect("write fixes");
    let out = Command::new(env!("CARGO_BIN_EXE_gridnav"))
        .arg(&input)
        .arg(&output)
        .args(extra)
        .env_remove("RUST_LOG")
        .envs(vars.iter().copied())
        .output()
        .expect("run gridnav");
    (out, output)
}

fn start_point() -> GeoPoint {
    GeoPoint::new(12.9716, 77.5946)
}

#[test]
fn test_diagonal_route_writes_commands() {
    let dir = tempfile::tempdir().expect("tempdir");
    let start = start_point();
    let goal = cell_center(&start, &GridCell::new(4, 4), 1.0);
    let fixes = format!("{}\n{}\n", hex_line(&fix_at(&start)), hex_line(&fix_at(&goal)));

    let (out, commands) = run(dir.path(), &fixes, &["--print-grid"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Grid map (10x10), 1=obstacle:"));
    assert!(stdout.contains("(0,0) (1,1) (2,2) (3,3) (4,4)"));

    let written = fs::read_to_string(commands).expect("commands file");
    let lines: Vec<f64> = written
        .lines()
        .map(|l| l.parse().expect("number"))
        .collect();
    let expected_time = 4.0 * std::f64::consts::SQRT_2 / (0.2 * std::f64::consts::PI);
    assert_eq!(lines.len(), 2);
    assert!((lines[0] - expected_time).abs() < 1e-9);
    assert!((lines[1] - 45.0).abs() < 1e-9);
}

#[test]
fn test_json_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let start = start_point();
    let goal = cell_center(&start, &GridCell::new(0, 3), 1.0);
    let fixes = format!("{}\n{}\n", hex_line(&fix_at(&start)), hex_line(&fix_at(&goal)));

    let (out, _) = run(dir.path(), &fixes, &["--json"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    let json_start = stdout.find('{').expect("json body");
    let report: serde_json::Value = serde_json::from_str(&stdout[json_start..]).expect("json");
    assert_eq!(report["goal_cell"], serde_json::json!({"row": 0, "col": 3}));
    assert_eq!(report["path"].as_array().map(Vec::len), Some(4));
    assert_eq!(report["failure"], serde_json::Value::Null);
    assert!(report["fix_separation_m"].as_f64().is_some_and(|d| (d - 3.5_f64.hypot(0.5)).abs() < 0.05));
}

#[test]
fn test_oversized_grid_is_rejected_before_printing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let line = hex_line(&fix_at(&start_point()));
    let (out, commands) = run_with_env(
        dir.path(),
        &format!("{line}\n{line}\n"),
        &["--print-grid"],
        &[("GRIDNAV_ROWS", "4611686018427387904"), ("GRIDNAV_COLS", "2")],
    );
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("invalid navigation config"), "{stderr}");
    assert!(!stderr.contains("panicked"));
    assert!(!commands.exists());
}

#[test]
fn test_zero_fix_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let zero = hex_line(&NavPosLlh::default());
    let (out, commands) = run(dir.path(), &format!("{zero}\n{zero}\n"), &[]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid GPS coordinates"));
    assert!(!commands.exists());
}

#[test]
fn test_missing_goal_line_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let line = hex_line(&fix_at(&start_point()));
    let (out, _) = run(dir.path(), &line, &[]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no goal line"));
}
