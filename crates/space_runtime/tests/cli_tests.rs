//! Integration tests for the `space` binary
//!
//! Runs the built executable against documents in a temp directory

use std::path::Path;
use std::process::Command;

const LOBBY: &str = r#"{
    "Name": "Lobby",
    "Author": "tests",
    "ContentRating": 2,
    "PrimaryLanguage": 0,
    "objects": [
        {"id": "floor", "name": "Floor", "primitiveType": "Plane", "scale": {"x": 10, "y": 1, "z": 10}},
        {"id": "lamp", "parentId": "floor", "name": "Lamp (1)", "primitiveType": "Sphere"},
        {"id": "ghost", "parentId": "missing", "name": "Ghost"}
    ]
}"#;

fn space(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_space"))
        .args(args)
        .current_dir(dir)
        .env_remove("SPACE_CONFIG")
        .env("SPACE_LOG", "warn")
        .output()
        .expect("failed to run space")
}

#[test]
fn test_inspect_reports_validation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("lobby.json"), LOBBY).unwrap();

    let output = space(dir.path(), &["inspect", "lobby.json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Lobby"));
    assert!(stdout.contains("Nodes:       3"));
    assert!(stdout.contains("missing parent 'missing'"));
}

#[test]
fn test_import_and_export() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("lobby.json"), LOBBY).unwrap();

    let output = space(dir.path(), &["import", "lobby.json", "--export", "out.json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Floor [mesh=Plane]"));
    assert!(stdout.contains("Lamp (1) [mesh=Sphere]"));

    let exported: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("out.json")).unwrap()).unwrap();
    let names: Vec<&str> = exported["objects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Floor", "Lamp", "Ghost"]);
    assert_eq!(exported["Name"], "Lobby");
}

#[test]
fn test_missing_document_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = space(dir.path(), &["import", "nowhere.json"]);
    assert!(!output.status.success());
}

#[test]
fn test_bad_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("space.toml"), "[loader]\nmax_concurrent_loads = \"many\"").unwrap();
    std::fs::write(dir.path().join("lobby.json"), LOBBY).unwrap();

    let output = space(dir.path(), &["inspect", "lobby.json"]);
    assert!(!output.status.success());
}
