use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn write_sbm(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("planetix")?;
    cmd.arg("sbm")
        .arg(root)
        .arg("--name")
        .arg("SBM")
        .arg("--communities")
        .arg("20,20,20")
        .arg("--p-in")
        .arg("0.5")
        .arg("--p-out")
        .arg("0.05");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("60 nodes"));
    Ok(())
}

#[test]
fn test_cli_sbm_then_stats() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    write_sbm(dir.path())?;
    assert!(dir.path().join("SBM").join("SBM.content").exists());
    assert!(dir.path().join("SBM").join("SBM.cites").exists());

    let mut cmd = Command::cargo_bin("planetix")?;
    cmd.arg("stats").arg(dir.path()).arg("--name").arg("SBM");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Nodes:          60"))
        .stdout(predicate::str::contains("Classes:        3"))
        .stdout(predicate::str::contains("community_2"));
    Ok(())
}

#[test]
fn test_cli_split() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    write_sbm(dir.path())?;

    let mut cmd = Command::cargo_bin("planetix")?;
    cmd.arg("split")
        .arg(dir.path())
        .arg("--name")
        .arg("SBM")
        .arg("--folds")
        .arg("5");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("SBM_splits.json"));

    let text = fs::read_to_string(dir.path().join("SBM_splits.json"))?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(json["test"].as_array().map(Vec::len), Some(5));
    assert!(json["fingerprint"].is_string());
    Ok(())
}

#[test]
fn test_cli_pos_enc() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    write_sbm(dir.path())?;
    let out = dir.path().join("pe.json");

    let mut cmd = Command::cargo_bin("planetix")?;
    cmd.arg("pos-enc")
        .arg(dir.path())
        .arg("--name")
        .arg("SBM")
        .arg("--dim")
        .arg("4")
        .arg("-o")
        .arg(&out);
    cmd.assert().success();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out)?)?;
    let rows = json["pos_enc"].as_array().unwrap();
    assert_eq!(rows.len(), 60);
    assert_eq!(rows[0].as_array().unwrap().len(), 4);
    Ok(())
}

#[test]
fn test_cli_missing_dataset_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut cmd = Command::cargo_bin("planetix")?;
    cmd.arg("stats").arg(dir.path()).arg("--name").arg("Cora");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("missing resource"));
    Ok(())
}

#[test]
fn test_cli_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    write_sbm(dir.path())?;
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"split": {"n_splits": 4}}"#)?;

    let mut cmd = Command::cargo_bin("planetix")?;
    cmd.arg("--config")
        .arg(&config)
        .arg("split")
        .arg(dir.path())
        .arg("--name")
        .arg("SBM");
    cmd.assert().success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("SBM_splits.json"))?)?;
    assert_eq!(json["train"].as_array().map(Vec::len), Some(4));
    Ok(())
}
