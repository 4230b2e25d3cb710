use std::process::Command;
use tempfile::TempDir;

fn syncwatch() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_syncwatch"));
    // Keep the user's environment from leaking into the settings under test.
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_init_command() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("conf/settings.toml");

    let output = syncwatch()
        .arg("--config")
        .arg(&config_path)
        .arg("init")
        .output()
        .expect("Failed to run init command");

    assert!(output.status.success());
    assert!(config_path.exists());

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[sync]"));
    assert!(content.contains("grive"));

    // Second init without --force refuses to overwrite
    let output = syncwatch()
        .arg("--config")
        .arg(&config_path)
        .arg("init")
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_config_command() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        "root = \"/srv/drive\"\n[sync]\npoll_interval_ms = 1234\n",
    )
    .unwrap();

    let output = syncwatch()
        .arg("--config")
        .arg(&config_path)
        .arg("config")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("poll_interval_ms = 1234"));
    assert!(stdout.contains("/srv/drive"));
}

#[test]
fn test_scan_lists_visible_directories() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("drive");
    std::fs::create_dir_all(root.join("docs/letters")).unwrap();
    std::fs::create_dir_all(root.join(".grive")).unwrap();
    std::fs::write(root.join("docs/a.txt"), "a").unwrap();

    let output = syncwatch()
        .arg("--config")
        .arg(temp_dir.path().join("absent.toml"))
        .arg("scan")
        .arg(&root)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&root.join("docs/letters").display().to_string()));
    assert!(!stdout.contains(".grive"));
    assert!(stdout.contains("number of watches=3 & reverse watches=3"));
}

#[test]
fn test_watch_rejects_missing_root() {
    let temp_dir = TempDir::new().unwrap();

    let output = syncwatch()
        .arg("--config")
        .arg(temp_dir.path().join("absent.toml"))
        .arg("watch")
        .arg("--root")
        .arg(temp_dir.path().join("nope"))
        .arg("--no-initial-sync")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not a directory"));
}
