use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated home, state directory and config file for one CLI run.
struct CliEnv {
    home: TempDir,
    data: TempDir,
}

impl CliEnv {
    fn new() -> Result<Self> {
        Ok(Self {
            home: TempDir::new()?,
            data: TempDir::new()?,
        })
    }

    fn state_dir(&self) -> PathBuf {
        self.home.path().join("state")
    }

    fn config_path(&self) -> PathBuf {
        self.home.path().join("config.toml")
    }

    fn folder(&self, name: &str) -> Result<PathBuf> {
        let path = self.data.path().join(name);
        fs::create_dir_all(&path)?;
        Ok(fs::canonicalize(path)?)
    }

    fn cmd(&self) -> Result<Command> {
        let mut cmd = Command::cargo_bin("foldwatch")?;
        cmd.env("HOME", self.home.path())
            .env("FOLDWATCH_STATE_DIR", self.state_dir())
            .env("FOLDWATCH_CONFIG_PATH", self.config_path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("FOLDWATCH_TICK_SECONDS");
        Ok(cmd)
    }

    fn add(&self, path: &Path, interval: &str) -> Result<()> {
        self.cmd()?
            .arg("add")
            .arg(path)
            .arg(interval)
            .assert()
            .success();
        Ok(())
    }
}

#[test]
fn test_add_and_list() -> Result<()> {
    let env = CliEnv::new()?;
    let a = env.folder("a")?;
    fs::write(a.join("file.txt"), "data")?;

    env.cmd()?
        .arg("add")
        .arg(&a)
        .arg("1h30m")
        .assert()
        .success()
        .stderr(predicate::str::contains("Watching"))
        .stderr(predicate::str::contains("Snapshot updated for"));

    assert!(env.state_dir().join("folders.json").exists());
    assert!(env.state_dir().join("snapshots.json").exists());
    assert!(env.config_path().exists());

    env.cmd()?
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(a.to_string_lossy().as_ref()))
        .stdout(predicate::str::contains("90 minutes"));

    env.cmd()?
        .args(["list", "--filter", "no-such-folder"])
        .assert()
        .success()
        .stdout(predicate::str::contains(a.to_string_lossy().as_ref()).not());
    Ok(())
}

#[test]
fn test_add_rejects_bad_input() -> Result<()> {
    let env = CliEnv::new()?;
    let a = env.folder("a")?;

    env.cmd()?
        .args(["add"])
        .arg(&a)
        .arg("1x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid interval"));

    env.cmd()?
        .arg("add")
        .arg(env.data.path().join("missing"))
        .arg("1m")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Folder not found"));

    env.add(&a, "1m")?;
    env.cmd()?
        .arg("add")
        .arg(&a)
        .arg("5m")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already being monitored"));
    Ok(())
}

#[test]
fn test_check_reports_new_file() -> Result<()> {
    let env = CliEnv::new()?;
    let a = env.folder("a")?;
    env.add(&a, "1m")?;

    let new_file = a.join("x.txt");
    fs::write(&new_file, "hello")?;

    env.cmd()?
        .arg("check")
        .arg(&a)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Changes in {}:", a.display())))
        .stdout(predicate::str::contains(format!("NEW: {}", new_file.display())));

    env.cmd()?
        .arg("log")
        .arg(&a)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("NEW: {}", new_file.display())));

    env.cmd()?
        .arg("list")
        .arg("--sort")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains(a.to_string_lossy().as_ref()));
    Ok(())
}

#[test]
fn test_snapshot_then_check_is_clean() -> Result<()> {
    let env = CliEnv::new()?;
    let a = env.folder("a")?;
    env.add(&a, "1m")?;
    fs::write(a.join("x.txt"), "hello")?;

    env.cmd()?.arg("snapshot").assert().success();
    env.cmd()?
        .arg("check")
        .assert()
        .success()
        .stderr(predicate::str::contains(format!("No changes in {}", a.display())));
    Ok(())
}

#[test]
fn test_check_unknown_folder_fails() -> Result<()> {
    let env = CliEnv::new()?;
    let a = env.folder("a")?;

    env.cmd()?
        .arg("check")
        .arg(&a)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not being monitored"));
    Ok(())
}

#[test]
fn test_interval_and_remove() -> Result<()> {
    let env = CliEnv::new()?;
    let a = env.folder("a")?;
    env.add(&a, "1m")?;

    env.cmd()?
        .arg("interval")
        .arg(&a)
        .arg("2d")
        .assert()
        .success();
    let folders = fs::read_to_string(env.state_dir().join("folders.json"))?;
    assert!(folders.contains("172800"));

    env.cmd()?
        .arg("interval")
        .arg(&a)
        .arg("0m")
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one second"));

    env.cmd()?
        .arg("remove")
        .arg(&a)
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed"));

    // Second removal is a no-op
    env.cmd()?
        .arg("remove")
        .arg(&a)
        .assert()
        .success()
        .stderr(predicate::str::contains("Not watching"));

    env.cmd()?
        .arg("list")
        .assert()
        .success()
        .stderr(predicate::str::contains("No folders are being watched"));
    Ok(())
}

#[test]
fn test_log_clear() -> Result<()> {
    let env = CliEnv::new()?;
    let a = env.folder("a")?;
    env.add(&a, "1m")?;

    env.cmd()?
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Snapshot updated for {}", a.display())));

    env.cmd()?.args(["log", "--clear"]).assert().success();
    env.cmd()?
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Log is empty"));
    Ok(())
}

#[test]
fn test_watch_once_checks_due_folders() -> Result<()> {
    let env = CliEnv::new()?;
    let a = env.folder("a")?;
    env.add(&a, "1m")?;

    // Never checked, so due immediately
    env.cmd()?
        .args(["watch", "--once"])
        .assert()
        .success()
        .stderr(predicate::str::contains(format!("No changes in {}", a.display())));

    env.cmd()?
        .args(["watch", "--once"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No folders are due"));

    assert!(!env.state_dir().join("watch.lock").exists());
    Ok(())
}

#[test]
fn test_watch_rejects_zero_tick() -> Result<()> {
    let env = CliEnv::new()?;
    env.cmd()?
        .args(["watch", "--tick", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Tick period"));
    Ok(())
}

#[test]
fn test_invalid_config_is_reported() -> Result<()> {
    let env = CliEnv::new()?;
    fs::write(env.config_path(), "[scheduler]\ntick_seconds = 0\n")?;

    env.cmd()?
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("tick_seconds"));
    Ok(())
}

#[test]
fn test_completion_generates_script() -> Result<()> {
    let env = CliEnv::new()?;
    env.cmd()?
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("foldwatch"));
    Ok(())
}
