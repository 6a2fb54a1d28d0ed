#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ubjwire_peer::{run_agent, ConnectConfig, MemoryPlayer, Player, SessionConfig};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/ubjwcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn spawn_agent(path: &Path) -> (Arc<AtomicBool>, JoinHandle<MemoryPlayer>) {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let path = path.to_path_buf();
    let handle = thread::spawn(move || {
        let config = ConnectConfig {
            retry_interval: Duration::from_millis(20),
            max_attempts: None,
            session: SessionConfig {
                read_timeout: Duration::from_millis(20),
                ..SessionConfig::default()
            },
        };
        run_agent(&path, &config, MemoryPlayer::demo(), &flag).expect("agent should stop cleanly")
    });
    (running, handle)
}

fn ctl(path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ubjwire"))
        .args(["--log-level", "error", "--format", "json", "ctl"])
        .arg(path)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("ctl should run")
}

#[test]
fn ctl_queries_a_connected_agent() {
    let dir = unique_temp_dir("ctl");
    let sock_path = dir.join("controller.sock");
    let (running, agent) = spawn_agent(&sock_path);

    let output = ctl(&sock_path, &["play", "--timeout", "3s"]);
    assert!(output.status.success(), "play failed: {output:?}");
    assert!(output.stdout.is_empty());

    let output = ctl(&sock_path, &["playbackstatus", "--timeout", "3s"]);
    assert!(output.status.success(), "playbackstatus failed: {output:?}");
    let json: serde_json::Value = serde_json::from_slice(&output.stdout)
        .expect("reply should be JSON");
    assert_eq!(
        json,
        serde_json::json!({ "command": "playbackstatus", "status": "Playing" })
    );

    running.store(false, Ordering::SeqCst);
    let player = agent.join().expect("agent thread should finish");
    assert_eq!(player.playback_status().as_str(), "Playing");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn ctl_rejects_unknown_command_without_binding() {
    let dir = unique_temp_dir("ctl-unknown");
    let sock_path = dir.join("controller.sock");

    let output = ctl(&sock_path, &["rewind"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(!sock_path.exists());

    let output = ctl(&sock_path, &["seek"]);
    assert_eq!(output.status.code(), Some(64));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn ctl_times_out_without_agent() {
    let dir = unique_temp_dir("ctl-idle");
    let sock_path = dir.join("controller.sock");

    let output = ctl(&sock_path, &["position", "--timeout", "200ms"]);
    assert_eq!(output.status.code(), Some(124));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn serve_watch_reports_agent_state() {
    let dir = unique_temp_dir("serve");
    let sock_path = dir.join("controller.sock");
    let (running, agent) = spawn_agent(&sock_path);

    let output = Command::new(env!("CARGO_BIN_EXE_ubjwire"))
        .args(["--log-level", "error", "--format", "json", "serve"])
        .arg(&sock_path)
        .args(["--interval", "100ms", "--watch", "--count", "2"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("serve should run");
    assert!(output.status.success(), "serve failed: {output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("watch line should be JSON"))
        .collect();
    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert_eq!(line["status"], "Stopped");
        assert_eq!(line["position"], 0);
    }

    running.store(false, Ordering::SeqCst);
    agent.join().expect("agent thread should finish");

    let _ = std::fs::remove_dir_all(dir);
}
