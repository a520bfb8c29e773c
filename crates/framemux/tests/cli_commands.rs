#![cfg(all(unix, feature = "cli"))]

use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/fmxcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn framemux() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_framemux"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        if start.elapsed() >= timeout {
            panic!("socket {} never appeared", path.display());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn spawn_serve(sock_path: &Path, extra: &[&str]) -> Child {
    let child = framemux()
        .arg("--format")
        .arg("json")
        .arg("serve")
        .arg(sock_path)
        .args(extra)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("serve command should start");
    wait_for_socket(sock_path, Duration::from_secs(3));
    child
}

fn send(sock_path: &Path, args: &[&str]) -> Output {
    framemux()
        .arg("--format")
        .arg("json")
        .arg("send")
        .arg(sock_path)
        .args(args)
        .output()
        .expect("send should run")
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Output {
    let start = Instant::now();
    loop {
        if child.try_wait().expect("child status").is_some() {
            return child.wait_with_output().expect("child output");
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            panic!("child did not exit in time");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn version_prints_package_version() {
    let output = framemux().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("framemux {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn version_extended_reports_frame_len() {
    let output = framemux()
        .arg("version")
        .arg("--extended")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("frame_len: 64"));
    assert!(stdout.contains("payload_len: 61"));
}

#[test]
fn serve_echoes_and_reports_stats() {
    let dir = unique_temp_dir("serve");
    let sock_path = dir.join("fmx.sock");
    let child = spawn_serve(
        &sock_path,
        &["--reliable-echo", "5", "--echo", "9", "--count", "3"],
    );

    let output = send(&sock_path, &["--id", "5", "--hex", "03", "--reliable"]);
    assert!(output.status.success(), "reliable send failed: {output:?}");
    let reply: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("reply should be json");
    assert_eq!(reply["id"], 5);
    assert_eq!(reply["ack"], 0);
    assert!(reply["payload_hex"]
        .as_str()
        .is_some_and(|hex| hex.starts_with("0300")));

    let output = send(&sock_path, &["--id", "9", "--data", "ping"]);
    assert!(output.status.success(), "unreliable send failed: {output:?}");
    let reply: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("reply should be json");
    assert_eq!(reply["payload_text"], "ping");

    let output = send(&sock_path, &["--id", "42", "--data", "nobody"]);
    assert!(output.status.success(), "unknown id send failed: {output:?}");
    let reply: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("reply should be json");
    assert_eq!(reply["id"], 42);
    assert!(reply["payload_text"].is_null());

    let served = wait_with_timeout(child, Duration::from_secs(5));
    assert!(served.status.success());
    let stats: serde_json::Value =
        serde_json::from_slice(&served.stdout).expect("stats should be json");
    assert_eq!(stats["kind"], "stats");
    assert_eq!(stats["accepted"], 1);
    assert_eq!(stats["unreliable"], 1);
    assert_eq!(stats["unknown"], 1);
    assert_eq!(stats["peers"], 3);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn serve_rejects_colliding_ids_with_64() {
    let dir = unique_temp_dir("collide");
    let sock_path = dir.join("fmx.sock");

    let output = framemux()
        .arg("serve")
        .arg(&sock_path)
        .arg("--echo")
        .arg("5")
        .arg("--reliable-echo")
        .arg("5")
        .output()
        .expect("serve should run");

    assert_eq!(output.status.code(), Some(64));
    assert!(!sock_path.exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_to_missing_socket_returns_1() {
    let dir = unique_temp_dir("missing");
    let output = send(&dir.join("absent.sock"), &["--id", "5", "--data", "x"]);
    assert_eq!(output.status.code(), Some(1));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn oversized_payload_returns_60() {
    let dir = unique_temp_dir("oversize");
    let payload = "ab".repeat(62);
    let output = send(&dir.join("absent.sock"), &["--id", "5", "--hex", &payload]);
    assert_eq!(output.status.code(), Some(60));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn reliable_send_without_ack_times_out_with_124() {
    let dir = unique_temp_dir("noack");
    let sock_path = dir.join("silent.sock");
    // Accepts the connection and never answers.
    let listener = UnixListener::bind(&sock_path).expect("bind silent listener");
    let silent = thread::spawn(move || listener.accept().map(|(stream, _)| stream));

    let output = send(
        &sock_path,
        &["--id", "6", "--data", "x", "--reliable", "--timeout", "300ms", "--attempts", "3"],
    );
    assert_eq!(output.status.code(), Some(124));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no acknowledgment for id 6"));

    drop(silent.join());
    let _ = std::fs::remove_dir_all(&dir);
}
