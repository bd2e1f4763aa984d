//! Shared helpers for black-box tests driving the compiled binary.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Pick a currently free port by binding port 0 and releasing it.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("failed to bind ephemeral port")
        .local_addr()
        .expect("failed to read local addr")
        .port()
}

/// Server process killed on drop so failed tests do not leak listeners.
pub struct ServerGuard {
    child: Child,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

/// Spawn the server binary in `dir` with `PORT` set, waiting until it accepts.
pub fn spawn_server(dir: &Path, port: u16) -> ServerGuard {
    spawn_server_with_port_env(dir, &port.to_string(), port)
}

/// Spawn the server with an arbitrary `PORT` value, waiting on `listen_port`.
///
/// The two differ when `PORT` is unparseable and the listening port
/// comes from the configuration fallback instead.
pub fn spawn_server_with_port_env(dir: &Path, port_env: &str, listen_port: u16) -> ServerGuard {
    let child = Command::new(env!("CARGO_BIN_EXE_onepage"))
        .current_dir(dir)
        .env("PORT", port_env)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn server binary");

    let guard = ServerGuard { child };
    wait_until_listening(listen_port);
    guard
}

fn wait_until_listening(port: u16) {
    for _ in 0..150 {
        if TcpStream::connect(("127.0.0.1", port)).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("server did not start listening on port {port}");
}

/// Issue a bare HTTP/1.0 request and return (status code, body bytes).
pub fn http_request(port: u16, method: &str, path: &str) -> (u16, Vec<u8>) {
    let mut stream =
        TcpStream::connect(("127.0.0.1", port)).expect("failed to connect to server");
    write!(
        stream,
        "{method} {path} HTTP/1.0\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n"
    )
    .expect("failed to write request");

    let mut raw = Vec::new();
    stream
        .read_to_end(&mut raw)
        .expect("failed to read response");

    let header_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator in response")
        + 4;
    let head = String::from_utf8_lossy(&raw[..header_end]);
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .expect("malformed status line");

    (status, raw[header_end..].to_vec())
}

/// Create a fresh working directory, optionally with static/index.html.
pub fn temp_site(name: &str, index_html: Option<&str>) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("onepage-it-{}-{name}", std::process::id()));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(dir.join("static")).expect("failed to create site dir");
    if let Some(content) = index_html {
        std::fs::write(dir.join("static/index.html"), content)
            .expect("failed to write entry file");
    }
    dir
}
