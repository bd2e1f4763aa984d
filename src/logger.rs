use crate::config::Config;
use hyper::{Method, Uri, Version};
use std::net::SocketAddr;
use std::path::Path;

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, static_file: &Path) {
    println!("======================================");
    println!("Server running at: http://{addr}");
    println!("Entry file: {}", static_file.display());
    if let Some(workers) = config.server.workers {
        println!("Worker threads: {workers}");
    }
    println!("Using Tokio runtime for concurrency");
    println!("======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    println!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    eprintln!("[ERROR] Failed to serve connection: {err:?}");
}

pub fn log_request(method: &Method, uri: &Uri, version: Version) {
    println!("[{}] [Request] {method} {uri} {version:?}", timestamp());
}

pub fn log_response(status: u16, size: usize) {
    println!("[{}] [Response] {status} ({size} bytes)", timestamp());
}

pub fn log_warning(message: &str) {
    eprintln!("[WARN] {message}");
}

pub fn log_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn log_shutdown() {
    println!("\n[Shutdown] Stopping accept loop, releasing listener");
}
