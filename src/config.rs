use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default port when neither configuration nor the `PORT` variable sets one.
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub routes: RoutesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub access_log: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutesConfig {
    /// The single HTML entry file served on the root path.
    pub static_file: String,
}

impl Config {
    /// Load configuration from the given file stem (without extension).
    ///
    /// Layering order: coded defaults, then an optional config file,
    /// then `SERVER_*` environment overrides. The `PORT` variable is
    /// applied last and wins when it parses as a positive integer.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("SERVER"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", i64::from(DEFAULT_PORT))?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "Onepage/0.1")?
            .set_default("routes.static_file", "static/index.html")?
            .build()?;

        let mut cfg: Self = settings.try_deserialize()?;

        if let Some(port) = port_from_env(std::env::var("PORT").ok().as_deref()) {
            cfg.server.port = port;
        }

        Ok(cfg)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Resolve the entry file to an absolute path, once at startup.
    ///
    /// The file itself is not touched here: existence is checked per
    /// request so a missing file yields a 500 instead of a dead server.
    pub fn static_file_path(&self) -> PathBuf {
        let path = Path::new(&self.routes.static_file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    }
}

/// Immutable per-process state shared by all request handlers.
pub struct AppState {
    pub config: Config,
    pub static_file: PathBuf,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let static_file = config.static_file_path();
        Self {
            config,
            static_file,
        }
    }
}

/// Interpret the `PORT` environment value.
///
/// Returns `Some(port)` only for a positive integer that fits a port
/// number; anything else falls back to the configured default.
fn port_from_env(value: Option<&str>) -> Option<u16> {
    value?.trim().parse::<u16>().ok().filter(|port| *port > 0)
}
