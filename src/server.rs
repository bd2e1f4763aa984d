//! Server runtime: listener setup, accept loop, and shutdown signals.

use crate::config::{AppState, Config};
use crate::handler;
use crate::logger;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Bind the listener and serve until a shutdown signal arrives.
///
/// The listener is created here and owned by the accept loop; a bind
/// failure propagates out and terminates the process with a non-zero
/// status, since a busy port has no recovery path.
pub async fn run(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = create_listener(addr)?;

    let state = Arc::new(AppState::new(cfg));
    let shutdown = Arc::new(Notify::new());
    start_signal_handler(Arc::clone(&shutdown));

    logger::log_server_start(&addr, &state.config, &state.static_file);

    serve(listener, state, shutdown).await;
    Ok(())
}

/// Accept connections until notified to shut down.
async fn serve(listener: TcpListener, state: Arc<AppState>, shutdown: Arc<Notify>) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        handle_connection(stream, peer_addr, Arc::clone(&state));
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                logger::log_shutdown();
                return;
            }
        }
    }
}

/// Handle a single connection in a spawned task.
///
/// Wraps the stream in `TokioIo`, serves it over HTTP/1.1 with the
/// request handler, and bounds the whole connection with the
/// configured timeout.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: Arc<AppState>,
) {
    tokio::spawn(async move {
        if state.config.logging.access_log {
            logger::log_connection_accepted(&peer_addr);
        }

        let io = TokioIo::new(stream);

        let keep_alive_timeout = state.config.performance.keep_alive_timeout;
        let timeout_duration = std::time::Duration::from_secs(std::cmp::max(
            state.config.performance.read_timeout,
            state.config.performance.write_timeout,
        ));

        let mut builder = http1::Builder::new();
        if keep_alive_timeout > 0 {
            builder.keep_alive(true);
        }

        let svc_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&svc_state);
                async move { handler::handle_request(req, state).await }
            }),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection timeout after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }
    });
}

/// Create a `TcpListener` with `SO_REUSEADDR` enabled.
///
/// `SO_REUSEADDR` allows rebinding a port left in TIME_WAIT after a
/// restart. `SO_REUSEPORT` is deliberately not set: a second instance
/// on a busy port must fail, not silently share the socket.
fn create_listener(addr: std::net::SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;

    // Non-blocking mode for async compatibility
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// Start the shutdown signal task (Unix: SIGTERM and SIGINT).
///
/// The accept loop owns the listener; the signal task only notifies
/// it, so the socket is released on the normal exit path.
#[cfg(unix)]
fn start_signal_handler(shutdown: Arc<Notify>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                println!("\n[Signal] SIGTERM received, shutting down");
            }
            _ = sigint.recv() => {
                println!("\n[Signal] SIGINT received, shutting down");
            }
        }

        shutdown.notify_waiters();
    });
}

/// Windows fallback: only Ctrl+C is supported.
#[cfg(not(unix))]
fn start_signal_handler(shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            println!("\n[Signal] Ctrl+C received, shutting down");
            shutdown.notify_waiters();
        }
    });
}
