use clap::Parser;

mod config;
mod handler;
mod logger;
mod mime;
mod response;
mod server;

#[derive(Parser, Debug)]
#[command(name = "onepage", version, about = "Single-page static HTTP server")]
struct Cli {
    /// Validate that the server can initialize, then exit without binding a port
    #[arg(long)]
    check_only: bool,

    /// Configuration file stem, e.g. "config" for config.toml
    #[arg(long, default_value = "config")]
    config: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = config::Config::load_from(&cli.config)?;

    // Check-only mode: configuration resolved, nothing bound, exit 0.
    if cli.check_only {
        println!("Check-only: server starts correctly");
        return Ok(());
    }

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(server::run(cfg))
}
