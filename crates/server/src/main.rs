use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use spool_server::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_WORKERS, EchoHandler, Server};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Echo server: every POST is answered with its own body.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Maximum number of connections served at once
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Limit for each socket read while a request is received
    #[arg(long, default_value_t = 5000)]
    read_timeout_ms: u64,

    /// Decode multipart and urlencoded POST bodies
    #[arg(long)]
    decode_post_forms: bool,

    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(args.log_level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let server = match Server::builder()
        .host(args.host)
        .port(args.port)
        .workers(args.workers)
        .read_timeout(Duration::from_millis(args.read_timeout_ms))
        .decode_post_forms(args.decode_post_forms)
        .build()
    {
        Ok(server) => server,
        Err(e) => {
            error!(cause = %e, "invalid server configuration");
            return ExitCode::FAILURE;
        }
    };

    match server.run(Arc::new(EchoHandler), shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(cause = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received ctrl-c"),
        Err(e) => {
            error!(cause = %e, "failed to listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
