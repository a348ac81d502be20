use std::io;

use credit_scoring_web::{FormServer, ServerConfig};
use tracing_subscriber::EnvFilter;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = ServerConfig::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    tracing::info!(scoring = ?config.scoring, "starting credit scoring form");

    let server = FormServer::from_config(config.scoring)
        .map_err(|e| io::Error::other(e.to_string()))?;
    server.serve_http(&config.addr)
}
