//! record-proxy - serve record searches as json, csv or neoshex.

use clap::Parser;
use record_proxy::{app, config::Options, Proxy};
use tracing::{event, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[async_std::main]
async fn main() -> std::io::Result<()> {
    let options = Options::parse();
    init_logging(options.verbose, options.json_logs);

    let config = options.proxy_config();
    event!(
        Level::INFO,
        "listening on {}, searching {}",
        options.listen,
        config.upstream_url
    );
    app(Proxy::new(&config)).listen(options.listen).await
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}
