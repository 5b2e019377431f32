//! Command line and environment configuration.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use surf::Url;

/// Search endpoint records are fetched from unless configured otherwise.
pub const DEFAULT_UPSTREAM_URL: &str = "https://cloudx.azurewebsites.net/api/records/pagedSearch";

/// Settings of a running proxy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyConfig {
    pub upstream_url: Url,
    pub upstream_timeout: Option<Duration>,
}

/// Record search proxy answering in json, csv or neoshex.
#[derive(Parser, Debug)]
#[command(name = "record-proxy")]
#[command(author, version, about, long_about = None)]
pub struct Options {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080", env = "RECORD_PROXY_LISTEN")]
    pub listen: SocketAddr,

    /// Upstream paged search endpoint
    #[arg(long, default_value = DEFAULT_UPSTREAM_URL, env = "RECORD_PROXY_UPSTREAM_URL")]
    pub upstream_url: Url,

    /// Seconds to wait for the upstream search before failing the request
    #[arg(long, env = "RECORD_PROXY_UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

impl Options {
    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig {
            upstream_url: self.upstream_url.clone(),
            upstream_timeout: self.upstream_timeout_secs.map(Duration::from_secs),
        }
    }
}
