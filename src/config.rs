//! Configuration for the proxy server and the API client.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use reqwest::Url;

use crate::Error;

/// The backend origin used when none is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// The proxy server between the web client and the finance backend.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct ProxyConfig {
    /// The origin of the finance backend that requests are forwarded to.
    #[arg(long, env = "BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// The address to listen on.
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// The port to serve the proxy from.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// File that debug logs are appended to.
    #[arg(long, default_value = "debug.log")]
    pub log_file: PathBuf,
}

impl ProxyConfig {
    /// The address the server binds to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The backend origin without a trailing slash.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidBackendUrl] if the URL cannot be parsed or is not
    /// http(s).
    pub fn backend_origin(&self) -> Result<String, Error> {
        normalize_origin(&self.backend_url)
    }
}

/// Validate `url` as an http(s) origin and strip any trailing slash.
pub(crate) fn normalize_origin(url: &str) -> Result<String, Error> {
    let parsed = Url::parse(url).map_err(|_| Error::InvalidBackendUrl(url.to_owned()))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(Error::InvalidBackendUrl(url.to_owned()));
    }

    Ok(url.trim_end_matches('/').to_owned())
}

/// Settings for [crate::HttpClient] and the alert refresher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// The backend (or proxy) origin, e.g. "http://127.0.0.1:3000".
    pub base_url: String,
    /// How long to wait for a response before giving up.
    pub request_timeout: Duration,
    /// How often the alerts view refetches the overview.
    pub refresh_period: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_owned(),
            request_timeout: Duration::from_secs(30),
            refresh_period: crate::refresh::DEFAULT_REFRESH_PERIOD,
        }
    }
}
