//! Pass-through forwarding of browser requests to the finance backend.
//!
//! The backend routes all end in a slash, so a missing trailing slash is
//! added before forwarding. Everything else (method, query, headers and body)
//! is passed on unchanged, apart from `host`, `content-length` and the
//! hop-by-hop headers, which belong to a single connection.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, Uri, header},
    response::Response,
};
use reqwest::{Client, redirect};

use crate::{
    Error,
    config::{ProxyConfig, normalize_origin},
};

const HOP_BY_HOP_HEADERS: [header::HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// The state needed by [proxy_request].
#[derive(Debug, Clone)]
pub struct ProxyState {
    client: Client,
    backend_origin: String,
}

impl ProxyState {
    /// Create the proxy state for the backend in `config`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidBackendUrl] if the backend URL is not an http(s)
    /// origin.
    pub fn new(config: &ProxyConfig) -> Result<Self, Error> {
        Self::with_origin(&config.backend_url)
    }

    /// Create the proxy state for the backend at `origin`.
    ///
    /// Redirects from the backend are handed back to the caller, not followed.
    pub fn with_origin(origin: &str) -> Result<Self, Error> {
        Ok(Self {
            client: Client::builder().redirect(redirect::Policy::none()).build()?,
            backend_origin: normalize_origin(origin)?,
        })
    }

    /// The origin requests are forwarded to, without a trailing slash.
    pub fn backend_origin(&self) -> &str {
        &self.backend_origin
    }
}

/// Forward `request` to the backend and return the backend's response.
///
/// # Errors
///
/// Returns [Error::BadGateway] if the backend cannot be reached or its
/// response cannot be read.
pub async fn proxy_request(
    State(state): State<ProxyState>,
    request: Request,
) -> Result<Response, Error> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|error| Error::BadGateway(error.to_string()))?;
    let url = backend_url(&state.backend_origin, &parts.uri);

    tracing::debug!("forwarding {} {} to {url}", parts.method, parts.uri);

    let backend_response = state
        .client
        .request(parts.method, &url)
        .headers(forwarded_headers(&parts.headers))
        .body(body)
        .send()
        .await
        .map_err(|error| {
            tracing::warn!("could not reach backend at {url}: {error}");
            Error::BadGateway(error.to_string())
        })?;

    let status = backend_response.status();
    let headers = forwarded_headers(backend_response.headers());
    let body = backend_response
        .bytes()
        .await
        .map_err(|error| Error::BadGateway(error.to_string()))?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;

    Ok(response)
}

/// The backend URL for `uri`, with a trailing slash added to the path.
fn backend_url(origin: &str, uri: &Uri) -> String {
    let path = uri.path();
    let slash = if path.ends_with('/') { "" } else { "/" };

    match uri.query() {
        Some(query) => format!("{origin}{path}{slash}?{query}"),
        None => format!("{origin}{path}{slash}"),
    }
}

fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();

    forwarded.remove(header::HOST);
    forwarded.remove(header::CONTENT_LENGTH);
    forwarded.remove("keep-alive");
    for name in HOP_BY_HOP_HEADERS {
        forwarded.remove(name);
    }

    forwarded
}
