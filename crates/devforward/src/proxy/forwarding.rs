//! Request forwarding to the remote server.
//!
//! The target url is the configured origin with the request's path and query
//! appended verbatim. Each request gets exactly one attempt; transport
//! failures become a plain-text 500 for the client.

use super::client::{create_http_client, HttpClient, RemoteTls};
use super::headers::forwardable_headers;
use super::response_ext::{ForwardBody, ResponseExt};
use crate::config::ForwardConfig;
use crate::error::{error_chain, ConfigError, ForwardError};
use crate::metrics;
use crate::response::text_error_response;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::HOST;
use hyper::{Request, Response, StatusCode, Uri};
use std::time::{Duration, Instant};
use tower::BoxError;
use tracing::{debug, error};

pub struct RemoteForwarder {
    http_client: HttpClient,
    origin: String,
    timeout: Option<Duration>,
    preserve_host: bool,
}

/// Response to send back for a forwarded request.
pub struct Forwarded {
    pub response: Response<ForwardBody>,
    /// The remote was never reached; `response` is the local 500.
    pub transport_failed: bool,
}

impl RemoteForwarder {
    /// Build the forwarder and its shared client from a remote-mode config.
    pub fn new(config: &ForwardConfig) -> Result<Self, ConfigError> {
        let origin = config.remote_origin()?;
        let tls = RemoteTls::for_origin(&origin, config.tls_skip_verify);
        let http_client =
            create_http_client(&config.connection_pool, tls).map_err(ConfigError::Client)?;

        Ok(RemoteForwarder {
            http_client,
            origin,
            timeout: config.timeout_secs.map(Duration::from_secs),
            preserve_host: config.preserve_host,
        })
    }

    /// `{remote_host}:{remote_port}`
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Full upstream url for a request path (with query).
    pub fn target_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.origin, path_and_query)
    }

    /// Forward `req` and relay the upstream response. Never fails: transport
    /// errors are logged and answered with a 500.
    pub async fn forward<B>(&self, req: Request<B>) -> Forwarded
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let host = req
            .headers()
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let url = path_and_query(req.uri()).to_string();
        let start = Instant::now();

        match self.send(req).await {
            Ok(upstream_response) => {
                let status = upstream_response.status();
                metrics::record_upstream_duration(
                    status.as_str(),
                    start.elapsed().as_secs_f64() * 1000.0,
                );
                let (mut parts, body) = upstream_response.into_parts();
                parts.headers = forwardable_headers(&parts.headers, true);
                Forwarded {
                    response: Response::from_parts(parts, body).into_forward_body(),
                    transport_failed: false,
                }
            }
            Err(e) => {
                metrics::record_upstream_duration("error", start.elapsed().as_secs_f64() * 1000.0);
                let description = error_chain(&e);
                error!("Failed to forward {}{} to {}: {}", host, url, self.origin, description);
                Forwarded {
                    response: text_error_response(StatusCode::INTERNAL_SERVER_ERROR, &description)
                        .into_forward_body(),
                    transport_failed: true,
                }
            }
        }
    }

    async fn send<B>(&self, req: Request<B>) -> Result<Response<Incoming>, ForwardError>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let target = self.target_url(path_and_query(req.uri()));
        let uri: Uri = target
            .parse()
            .map_err(|source| ForwardError::InvalidTarget {
                target: target.clone(),
                source,
            })?;

        debug!("Forwarding {} {} to {}", req.method(), req.uri(), uri);

        let (parts, body) = req.into_parts();
        let mut upstream_req = Request::new(body.map_err(Into::into).boxed_unsync());
        *upstream_req.method_mut() = parts.method;
        *upstream_req.uri_mut() = uri;
        // Without a Host header the client fills in the remote's own
        *upstream_req.headers_mut() = forwardable_headers(&parts.headers, self.preserve_host);

        let pending = self.http_client.request(upstream_req);
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| ForwardError::Timeout(limit))??,
            None => pending.await?,
        };
        Ok(response)
    }
}

/// Request path with query, `/` when the uri has neither.
pub(crate) fn path_and_query(uri: &Uri) -> &str {
    uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/")
}
