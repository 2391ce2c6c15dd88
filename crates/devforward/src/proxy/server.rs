//! DevServer and its run loop.
//!
//! Serves the static root behind the forwarding middleware, plus an optional
//! Prometheus listener.

use crate::config::Config;
use crate::dispatcher::ForwardLayer;
use crate::metrics::collect_metrics;
use crate::response::{build_response, text_error_response};
use anyhow::Context;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::services::ServeDir;
use tracing::{error, info};

/// Static file server with request forwarding installed in front of it.
pub struct DevServer {
    listener: TcpListener,
    metrics_listener: Option<TcpListener>,
    root: PathBuf,
    layer: ForwardLayer,
}

impl DevServer {
    /// Validate `config`, build the middleware and bind the listeners.
    pub async fn bind(config: &Config) -> Result<Self, anyhow::Error> {
        let layer = ForwardLayer::new(&config.forward).context("Invalid forward configuration")?;

        let addr = SocketAddr::from(([0, 0, 0, 0], config.listen.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        let metrics_listener = match &config.metrics {
            Some(metrics) => {
                let addr = SocketAddr::from(([0, 0, 0, 0], metrics.port));
                let listener = TcpListener::bind(addr)
                    .await
                    .with_context(|| format!("Failed to bind metrics listener {addr}"))?;
                Some(listener)
            }
            None => None,
        };

        Ok(DevServer {
            listener,
            metrics_listener,
            root: config.listen.root.clone(),
            layer,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
    }

    /// Accept connections until the listener fails.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = self.listener.local_addr()?;
        info!("Listening on http://{}", addr);
        info!("Serving static files from {}", self.root.display());

        if let Some(listener) = self.metrics_listener {
            info!("Metrics available at http://{}/metrics", listener.local_addr()?);
            tokio::spawn(async move {
                if let Err(err) = serve_metrics(listener).await {
                    error!("Metrics listener stopped: {}", err);
                }
            });
        }

        let service = self.layer.layer(ServeDir::new(&self.root));

        loop {
            let (stream, remote_addr) = self.listener.accept().await?;
            let service = TowerToHyperService::new(service.clone());

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }
}

async fn serve_metrics(listener: TcpListener) -> std::io::Result<()> {
    loop {
        let (stream, remote_addr) = listener.accept().await?;
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service =
                service_fn(|req: Request<Incoming>| async move { Ok::<_, Infallible>(metrics_response(&req)) });
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Error serving metrics connection from {}: {}", remote_addr, err);
            }
        });
    }
}

fn metrics_response<B>(req: &Request<B>) -> Response<Full<Bytes>> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => build_response(
            StatusCode::OK,
            [(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )],
            collect_metrics(),
        ),
        _ => text_error_response(StatusCode::NOT_FOUND, "Not found"),
    }
}
