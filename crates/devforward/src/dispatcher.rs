//! Forwarding middleware.
//!
//! The mode is fixed when the middleware is installed:
//! - `Disabled`: every request goes to the next handler untouched.
//! - `Mock`: requests matching the mock pattern are answered from the mock
//!   directory; the rest go to the next handler.
//! - `Remote`: a request matching a rewrite rule has its url rewritten and goes
//!   to the next handler; anything else is forwarded to the remote server.
//!
//! [`ForwardLayer`] installs the middleware around any tower service.

use crate::config::{ForwardConfig, ProxyMode};
use crate::error::ConfigError;
use crate::matcher::{compile_rules, find_match, CompiledRule};
use crate::metrics::{self, Outcome};
use crate::mock::{MockOutcome, MockResolver};
use crate::proxy::{path_and_query, ForwardBody, RemoteForwarder, ResponseExt};
use crate::response::text_error_response;
use hyper::body::{Body, Bytes};
use hyper::http::uri::PathAndQuery;
use hyper::{Request, Response, StatusCode, Uri};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{BoxError, Layer, Service};
use tracing::{debug, error, info};

/// Validated forwarding mode, carrying only what each mode needs.
pub enum ForwardMode {
    Disabled,
    Mock(MockResolver),
    Remote {
        rules: Vec<CompiledRule>,
        forwarder: RemoteForwarder,
    },
}

impl ForwardMode {
    /// Validate `config` and build the state for its mode. No request is ever
    /// handled with a configuration that fails here.
    pub fn from_config(config: &ForwardConfig) -> Result<Self, ConfigError> {
        match config.validate()? {
            ProxyMode::Disabled => Ok(ForwardMode::Disabled),
            ProxyMode::Mock => {
                let mock = config
                    .mock_config
                    .as_ref()
                    .ok_or(ConfigError::MissingMockConfig)?;
                Ok(ForwardMode::Mock(MockResolver::new(mock)?))
            }
            ProxyMode::Remote => {
                let rules = compile_rules(&config.rules)?;
                let forwarder = RemoteForwarder::new(config)?;
                Ok(ForwardMode::Remote { rules, forwarder })
            }
        }
    }

    pub fn proxy_mode(&self) -> ProxyMode {
        match self {
            ForwardMode::Disabled => ProxyMode::Disabled,
            ForwardMode::Mock(_) => ProxyMode::Mock,
            ForwardMode::Remote { .. } => ProxyMode::Remote,
        }
    }
}

/// The request uri as received, stored in the request extensions when a
/// rewrite rule changed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalUri(pub Uri);

/// Decision for a single request.
pub enum Dispatch<B> {
    /// Hand the (possibly rewritten) request to the next handler.
    Next(Request<B>),
    /// Answer the request directly.
    Respond(Response<ForwardBody>),
}

/// Shared, read-only dispatch state. Cloning is cheap.
#[derive(Clone)]
pub struct Dispatcher {
    mode: Arc<ForwardMode>,
}

impl Dispatcher {
    pub fn new(config: &ForwardConfig) -> Result<Self, ConfigError> {
        let mode = ForwardMode::from_config(config)?;
        match &mode {
            ForwardMode::Disabled => info!("Request forwarding disabled"),
            ForwardMode::Mock(resolver) => {
                info!("Serving mocks from {}", resolver.mock_dir().display())
            }
            ForwardMode::Remote { rules, forwarder } => info!(
                "Forwarding to {} with {} rewrite rules",
                forwarder.origin(),
                rules.len()
            ),
        }
        Ok(Dispatcher {
            mode: Arc::new(mode),
        })
    }

    pub fn mode(&self) -> &ForwardMode {
        &self.mode
    }

    /// Decide what happens to `req`, doing any mock read or remote call needed.
    pub async fn dispatch<B>(&self, mut req: Request<B>) -> Dispatch<B>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let mode = self.mode.proxy_mode().as_str();

        match self.mode.as_ref() {
            ForwardMode::Disabled => {
                metrics::record_dispatch(mode, Outcome::PassThrough);
                Dispatch::Next(req)
            }
            ForwardMode::Mock(resolver) => {
                let url = path_and_query(req.uri()).to_string();
                let outcome = resolver.resolve(&url).await;
                metrics::record_dispatch(mode, mock_outcome(&outcome));
                match outcome.into_response() {
                    Some(response) => Dispatch::Respond(response.into_forward_body()),
                    None => Dispatch::Next(req),
                }
            }
            ForwardMode::Remote { rules, forwarder } => {
                let url = path_and_query(req.uri()).to_string();
                let Some(rule) = find_match(rules, &url) else {
                    debug!("No rule for {}, forwarding to {}", url, forwarder.target_url(&url));
                    let forwarded = forwarder.forward(req).await;
                    let outcome = if forwarded.transport_failed {
                        Outcome::ForwardError
                    } else {
                        Outcome::Forwarded
                    };
                    metrics::record_dispatch(mode, outcome);
                    return Dispatch::Respond(forwarded.response);
                };

                let rewritten = rule.rewrite(&url);
                debug!("Rule {} rewrote {} to {}", rule.pattern(), url, rewritten);
                match rewrite_uri(req.uri(), &rewritten) {
                    Ok(uri) => {
                        let original = std::mem::replace(req.uri_mut(), uri);
                        req.extensions_mut().insert(OriginalUri(original));
                        metrics::record_dispatch(mode, Outcome::Rewrite);
                        Dispatch::Next(req)
                    }
                    Err(e) => {
                        error!("Rule {} produced invalid url {}: {}", rule.pattern(), rewritten, e);
                        metrics::record_dispatch(mode, Outcome::ForwardError);
                        Dispatch::Respond(
                            text_error_response(
                                StatusCode::INTERNAL_SERVER_ERROR,
                                &format!("Invalid rewritten url '{rewritten}': {e}"),
                            )
                            .into_forward_body(),
                        )
                    }
                }
            }
        }
    }
}

fn mock_outcome(outcome: &MockOutcome) -> Outcome {
    match outcome {
        MockOutcome::PassThrough => Outcome::PassThrough,
        MockOutcome::Found(_) => Outcome::MockHit,
        MockOutcome::NotFound => Outcome::MockMiss,
        MockOutcome::Failed(_) => Outcome::MockError,
    }
}

/// `original` with its path and query replaced; scheme and authority are kept.
fn rewrite_uri(original: &Uri, rewritten: &str) -> Result<Uri, hyper::http::Error> {
    let mut parts = original.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(rewritten)?);
    Ok(Uri::from_parts(parts)?)
}

/// Installs the forwarding middleware around a service.
#[derive(Clone)]
pub struct ForwardLayer {
    dispatcher: Dispatcher,
}

impl ForwardLayer {
    /// Validate the configuration and build the shared state. Fails before any
    /// request is handled if the configuration is unusable.
    pub fn new(config: &ForwardConfig) -> Result<Self, ConfigError> {
        Ok(ForwardLayer {
            dispatcher: Dispatcher::new(config)?,
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl<S> Layer<S> for ForwardLayer {
    type Service = ForwardService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ForwardService {
            dispatcher: self.dispatcher.clone(),
            inner,
        }
    }
}

/// Forwarding middleware wrapping the next handler `S`.
#[derive(Clone)]
pub struct ForwardService<S> {
    dispatcher: Dispatcher,
    inner: S,
}

type ResponseFuture<E> = Pin<Box<dyn Future<Output = Result<Response<ForwardBody>, E>> + Send>>;

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ForwardService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Body<Data = Bytes> + Send + 'static,
    ReqBody::Error: Into<BoxError>,
    ResBody: Body<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<ForwardBody>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let dispatcher = self.dispatcher.clone();
        // The instance polled ready is the one that handles the request
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match dispatcher.dispatch(req).await {
                Dispatch::Next(req) => inner
                    .call(req)
                    .await
                    .map(ResponseExt::into_forward_body),
                Dispatch::Respond(response) => Ok(response),
            }
        })
    }
}
