//! HTTP plumbing for devforward.
//!
//! # Module Structure
//!
//! - `server` - DevServer and its accept loop
//! - `forwarding` - Request forwarding to the remote server
//! - `client` - HTTP client creation and configuration
//! - `tls` - Certificate handling for https remotes
//! - `headers` - Header filtering and shared header values
//! - `response_ext` - Unified response body type

mod client;
mod forwarding;
pub(crate) mod headers;
pub mod response_ext;
mod server;
mod tls;

pub use client::{create_http_client, HttpClient, RemoteTls};
pub(crate) use forwarding::path_and_query;
pub use forwarding::{Forwarded, RemoteForwarder};
pub use response_ext::{ForwardBody, ResponseExt};
pub use server::DevServer;
