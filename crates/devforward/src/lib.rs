//! Development-time request forwarding.
//!
//! [`ForwardLayer`] is a tower middleware that, depending on its configured
//! mode, passes requests through, answers them from local mock files, or
//! rewrites and forwards them to a remote server. [`DevServer`] serves a
//! static directory with the middleware installed in front of it.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod matcher;
pub mod metrics;
pub mod mock;
pub mod proxy;
pub mod response;

pub use config::{Config, ForwardConfig, ProxyMode};
pub use dispatcher::{Dispatch, Dispatcher, ForwardLayer, ForwardMode, ForwardService, OriginalUri};
pub use error::{ConfigError, ForwardError};
pub use proxy::{DevServer, ForwardBody};
