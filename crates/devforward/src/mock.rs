//! Local mock responses served from a directory.
//!
//! A request whose path (query string removed) matches the mock pattern is
//! answered with the file at `mock_dir` + path. Everything else is left to the
//! next handler.

use crate::config::MockConfig;
use crate::error::ConfigError;
use crate::proxy::headers::APPLICATION_JSON_UTF8;
use crate::response::builder::{build_response, text_error_response};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use regex::Regex;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Body of the 404 returned when no mock file exists for a matched path.
pub const MOCK_NOT_FOUND_BODY: &str = "api handler no find";

/// Result of resolving a request against the mock directory.
#[derive(Debug)]
pub enum MockOutcome {
    /// Path does not match the mock pattern; not ours to answer.
    PassThrough,
    /// File content, verbatim.
    Found(Bytes),
    /// Path matched but no file exists for it.
    NotFound,
    /// The file exists but could not be read.
    Failed(io::Error),
}

impl MockOutcome {
    /// Response for this outcome, `None` for `PassThrough`.
    pub fn into_response(self) -> Option<Response<Full<Bytes>>> {
        match self {
            MockOutcome::PassThrough => None,
            MockOutcome::Found(body) => Some(json_response(StatusCode::OK, body)),
            MockOutcome::NotFound => Some(json_response(
                StatusCode::NOT_FOUND,
                Bytes::from_static(MOCK_NOT_FOUND_BODY.as_bytes()),
            )),
            MockOutcome::Failed(err) => Some(text_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &err.to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockResolver {
    mock_dir: PathBuf,
    pattern: Regex,
}

impl MockResolver {
    pub fn new(config: &MockConfig) -> Result<Self, ConfigError> {
        let pattern =
            Regex::new(&config.mock_pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: config.mock_pattern.clone(),
                source,
            })?;

        Ok(MockResolver {
            mock_dir: config.mock_dir.clone(),
            pattern,
        })
    }

    pub fn mock_dir(&self) -> &Path {
        &self.mock_dir
    }

    /// True if the path part of `url` is handled by this resolver.
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(strip_query(url))
    }

    /// File a matched path maps to: `mock_dir` with the path appended as-is.
    /// Returns `None` for paths with a `..` segment.
    pub fn candidate_path(&self, path: &str) -> Option<PathBuf> {
        if path.split('/').any(|segment| segment == "..") {
            return None;
        }
        let mut full: OsString = self.mock_dir.as_os_str().to_owned();
        full.push(path);
        Some(PathBuf::from(full))
    }

    pub async fn resolve(&self, url: &str) -> MockOutcome {
        let path = strip_query(url);
        if !self.pattern.is_match(path) {
            return MockOutcome::PassThrough;
        }

        let Some(file) = self.candidate_path(path) else {
            debug!("Mock path {} escapes mock directory", path);
            return MockOutcome::NotFound;
        };

        match tokio::fs::read(&file).await {
            Ok(content) => {
                debug!("Serving mock {} for {}", file.display(), url);
                MockOutcome::Found(Bytes::from(content))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No mock file {} for {}", file.display(), url);
                MockOutcome::NotFound
            }
            Err(e) => {
                error!("Failed to read mock file {}: {}", file.display(), e);
                MockOutcome::Failed(e)
            }
        }
    }
}

/// Path part of a request url: everything before the first `?`.
pub fn strip_query(url: &str) -> &str {
    url.split_once('?').map(|(path, _)| path).unwrap_or(url)
}

fn json_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    build_response(status, [(CONTENT_TYPE, APPLICATION_JSON_UTF8.clone())], body)
}
