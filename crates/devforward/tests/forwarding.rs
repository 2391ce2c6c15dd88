//! End-to-end tests: a DevServer in front of a static root, with an
//! in-process upstream standing in for the remote API.

use bytes::Bytes;
use devforward::config::{Config, ForwardConfig, MockConfig, RemotePort, RuleConfig};
use devforward::DevServer;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use reqwest::Client;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Upstream answering `{method} {path?query} {body}`. `/status/{code}`
/// answers with that status.
async fn upstream(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let pq = req
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_default();
    let custom = req
        .headers()
        .get("x-custom")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let body = req.into_body().collect().await.unwrap().to_bytes();

    let status = pq
        .strip_prefix("/status/")
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let text = format!("{method} {pq} {}", String::from_utf8_lossy(&body));
    Ok(Response::builder()
        .status(status)
        .header("x-upstream", "yes")
        .header("x-seen-custom", custom)
        .body(Full::new(Bytes::from(text)))
        .unwrap())
}

async fn start_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::spawn(async move {
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service_fn(upstream))
                    .await;
            });
        }
    });
    addr
}

async fn start_dev_server(forward: ForwardConfig, root: &Path) -> String {
    let mut config = Config::default();
    config.listen.port = 0;
    config.listen.root = root.to_path_buf();
    config.forward = forward;

    let server = DevServer::bind(&config).await.unwrap();
    let port = server.local_addr().unwrap().port();
    tokio::spawn(server.run());
    format!("http://127.0.0.1:{port}")
}

/// Static root with `index.html` and `static/foo/bar.json`.
fn static_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
    std::fs::create_dir_all(dir.path().join("static/foo")).unwrap();
    std::fs::write(dir.path().join("static/foo/bar.json"), r#"{"static":true}"#).unwrap();
    dir
}

fn remote_config(upstream: SocketAddr) -> ForwardConfig {
    ForwardConfig {
        proxy_mode: 2,
        remote_host: Some("http://127.0.0.1".to_string()),
        remote_port: Some(RemotePort::Number(upstream.port())),
        rules: vec![RuleConfig {
            pattern: r"^/api/foo(.*)".to_string(),
            replace: "/static/foo$1".to_string(),
        }],
        timeout_secs: Some(5),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_remote_forward_preserves_path_query_and_headers() {
    let root = static_root();
    let upstream = start_upstream().await;
    let base = start_dev_server(remote_config(upstream), root.path()).await;

    let response = Client::new()
        .get(format!("{base}/v2/items?page=2"))
        .header("x-custom", "abc")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-upstream"], "yes");
    assert_eq!(response.headers()["x-seen-custom"], "abc");
    assert_eq!(response.text().await.unwrap(), "GET /v2/items?page=2 ");
}

#[tokio::test]
async fn test_remote_forward_relays_body_and_status() {
    let root = static_root();
    let upstream = start_upstream().await;
    let base = start_dev_server(remote_config(upstream), root.path()).await;
    let client = Client::new();

    let response = client
        .post(format!("{base}/submit"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "POST /submit payload");

    let response = client
        .get(format!("{base}/status/404"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(response.headers()["x-upstream"], "yes");
}

#[tokio::test]
async fn test_remote_rule_rewrites_to_static_file() {
    let root = static_root();
    let upstream = start_upstream().await;
    let base = start_dev_server(remote_config(upstream), root.path()).await;

    let response = Client::new()
        .get(format!("{base}/api/foo/bar.json?x=1"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().get("x-upstream").is_none());
    assert_eq!(response.text().await.unwrap(), r#"{"static":true}"#);
}

#[tokio::test]
async fn test_remote_unreachable_is_500() {
    let root = static_root();
    let closed = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let base = start_dev_server(remote_config(closed), root.path()).await;

    let response = Client::new()
        .get(format!("{base}/v2/items"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert!(!response.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mock_mode() {
    let root = static_root();
    let mocks = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(mocks.path().join("api")).unwrap();
    std::fs::write(mocks.path().join("api/users"), r#"{"id":1}"#).unwrap();

    let forward = ForwardConfig {
        proxy_mode: 1,
        mock_config: Some(MockConfig {
            mock_dir: mocks.path().to_path_buf(),
            mock_pattern: "^/api/".to_string(),
        }),
        ..Default::default()
    };
    let base = start_dev_server(forward, root.path()).await;
    let client = Client::new();

    let hit = client
        .get(format!("{base}/api/users?id=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(hit.status(), 200);
    assert_eq!(
        hit.headers()["content-type"],
        "application/json; charset=utf-8"
    );
    assert_eq!(hit.text().await.unwrap(), r#"{"id":1}"#);

    let miss = client
        .get(format!("{base}/api/orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(miss.status(), 404);
    assert_eq!(miss.text().await.unwrap(), "api handler no find");

    let static_file = client
        .get(format!("{base}/index.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(static_file.status(), 200);
    assert_eq!(static_file.text().await.unwrap(), "<h1>home</h1>");
}

#[tokio::test]
async fn test_disabled_mode_serves_static_only() {
    let root = static_root();
    let base = start_dev_server(ForwardConfig::default(), root.path()).await;
    let client = Client::new();

    let response = client
        .get(format!("{base}/static/foo/bar.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{base}/api/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
