//! Shared utilities for protocol integration tests.

use std::net::SocketAddr;

use carddav_server::config::ServerConfig;
use carddav_server::http::HttpServer;
use tokio::net::TcpListener;

/// Start a server on an ephemeral port, returning its address.
pub async fn start_server(mut config: ServerConfig) -> SocketAddr {
    config.listener.bind_address = "127.0.0.1:0".to_string();

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config);
    tokio::spawn(async move {
        server.run(listener).await.unwrap();
    });

    addr
}

/// Issue a DAV request with an arbitrary method.
pub async fn dav_request(
    addr: SocketAddr,
    method: &str,
    path: &str,
    depth: Option<&str>,
    body: String,
) -> reqwest::Response {
    let client = reqwest::Client::new();
    let mut request = client.request(
        reqwest::Method::from_bytes(method.as_bytes()).unwrap(),
        format!("http://{}{}", addr, path),
    );
    if let Some(depth) = depth {
        request = request.header("Depth", depth);
    }
    request.body(body).send().await.unwrap()
}
