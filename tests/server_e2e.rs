mod common;

use common::{parse_response, Response};
use hashserve::args::Args;
use hashserve::server::Server;
use std::net::SocketAddr;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn spawn_server(root: &TempDir) -> SocketAddr {
    let args = Args {
        listen_addr: "127.0.0.1:0".to_string(),
        serve_dir: root.path().to_path_buf(),
        listing_template: None,
    };
    let server = Server::bind(args).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn roundtrip(addr: SocketAddr, raw: &[u8]) -> Response {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    parse_response(&reply)
}

#[tokio::test]
async fn serves_a_file_over_tcp() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("hello.txt"), b"hello over tcp").unwrap();
    let addr = spawn_server(&root).await;

    let response = roundtrip(
        addr,
        b"GET /hello.txt HTTP/1.1\r\nHost: localhost\r\n\r\n",
    )
    .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"hello over tcp");
    assert_eq!(response.header("Content-Length"), Some("14"));

    // Second request over a fresh connection is a cache hit with an ETag.
    let response = roundtrip(
        addr,
        b"GET /hello.txt HTTP/1.1\r\nHost: localhost\r\n\r\n",
    )
    .await;
    assert_eq!(response.status, 200);
    let etag = response.header("ETag").unwrap().to_string();
    assert_eq!(etag.len(), 40);

    // Conditional fetch with that validator.
    let conditional = format!(
        "GET /hello.txt HTTP/1.1\r\nHost: localhost\r\nIf-None-Match: {}\r\n\r\n",
        etag
    );
    let response = roundtrip(addr, conditional.as_bytes()).await;
    assert_eq!(response.status, 304);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn artifact_put_and_get_over_tcp() {
    let root = TempDir::new().unwrap();
    let addr = spawn_server(&root).await;

    let put = b"PUT /artifactory/g/app/1.0/app.bin HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/octet-stream\r\nContent-Length: 8\r\n\r\npayload!";
    let response = roundtrip(addr, put).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"ok");

    let get = b"GET /artifactory/g/app/1.0/app.bin HTTP/1.1\r\nHost: localhost\r\n\r\n";
    let response = roundtrip(addr, get).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"payload!");

    // The artifact tree is also visible to the static handler.
    let browse = b"GET /g/app/1.0/app.bin HTTP/1.1\r\nHost: localhost\r\n\r\n";
    let response = roundtrip(addr, browse).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"payload!");
}

#[tokio::test]
async fn malformed_request_line_gets_400() {
    let root = TempDir::new().unwrap();
    let addr = spawn_server(&root).await;

    let response = roundtrip(addr, b"NONSENSE\r\n\r\n").await;
    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn directory_redirect_over_tcp() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir(root.path().join("site")).unwrap();
    std::fs::write(root.path().join("site/index.html"), b"<html></html>").unwrap();
    let addr = spawn_server(&root).await;

    let response = roundtrip(addr, b"GET /site HTTP/1.1\r\nHost: h:1\r\n\r\n").await;
    assert_eq!(response.status, 301);
    assert_eq!(response.header("Location"), Some("http://h:1/site/index.html"));
}
