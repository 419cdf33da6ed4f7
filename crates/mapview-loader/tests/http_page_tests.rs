// HttpPage against a local server with canned responses
#![cfg(feature = "http")]

use std::net::SocketAddr;
use std::time::Duration;

use mapview_loader::{
    HttpPage, LoadState, LoaderEvent, Readiness, ResourceLoadFailure, ScriptLoader, ScriptSrc,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

async fn respond(mut stream: TcpStream) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let request = String::from_utf8_lossy(&request);
    let path = request.split_whitespace().nth(1).unwrap_or("/");
    let (status, body) = match path {
        "/sdk.js" => ("200 OK", "window.woosmap = {};"),
        "/missing.js" => ("404 Not Found", "not found"),
        "/forbidden.js" => ("403 Forbidden", "forbidden"),
        _ => ("500 Internal Server Error", "boom"),
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/javascript\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(respond(stream));
        }
    });

    addr
}

fn page() -> HttpPage {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    HttpPage::with_client(client).unwrap()
}

async fn settled(readiness: &Readiness) -> LoadState {
    tokio::time::timeout(Duration::from_secs(10), readiness.settled())
        .await
        .expect("script did not settle in time")
}

#[tokio::test]
async fn test_fetched_script_becomes_ready() {
    let addr = spawn_server().await;
    let url = format!("http://{}/sdk.js", addr);

    let (tx, mut events) = mpsc::unbounded_channel();
    let mut loader = ScriptLoader::with_events(page(), tx);
    let readiness = loader.load(&url).unwrap();

    assert_eq!(settled(&readiness).await, LoadState::Ready);
    assert!(readiness.is_ready());

    let handle = loader.handle().unwrap();
    let src = ScriptSrc::new(url.as_str()).unwrap();
    assert_eq!(
        events.recv().await,
        Some(LoaderEvent::Injected {
            src: src.clone(),
            handle
        })
    );
    assert_eq!(events.recv().await, Some(LoaderEvent::Ready { src }));
}

#[tokio::test]
async fn test_not_found() {
    let addr = spawn_server().await;
    let mut loader = ScriptLoader::new(page());

    let readiness = loader.load(&format!("http://{}/missing.js", addr)).unwrap();
    assert_eq!(
        settled(&readiness).await,
        LoadState::Failed(ResourceLoadFailure::NotFound)
    );
    assert!(!readiness.is_ready());
}

#[tokio::test]
async fn test_error_status() {
    let addr = spawn_server().await;
    let mut loader = ScriptLoader::new(page());

    let forbidden = loader.load(&format!("http://{}/forbidden.js", addr)).unwrap();
    assert_eq!(
        settled(&forbidden).await,
        LoadState::Failed(ResourceLoadFailure::Status(403))
    );

    let broken = loader.load(&format!("http://{}/broken.js", addr)).unwrap();
    assert_eq!(
        settled(&broken).await,
        LoadState::Failed(ResourceLoadFailure::Status(500))
    );
}

#[tokio::test]
async fn test_connection_refused() {
    // Grab a free port, then close it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut loader = ScriptLoader::new(page());
    let readiness = loader.load(&format!("http://{}/sdk.js", addr)).unwrap();

    assert!(matches!(
        settled(&readiness).await,
        LoadState::Failed(ResourceLoadFailure::Network(_))
    ));
}

#[tokio::test]
async fn test_fetch_result_is_shared_with_later_loaders() {
    let addr = spawn_server().await;
    let page = std::sync::Arc::new(page());
    let ok_url = format!("http://{}/sdk.js", addr);
    let missing_url = format!("http://{}/missing.js", addr);

    let mut first = ScriptLoader::new(std::sync::Arc::clone(&page));
    settled(&first.load(&ok_url).unwrap()).await;
    settled(&first.load(&missing_url).unwrap()).await;

    // Both elements are found in the page; neither is fetched again
    let mut second = ScriptLoader::new(std::sync::Arc::clone(&page));
    assert!(second.load(&ok_url).unwrap().is_ready());
    assert_eq!(
        second.load(&missing_url).unwrap().state(),
        LoadState::Failed(ResourceLoadFailure::NotFound)
    );
    assert_eq!(page.registry().len(), 2);
}

#[test]
fn test_requires_runtime() {
    assert!(HttpPage::new().is_err());
}
