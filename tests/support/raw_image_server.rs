//! Minimal HTTP/1.1 image server built on a raw `TcpListener`.
//!
//! Replies to every request with `200 image/png`, no `Content-Length`, and
//! closes the connection to end the body. Counts requests that are in
//! flight so tests can observe the client's concurrency.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::socket_guard::should_skip_socket_bound_test;

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    requests: AtomicUsize,
}

pub struct RawImageServer {
    base_url: String,
    counters: Arc<Counters>,
}

impl RawImageServer {
    /// Starts the server, or returns `None` when localhost cannot be bound.
    pub async fn start_or_skip(body: Vec<u8>, delay: Duration) -> Option<Self> {
        if should_skip_socket_bound_test() {
            return None;
        }

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind raw image server");
        let addr = listener.local_addr().expect("raw image server address");
        let counters = Arc::new(Counters::default());
        let body: Arc<[u8]> = body.into();

        let accept_counters = Arc::clone(&counters);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let counters = Arc::clone(&accept_counters);
                let body = Arc::clone(&body);
                tokio::spawn(serve_one(socket, counters, body, delay));
            }
        });

        Some(Self {
            base_url: format!("http://{addr}"),
            counters,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Highest number of requests handled at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub fn request_count(&self) -> usize {
        self.counters.requests.load(Ordering::SeqCst)
    }
}

async fn serve_one(mut socket: TcpStream, counters: Arc<Counters>, body: Arc<[u8]>, delay: Duration) {
    let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    counters.peak.fetch_max(now, Ordering::SeqCst);
    counters.requests.fetch_add(1, Ordering::SeqCst);

    read_request_head(&mut socket).await;
    tokio::time::sleep(delay).await;
    counters.in_flight.fetch_sub(1, Ordering::SeqCst);

    let head = "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n";
    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(&body).await;
    let _ = socket.shutdown().await;
}

async fn read_request_head(socket: &mut TcpStream) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&chunk[..n]),
        }
    }
}
