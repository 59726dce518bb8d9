//! Shared helpers for integration tests: a small in-process HTTP
//! server with fault injection, plus archive and digest fixtures.

// Each integration test binary compiles this module separately and
// uses a different subset of it.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// One served path and how to answer it.
#[derive(Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
    /// Stop sending after this many body bytes and drop the connection.
    /// The Content-Length header still declares the full length.
    pub truncate_at: Option<usize>,
    /// Sleep between 1KB body chunks, to keep a transfer in flight long
    /// enough for cancellation and concurrency tests.
    pub chunk_delay: Option<Duration>,
}

impl Route {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            body,
            truncate_at: None,
            chunk_delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            truncate_at: None,
            chunk_delay: None,
        }
    }

    pub fn truncated(mut self, at: usize) -> Self {
        self.truncate_at = Some(at);
        self
    }

    pub fn throttled(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }
}

/// Minimal blocking HTTP server bound to a random localhost port.
///
/// The accept thread runs for the life of the test process.
pub struct TestServer {
    addr: SocketAddr,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    max_active: Arc<AtomicUsize>,
}

impl TestServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let addr = listener.local_addr().expect("local addr");

        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::new(Mutex::new(HashMap::new()));
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        {
            let routes = Arc::clone(&routes);
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(stream) = stream else { break };
                    let routes = Arc::clone(&routes);
                    let active = Arc::clone(&active);
                    let max_active = Arc::clone(&max_active);
                    thread::spawn(move || {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_active.fetch_max(now, Ordering::SeqCst);
                        handle_connection(stream, &routes);
                        active.fetch_sub(1, Ordering::SeqCst);
                    });
                }
            });
        }

        Self {
            addr,
            routes,
            max_active,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn route(&self, path: &str, route: Route) {
        self.routes.lock().insert(path.to_string(), route);
    }

    /// Highest number of requests that were in flight at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

fn handle_connection(mut stream: TcpStream, routes: &Mutex<HashMap<String, Route>>) {
    // Read until end of headers
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                request.extend_from_slice(&buf[..n]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }

    let request = String::from_utf8_lossy(&request);
    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

    let route = routes.lock().get(&path).cloned();
    let route = match route {
        Some(route) => route,
        None => Route::status(404),
    };

    let reason = match route.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        reason,
        route.body.len()
    );
    if stream.write_all(header.as_bytes()).is_err() {
        return;
    }

    let limit = route.truncate_at.unwrap_or(route.body.len());
    let body = &route.body[..limit.min(route.body.len())];
    match route.chunk_delay {
        Some(delay) => {
            for chunk in body.chunks(1024) {
                thread::sleep(delay);
                if stream.write_all(chunk).is_err() {
                    return;
                }
                let _ = stream.flush();
            }
        }
        None => {
            let _ = stream.write_all(body);
        }
    }
    let _ = stream.flush();
}

/// Build an in-memory ZIP archive. `None` contents mean a directory.
pub fn zip_bytes(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default();
        for (name, contents) in entries {
            match contents {
                Some(bytes) => {
                    zip.start_file(*name, options).unwrap();
                    zip.write_all(bytes).unwrap();
                }
                None => {
                    zip.add_directory(*name, options).unwrap();
                }
            }
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
