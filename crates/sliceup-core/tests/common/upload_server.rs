//! Minimal HTTP/1.1 server with verify/upload/merge endpoints for
//! integration tests.
//!
//! `POST /verify` answers `{"exists": <bool>}` from the configured flag;
//! `POST /upload` stores the chunk body keyed by the `x-chunk-index`
//! header (or returns 500 for indices in `fail_indices`); `POST /merge`
//! counts calls. Tests inspect the shared state afterwards.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Default)]
pub struct ServerState {
    /// Answer for the verify endpoint.
    pub exists: bool,
    /// Chunk indices the upload endpoint rejects with HTTP 500.
    pub fail_indices: HashSet<usize>,
    /// Received chunks: index -> (name header, body bytes).
    pub chunks: Mutex<HashMap<usize, (String, Vec<u8>)>>,
    pub verify_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub merge_calls: AtomicUsize,
}

impl ServerState {
    pub fn merge_count(&self) -> usize {
        self.merge_calls.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Reassembles the received chunks in index order.
    pub fn assembled(&self) -> Vec<u8> {
        let chunks = self.chunks.lock().unwrap();
        let mut indices: Vec<_> = chunks.keys().copied().collect();
        indices.sort_unstable();
        let mut out = Vec::new();
        for i in indices {
            out.extend_from_slice(&chunks[&i].1);
        }
        out
    }
}

/// Starts the server in a background thread. Returns the base URL
/// (e.g. "http://127.0.0.1:12345/"). Runs until the process exits.
pub fn start(state: Arc<ServerState>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&state);
            thread::spawn(move || handle(stream, &state));
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

fn handle(mut stream: std::net::TcpStream, state: &ServerState) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(5)));

    let Some((path, headers, body)) = read_request(&mut stream) else {
        return;
    };

    match path.as_str() {
        "/verify" => {
            state.verify_calls.fetch_add(1, Ordering::SeqCst);
            let body = format!("{{\"exists\":{}}}", state.exists);
            respond(&mut stream, 200, "application/json", body.as_bytes());
        }
        "/upload" => {
            state.upload_calls.fetch_add(1, Ordering::SeqCst);
            let index: usize = headers
                .get("x-chunk-index")
                .and_then(|v| v.parse().ok())
                .unwrap_or(usize::MAX);
            if state.fail_indices.contains(&index) {
                respond(&mut stream, 500, "text/plain", b"chunk rejected");
                return;
            }
            let name = headers.get("x-chunk-name").cloned().unwrap_or_default();
            state.chunks.lock().unwrap().insert(index, (name, body));
            respond(&mut stream, 200, "text/plain", b"ok");
        }
        "/merge" => {
            state.merge_calls.fetch_add(1, Ordering::SeqCst);
            respond(&mut stream, 200, "text/plain", b"merged");
        }
        _ => respond(&mut stream, 404, "text/plain", b"not found"),
    }
}

/// Reads one request: returns (path, lowercase header map, body).
fn read_request(
    stream: &mut std::net::TcpStream,
) -> Option<(String, HashMap<String, String>, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut tmp).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        if buf.len() > 64 * 1024 {
            return None;
        }
    };

    let head = std::str::from_utf8(&buf[..header_end]).ok()?;
    let mut lines = head.split("\r\n");
    let request_line = lines.next()?;
    let path = request_line.split_whitespace().nth(1)?.to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    // curl announces sized bodies with Expect: 100-continue and waits for
    // the interim response before sending them.
    if headers.contains_key("expect") {
        let _ = stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n");
        let _ = stream.flush();
    }

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut tmp).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&tmp[..n]);
    }
    body.truncate(content_length);

    Some((path, headers, body))
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn respond(stream: &mut std::net::TcpStream, code: u16, content_type: &str, body: &[u8]) {
    let status = match code {
        200 => "200 OK",
        404 => "404 Not Found",
        _ => "500 Internal Server Error",
    };
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}
