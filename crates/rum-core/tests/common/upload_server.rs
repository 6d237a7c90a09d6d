//! Minimal HTTP/1.1 server implementing the resumable upload contract for
//! integration tests.
//!
//! POST /videos opens a session (Location: /files/{id}); HEAD reports the
//! confirmed offset in Upload-Offset; PATCH appends bytes at the declared
//! offset; DELETE discards the session; GET /files/{id}/events serves a
//! canned newline-delimited JSON event stream. Options inject faults:
//! required auth, 503s after N successful appends, failing DELETEs,
//! expiring sessions between runs.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone, Default)]
pub struct UploadServerOptions {
    /// When set, every request must carry `Authorization: Bearer <this>`.
    pub auth_required: Option<String>,
    /// When set, PATCH returns 503 once this many appends have succeeded.
    pub fail_after_appends: Option<u32>,
    /// DELETE returns 500 (local cancellation must proceed anyway).
    pub fail_delete: bool,
}

#[derive(Debug, Default)]
struct SessionData {
    data: Vec<u8>,
    metadata: Option<String>,
    expired: bool,
}

#[derive(Debug, Default)]
struct ServerState {
    options: UploadServerOptions,
    sessions: HashMap<u64, SessionData>,
    next_id: u64,
    creates: u32,
    appended_patches: u32,
    failed_patches: u32,
    deletes: u32,
    total_requests: u32,
    /// ND-JSON lines served on any events stream request.
    event_lines: Vec<String>,
}

/// Handle to a running test server.
pub struct UploadServer {
    port: u16,
    state: Arc<Mutex<ServerState>>,
}

impl UploadServer {
    /// Session-creation endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}/videos", self.port)
    }

    pub fn creates(&self) -> u32 {
        self.state.lock().unwrap().creates
    }

    /// Successful PATCH round-trips (each appended exactly one chunk).
    pub fn appended_patches(&self) -> u32 {
        self.state.lock().unwrap().appended_patches
    }

    pub fn failed_patches(&self) -> u32 {
        self.state.lock().unwrap().failed_patches
    }

    pub fn deletes(&self) -> u32 {
        self.state.lock().unwrap().deletes
    }

    pub fn total_requests(&self) -> u32 {
        self.state.lock().unwrap().total_requests
    }

    /// Bytes of the most recently created session.
    pub fn last_session_bytes(&self) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        let id = state.sessions.keys().max()?;
        Some(state.sessions[id].data.clone())
    }

    /// Raw Upload-Metadata of the most recently created session.
    pub fn last_session_metadata(&self) -> Option<String> {
        let state = self.state.lock().unwrap();
        let id = state.sessions.keys().max()?;
        state.sessions[id].metadata.clone()
    }

    /// Mark all existing sessions expired: HEAD/PATCH on them return 404,
    /// simulating server-side session expiry between runs.
    pub fn expire_all_sessions(&self) {
        let mut state = self.state.lock().unwrap();
        for session in state.sessions.values_mut() {
            session.expired = true;
        }
    }

    /// Stop injecting PATCH failures.
    pub fn clear_failure_mode(&self) {
        self.state.lock().unwrap().options.fail_after_appends = None;
    }

    /// Set the canned events stream.
    pub fn set_event_lines(&self, lines: Vec<String>) {
        self.state.lock().unwrap().event_lines = lines;
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(options: UploadServerOptions) -> UploadServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(Mutex::new(ServerState {
        options,
        next_id: 1,
        ..ServerState::default()
    }));
    let thread_state = Arc::clone(&state);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let state = Arc::clone(&thread_state);
            thread::spawn(move || handle(stream, &state));
        }
    });
    UploadServer { port, state }
}

struct Request {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

fn handle(mut stream: TcpStream, state: &Mutex<ServerState>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(5)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    state.lock().unwrap().total_requests += 1;

    if let Some(expected) = state.lock().unwrap().options.auth_required.clone() {
        let ok = req
            .headers
            .get("authorization")
            .map(|v| *v == format!("Bearer {expected}"))
            .unwrap_or(false);
        if !ok {
            respond(&mut stream, 401, "Unauthorized", &[], b"");
            return;
        }
    }

    match (req.method.as_str(), req.path.as_str()) {
        ("POST", "/videos") => handle_create(&mut stream, state, &req),
        (_, path) if path.starts_with("/files/") => handle_session(&mut stream, state, &req),
        _ => respond(&mut stream, 404, "Not Found", &[], b""),
    }
}

fn handle_create(stream: &mut TcpStream, state: &Mutex<ServerState>, req: &Request) {
    let mut state = state.lock().unwrap();
    let id = state.next_id;
    state.next_id += 1;
    state.creates += 1;
    state.sessions.insert(
        id,
        SessionData {
            data: Vec::new(),
            metadata: req.headers.get("upload-metadata").cloned(),
            expired: false,
        },
    );
    let location = format!("Location: /files/{id}");
    respond(stream, 201, "Created", &[&location], b"");
}

fn handle_session(stream: &mut TcpStream, state: &Mutex<ServerState>, req: &Request) {
    let rest = &req.path["/files/".len()..];
    if let Some(id_str) = rest.strip_suffix("/events") {
        let Ok(_id) = id_str.parse::<u64>() else {
            respond(stream, 404, "Not Found", &[], b"");
            return;
        };
        let body = state.lock().unwrap().event_lines.join("\n") + "\n";
        respond(stream, 200, "OK", &[], body.as_bytes());
        return;
    }

    let Ok(id) = rest.parse::<u64>() else {
        respond(stream, 404, "Not Found", &[], b"");
        return;
    };

    let mut state = state.lock().unwrap();
    let gone = match state.sessions.get(&id) {
        None => true,
        Some(s) => s.expired,
    };

    match req.method.as_str() {
        "HEAD" => {
            if gone {
                respond(stream, 404, "Not Found", &[], b"");
                return;
            }
            let offset = state.sessions[&id].data.len();
            let header = format!("Upload-Offset: {offset}");
            respond_head(stream, 200, "OK", &[&header]);
        }
        "PATCH" => {
            if gone {
                respond(stream, 404, "Not Found", &[], b"");
                return;
            }
            if let Some(limit) = state.options.fail_after_appends {
                if state.appended_patches >= limit {
                    state.failed_patches += 1;
                    respond(stream, 503, "Service Unavailable", &[], b"");
                    return;
                }
            }
            let declared: Option<u64> = req
                .headers
                .get("upload-offset")
                .and_then(|v| v.parse().ok());
            let current = state.sessions[&id].data.len() as u64;
            match declared {
                Some(offset) if offset == current => {
                    let session = state.sessions.get_mut(&id).unwrap();
                    session.data.extend_from_slice(&req.body);
                    let new_offset = session.data.len();
                    state.appended_patches += 1;
                    let header = format!("Upload-Offset: {new_offset}");
                    respond(stream, 204, "No Content", &[&header], b"");
                }
                _ => {
                    let header = format!("Upload-Offset: {current}");
                    respond(stream, 409, "Conflict", &[&header], b"");
                }
            }
        }
        "DELETE" => {
            if state.options.fail_delete {
                respond(stream, 500, "Internal Server Error", &[], b"");
                return;
            }
            state.sessions.remove(&id);
            state.deletes += 1;
            respond(stream, 204, "No Content", &[], b"");
        }
        _ => respond(stream, 405, "Method Not Allowed", &[], b""),
    }
}

/// Read one request: headers, then exactly Content-Length body bytes.
fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf: Vec<u8> = Vec::new();
    let mut tmp = [0u8; 8192];
    let header_end = loop {
        match stream.read(&mut tmp) {
            Ok(0) => return None,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
            Err(_) => return None,
        }
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > 64 * 1024 {
            return None;
        }
    };

    let head = std::str::from_utf8(&buf[..header_end]).ok()?;
    let mut lines = head.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => body.extend_from_slice(&tmp[..n]),
            Err(_) => return None,
        }
    }
    body.truncate(content_length);

    Some(Request {
        method,
        path,
        headers,
        body,
    })
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn respond(stream: &mut TcpStream, status: u32, reason: &str, headers: &[&str], body: &[u8]) {
    let mut response = format!("HTTP/1.1 {status} {reason}\r\n");
    for h in headers {
        response.push_str(h);
        response.push_str("\r\n");
    }
    response.push_str(&format!("Content-Length: {}\r\n", body.len()));
    response.push_str("Connection: close\r\n\r\n");
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(body);
}

/// Like `respond` but with no body bytes (HEAD).
fn respond_head(stream: &mut TcpStream, status: u32, reason: &str, headers: &[&str]) {
    let mut response = format!("HTTP/1.1 {status} {reason}\r\n");
    for h in headers {
        response.push_str(h);
        response.push_str("\r\n");
    }
    response.push_str("Content-Length: 0\r\nConnection: close\r\n\r\n");
    let _ = stream.write_all(response.as_bytes());
}
