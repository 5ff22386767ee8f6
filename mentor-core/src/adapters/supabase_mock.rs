//! Mock GoTrue server for testing
//!
//! Simulates the subset of the Supabase auth API the client uses, with an
//! in-memory account table:
//! - POST /auth/v1/signup
//! - POST /auth/v1/token?grant_type=password | refresh_token
//! - GET  /auth/v1/user
//! - POST /auth/v1/logout
//!
//! Tokens are `access-<user id>` / `refresh-<user id>`.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value as JsonValue};

/// Mock GoTrue server for testing
pub struct MockGoTrueServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Behavior switches for the mock
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Signup returns the bare user instead of a session
    pub require_confirmation: bool,
    /// Logout answers with HTTP 500
    pub fail_logout: bool,
    /// Lifetime of issued access tokens
    pub token_ttl_secs: i64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            require_confirmation: false,
            fail_logout: false,
            token_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone)]
struct MockAccount {
    id: String,
    email: String,
    password: String,
    full_name: String,
}

#[derive(Default)]
struct MockState {
    accounts: Mutex<Vec<MockAccount>>,
    next_id: AtomicU64,
}

struct Request {
    method: String,
    path: String,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    body: JsonValue,
}

impl MockGoTrueServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let state = Arc::new(MockState::default());

        // Non-blocking so stop() can end the accept loop
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let state = Arc::clone(&state);
                        thread::spawn(move || {
                            handle_connection(stream, &cfg, &state);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    /// Base URL to configure as the Supabase project URL
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockGoTrueServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read one HTTP request, including a Content-Length body
fn read_request(stream: &mut TcpStream) -> Option<Request> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let mut parts = lines.next()?.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let body_end = (header_end + content_length).min(data.len());
    let body = serde_json::from_slice(&data[header_end..body_end]).unwrap_or(JsonValue::Null);

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (
            path.to_string(),
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        ),
        None => (target, HashMap::new()),
    };

    Some(Request {
        method,
        path,
        query,
        headers,
        body,
    })
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, state: &MockState) {
    let Some(request) = read_request(&mut stream) else {
        send_response(&mut stream, 400, "Bad Request", r#"{"msg": "Invalid request"}"#);
        return;
    };

    if !request.headers.contains_key("apikey") {
        send_response(
            &mut stream,
            401,
            "Unauthorized",
            r#"{"message": "No API key found in request"}"#,
        );
        return;
    }

    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/auth/v1/signup") => handle_signup(&mut stream, &request, config, state),
        ("POST", "/auth/v1/token") => handle_token(&mut stream, &request, config, state),
        ("GET", "/auth/v1/user") => match bearer_account(&request, state) {
            Some(account) => {
                send_json(&mut stream, 200, "OK", &user_json(&account));
            }
            None => send_response(
                &mut stream,
                401,
                "Unauthorized",
                r#"{"msg": "invalid JWT: unable to parse or verify signature"}"#,
            ),
        },
        ("POST", "/auth/v1/logout") => {
            if config.fail_logout {
                send_response(
                    &mut stream,
                    500,
                    "Internal Server Error",
                    r#"{"msg": "Unexpected failure"}"#,
                );
            } else {
                send_response(&mut stream, 204, "No Content", "");
            }
        }
        _ => send_response(
            &mut stream,
            404,
            "Not Found",
            r#"{"msg": "Endpoint not found"}"#,
        ),
    }
}

fn handle_signup(stream: &mut TcpStream, request: &Request, config: &MockConfig, state: &MockState) {
    let email = request.body["email"].as_str().unwrap_or_default().to_lowercase();
    let password = request.body["password"].as_str().unwrap_or_default().to_string();
    let full_name = request.body["data"]["full_name"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let mut accounts = state.accounts.lock().unwrap();
    if accounts.iter().any(|a| a.email == email) {
        send_response(
            stream,
            422,
            "Unprocessable Entity",
            r#"{"code": 422, "error_code": "user_already_exists", "msg": "User already registered"}"#,
        );
        return;
    }

    let id = format!("user-{}", state.next_id.fetch_add(1, Ordering::SeqCst) + 1);
    let account = MockAccount {
        id,
        email,
        password,
        full_name,
    };
    accounts.push(account.clone());
    drop(accounts);

    if config.require_confirmation {
        send_json(stream, 200, "OK", &user_json(&account));
    } else {
        send_json(stream, 200, "OK", &token_json(&account, config));
    }
}

fn handle_token(stream: &mut TcpStream, request: &Request, config: &MockConfig, state: &MockState) {
    let accounts = state.accounts.lock().unwrap().clone();

    let account = match request.query.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = request.body["email"].as_str().unwrap_or_default().to_lowercase();
            let password = request.body["password"].as_str().unwrap_or_default();
            accounts
                .into_iter()
                .find(|a| a.email == email && a.password == password)
                .ok_or(r#"{"error": "invalid_grant", "error_description": "Invalid login credentials"}"#)
        }
        Some("refresh_token") => {
            let token = request.body["refresh_token"].as_str().unwrap_or_default();
            token
                .strip_prefix("refresh-")
                .and_then(|id| accounts.into_iter().find(|a| a.id == id))
                .ok_or(r#"{"error": "invalid_grant", "error_description": "Invalid Refresh Token: Refresh Token Not Found"}"#)
        }
        _ => Err(r#"{"error": "unsupported_grant_type", "error_description": "Unsupported grant type"}"#),
    };

    match account {
        Ok(account) => send_json(stream, 200, "OK", &token_json(&account, config)),
        Err(body) => send_response(stream, 400, "Bad Request", body),
    }
}

fn bearer_account(request: &Request, state: &MockState) -> Option<MockAccount> {
    let token = request.headers.get("authorization")?.strip_prefix("Bearer ")?;
    let id = token.strip_prefix("access-")?;
    state
        .accounts
        .lock()
        .unwrap()
        .iter()
        .find(|a| a.id == id)
        .cloned()
}

fn user_json(account: &MockAccount) -> JsonValue {
    json!({
        "id": account.id,
        "aud": "authenticated",
        "role": "authenticated",
        "email": account.email,
        "user_metadata": { "full_name": account.full_name },
        "app_metadata": { "provider": "email" },
    })
}

fn token_json(account: &MockAccount, config: &MockConfig) -> JsonValue {
    json!({
        "access_token": format!("access-{}", account.id),
        "token_type": "bearer",
        "expires_in": config.token_ttl_secs,
        "refresh_token": format!("refresh-{}", account.id),
        "user": user_json(account),
    })
}

fn send_json(stream: &mut TcpStream, status: u16, status_text: &str, body: &JsonValue) {
    send_response(stream, status, status_text, &body.to_string());
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
