//! Fake switcher and fake gateway for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tally_sync::GatewayConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// =============================================================================
// Fake Switcher
// =============================================================================

pub const SWITCHER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<switcher>
  <physical_input physical_input_number="Input1" iso_label="Cam 1"/>
  <physical_input physical_input_number="Input2" iso_label="Cam 2"/>
</switcher>"#;

pub const TALLY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tally>
  <column index="0" name="input1" on_pgm="true" on_prev="false"/>
  <column index="1" name="input2" on_pgm="false" on_prev="true"/>
  <column index="2" name="input3" on_pgm="false" on_prev="false"/>
</tally>"#;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";

const CHALLENGE: &str =
    r#"Digest realm="switcher", qop="auth", nonce="7f1de29e6da19d22b51c68001e7e0e54", opaque="5ccc069c403ebaf9f0171e9517f40e41", algorithm=MD5"#;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum SwitcherMode {
    Healthy,
    ServerError,
    Malformed,
}

#[derive(Clone)]
struct SwitcherState {
    mode: SwitcherMode,
    requests: Arc<Mutex<Vec<HeaderMap>>>,
}

async fn dictionary_handler(
    State(state): State<SwitcherState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.requests.lock().unwrap().push(headers.clone());

    let key = params.get("key").cloned().unwrap_or_default();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let expected_uri = format!(r#"uri="/v1/dictionary?key={key}""#);
    let authorized = authorization.starts_with("Digest ")
        && authorization.contains(&format!(r#"username="{USERNAME}""#))
        && authorization.contains(&expected_uri)
        && authorization.contains("response=");

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, CHALLENGE)],
        )
            .into_response();
    }

    let body = match (state.mode, key.as_str()) {
        (SwitcherMode::ServerError, _) => {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        (SwitcherMode::Malformed, "tally") => "<tally><column name=\"input1\" on_pgm=\"true\"/>",
        (_, "switcher") => SWITCHER_XML,
        (_, "tally") => TALLY_XML,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };

    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

pub struct FakeSwitcher {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<HeaderMap>>>,
}

pub async fn start_switcher(mode: SwitcherMode) -> FakeSwitcher {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1/dictionary", get(dictionary_handler))
        .with_state(SwitcherState {
            mode,
            requests: requests.clone(),
        });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeSwitcher {
        base_url: format!("http://{addr}"),
        requests,
    }
}

// =============================================================================
// Fake Gateway
// =============================================================================

pub const AUTH_OK: &str = r#"<application-authentication-reply result="Ok"/>"#;
pub const AUTH_DENIED: &str = r#"<application-authentication-reply result="Denied"/>"#;
pub const SET_OK: &str = r#"<function-value-change-reply result="Ok"/>"#;
pub const INDICATION: &str = r#"<application-authentication-indication xml-protocol="2.0"/>"#;

/// How the fake gateway answers each of the two documents.
#[derive(Clone, Copy)]
pub enum Answer {
    Reply(&'static str),
    Silent,
    Close,
}

#[derive(Clone, Copy)]
pub struct GatewayScript {
    pub auth: Answer,
    pub set: Answer,
}

impl GatewayScript {
    pub const ACKNOWLEDGING: GatewayScript = GatewayScript {
        auth: Answer::Reply(AUTH_OK),
        set: Answer::Reply(SET_OK),
    };
}

pub struct FakeGateway {
    pub port: u16,
    /// Function-value-change documents received, in order.
    pub received: Arc<Mutex<Vec<String>>>,
    /// Number of connections accepted.
    pub connections: Arc<Mutex<usize>>,
}

impl FakeGateway {
    pub fn config(&self) -> GatewayConfig {
        GatewayConfig {
            host: "127.0.0.1".to_string(),
            port: self.port,
            timeout: Duration::from_millis(300),
            settle_delay: Duration::ZERO,
            client_name: "TallySender".to_string(),
        }
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

async fn read_until(stream: &mut TcpStream, marker: &str) -> Option<String> {
    let mut collected = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        collected.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&collected).into_owned();
        if text.contains(marker) {
            return Some(text);
        }
    }
}

/// Answers per `script`; returns false when the connection should end.
async fn answer(stream: &mut TcpStream, answer: Answer) -> bool {
    match answer {
        Answer::Reply(text) => stream.write_all(text.as_bytes()).await.is_ok(),
        Answer::Silent => true,
        Answer::Close => false,
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    script: GatewayScript,
    received: Arc<Mutex<Vec<String>>>,
) {
    if read_until(&mut stream, "</application-authentication-request>")
        .await
        .is_none()
    {
        return;
    }
    if !answer(&mut stream, script.auth).await {
        return;
    }

    let Some(document) = read_until(&mut stream, "</function-value-change>").await else {
        return;
    };
    received.lock().unwrap().push(document);
    if !answer(&mut stream, script.set).await {
        return;
    }

    // Hold the connection until the client closes it.
    let mut sink = [0u8; 64];
    while let Ok(n) = stream.read(&mut sink).await {
        if n == 0 {
            break;
        }
    }
}

pub async fn start_gateway(script: GatewayScript) -> FakeGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let received = Arc::new(Mutex::new(Vec::new()));
    let connections = Arc::new(Mutex::new(0usize));

    let task_received = received.clone();
    let task_connections = connections.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            *task_connections.lock().unwrap() += 1;
            tokio::spawn(serve_connection(stream, script, task_received.clone()));
        }
    });

    FakeGateway {
        port,
        received,
        connections,
    }
}
