// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An in-process stand-in for a WiNet-S dongle.
//!
//! Serves the websocket control channel (`connect`, `devicelist`) and the
//! HTTP `getParam` endpoint on ephemeral ports, records every read request,
//! and can be scripted to fail in the ways the real device does.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use futures_util::{SinkExt as _, StreamExt as _};
use serde_json::{json, Value};
use tokio::{
    io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader},
    net::{TcpListener, TcpStream},
};
use tokio_tungstenite::tungstenite::Message;

use tokio_winets::Session;

pub const DEV_ID: u32 = 1;
pub const DEV_TYPE: u32 = 35;
pub const DEV_CODE: u32 = 3343;

pub struct MockState {
    connect_calls: AtomicUsize,
    devicelist_calls: AtomicUsize,
    http_calls: AtomicUsize,
    reject_devicelist: AtomicUsize,
    fail_http: AtomicUsize,
    empty_devicelist: AtomicBool,
    http_result_code: Mutex<u64>,
    fixed_param_value: Mutex<Option<String>>,
    queries: Mutex<Vec<HashMap<String, String>>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            connect_calls: AtomicUsize::new(0),
            devicelist_calls: AtomicUsize::new(0),
            http_calls: AtomicUsize::new(0),
            reject_devicelist: AtomicUsize::new(0),
            fail_http: AtomicUsize::new(0),
            empty_devicelist: AtomicBool::new(false),
            http_result_code: Mutex::new(1),
            fixed_param_value: Mutex::new(None),
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl MockState {
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn devicelist_calls(&self) -> usize {
        self.devicelist_calls.load(Ordering::SeqCst)
    }

    pub fn http_calls(&self) -> usize {
        self.http_calls.load(Ordering::SeqCst)
    }

    /// Recorded query parameters of every `getParam` request, in order.
    pub fn queries(&self) -> Vec<HashMap<String, String>> {
        self.queries.lock().unwrap().clone()
    }

    /// Answer the next `devicelist` exchange with a failure result code.
    pub fn reject_next_devicelist(&self) {
        self.reject_devicelist.fetch_add(1, Ordering::SeqCst);
    }

    /// Answer the next `getParam` request with HTTP 503.
    pub fn fail_next_http(&self) {
        self.fail_http.fetch_add(1, Ordering::SeqCst);
    }

    /// Answer `devicelist` with an empty device list.
    pub fn set_empty_devicelist(&self, empty: bool) {
        self.empty_devicelist.store(empty, Ordering::SeqCst);
    }

    /// Result code for `getParam` responses (1 = success).
    pub fn set_http_result_code(&self, result_code: u64) {
        *self.http_result_code.lock().unwrap() = result_code;
    }

    /// Fixed `param_value` payload instead of the generated one.
    pub fn set_param_value(&self, param_value: &str) {
        *self.fixed_param_value.lock().unwrap() = Some(param_value.to_owned());
    }
}

pub struct MockDevice {
    pub state: Arc<MockState>,
    pub host: String,
    pub ws_port: u16,
    pub http_port: u16,
}

impl MockDevice {
    /// A fresh session pointed at this mock.
    pub fn session(&self) -> Session {
        Session::with_http_port(self.host.clone(), self.ws_port, self.http_port)
    }
}

pub async fn spawn() -> anyhow::Result<MockDevice> {
    let state = Arc::new(MockState::default());
    let ws_listener = TcpListener::bind("127.0.0.1:0").await?;
    let http_listener = TcpListener::bind("127.0.0.1:0").await?;
    let ws_port = ws_listener.local_addr()?.port();
    let http_port = http_listener.local_addr()?.port();
    tokio::spawn(serve_ws(ws_listener, Arc::clone(&state)));
    tokio::spawn(serve_http(http_listener, Arc::clone(&state)));
    Ok(MockDevice {
        state,
        host: "127.0.0.1".to_owned(),
        ws_port,
        http_port,
    })
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

async fn serve_ws(listener: TcpListener, state: Arc<MockState>) {
    while let Ok((stream, _)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };
            while let Some(Ok(message)) = ws.next().await {
                let Message::Text(text) = message else {
                    continue;
                };
                let request: Value = match serde_json::from_str(&text) {
                    Ok(request) => request,
                    Err(_) => break,
                };
                let response = match request["service"].as_str().unwrap_or_default() {
                    "connect" => {
                        let nth = state.connect_calls.fetch_add(1, Ordering::SeqCst) + 1;
                        json!({
                            "result_code": 1,
                            "result_data": { "token": format!("token-{nth}"), "uid": 1 },
                        })
                    }
                    "devicelist" => {
                        state.devicelist_calls.fetch_add(1, Ordering::SeqCst);
                        if take_one(&state.reject_devicelist) {
                            json!({ "result_code": 0, "result_data": {} })
                        } else if state.empty_devicelist.load(Ordering::SeqCst) {
                            json!({ "result_code": 1, "result_data": { "list": [] } })
                        } else {
                            json!({
                                "result_code": 1,
                                "result_data": { "list": [{
                                    "dev_id": DEV_ID,
                                    "dev_type": DEV_TYPE,
                                    "dev_code": DEV_CODE,
                                    "dev_name": "SG5.0RS",
                                }]},
                            })
                        }
                    }
                    _ => json!({ "result_code": 0, "result_data": {} }),
                };
                if ws.send(Message::Text(response.to_string())).await.is_err() {
                    break;
                }
            }
        });
    }
}

async fn serve_http(listener: TcpListener, state: Arc<MockState>) {
    while let Ok((stream, _)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let _ = handle_http_connection(stream, state).await;
        });
    }
}

/// Serves one keep-alive HTTP connection; reqwest pools and reuses it
/// across reads.
async fn handle_http_connection(stream: TcpStream, state: Arc<MockState>) -> anyhow::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    loop {
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await? == 0 {
            return Ok(());
        }
        if request_line.trim().is_empty() {
            continue;
        }
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).await? == 0 {
                return Ok(());
            }
            if header.trim().is_empty() {
                break;
            }
        }

        state.http_calls.fetch_add(1, Ordering::SeqCst);
        let query = parse_query(&request_line);
        state.queries.lock().unwrap().push(query.clone());

        if take_one(&state.fail_http) {
            write_response(&mut write_half, "503 Service Unavailable", "device busy").await?;
            continue;
        }

        let result_code = *state.http_result_code.lock().unwrap();
        let body = if result_code == 1 {
            let param_value = state
                .fixed_param_value
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| generated_param_value(&query));
            json!({ "result_code": 1, "result_data": { "param_value": param_value } })
        } else {
            json!({ "result_code": result_code, "result_data": {} })
        };
        write_response(&mut write_half, "200 OK", &body.to_string()).await?;
    }
}

/// One word per requested register: register `i` holds `i + 1`.
fn generated_param_value(query: &HashMap<String, String>) -> String {
    let count: usize = query
        .get("param_num")
        .and_then(|num| num.parse().ok())
        .unwrap_or(0);
    (0..count)
        .map(|index| {
            let word = (index + 1) as u16;
            format!("{:02x} {:02x}", word >> 8, word & 0xFF)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_query(request_line: &str) -> HashMap<String, String> {
    let target = request_line.split_whitespace().nth(1).unwrap_or_default();
    let query = target.split_once('?').map(|(_, query)| query).unwrap_or_default();
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

async fn write_response(
    write_half: &mut tokio::net::tcp::OwnedWriteHalf,
    status: &str,
    body: &str,
) -> anyhow::Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: keep-alive\r\n\r\n{body}",
        body.len()
    );
    write_half.write_all(response.as_bytes()).await?;
    Ok(())
}
