use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::api::ChatRequest;
use crate::core::exchange::{Exchange, ExchangeError, ExchangeResponse};

#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    content_type: &'static str,
    body: String,
    delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn event_stream(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

/// Minimal HTTP/1.1 server that replays queued responses in request order.
pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub async fn start(responses: Vec<MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("local addr should resolve");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));

        let requests_for_server = Arc::clone(&requests);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let requests = Arc::clone(&requests_for_server);
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    let _ = serve_connection(stream, requests, queue).await;
                });
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub async fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().await.clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    queue: Arc<Mutex<VecDeque<MockResponse>>>,
) -> Result<(), String> {
    let captured = read_http_request(&mut stream).await?;
    let response = {
        // Record and dequeue under one lock so arrival order decides the reply.
        let mut requests = requests.lock().await;
        requests.push(captured);
        queue.lock().await.pop_front()
    }
    .unwrap_or_else(|| MockResponse::text(500, "mock server has no more responses"));

    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }

    let reason = if response.status < 400 { "OK" } else { "Error" };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        reason,
        response.content_type,
        response.body.len()
    );
    stream
        .write_all(head.as_bytes())
        .await
        .map_err(|err| err.to_string())?;
    stream
        .write_all(response.body.as_bytes())
        .await
        .map_err(|err| err.to_string())?;
    stream.shutdown().await.map_err(|err| err.to_string())
}

async fn read_http_request(stream: &mut TcpStream) -> Result<CapturedRequest, String> {
    let mut buffer = Vec::new();
    let mut header_end = None;
    while header_end.is_none() {
        let mut chunk = [0_u8; 1024];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        header_end = buffer
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|index| index + 4);
    }

    let header_end = header_end.expect("header end should exist");
    let header_text =
        std::str::from_utf8(&buffer[..header_end]).map_err(|err| err.to_string())?;
    let mut lines = header_text.split("\r\n").filter(|line| !line.is_empty());
    let request_line = lines
        .next()
        .ok_or_else(|| "Missing HTTP request line".to_string())?
        .to_string();

    let mut headers = Vec::new();
    let mut content_length = 0_usize;
    for line in lines {
        let mut parts = line.splitn(2, ':');
        let Some(name) = parts.next() else {
            continue;
        };
        let value = parts.next().unwrap_or_default().trim().to_string();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().map_err(|err| err.to_string())?;
        }
        headers.push((name.to_string(), value));
    }

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0_u8; content_length - body.len()];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }

    Ok(CapturedRequest {
        request_line,
        headers,
        body,
    })
}

pub type ScriptedReply = Result<ExchangeResponse, ExchangeError>;

/// [`Exchange`] double that answers from a per-model script and records requests.
#[derive(Default)]
pub struct ScriptedExchange {
    scripts: StdMutex<HashMap<String, VecDeque<ScriptedReply>>>,
    requests: StdMutex<Vec<ChatRequest>>,
}

impl ScriptedExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(self, model: &str, replies: Vec<ScriptedReply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(model.to_string(), VecDeque::from(replies));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Exchange for ScriptedExchange {
    async fn exchange(&self, request: &ChatRequest) -> Result<ExchangeResponse, ExchangeError> {
        self.requests.lock().unwrap().push(request.clone());
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&request.model)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(ExchangeError::Status {
                    status: 500,
                    body: format!("no scripted reply left for {}", request.model),
                })
            })
    }
}

pub fn completion(body: Value) -> ScriptedReply {
    Ok(ExchangeResponse::Completion(body))
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> Value {
    json!({
        "id": id,
        "type": "function",
        "function": {"name": name, "arguments": arguments}
    })
}

pub fn tool_calls_reply(calls: Vec<Value>) -> ScriptedReply {
    completion(json!({
        "choices": [{
            "message": {"role": "assistant", "content": null, "tool_calls": calls},
            "finish_reason": "tool_calls"
        }]
    }))
}

pub fn content_reply(content: &str) -> ScriptedReply {
    completion(json!({
        "choices": [{
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
}

pub fn status_error(status: u16, body: &str) -> ScriptedReply {
    Err(ExchangeError::Status {
        status,
        body: body.to_string(),
    })
}

/// Replies that pass every probe in the full suite, in execution order.
pub fn passing_suite() -> Vec<ScriptedReply> {
    vec![
        tool_calls_reply(vec![tool_call("call_1", "get_weather", r#"{"city":"Tokyo"}"#)]),
        tool_calls_reply(vec![tool_call("call_2", "get_weather", r#"{"city":"Tokyo"}"#)]),
        content_reply("It is 22°C and partly cloudy in Tokyo."),
        tool_calls_reply(vec![
            tool_call("call_3", "get_weather", r#"{"city":"Tokyo"}"#),
            tool_call("call_4", "calculate", r#"{"expression":"15 + 27"}"#),
        ]),
        content_reply(r#"{"name": "Ada", "age": 36, "city": "London"}"#),
        Ok(ExchangeResponse::Stream(vec![json!({
            "choices": [{"delta": {"tool_calls": [{"index": 0, "id": "call_5", "function": {"name": "get_weather"}}]}}]
        })])),
    ]
}
