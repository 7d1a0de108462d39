#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use devradar::models::{Developer, SessionParams};
use devradar::services::live_channel::{
    ChannelEvent, ChannelStatus, EventHandler, LiveChannel, NEW_DEV_EVENT,
};
use devradar::services::search_service::DiscoveryApi;
use devradar::RadarResult;

pub fn developer_json(id: &str, bio: &str, techs: &[&str], lat: f64, lon: f64) -> Value {
    json!({
        "_id": id,
        "name": id.to_uppercase(),
        "bio": bio,
        "techs": techs,
        "location": { "type": "Point", "coordinates": [lon, lat] },
        "avatar_url": format!("https://avatars.example/{}.png", id),
        "github_username": id
    })
}

pub fn developer(id: &str, bio: &str) -> Developer {
    Developer::from_json(developer_json(id, bio, &["go"], 10.0, 20.0)).unwrap()
}

/// Polls `check` until it holds or five seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// --- scripted discovery api -------------------------------------------------

pub struct ScriptedApi {
    responses: Mutex<VecDeque<RadarResult<Vec<Developer>>>>,
    queries: Arc<Mutex<Vec<SessionParams>>>,
}

impl ScriptedApi {
    pub fn new(responses: Vec<RadarResult<Vec<Developer>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn queries(&self) -> Arc<Mutex<Vec<SessionParams>>> {
        Arc::clone(&self.queries)
    }
}

#[async_trait]
impl DiscoveryApi for ScriptedApi {
    async fn search(&self, params: &SessionParams) -> RadarResult<Vec<Developer>> {
        self.queries.lock().unwrap().push(params.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

// --- recording live channel -------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCall {
    Connect(SessionParams),
    Disconnect,
}

/// Test-side handle on a `RecordingChannel` moved into a session.
#[derive(Clone, Default)]
pub struct ChannelProbe {
    calls: Arc<Mutex<Vec<ChannelCall>>>,
    handler: Arc<Mutex<Option<EventHandler>>>,
    subscriptions: Arc<AtomicUsize>,
    active: Arc<AtomicBool>,
}

impl ChannelProbe {
    pub fn calls(&self) -> Vec<ChannelCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Delivers an event the way the real channel does: only while active.
    pub fn push(&self, event: ChannelEvent) -> bool {
        if !self.is_active() {
            return false;
        }
        let handler = self.handler.lock().unwrap().clone();
        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }

    pub fn push_developer(&self, dev: Developer) -> bool {
        self.push(ChannelEvent::NewDeveloper(dev))
    }

    /// Simulates retries running out on the transport.
    pub fn pause(&self) {
        self.push(ChannelEvent::Status(ChannelStatus::Paused));
        self.active.store(false, Ordering::SeqCst);
    }
}

pub struct RecordingChannel {
    probe: ChannelProbe,
}

impl RecordingChannel {
    pub fn new() -> (Self, ChannelProbe) {
        let probe = ChannelProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

#[async_trait]
impl LiveChannel for RecordingChannel {
    async fn connect(&mut self, params: &SessionParams) -> RadarResult<()> {
        if self.probe.is_active() {
            return Ok(());
        }
        self.probe
            .calls
            .lock()
            .unwrap()
            .push(ChannelCall::Connect(params.clone()));
        self.probe.active.store(true, Ordering::SeqCst);
        self.probe.push(ChannelEvent::Status(ChannelStatus::Connected));
        Ok(())
    }

    async fn disconnect(&mut self) {
        if !self.probe.is_active() {
            return;
        }
        self.probe.active.store(false, Ordering::SeqCst);
        self.probe.calls.lock().unwrap().push(ChannelCall::Disconnect);
    }

    fn subscribe(&mut self, handler: EventHandler) {
        self.probe.subscriptions.fetch_add(1, Ordering::SeqCst);
        *self.probe.handler.lock().unwrap() = Some(handler);
    }

    fn is_active(&self) -> bool {
        self.probe.is_active()
    }
}

// --- fake socket.io server --------------------------------------------------

#[derive(Debug, Clone)]
enum Command {
    Frame(String),
    CloseAll,
}

/// Minimal Engine.IO v4 websocket endpoint: open, namespace connect, then
/// whatever frames the test pushes.
pub struct FakeSocketServer {
    pub base_url: Url,
    handshakes: Arc<Mutex<Vec<String>>>,
    connected: Arc<AtomicUsize>,
    commands: broadcast::Sender<Command>,
}

impl FakeSocketServer {
    pub async fn start() -> Self {
        Self::start_with_heartbeat(25_000, 20_000).await
    }

    /// The server advertises these heartbeat timings but never pings.
    pub async fn start_with_heartbeat(ping_interval_ms: u64, ping_timeout_ms: u64) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handshakes = Arc::new(Mutex::new(Vec::new()));
        let connected = Arc::new(AtomicUsize::new(0));
        let (commands, _) = broadcast::channel(64);

        let server = Self {
            base_url: Url::parse(&format!("http://{}", addr)).unwrap(),
            handshakes: Arc::clone(&handshakes),
            connected: Arc::clone(&connected),
            commands: commands.clone(),
        };

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handshakes = Arc::clone(&handshakes);
                let connected = Arc::clone(&connected);
                let mut rx = commands.subscribe();
                tokio::spawn(async move {
                    let record = Arc::clone(&handshakes);
                    let callback =
                        move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                            record.lock().unwrap().push(req.uri().to_string());
                            Ok(resp)
                        };
                    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await
                    else {
                        return;
                    };
                    let open = json!({
                        "sid": "fake",
                        "upgrades": [],
                        "pingInterval": ping_interval_ms,
                        "pingTimeout": ping_timeout_ms,
                        "maxPayload": 1_000_000,
                    });
                    if ws.send(Message::Text(format!("0{}", open))).await.is_err() {
                        return;
                    }
                    // wait for the namespace connect
                    loop {
                        match ws.next().await {
                            Some(Ok(Message::Text(text))) if text == "40" => break,
                            Some(Ok(_)) => continue,
                            _ => return,
                        }
                    }
                    if ws
                        .send(Message::Text(r#"40{"sid":"ns-fake"}"#.to_string()))
                        .await
                        .is_err()
                    {
                        return;
                    }
                    connected.fetch_add(1, Ordering::SeqCst);

                    loop {
                        tokio::select! {
                            cmd = rx.recv() => match cmd {
                                Ok(Command::Frame(frame)) => {
                                    if ws.send(Message::Text(frame)).await.is_err() {
                                        return;
                                    }
                                }
                                Ok(Command::CloseAll) | Err(_) => {
                                    let _ = ws.close(None).await;
                                    return;
                                }
                            },
                            incoming = ws.next() => match incoming {
                                Some(Ok(_)) => {}
                                _ => return,
                            },
                        }
                    }
                });
            }
        });

        server
    }

    pub fn handshakes(&self) -> Vec<String> {
        self.handshakes.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn push_frame(&self, frame: impl Into<String>) {
        let _ = self.commands.send(Command::Frame(frame.into()));
    }

    pub fn push_new_dev(&self, payload: Value) {
        self.push_frame(event_frame(NEW_DEV_EVENT, &[payload]));
    }

    pub fn close_all(&self) {
        let _ = self.commands.send(Command::CloseAll);
    }
}

/// Socket.IO event frame on the default namespace: `42["name",...args]`.
pub fn event_frame(name: &str, args: &[Value]) -> String {
    let mut items = Vec::with_capacity(args.len() + 1);
    items.push(Value::String(name.to_string()));
    items.extend(args.iter().cloned());
    format!("42{}", Value::Array(items))
}

/// A base URL nothing listens on.
pub async fn unreachable_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{}", addr)).unwrap()
}
