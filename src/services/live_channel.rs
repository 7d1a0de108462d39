use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::RadarConfig;
use crate::error::{RadarError, RadarResult};
use crate::models::{Developer, SessionParams};
use crate::services::socket_io::{self, Packet};

/// Event name the server pushes newly matching developers on.
pub const NEW_DEV_EVENT: &str = "new-dev";

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChannelStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// Retries exhausted; live updates stop until the session is resumed.
    Paused,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    NewDeveloper(Developer),
    Status(ChannelStatus),
}

/// Invoked on the channel worker. Must not call back into the channel.
pub type EventHandler = Arc<dyn Fn(ChannelEvent) + Send + Sync>;

#[async_trait]
pub trait LiveChannel: Send {
    /// No-op while a session is already active.
    async fn connect(&mut self, params: &SessionParams) -> RadarResult<()>;
    /// No-op when nothing is active. Nothing is dispatched once this returns.
    async fn disconnect(&mut self);
    /// Installs the single handler, replacing any previous one.
    fn subscribe(&mut self, handler: EventHandler);
    fn is_active(&self) -> bool;
}

#[async_trait]
impl<T: LiveChannel + ?Sized> LiveChannel for Box<T> {
    async fn connect(&mut self, params: &SessionParams) -> RadarResult<()> {
        (**self).connect(params).await
    }

    async fn disconnect(&mut self) {
        (**self).disconnect().await
    }

    fn subscribe(&mut self, handler: EventHandler) {
        (**self).subscribe(handler)
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &RadarConfig) -> Self {
        Self {
            max_attempts: config.reconnect_attempts,
            base_delay: config.reconnect_base,
        }
    }

    /// Delay before retry `attempt` (1-based): base * 2^(attempt-1), capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(MAX_RECONNECT_DELAY)
    }
}

#[derive(Default)]
struct Dispatch {
    generation: u64,
    handler: Option<EventHandler>,
}

fn lock_dispatch(dispatch: &Mutex<Dispatch>) -> MutexGuard<'_, Dispatch> {
    dispatch.lock().unwrap_or_else(|e| e.into_inner())
}

/// Worker-side view of the dispatch slot, pinned to one session generation.
#[derive(Clone)]
struct Dispatcher {
    dispatch: Arc<Mutex<Dispatch>>,
    generation: u64,
}

impl Dispatcher {
    /// Returns false once the session was superseded; the worker should stop.
    fn emit(&self, event: ChannelEvent) -> bool {
        let slot = lock_dispatch(&self.dispatch);
        if slot.generation != self.generation {
            return false;
        }
        if let Some(handler) = slot.handler.as_ref() {
            handler(event);
        }
        true
    }
}

/// Socket.IO session over WebSocket, owned by one discovery session.
pub struct SocketIoChannel {
    base_url: Url,
    policy: ReconnectPolicy,
    dispatch: Arc<Mutex<Dispatch>>,
    worker: Option<JoinHandle<()>>,
}

impl SocketIoChannel {
    pub fn new(config: &RadarConfig) -> Self {
        Self::with_policy(config.api_url.clone(), ReconnectPolicy::from_config(config))
    }

    pub fn with_policy(base_url: Url, policy: ReconnectPolicy) -> Self {
        Self {
            base_url,
            policy,
            dispatch: Arc::new(Mutex::new(Dispatch::default())),
            worker: None,
        }
    }
}

/// Handshake URL: `<base>/socket.io/?EIO=4&transport=websocket&latitude=..&longitude=..&techs=..`.
pub fn handshake_url(base: &Url, params: &SessionParams) -> RadarResult<Url> {
    let mut url = base
        .join("socket.io/")
        .map_err(|e| RadarError::Config(format!("channel url: {}", e)))?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(RadarError::Config(format!(
                "unsupported channel scheme {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| RadarError::Config(format!("cannot switch {} to {}", base, scheme)))?;
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.append_pair("EIO", socket_io::ENGINE_IO_VERSION);
        query.append_pair("transport", "websocket");
        for (key, value) in params.query_pairs() {
            query.append_pair(key, &value);
        }
    }
    Ok(url)
}

#[async_trait]
impl LiveChannel for SocketIoChannel {
    async fn connect(&mut self, params: &SessionParams) -> RadarResult<()> {
        if self.is_active() {
            debug!("🛰️ Live channel already active, ignoring connect");
            return Ok(());
        }

        let url = handshake_url(&self.base_url, params)?;
        let generation = {
            let mut slot = lock_dispatch(&self.dispatch);
            slot.generation += 1;
            slot.generation
        };
        let dispatcher = Dispatcher {
            dispatch: Arc::clone(&self.dispatch),
            generation,
        };

        info!(
            latitude = params.latitude,
            longitude = params.longitude,
            techs = %params.techs,
            "🛰️ Opening live channel"
        );
        self.worker = Some(tokio::spawn(run_session(url, self.policy, dispatcher)));
        Ok(())
    }

    async fn disconnect(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        lock_dispatch(&self.dispatch).generation += 1;
        worker.abort();
        // aborted or finished; either way the socket is gone after this
        let _ = worker.await;
        info!("🛰️ Live channel closed");
    }

    fn subscribe(&mut self, handler: EventHandler) {
        lock_dispatch(&self.dispatch).handler = Some(handler);
    }

    fn is_active(&self) -> bool {
        self.worker
            .as_ref()
            .map(|w| !w.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for SocketIoChannel {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            lock_dispatch(&self.dispatch).generation += 1;
            worker.abort();
        }
    }
}

enum SessionEnd {
    Superseded,
    Dropped { established: bool, reason: String },
}

async fn run_session(url: Url, policy: ReconnectPolicy, dispatcher: Dispatcher) {
    if !dispatcher.emit(ChannelEvent::Status(ChannelStatus::Connecting)) {
        return;
    }

    let mut attempt: u32 = 0;
    loop {
        let (established, reason) = match run_connection(&url, &dispatcher).await {
            SessionEnd::Superseded => return,
            SessionEnd::Dropped {
                established,
                reason,
            } => (established, reason),
        };

        if established {
            attempt = 0;
        }
        attempt += 1;
        warn!(attempt, reason = %reason, "🛰️ Live channel dropped");

        if attempt > policy.max_attempts {
            warn!("🛰️ Live channel paused after {} attempts", policy.max_attempts);
            dispatcher.emit(ChannelEvent::Status(ChannelStatus::Paused));
            return;
        }
        if !dispatcher.emit(ChannelEvent::Status(ChannelStatus::Reconnecting { attempt })) {
            return;
        }
        tokio::time::sleep(policy.delay(attempt)).await;
    }
}

async fn run_connection(url: &Url, dispatcher: &Dispatcher) -> SessionEnd {
    let (mut ws, _response) = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok(pair) => pair,
        Err(e) => {
            return SessionEnd::Dropped {
                established: false,
                reason: e.to_string(),
            }
        }
    };

    let mut established = false;
    let mut idle_limit: Option<Duration> = None;
    let dropped = |established: bool, reason: String| SessionEnd::Dropped {
        established,
        reason,
    };

    loop {
        let next = match idle_limit {
            Some(limit) => match tokio::time::timeout(limit, ws.next()).await {
                Ok(next) => next,
                Err(_) => return dropped(established, "heartbeat timeout".to_string()),
            },
            None => ws.next().await,
        };

        let frame = match next {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Ping(data))) => {
                let _ = ws.send(Message::Pong(data)).await;
                continue;
            }
            Some(Ok(Message::Close(_))) => {
                return dropped(established, "closed by server".to_string())
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return dropped(established, e.to_string()),
            None => return dropped(established, "stream ended".to_string()),
        };

        let packet = match socket_io::decode(&frame) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("🛰️ Dropping malformed frame: {}", e);
                continue;
            }
        };

        match packet {
            Packet::Open(open) => {
                debug!(sid = %open.sid, "🛰️ Engine.IO session opened");
                if open.ping_interval > 0 {
                    idle_limit = Some(Duration::from_millis(
                        open.ping_interval + open.ping_timeout,
                    ));
                }
                if let Err(e) = ws.send(Message::Text(socket_io::CONNECT.to_string())).await {
                    return dropped(established, e.to_string());
                }
            }
            Packet::Ping => {
                if let Err(e) = ws.send(Message::Text(socket_io::PONG.to_string())).await {
                    return dropped(established, e.to_string());
                }
            }
            Packet::Connected => {
                established = true;
                if !dispatcher.emit(ChannelEvent::Status(ChannelStatus::Connected)) {
                    let _ = ws.close(None).await;
                    return SessionEnd::Superseded;
                }
            }
            Packet::Event { name, args } if name == NEW_DEV_EVENT => {
                let Some(payload) = args.into_iter().next() else {
                    warn!("🛰️ new-dev event without payload");
                    continue;
                };
                match Developer::from_json(payload) {
                    Ok(dev) => {
                        debug!(id = %dev.id, "🛰️ new-dev received");
                        if !dispatcher.emit(ChannelEvent::NewDeveloper(dev)) {
                            let _ = ws.close(None).await;
                            return SessionEnd::Superseded;
                        }
                    }
                    Err(e) => warn!("🛰️ Dropping new-dev payload: {}", e),
                }
            }
            Packet::Event { name, .. } => debug!(event = %name, "🛰️ Ignoring event"),
            Packet::Close | Packet::Disconnected => {
                return dropped(established, "session closed by server".to_string())
            }
            Packet::ConnectError(detail) => {
                return dropped(established, format!("connect error: {}", detail))
            }
            Packet::Pong | Packet::Other(_) => {}
        }
    }
}
