//! WebSocket Provider Base (§4.G) — the connect/heartbeat/reconnect state
//! machine shared by every streaming feed, with four template-method hooks
//! an individual provider fills in.
//!
//! Grounded on the teacher's `chronicle-feed-binance` adapter
//! (`crates/chronicle-feed-binance/src/binance.rs`): a `tokio-tungstenite`
//! read loop behind `tokio::select!`-style polling, reconnect-on-error with
//! a sleep, a bounded channel so parsing never blocks the socket read.
//! Generalized here into a reusable base instead of one feed's `run`.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::clock::Clock;
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::model::Subscription;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// §4.G state machine: `Disconnected → Connecting → Connected →
/// (Streaming|Reconnecting|RateLimited|Error) → Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Streaming,
    Reconnecting,
    RateLimited,
    Error,
}

/// Four hooks a concrete feed fills in; everything else (lifecycle,
/// heartbeat, reconnect backoff) is common (§4.G).
#[async_trait]
pub trait ProviderTemplate: Send + Sync {
    fn build_uri(&self) -> Result<url::Url>;

    async fn configure_socket(&self, _socket: &mut WsStream) -> Result<()> {
        Ok(())
    }

    async fn authenticate(&self, _socket: &mut WsStream) -> Result<()> {
        Ok(())
    }

    /// Parses `message` and routes it to collectors via the bus. Runs on
    /// the dispatcher task, never on the socket task (§5).
    async fn handle_message(&self, message: Message);

    async fn resubscribe(&self, socket: &mut WsStream, subscriptions: &[Subscription]) -> Result<()>;
}

/// `delay = min(base·2^attempt, max) · (1 ± 20% jitter)` (§4.G Reconnect).
/// `jitter_unit` is in `[-1.0, 1.0]`; callers pass a fresh random draw.
pub fn reconnect_delay(attempt: u32, base: Duration, max: Duration, jitter_unit: f64) -> Duration {
    let scaled = base.as_secs_f64() * 2f64.powi(attempt as i32);
    let capped = scaled.min(max.as_secs_f64());
    let jitter = 1.0 + (jitter_unit.clamp(-1.0, 1.0) * 0.20);
    Duration::from_secs_f64((capped * jitter).max(0.0))
}

pub struct WebSocketProvider<T: ProviderTemplate + 'static> {
    config: ProviderConfig,
    clock: Arc<dyn Clock>,
    template: Arc<T>,
    state: RwLock<ConnectionState>,
    last_activity_ns: AtomicU64,
    reconnect_attempt: AtomicU32,
    stop: AtomicBool,
    subscriptions: RwLock<Vec<Subscription>>,
}

impl<T: ProviderTemplate + 'static> WebSocketProvider<T> {
    pub fn new(config: ProviderConfig, clock: Arc<dyn Clock>, template: Arc<T>) -> Self {
        Self {
            config,
            clock,
            template,
            state: RwLock::new(ConnectionState::Disconnected),
            last_activity_ns: AtomicU64::new(0),
            reconnect_attempt: AtomicU32::new(0),
            stop: AtomicBool::new(false),
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn set_state(&self, next: ConnectionState) {
        log::info!("provider state transition -> {next:?}");
        *self.state.write() = next;
    }

    fn record_activity(&self) {
        self.last_activity_ns.store(self.clock.now_ns(), Ordering::Relaxed);
    }

    /// §4.G heartbeat monitor: `now - lastActivity > heartbeatInterval +
    /// heartbeatTimeout` while Connected/Streaming.
    pub fn heartbeat_expired(&self) -> bool {
        let state = self.state();
        if state != ConnectionState::Connected && state != ConnectionState::Streaming {
            return false;
        }
        let last = self.last_activity_ns.load(Ordering::Relaxed);
        let now = self.clock.now_ns();
        let elapsed = Duration::from_nanos(now.saturating_sub(last));
        elapsed > self.config.heartbeat_interval + self.config.heartbeat_timeout
    }

    /// Replaces the saved subscription set consulted by `resubscribe`.
    pub fn set_subscriptions(&self, subs: Vec<Subscription>) {
        *self.subscriptions.write() = subs;
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    async fn connect_once(&self) -> Result<WsStream> {
        self.set_state(ConnectionState::Connecting);
        let uri = self.template.build_uri()?;
        let attempt = async {
            let (mut socket, _response) = connect_async(uri.as_str())
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;
            self.template.configure_socket(&mut socket).await?;
            self.template.authenticate(&mut socket).await?;
            Ok::<_, Error>(socket)
        };
        let socket = tokio::time::timeout(self.config.connect_timeout, attempt)
            .await
            .map_err(|_| Error::Timeout(self.config.connect_timeout))??;
        self.set_state(ConnectionState::Connected);
        self.record_activity();
        Ok(socket)
    }

    /// Sleeps the attempt's backoff delay; returns `false` once
    /// `max_reconnect_attempts` has been exceeded (caller transitions to
    /// `Error`).
    async fn backoff_and_retry(&self) -> bool {
        let attempt = self.reconnect_attempt.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.config.max_reconnect_attempts {
            return false;
        }
        let jitter_unit = rand::random::<f64>() * 2.0 - 1.0;
        let delay = reconnect_delay(
            attempt,
            self.config.retry_base_delay,
            self.config.max_retry_delay,
            jitter_unit,
        );
        tokio::time::sleep(delay).await;
        true
    }

    /// Drives the full lifecycle until `request_stop` is observed or
    /// reconnect attempts are exhausted. Parsed frames flow through a
    /// bounded single-reader channel to a dispatcher task so the socket
    /// read loop is never blocked by collector work (§5).
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<Message>(self.config.message_channel_capacity);
        let dispatch_template = Arc::clone(&self.template);
        let dispatcher = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                dispatch_template.handle_message(message).await;
            }
        });

        'outer: loop {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            let mut socket = match self.connect_once().await {
                Ok(socket) => {
                    self.reconnect_attempt.store(0, Ordering::SeqCst);
                    socket
                }
                Err(e) => {
                    log::warn!("connect failed: {e}");
                    if !self.backoff_and_retry().await {
                        self.set_state(ConnectionState::Error);
                        break;
                    }
                    continue;
                }
            };
            self.set_state(ConnectionState::Streaming);
            if let Err(e) = self
                .template
                .resubscribe(&mut socket, &self.subscriptions.read().clone())
                .await
            {
                log::warn!("resubscribe failed: {e}");
            }

            loop {
                if self.stop.load(Ordering::SeqCst) {
                    if tokio::time::timeout(self.config.disconnect_timeout, futures_util::SinkExt::close(&mut socket))
                        .await
                        .is_err()
                    {
                        log::warn!("disconnect exceeded {:?}, dropping socket", self.config.disconnect_timeout);
                    }
                    self.set_state(ConnectionState::Disconnected);
                    break 'outer;
                }
                if self.heartbeat_expired() {
                    log::warn!("heartbeat expired, reconnecting");
                    break;
                }
                match tokio::time::timeout(self.config.heartbeat_interval, socket.next()).await {
                    Ok(Some(Ok(message))) => {
                        self.record_activity();
                        if tx.send(message).await.is_err() {
                            log::warn!("dispatcher channel closed, dropping message");
                        }
                    }
                    Ok(Some(Err(e))) => {
                        log::warn!("socket error: {e}");
                        break;
                    }
                    Ok(None) => {
                        log::warn!("socket closed by peer");
                        break;
                    }
                    Err(_) => continue,
                }
            }
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            self.set_state(ConnectionState::Reconnecting);
            if !self.backoff_and_retry().await {
                self.set_state(ConnectionState::Error);
                break;
            }
        }
        drop(tx);
        let _ = dispatcher.await;
        Ok(())
    }
}
