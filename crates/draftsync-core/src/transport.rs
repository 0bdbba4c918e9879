// WebSocket transport adapter: connects to the draft server, forwards text
// frames to the session, writes outbound intents, and reconnects with backoff.

use std::time::Duration;

use anyhow::Context;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::protocol::ClientIntent;

/// Signals emitted by the transport to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// First successful connection.
    Connected { url: String },
    /// The connection dropped.
    Disconnected,
    /// A connection was re-established after a drop.
    Reconnected { url: String },
    /// A text frame from the server (raw JSON).
    Message(String),
}

/// Anything that can accept outbound intents without blocking.
pub trait IntentSink {
    fn send_intent(&self, intent: ClientIntent) -> Result<(), TransportError>;
}

impl IntentSink for mpsc::Sender<ClientIntent> {
    fn send_intent(&self, intent: ClientIntent) -> Result<(), TransportError> {
        self.try_send(intent).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Full,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}

impl IntentSink for mpsc::UnboundedSender<ClientIntent> {
    fn send_intent(&self, intent: ClientIntent) -> Result<(), TransportError> {
        self.send(intent).map_err(|_| TransportError::Closed)
    }
}

/// Exponential backoff between connection attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Consecutive failures tolerated; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based), doubling up to the cap.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

/// Build the per-user session URL: `{base}/{room_id}/{user_name}`.
pub fn session_url(base: &str, room_id: &str, user_name: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        encode_path_segment(room_id),
        encode_path_segment(user_name)
    )
}

fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Why a single connection's pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The server closed or the socket failed; reconnect.
    ConnectionClosed,
    /// The session stopped listening; shut down.
    SessionGone,
}

/// Drive one connection: forward text frames from `read` as
/// [`TransportSignal::Message`] and write intents from `intents` to `write`.
///
/// Generic over the stream and sink so it can be exercised with in-memory
/// streams.
pub async fn pump<St, Si>(
    mut read: St,
    mut write: Si,
    signals: &mpsc::Sender<TransportSignal>,
    intents: &mut mpsc::Receiver<ClientIntent>,
) -> PumpExit
where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
    Si: Sink<Message, Error = WsError> + Unpin,
{
    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if signals.send(TransportSignal::Message(text.as_str().to_owned())).await.is_err() {
                        return PumpExit::SessionGone;
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Server sent close frame");
                    return PumpExit::ConnectionClosed;
                }
                Some(Err(e)) => {
                    warn!("WebSocket read error: {e}");
                    return PumpExit::ConnectionClosed;
                }
                None => return PumpExit::ConnectionClosed,
                Some(Ok(_)) => {
                    // Ignore Binary, Ping, Pong, Frame variants.
                }
            },

            intent = intents.recv() => match intent {
                Some(intent) => {
                    let json = match intent.to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("Failed to encode intent {:?}: {e}", intent);
                            continue;
                        }
                    };
                    debug!("Sending intent: {json}");
                    if let Err(e) = write.send(Message::Text(json.into())).await {
                        warn!("WebSocket write error: {e}");
                        return PumpExit::ConnectionClosed;
                    }
                }
                None => return PumpExit::SessionGone,
            },
        }
    }
}

/// Connect to `url` and keep the connection alive, reconnecting with
/// backoff, until the session drops its end of either channel.
///
/// Emits `Connected` on the first connection, `Disconnected` whenever one
/// drops, and `Reconnected` for every later connection.
pub async fn run(
    url: String,
    policy: ReconnectPolicy,
    signals: mpsc::Sender<TransportSignal>,
    mut intents: mpsc::Receiver<ClientIntent>,
) -> anyhow::Result<()> {
    let mut ever_connected = false;
    let mut failures: u32 = 0;

    loop {
        match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((ws, _response)) => {
                failures = 0;
                info!("Connected to {url}");
                let signal = if ever_connected {
                    TransportSignal::Reconnected { url: url.clone() }
                } else {
                    TransportSignal::Connected { url: url.clone() }
                };
                ever_connected = true;
                if signals.send(signal).await.is_err() {
                    return Ok(());
                }

                let (write, read) = ws.split();
                match pump(read, write, &signals, &mut intents).await {
                    PumpExit::SessionGone => {
                        info!("Session closed; stopping transport");
                        return Ok(());
                    }
                    PumpExit::ConnectionClosed => {
                        if signals.send(TransportSignal::Disconnected).await.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
            Err(e) => {
                failures += 1;
                warn!("Connection attempt {failures} to {url} failed: {e}");
                if policy.exhausted(failures) {
                    return Err(TransportError::from(e))
                        .with_context(|| format!("giving up on {url} after {failures} attempts"));
                }
            }
        }

        let delay = policy.backoff(failures.max(1));
        debug!("Reconnecting in {delay:?}");
        tokio::time::sleep(delay).await;
    }
}
