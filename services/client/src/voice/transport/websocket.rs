//! Voice transport over the provider's WebSocket call API.
//!
//! A call is created over HTTP, then its socket is pumped by a spawned task
//! that turns JSON control frames into [`TransportEvent`]s. Audio frames are
//! not handled here.

use crate::voice::protocol::{TransportEvent, decode_frame};
use crate::voice::transport::VoiceTransport;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message as WsMessage,
};
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedCall {
    #[serde(default)]
    id: Option<String>,
    transport: CallTransport,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallTransport {
    websocket_call_url: String,
}

/// How long a hung-up call gets to send its close frame before the pump is aborted.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// The task pumping one call's socket.
struct Pump {
    task: JoinHandle<()>,
    /// Dropping this asks the pump to close the socket and exit.
    hangup: oneshot::Sender<()>,
}

impl Pump {
    /// Signals the pump and gives it `CLOSE_GRACE` to finish. Outside a
    /// runtime there is nothing to wait on, so the task is aborted.
    fn wind_down(self) {
        let Pump { mut task, hangup } = self;
        drop(hangup);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
                        warn!("Call socket did not close in time; aborting pump");
                        task.abort();
                    }
                });
            }
            Err(_) => task.abort(),
        }
    }
}

pub struct WebSocketTransport {
    client: reqwest::Client,
    api_url: String,
    pump: Mutex<Option<Pump>>,
}

impl WebSocketTransport {
    pub fn new(api_url: &Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.as_str().trim_end_matches('/').to_string(),
            pump: Mutex::new(None),
        }
    }

    async fn create_call(&self, public_key: &str, assistant: &serde_json::Value) -> Result<CreatedCall> {
        let body = json!({
            "assistant": assistant,
            "transport": {
                "provider": "vapi.websocket",
                "audioFormat": {
                    "format": "pcm_s16le",
                    "container": "raw",
                    "sampleRate": 16000
                }
            }
        });
        let response = self
            .client
            .post(format!("{}/call", self.api_url))
            .bearer_auth(public_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach the voice provider")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("voice provider rejected the call ({status}): {detail}");
        }
        response
            .json::<CreatedCall>()
            .await
            .context("Voice provider returned an unexpected call payload")
    }

    fn replace_pump(&self, pump: Option<Pump>) {
        let previous = std::mem::replace(
            &mut *self.pump.lock().unwrap_or_else(PoisonError::into_inner),
            pump,
        );
        if let Some(previous) = previous {
            previous.wind_down();
        }
    }
}

#[async_trait]
impl VoiceTransport for WebSocketTransport {
    async fn start(
        &self,
        public_key: &str,
        assistant: &serde_json::Value,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<()> {
        let call = self.create_call(public_key, assistant).await?;
        let (stream, _) = connect_async(call.transport.websocket_call_url.as_str())
            .await
            .context("Failed to connect to the call socket")?;
        info!(call_id = ?call.id, "Connected to voice call socket");
        // The provider may never send an in-progress status; a live socket is enough.
        let _ = events.send(TransportEvent::CallStart);

        let span = info_span!("voice_call", call_id = call.id.as_deref().unwrap_or("unknown"));
        let (hangup, hangup_rx) = oneshot::channel();
        let task = tokio::spawn(pump(stream, events, hangup_rx).instrument(span));
        self.replace_pump(Some(Pump { task, hangup }));
        Ok(())
    }

    fn stop(&self) {
        self.replace_pump(None);
    }
}

/// Forwards control frames until the socket closes, the transport is
/// stopped, or the channel stops listening.
async fn pump(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut hangup: oneshot::Receiver<()>,
) {
    let (mut socket_tx, mut socket_rx) = stream.split();
    loop {
        tokio::select! {
            biased;
            _ = &mut hangup => {
                debug!("Transport stopped; closing call socket");
                close(&mut socket_tx).await;
                break;
            }
            _ = events.closed() => {
                debug!("Voice channel hung up; closing call socket");
                close(&mut socket_tx).await;
                break;
            }
            frame = socket_rx.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => match decode_frame(&text) {
                    Ok(Some(event)) => {
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => debug!(error = %e, "Ignoring unrecognised control frame"),
                },
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!("Call socket closed");
                    let _ = events.send(TransportEvent::CallEnd);
                    break;
                }
                // Audio and keep-alives.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "Call socket failed");
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    let _ = events.send(TransportEvent::CallEnd);
                    break;
                }
            }
        }
    }
}

type SocketSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

async fn close(socket_tx: &mut SocketSink) {
    match tokio::time::timeout(CLOSE_GRACE, socket_tx.send(WsMessage::Close(None))).await {
        Ok(Ok(())) => debug!("Sent close frame"),
        Ok(Err(_)) => debug!("Call socket already gone"),
        Err(_) => debug!("Timed out sending close frame"),
    }
}
