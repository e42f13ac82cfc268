// Session Dispatcher
// One WebSocket connection. Frames are handled strictly one at a time, and every
// analyzable text frame ends in exactly one fallacy_detection event, even on failure.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::models::{ClientMessage, DetectionOutcome, ServerEvent};
use crate::services::detection::FallacyDetector;
use crate::services::text_processor::{char_prefix, log_excerpt, trimmed_char_count};

/// Characters of the input echoed back on an error event.
pub const INPUT_ECHO_CHARS: usize = 100;
pub const INVALID_FORMAT_MESSAGE: &str = "invalid message format";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("connection closed: {0}")]
    Closed(#[from] axum::Error),
}

pub struct Session {
    id: Uuid,
    detector: Arc<FallacyDetector>,
}

impl Session {
    pub fn new(detector: Arc<FallacyDetector>) -> Self {
        Self {
            id: Uuid::new_v4(),
            detector,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn greeting(&self) -> ServerEvent {
        ServerEvent::connected()
    }

    /// Replies for one raw frame, in emission order.
    pub async fn handle_frame(&self, frame: &str) -> Vec<ServerEvent> {
        match parse_frame(frame) {
            Some(value) => self.handle_value(value).await,
            None => {
                debug!("[DISPATCH] unparseable frame: {}", log_excerpt(frame, 80));
                vec![ServerEvent::error(INVALID_FORMAT_MESSAGE, None)]
            }
        }
    }

    /// Unknown message kinds are dropped without a reply; a malformed known kind
    /// or a non-object frame gets the invalid-format error.
    pub async fn handle_value(&self, value: Value) -> Vec<ServerEvent> {
        let kind = match value.as_object() {
            Some(fields) => fields.get("type").and_then(Value::as_str).map(str::to_string),
            None => {
                debug!("[DISPATCH] frame is not an object");
                return vec![ServerEvent::error(INVALID_FORMAT_MESSAGE, None)];
            }
        };

        match kind.as_deref() {
            Some("text") | Some("ping") => match serde_json::from_value::<ClientMessage>(value) {
                Ok(ClientMessage::Ping) => vec![ServerEvent::pong()],
                Ok(ClientMessage::Text { text, speaker, .. }) => {
                    self.dispatch_text(&text, speaker).await
                }
                Err(e) => {
                    debug!("[DISPATCH] malformed message: {}", e);
                    vec![ServerEvent::error(INVALID_FORMAT_MESSAGE, None)]
                }
            },
            other => {
                debug!(
                    "[DISPATCH] dropping message type={}",
                    other.unwrap_or("<missing>")
                );
                Vec::new()
            }
        }
    }

    async fn dispatch_text(&self, text: &str, speaker: Option<String>) -> Vec<ServerEvent> {
        let chars = trimmed_char_count(text);
        if !self.detector.is_analyzable(text) {
            debug!(
                "[DISPATCH] skipping short text chars={} min={}",
                chars,
                self.detector.min_text_chars()
            );
            return Vec::new();
        }

        info!(
            "[DISPATCH] analysing chars={} text=\"{}\"",
            chars,
            log_excerpt(text, 60)
        );

        match self.detector.detect(text).await {
            Ok(outcome) => vec![ServerEvent::detection(text, speaker, outcome)],
            Err(e) => {
                let message = e.to_string();
                warn!("[DISPATCH] detection failed: {}", message);
                vec![
                    ServerEvent::error(message.clone(), Some(char_prefix(text, INPUT_ECHO_CHARS))),
                    ServerEvent::detection(text, speaker, DetectionOutcome::degraded(message)),
                ]
            }
        }
    }

    async fn serve(&self, socket: WebSocket) {
        let (mut sender, mut receiver) = socket.split();
        info!("[DISPATCH] client connected");

        if let Err(e) = send_event(&mut sender, &self.greeting()).await {
            debug!("[DISPATCH] greeting not delivered: {}", e);
            return;
        }

        while let Some(frame) = receiver.next().await {
            let events = match frame {
                Ok(Message::Text(text)) => self.handle_frame(&text).await,
                Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                    Ok(text) => self.handle_frame(text).await,
                    Err(_) => vec![ServerEvent::error(INVALID_FORMAT_MESSAGE, None)],
                },
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    debug!("[DISPATCH] receive failed: {}", e);
                    break;
                }
            };

            for event in &events {
                if let Err(e) = send_event(&mut sender, event).await {
                    debug!("[DISPATCH] reply dropped: {}", e);
                    info!("[DISPATCH] client disconnected");
                    return;
                }
            }
        }

        info!("[DISPATCH] client disconnected");
    }
}

/// Drive one upgraded socket until either side closes it.
pub async fn run_session(socket: WebSocket, detector: Arc<FallacyDetector>) {
    let session = Session::new(detector);
    let span = info_span!("session", id = %session.id());
    session.serve(socket).instrument(span).await;
}

/// JSON object frames pass through; a JSON string holding JSON is decoded once more.
fn parse_frame(frame: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(frame).ok()? {
        Value::String(inner) => serde_json::from_str(&inner).ok(),
        value => Some(value),
    }
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), SessionError> {
    let payload = serde_json::to_string(event)?;
    sender.send(Message::Text(payload)).await?;
    Ok(())
}
