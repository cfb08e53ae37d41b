//! Message types and the connection seam for the remote conversational
//! service.
//!
//! The service itself (endpoint, auth, model) lives behind
//! [`ServiceConnector`]. The core only sees three things: an outbound sender
//! for real-time audio, a multiplexed stream of [`ServerMessage`]s, and the
//! connection lifecycle events.

pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::engine::event::Event;
use crate::error::Result;
use crate::wire::EncodedChunk;

/// Outbound payloads. Audio input is fire-and-forget: frames are sent in
/// capture order and no acknowledgment is awaited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ClientMessage {
    /// One encoded capture frame, tagged as real-time audio input.
    RealtimeAudio { chunk: EncodedChunk },
}

/// One multiplexed inbound event. Every field is optional and any subset
/// may co-occur within a single message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    /// Partial transcript of what the local user said.
    pub input_transcript: Option<String>,
    /// Partial transcript of what the agent is saying.
    pub output_transcript: Option<String>,
    /// The current turn is finished; accumulated transcripts flush.
    pub turn_complete: bool,
    /// Inline response audio (16-bit PCM envelope, 24kHz mono).
    pub audio: Option<EncodedChunk>,
    /// The agent started speaking over in-flight playback: barge-in.
    pub interrupted: bool,
}

/// Connection lifecycle as seen by the core. `Opened` is implicit in a
/// successful `connect()`; `Error` and `Closed` arrive asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened,
    Error(String),
    Closed,
}

/// The entire remote-service surface.
///
/// `connect` performs the handshake and returns the outbound sender on
/// success. Afterwards the transport feeds `Event::Server` and
/// `Event::Connection` into the engine channel it was given.
#[async_trait]
pub trait ServiceConnector: Send {
    async fn connect(&mut self, inbound: mpsc::Sender<Event>) -> Result<mpsc::Sender<ClientMessage>>;
}
