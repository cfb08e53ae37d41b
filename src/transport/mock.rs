//! In-process stand-in for the remote conversational service.
//!
//! Used by the binary for end-to-end runs without credentials, and by
//! integration tests for the session lifecycle. The script: every audio
//! chunk is acknowledged with a user-transcript fragment; every
//! `reply_every`-th chunk triggers an agent turn (a short tone, an agent
//! transcript, then turn-complete).

use std::f32::consts::PI;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::audio::PLAYBACK_SAMPLE_RATE;
use crate::engine::event::Event;
use crate::error::{Result, TalkbackError};
use crate::transport::{ClientMessage, ConnectionEvent, ServerMessage, ServiceConnector};
use crate::wire::encode_samples;

pub struct MockService {
    handshake_failure: Option<String>,
    reply_every: usize,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            handshake_failure: None,
            reply_every: 4,
        }
    }

    /// A service whose handshake always rejects.
    pub fn failing(message: &str) -> Self {
        Self {
            handshake_failure: Some(message.to_string()),
            reply_every: 4,
        }
    }

    pub fn with_reply_every(mut self, n: usize) -> Self {
        self.reply_every = n.max(1);
        self
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceConnector for MockService {
    async fn connect(&mut self, inbound: mpsc::Sender<Event>) -> Result<mpsc::Sender<ClientMessage>> {
        if let Some(message) = &self.handshake_failure {
            return Err(TalkbackError::Handshake {
                message: message.clone(),
            });
        }

        let (outbound_tx, outbound_rx) = mpsc::channel(32);
        tokio::spawn(respond(outbound_rx, inbound, self.reply_every));
        Ok(outbound_tx)
    }
}

async fn respond(
    mut outbound: mpsc::Receiver<ClientMessage>,
    inbound: mpsc::Sender<Event>,
    reply_every: usize,
) {
    let mut heard = 0usize;

    while let Some(ClientMessage::RealtimeAudio { .. }) = outbound.recv().await {
        heard += 1;
        debug!(heard, "mock service received audio frame");

        let ack = ServerMessage {
            input_transcript: Some(format!("(frame {}) ", heard)),
            ..ServerMessage::default()
        };
        if inbound.send(Event::Server(ack)).await.is_err() {
            return;
        }

        if heard % reply_every == 0 {
            for reply in agent_turn(heard / reply_every) {
                if inbound.send(Event::Server(reply)).await.is_err() {
                    return;
                }
            }
        }
    }

    // Outbound sender dropped: the session shut down, mirror a clean close.
    let _ = inbound.send(Event::Connection(ConnectionEvent::Closed)).await;
}

/// One scripted agent turn as three multiplexed messages: tone audio,
/// transcript fragment, turn-complete.
fn agent_turn(turn: usize) -> Vec<ServerMessage> {
    let tone = encode_samples(&sine(330.0, 0.3), PLAYBACK_SAMPLE_RATE).ok();

    vec![
        ServerMessage {
            audio: tone,
            ..ServerMessage::default()
        },
        ServerMessage {
            output_transcript: Some(format!("Reply number {}.", turn)),
            ..ServerMessage::default()
        },
        ServerMessage {
            turn_complete: true,
            ..ServerMessage::default()
        },
    ]
}

fn sine(freq: f32, seconds: f32) -> Vec<f32> {
    let total = (PLAYBACK_SAMPLE_RATE as f32 * seconds) as usize;
    (0..total)
        .map(|i| (i as f32 * 2.0 * PI * freq / PLAYBACK_SAMPLE_RATE as f32).sin() * 0.2)
        .collect()
}
