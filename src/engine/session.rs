//! Session lifecycle and the event dispatch loop.
//!
//! One task owns every piece of mutable engine state (the scheduler's
//! timeline, the in-flight set, the transcript buffers, the state machine)
//! and drains a single event channel. Handlers run to completion before the
//! next event is dispatched, so no locking is needed anywhere in the
//! engine.

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::audio::capture::CaptureSource;
use crate::audio::output::AudioOut;
use crate::audio::PLAYBACK_SAMPLE_RATE;
use crate::engine::event::{Control, Event};
use crate::engine::playback::PlaybackScheduler;
use crate::engine::state::SessionState;
use crate::engine::transcript::{Role, TranscriptAggregator};
use crate::transport::{ClientMessage, ConnectionEvent, ServerMessage, ServiceConnector};
use crate::wire::decode_chunk;

/// Externally observable session snapshot, published after every event.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub last_error: Option<String>,
}

/// Control surface handed to the presentation layer.
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::Sender<Event>,
    pub speaking: watch::Receiver<bool>,
    pub status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    pub async fn start(&self) {
        let _ = self.events.send(Event::Control(Control::StartSession)).await;
    }

    pub async fn stop(&self) {
        let _ = self.events.send(Event::Control(Control::StopSession)).await;
    }

    pub async fn dismiss_error(&self) {
        let _ = self.events.send(Event::Control(Control::DismissError)).await;
    }
}

pub struct Session<O: AudioOut, C: CaptureSource> {
    events_rx: mpsc::Receiver<Event>,
    events_tx: mpsc::Sender<Event>,
    connector: Box<dyn ServiceConnector>,
    pub capture: C,
    pub playback: PlaybackScheduler<O>,
    pub transcript: TranscriptAggregator,
    state: SessionState,
    last_error: Option<String>,
    // Held so the transport sees the outbound channel close only on
    // shutdown
    #[allow(dead_code)]
    outbound: Option<mpsc::Sender<ClientMessage>>,
    speaking_tx: watch::Sender<bool>,
    status_tx: watch::Sender<SessionStatus>,
}

impl<O: AudioOut, C: CaptureSource> Session<O, C> {
    pub fn new(
        events_rx: mpsc::Receiver<Event>,
        events_tx: mpsc::Sender<Event>,
        connector: Box<dyn ServiceConnector>,
        capture: C,
        out: O,
    ) -> (Self, SessionHandle) {
        let (speaking_tx, speaking_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(SessionStatus {
            state: SessionState::Disconnected,
            last_error: None,
        });

        let handle = SessionHandle {
            events: events_tx.clone(),
            speaking: speaking_rx,
            status: status_rx,
        };

        let session = Self {
            events_rx,
            events_tx,
            connector,
            capture,
            playback: PlaybackScheduler::new(out),
            transcript: TranscriptAggregator::new(),
            state: SessionState::Disconnected,
            last_error: None,
            outbound: None,
            speaking_tx,
            status_tx,
        };

        (session, handle)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Drive the loop until every event sender besides the session's own
    /// is gone.
    pub async fn run(mut self) {
        info!("session loop started");
        while let Some(event) = self.events_rx.recv().await {
            self.handle_event(event).await;
        }
        if !self.state.is_terminal() {
            self.shutdown(SessionState::Disconnected).await;
        }
        info!("session loop ended");
    }

    /// Dispatch one event to completion. Public so tests can step the
    /// session directly.
    pub async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Control(Control::StartSession) => self.handle_start().await,
            Event::Control(Control::StopSession) => self.handle_stop().await,
            Event::Control(Control::DismissError) => {
                self.last_error = None;
            }
            Event::Connection(ev) => self.handle_connection(ev).await,
            Event::Server(msg) => self.handle_server_message(msg),
            Event::SegmentFinished(id) => self.playback.on_segment_finished(id),
        }
        self.publish();
    }

    async fn handle_start(&mut self) {
        if !self.state.can_start() {
            warn!(state = %self.state, "start request ignored");
            return;
        }
        self.last_error = None;
        self.transition(SessionState::Connecting);

        // Handshake first; the suspension is the loop's only await during
        // Connecting. Events that arrive meanwhile queue behind it.
        let outbound = match self.connector.connect(self.events_tx.clone()).await {
            Ok(outbound) => outbound,
            Err(e) => {
                self.fail_setup(e.to_string()).await;
                return;
            }
        };

        // Microphone acquisition: a denial here must end in Error without
        // ever touching Connected.
        if let Err(e) = self.capture.start(outbound.clone()).await {
            self.fail_setup(e.to_string()).await;
            return;
        }

        self.outbound = Some(outbound);
        self.transition(SessionState::Connected);
        info!("session connected, capture streaming");
    }

    async fn handle_stop(&mut self) {
        match self.state {
            SessionState::Connected | SessionState::Connecting => {
                self.shutdown(SessionState::Disconnected).await;
                info!("session stopped");
            }
            _ => {}
        }
    }

    async fn handle_connection(&mut self, ev: ConnectionEvent) {
        match ev {
            // Redundant for connectors whose connect() already returned.
            ConnectionEvent::Opened => debug!("connection opened"),
            ConnectionEvent::Error(cause) => {
                if self.state == SessionState::Disconnected {
                    return;
                }
                error!(cause = %cause, "transport error");
                self.last_error = Some(format!("connection error: {}", cause));
                self.shutdown(SessionState::Error).await;
            }
            ConnectionEvent::Closed => {
                if self.state == SessionState::Connected {
                    info!("service closed the channel");
                    self.shutdown(SessionState::Disconnected).await;
                }
            }
        }
    }

    /// Fixed per-message order: barge-in, transcript fragments, audio,
    /// turn flush. A message carrying both an interruption and audio must
    /// reset before the new audio is scheduled.
    fn handle_server_message(&mut self, msg: ServerMessage) {
        if self.state != SessionState::Connected {
            return;
        }

        if msg.interrupted {
            info!("barge-in: stopping in-flight playback");
            self.playback.reset();
        }

        if let Some(text) = &msg.input_transcript {
            self.transcript.append_fragment(Role::User, text);
        }
        if let Some(text) = &msg.output_transcript {
            self.transcript.append_fragment(Role::Agent, text);
        }

        if let Some(chunk) = &msg.audio {
            match decode_chunk(chunk, PLAYBACK_SAMPLE_RATE, 1) {
                Ok(frame) if !frame.is_empty() => {
                    self.playback.enqueue(frame);
                }
                Ok(_) => {}
                Err(e) => warn!("inbound audio discarded: {}", e),
            }
        }

        if msg.turn_complete {
            for message in self.transcript.on_turn_complete() {
                info!(role = ?message.role, text = %message.text, "turn message");
            }
        }
    }

    async fn fail_setup(&mut self, cause: String) {
        error!(cause = %cause, "session setup failed");
        self.last_error = Some(cause);
        self.shutdown(SessionState::Error).await;
    }

    /// The single shutdown path. Runs fully on every exit from
    /// Connecting/Connected regardless of cause: microphone and its
    /// subscription released together, playback cleared, outbound handle
    /// dropped.
    async fn shutdown(&mut self, to: SessionState) {
        self.capture.stop().await;
        self.playback.reset();
        self.outbound = None;
        self.transition(to);
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            info!(from = %self.state, to = %to, "session state");
            self.state = to;
        }
    }

    fn publish(&self) {
        let speaking = self.playback.is_speaking();
        if *self.speaking_tx.borrow() != speaking {
            let _ = self.speaking_tx.send(speaking);
        }

        let status = SessionStatus {
            state: self.state,
            last_error: self.last_error.clone(),
        };
        if *self.status_tx.borrow() != status {
            let _ = self.status_tx.send(status);
        }
    }
}
