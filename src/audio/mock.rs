//! Device stand-ins for tests: a capture source that records lifecycle
//! calls and an output device with a manually advanced clock.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::audio::capture::CaptureSource;
use crate::audio::output::AudioOut;
use crate::audio::AudioFrame;
use crate::engine::playback::SegmentId;
use crate::error::{Result, TalkbackError};
use crate::transport::ClientMessage;

#[derive(Default)]
pub struct MockCapture {
    pub starts: usize,
    pub stops: usize,
    pub fail_start: Option<String>,
    pub outbound: Option<mpsc::Sender<ClientMessage>>,
    active: bool,
}

impl MockCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capture source whose acquisition always fails (e.g. permission
    /// denied).
    pub fn failing(message: &str) -> Self {
        Self {
            fail_start: Some(message.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl CaptureSource for MockCapture {
    async fn start(&mut self, outbound: mpsc::Sender<ClientMessage>) -> Result<()> {
        if let Some(message) = &self.fail_start {
            return Err(TalkbackError::AudioCapture {
                message: message.clone(),
            });
        }
        self.starts += 1;
        self.active = true;
        self.outbound = Some(outbound);
        Ok(())
    }

    async fn stop(&mut self) {
        if self.active {
            self.stops += 1;
        }
        self.active = false;
        self.outbound = None;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Output device with a hand-cranked clock. Records every schedule and
/// stop call for assertions.
#[derive(Default)]
pub struct MockOutput {
    pub clock: f64,
    pub scheduled: Vec<ScheduledCall>,
    pub stopped: Vec<SegmentId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCall {
    pub id: SegmentId,
    pub start: f64,
    pub duration: f64,
}

impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioOut for MockOutput {
    fn now(&self) -> f64 {
        self.clock
    }

    fn schedule(&mut self, id: SegmentId, frame: AudioFrame, start: f64) {
        self.scheduled.push(ScheduledCall {
            id,
            start,
            duration: frame.duration_secs(),
        });
    }

    fn stop(&mut self, id: SegmentId) {
        // Unknown ids are swallowed, mirroring the real device contract.
        self.stopped.push(id);
    }
}
