//! Fixed-size frame slicing between the capture ring buffer and the
//! outbound channel.
//!
//! Forwarding is fire-and-forget: a backed-up outbound path must never
//! stall the capture thread. The outbound channel is bounded and overflow
//! drops the NEW frame (drop-newest): freshest audio wins over guaranteed
//! delivery, and dropped frames are counted, not retried.

use std::time::Duration;

use ringbuf::traits::{Consumer, Observer};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::audio::FRAME_SAMPLES;
use crate::transport::ClientMessage;
use crate::wire::encode_frame;

/// Capacity of the outbound channel in frames (~8s of audio at 256ms per
/// frame).
pub const OUTBOUND_CAPACITY: usize = 32;

pub struct FrameChunker<C>
where
    C: Consumer<Item = f32> + Send,
{
    consumer: C,
    outbound: mpsc::Sender<ClientMessage>,
    cancel: CancellationToken,
    frame: Vec<f32>,
    dropped: u64,
    closed: bool,
}

impl<C> FrameChunker<C>
where
    C: Consumer<Item = f32> + Send,
{
    pub fn new(consumer: C, outbound: mpsc::Sender<ClientMessage>, cancel: CancellationToken) -> Self {
        Self {
            consumer,
            outbound,
            cancel,
            frame: vec![0.0; FRAME_SAMPLES],
            dropped: 0,
            closed: false,
        }
    }

    /// One poll: if a full frame is buffered, pop it, encode, and forward.
    /// Returns true when a frame was consumed.
    pub fn poll_frame(&mut self) -> bool {
        if self.consumer.occupied_len() < FRAME_SAMPLES {
            return false;
        }

        self.consumer.pop_slice(&mut self.frame);

        let chunk = match encode_frame(&self.frame) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("frame encode failed: {}", e);
                return true;
            }
        };

        match self.outbound.try_send(ClientMessage::RealtimeAudio { chunk }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                if self.dropped % 16 == 1 {
                    warn!(dropped = self.dropped, "outbound channel full, dropping frame");
                }
            }
            Err(TrySendError::Closed(_)) => self.closed = true,
        }
        true
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Blocking loop for the chunker thread. Ends on cancellation or when
    /// the outbound channel closes.
    pub fn run(mut self) {
        info!("frame chunker started");
        while !self.cancel.is_cancelled() && !self.closed {
            if !self.poll_frame() {
                std::thread::sleep(Duration::from_millis(10));
            }
        }
        info!(dropped = self.dropped, "frame chunker stopped");
    }
}
