//! Gapless playback scheduling.
//!
//! The scheduler owns the output timeline: a cursor holding the next free
//! start time and the set of segments currently in flight on the device.
//! Each enqueue reads and advances the cursor synchronously, so segments
//! enqueued in arrival order can never gap or overlap. Arrival order
//! matching playback order is the transport's precondition, not enforced
//! here.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::audio::output::AudioOut;
use crate::audio::AudioFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PlaybackScheduler<O: AudioOut> {
    pub out: O,
    /// Next free start time in device-clock seconds. `None` means unset:
    /// the next enqueue starts at the device's current time. Never reset
    /// to 0.0, which would read as a real past timestamp.
    cursor: Option<f64>,
    /// Segment id -> duration, for every segment scheduled but not yet
    /// reported finished.
    in_flight: HashMap<SegmentId, f64>,
    speaking: bool,
}

impl<O: AudioOut> PlaybackScheduler<O> {
    pub fn new(out: O) -> Self {
        Self {
            out,
            cursor: None,
            in_flight: HashMap::new(),
            speaking: false,
        }
    }

    /// Schedule a decoded frame to start exactly when the previous one
    /// ends, clamped to "now" if the cursor has fallen behind the device
    /// clock (idle catch-up). Synchronous from cursor read to cursor
    /// advance.
    pub fn enqueue(&mut self, frame: AudioFrame) -> SegmentId {
        let now = self.out.now();
        let start = match self.cursor {
            Some(cursor) => cursor.max(now),
            None => now,
        };

        let id = SegmentId::new();
        let duration = frame.duration_secs();

        self.out.schedule(id, frame, start);
        self.in_flight.insert(id, duration);
        self.cursor = Some(start + duration);
        self.speaking = true;

        debug!(segment = %id.0, start, duration, "segment scheduled");
        id
    }

    /// Completion callback path: drop the segment from the in-flight set.
    /// When the set empties, playback is idle and the speaking flag falls.
    pub fn on_segment_finished(&mut self, id: SegmentId) {
        self.in_flight.remove(&id);
        if self.in_flight.is_empty() {
            self.speaking = false;
        }
    }

    /// Barge-in / shutdown: stop every in-flight segment regardless of
    /// whether it has started, clear the set, unset the cursor. Stopping a
    /// segment that already finished naturally is a swallowed no-op on the
    /// device side, so reset itself cannot fail.
    pub fn reset(&mut self) {
        for id in self.in_flight.keys() {
            self.out.stop(*id);
        }
        let stopped = self.in_flight.len();
        self.in_flight.clear();
        self.cursor = None;
        self.speaking = false;

        if stopped > 0 {
            debug!(stopped, "playback reset");
        }
    }

    /// True from the first enqueue after idle until the in-flight set
    /// empties (naturally or via reset).
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn cursor(&self) -> Option<f64> {
        self.cursor
    }
}
