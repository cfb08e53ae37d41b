//! Output device boundary.
//!
//! [`AudioOut`] is the seam the playback scheduler talks to: a monotonic
//! device clock, scheduled-start playback, and a stop that swallows
//! unknown or already-finished segments. [`CpalOutput`] implements it with
//! one continuously running 24kHz stream and a mixer shared with the
//! device callback.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::audio::{AudioFrame, PLAYBACK_SAMPLE_RATE};
use crate::engine::event::Event;
use crate::engine::playback::SegmentId;
use crate::error::{Result, TalkbackError};

pub trait AudioOut: Send {
    /// Current playback time in seconds. Monotonically increasing for the
    /// life of the device.
    fn now(&self) -> f64;

    /// Schedule a decoded frame to begin at `start` (device-clock seconds).
    fn schedule(&mut self, id: SegmentId, frame: AudioFrame, start: f64);

    /// Stop a scheduled or playing segment. Ids that already finished are
    /// swallowed; stop never fails.
    fn stop(&mut self, id: SegmentId);
}

struct ScheduledSegment {
    samples: Vec<f32>,
    start_frame: u64,
    pos: usize,
}

#[derive(Default)]
struct Mixer {
    segments: HashMap<SegmentId, ScheduledSegment>,
    clock_frames: u64,
}

/// Speaker output backed by cpal. The stream lives on a dedicated thread
/// (cpal streams cannot cross threads); this handle shares the mixer with
/// the device callback and stays `Send`.
pub struct CpalOutput {
    mixer: Arc<Mutex<Mixer>>,
    // Dropping the sender ends the device thread and releases the stream.
    _shutdown: std::sync::mpsc::Sender<()>,
}

impl CpalOutput {
    /// Open the default output device at 24kHz. Segment completions are
    /// posted to `events` as they drain.
    pub fn new(events: mpsc::Sender<Event>) -> Result<Self> {
        let mixer = Arc::new(Mutex::new(Mixer::default()));
        let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let shared = Arc::clone(&mixer);
        std::thread::spawn(move || match build_output_stream(shared, events) {
            Ok(stream) => {
                let _ = ready_tx.send(Ok(()));
                // Park until the handle drops, keeping the stream alive.
                let _ = shutdown_rx.recv();
                drop(stream);
                info!("output device released");
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        });

        ready_rx
            .recv()
            .map_err(|_| TalkbackError::AudioOutput {
                message: "output device thread exited".to_string(),
            })??;

        Ok(Self {
            mixer,
            _shutdown: shutdown_tx,
        })
    }
}

impl AudioOut for CpalOutput {
    fn now(&self) -> f64 {
        self.mixer
            .lock()
            .map(|m| m.clock_frames as f64 / f64::from(PLAYBACK_SAMPLE_RATE))
            .unwrap_or(0.0)
    }

    fn schedule(&mut self, id: SegmentId, frame: AudioFrame, start: f64) {
        let start_frame = (start * f64::from(PLAYBACK_SAMPLE_RATE)).round() as u64;
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.segments.insert(
                id,
                ScheduledSegment {
                    samples: frame.samples,
                    start_frame,
                    pos: 0,
                },
            );
        }
    }

    fn stop(&mut self, id: SegmentId) {
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.segments.remove(&id);
        }
    }
}

fn build_output_stream(
    mixer: Arc<Mutex<Mixer>>,
    events: mpsc::Sender<Event>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(TalkbackError::NoOutputDevice)?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| TalkbackError::AudioOutput {
            message: e.to_string(),
        })?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
        })
        .or_else(|| {
            // Fallback: stereo, duplicating the mono signal per frame
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
        })
        .ok_or_else(|| TalkbackError::AudioOutput {
            message: format!("no {}Hz output config found", PLAYBACK_SAMPLE_RATE),
        })?
        .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE));

    let config = supported.config();
    let channels = config.channels as usize;

    info!(
        device = device.name().unwrap_or_default(),
        sample_rate = PLAYBACK_SAMPLE_RATE,
        channels,
        "output device opened"
    );

    let err_fn = |err| error!("output stream error: {}", err);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut finished: Vec<SegmentId> = Vec::new();
                if let Ok(mut mixer) = mixer.lock() {
                    for frame in data.chunks_mut(channels) {
                        let t = mixer.clock_frames;
                        let mut value = 0.0f32;
                        mixer.segments.retain(|id, seg| {
                            if t < seg.start_frame {
                                return true;
                            }
                            if seg.pos < seg.samples.len() {
                                value += seg.samples[seg.pos];
                                seg.pos += 1;
                                if seg.pos == seg.samples.len() {
                                    finished.push(*id);
                                    return false;
                                }
                                true
                            } else {
                                finished.push(*id);
                                false
                            }
                        });
                        for out in frame.iter_mut() {
                            *out = value;
                        }
                        mixer.clock_frames += 1;
                    }
                }
                for id in finished {
                    // try_send: never block the device callback
                    let _ = events.try_send(Event::SegmentFinished(id));
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| TalkbackError::AudioOutput {
            message: e.to_string(),
        })?;

    stream.play().map_err(|e| TalkbackError::AudioOutput {
        message: e.to_string(),
    })?;

    Ok(stream)
}
