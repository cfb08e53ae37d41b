//! Microphone capture.
//!
//! [`CaptureSource`] is the device seam the session manages. [`MicCapture`]
//! implements it with an actor thread that owns the `cpal::Stream`: Start
//! builds a 16kHz mono input stream whose callback pushes into a ring
//! buffer, and a chunker thread drains the buffer into encoded outbound
//! frames. Stop cancels the chunker and drops the stream together, so the
//! device handle and the subscription are always released as a unit.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate};
use ringbuf::traits::{Producer, Split};
use ringbuf::HeapRb;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::audio::chunker::FrameChunker;
use crate::audio::{CAPTURE_SAMPLE_RATE, FRAME_SAMPLES};
use crate::error::{Result, TalkbackError};
use crate::transport::ClientMessage;

#[async_trait]
pub trait CaptureSource: Send {
    /// Acquire the microphone and begin streaming encoded frames into
    /// `outbound`. Fails on device absence, config mismatch, or permission
    /// denial.
    async fn start(&mut self, outbound: mpsc::Sender<ClientMessage>) -> Result<()>;

    /// Release the device and its subscription.
    async fn stop(&mut self);

    fn is_active(&self) -> bool;
}

enum CaptureCommand {
    Start {
        outbound: mpsc::Sender<ClientMessage>,
        reply: oneshot::Sender<Result<()>>,
    },
    Stop,
}

/// Handle to the capture actor thread.
pub struct MicCapture {
    cmd_tx: mpsc::Sender<CaptureCommand>,
    active: bool,
}

impl MicCapture {
    /// Spawn the actor thread. The microphone is not touched until the
    /// first `start`.
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        std::thread::spawn(move || CaptureActor::new(cmd_rx).run());
        Self {
            cmd_tx,
            active: false,
        }
    }
}

#[async_trait]
impl CaptureSource for MicCapture {
    async fn start(&mut self, outbound: mpsc::Sender<ClientMessage>) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(CaptureCommand::Start {
                outbound,
                reply: reply_tx,
            })
            .await
            .map_err(|_| TalkbackError::ChannelClosed)?;
        let result = reply_rx.await.map_err(|_| TalkbackError::ChannelClosed)?;
        if result.is_ok() {
            self.active = true;
        }
        result
    }

    async fn stop(&mut self) {
        let _ = self.cmd_tx.send(CaptureCommand::Stop).await;
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

struct CaptureActor {
    cmd_rx: mpsc::Receiver<CaptureCommand>,
    stream: Option<cpal::Stream>,
    chunker_cancel: Option<CancellationToken>,
}

impl CaptureActor {
    fn new(cmd_rx: mpsc::Receiver<CaptureCommand>) -> Self {
        Self {
            cmd_rx,
            stream: None,
            chunker_cancel: None,
        }
    }

    fn run(mut self) {
        while let Some(cmd) = self.cmd_rx.blocking_recv() {
            match cmd {
                CaptureCommand::Start { outbound, reply } => {
                    if self.stream.is_some() {
                        let _ = reply.send(Ok(()));
                        continue;
                    }
                    let _ = reply.send(self.open(outbound));
                }
                CaptureCommand::Stop => self.close(),
            }
        }
        // Handle dropped: release whatever is still held.
        self.close();
    }

    fn open(&mut self, outbound: mpsc::Sender<ClientMessage>) -> Result<()> {
        let rb = HeapRb::<f32>::new(FRAME_SAMPLES * 4);
        let (producer, consumer) = rb.split();

        let stream = build_input_stream(producer)?;

        let cancel = CancellationToken::new();
        let chunker = FrameChunker::new(consumer, outbound, cancel.clone());
        std::thread::spawn(move || chunker.run());

        self.stream = Some(stream);
        self.chunker_cancel = Some(cancel);
        info!("microphone capture started");
        Ok(())
    }

    fn close(&mut self) {
        if let Some(cancel) = self.chunker_cancel.take() {
            cancel.cancel();
        }
        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("microphone capture stopped");
        }
    }
}

fn build_input_stream<P>(mut producer: P) -> Result<cpal::Stream>
where
    P: Producer<Item = f32> + Send + 'static,
{
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(TalkbackError::NoInputDevice)?;

    info!(device = device.name().unwrap_or_default(), "input device");

    let supported = device
        .supported_input_configs()
        .map_err(|e| TalkbackError::AudioCapture {
            message: e.to_string(),
        })?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(CAPTURE_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(CAPTURE_SAMPLE_RATE)
        })
        .ok_or(TalkbackError::UnsupportedCaptureConfig {
            rate: CAPTURE_SAMPLE_RATE,
        })?
        .with_sample_rate(SampleRate(CAPTURE_SAMPLE_RATE));

    let config = supported.config();
    let err_fn = |err| error!("capture stream error: {}", err);

    let stream = match supported.sample_format() {
        SampleFormat::F32 => device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Full ring buffer drops input (lossy)
                    producer.push_slice(data);
                },
                err_fn,
                None,
            )
            .map_err(|e| TalkbackError::AudioCapture {
                message: e.to_string(),
            })?,
        SampleFormat::I16 => device
            .build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    for &sample in data {
                        let _ = producer.try_push(sample as f32 / i16::MAX as f32);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| TalkbackError::AudioCapture {
                message: e.to_string(),
            })?,
        other => {
            return Err(TalkbackError::AudioCapture {
                message: format!("unsupported sample format {:?}", other),
            })
        }
    };

    stream.play().map_err(|e| TalkbackError::AudioCapture {
        message: e.to_string(),
    })?;

    Ok(stream)
}
