//! Error types for talkback.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TalkbackError {
    // Capture device errors
    #[error("No input device available")]
    NoInputDevice,

    #[error("No supported {rate}Hz capture config on device")]
    UnsupportedCaptureConfig { rate: u32 },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Playback device errors
    #[error("No output device available")]
    NoOutputDevice,

    #[error("Audio output failed: {message}")]
    AudioOutput { message: String },

    // Codec errors
    #[error("Cannot encode an empty audio frame")]
    EmptyFrame,

    #[error("Chunk decode failed: {message}")]
    Codec { message: String },

    // Service connection errors
    #[error("Handshake with service failed: {message}")]
    Handshake { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    // Internal wiring
    #[error("Engine channel closed")]
    ChannelClosed,
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TalkbackError>;
