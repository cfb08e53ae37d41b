pub mod event;
pub mod playback;
pub mod session;
pub mod state;
pub mod transcript;
