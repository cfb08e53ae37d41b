pub mod audio;
pub mod engine;
pub mod error;
pub mod transport;
pub mod wire;

// Re-export specific items if needed for convenient access
pub use engine::session::{Session, SessionHandle};
pub use error::{Result, TalkbackError};
