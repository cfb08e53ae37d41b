use crate::engine::playback::SegmentId;
use crate::transport::{ConnectionEvent, ServerMessage};

/// Everything the session loop reacts to, in one typed union. Events are
/// dispatched one at a time; each handler runs to completion before the
/// next event is taken.
#[derive(Debug, Clone)]
pub enum Event {
    /// Operations exposed to the presentation layer.
    Control(Control),
    /// Connection lifecycle from the transport.
    Connection(ConnectionEvent),
    /// One multiplexed inbound message from the service.
    Server(ServerMessage),
    /// A scheduled playback segment finished on the output device.
    SegmentFinished(SegmentId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    StartSession,
    StopSession,
    DismissError,
}
