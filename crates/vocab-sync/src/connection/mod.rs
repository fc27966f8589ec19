//! Push-channel connection: lifecycle, backoff, heartbeat, and transport.

pub mod backoff;
pub mod heartbeat;
pub mod state;
pub mod transport;

pub use backoff::ReconnectPolicy;
pub use heartbeat::{HeartbeatAction, HeartbeatTracker};
pub use state::{ConnectionInput, ConnectionMachine, Effect, Step};
pub use transport::{Connection, Frame, Transport, WsConnection, WsTransport};
