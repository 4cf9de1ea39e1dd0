//! Signaling relay: peer registry, offer/answer routing and the per-connection
//! websocket session that feeds them.

mod envelope;
mod registry;
mod router;
mod session;

pub use envelope::{Envelope, Payload, PayloadKind, PROTOCOL_TAG, SERVER_ID};
pub use registry::{deliver, outbound_channel, Outbound, Registry};
pub use router::{Routed, Router};
pub use session::{ws_route, SignalingSession};
