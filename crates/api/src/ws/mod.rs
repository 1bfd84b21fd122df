//! WebSocket infrastructure: the connection registry, heartbeat, and the
//! authenticated upgrade handler.

mod handler;
mod heartbeat;
pub mod registry;

pub use handler::{ws_handler, ClientMessage};
pub use heartbeat::start_heartbeat;
pub use registry::ConnectionRegistry;
