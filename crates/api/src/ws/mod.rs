//! WebSocket progress stream.
//!
//! Each authenticated connection becomes one subscription on the
//! [`ProgressNotifier`](reelgen_events::ProgressNotifier) for its user.

mod handler;

pub use handler::ws_handler;
