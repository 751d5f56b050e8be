//! Real-time job progress fan-out.
//!
//! - [`ProgressEvent`] -- the envelope pushed to clients for every phase and
//!   terminal outcome of a job.
//! - [`ProgressNotifier`] -- per-owner subscriber registry with best-effort,
//!   fire-and-forget delivery.

pub mod event;
pub mod notifier;

pub use event::ProgressEvent;
pub use notifier::{ProgressNotifier, Subscription, SubscriptionId};
