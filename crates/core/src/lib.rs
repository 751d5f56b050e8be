//! Domain types shared by every reelgen crate.
//!
//! - [`job`] -- the generation job record, its status machine and kinds.
//! - [`phases`] -- fixed phase tables that drive simulated generation.
//! - [`job_events`] -- wire names for job lifecycle notifications.
//! - [`roles`] -- role names carried in access tokens.
//! - [`error`] -- the domain error enum.

pub mod error;
pub mod job;
pub mod job_events;
pub mod phases;
pub mod roles;
pub mod types;
