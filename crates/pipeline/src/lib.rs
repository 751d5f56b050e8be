//! Simulated generation pipeline.
//!
//! [`JobRunner`] drives a job from `pending` through its fixed phase table
//! to `completed` or `failed`, persisting progress through a
//! [`JobStore`](reelgen_db::JobStore) and pushing every step to the owner
//! through the [`ProgressNotifier`](reelgen_events::ProgressNotifier).
//! The actual work of each phase is delegated to a [`Generator`].

pub mod error;
pub mod generator;
pub mod runner;

pub use error::{GeneratorError, PhaseError, RunnerError};
pub use generator::{Generator, SimulatedGenerator};
pub use runner::{JobRunner, RunnerConfig};
