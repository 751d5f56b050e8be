use std::sync::Arc;

use reelgen_db::{DbPool, JobStore};
use reelgen_events::ProgressNotifier;
use reelgen_pipeline::{JobRunner, RunnerConfig, SimulatedGenerator};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Job record store (PostgreSQL or in-memory).
    pub store: Arc<dyn JobStore>,
    /// Per-owner progress fan-out (WebSocket subscribers).
    pub notifier: Arc<ProgressNotifier>,
    /// Executes generation jobs in the background.
    pub runner: Arc<JobRunner>,
    /// Database pool, present only when the PostgreSQL store is in use.
    pub pool: Option<DbPool>,
}

impl AppState {
    /// Wire the notifier, the simulated generator and the runner around
    /// `store`.
    pub fn new(config: ServerConfig, store: Arc<dyn JobStore>, pool: Option<DbPool>) -> Self {
        let notifier = Arc::new(ProgressNotifier::new());
        let generator = Arc::new(SimulatedGenerator::new(config.asset_base_url.clone()));
        let runner = Arc::new(JobRunner::new(
            Arc::clone(&store),
            Arc::clone(&notifier),
            generator,
            RunnerConfig {
                phase_delay: config.phase_delay(),
            },
        ));

        Self {
            config: Arc::new(config),
            store,
            notifier,
            runner,
            pool,
        }
    }

    /// Name of the backing store, reported by the health check.
    pub fn store_kind(&self) -> &'static str {
        if self.pool.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }
}
