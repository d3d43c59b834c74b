use std::sync::Arc;

use research_relay::{ActiveRuns, DriverConfig};
use research_upstream::RunTransport;

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub transport: Arc<dyn RunTransport>,
    pub active_runs: ActiveRuns,
    pub driver: DriverConfig,
}

impl AppState {
    pub fn new(transport: Arc<dyn RunTransport>, driver: DriverConfig) -> Self {
        Self {
            transport,
            active_runs: ActiveRuns::new(),
            driver,
        }
    }
}
