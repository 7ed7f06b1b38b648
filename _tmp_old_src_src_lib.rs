pub mod adapters;
pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod model;
pub mod passwordgen;
pub mod pipeline;
pub mod retry;
pub mod validation;

use std::sync::Arc;

use adapters::Adapters;
use config::Config;

/// Process-wide state cloned into every request (§5 "Shared resources":
/// tokens and adapter clients are process-wide immutables).
#[derive(Clone)]
pub struct AppState {
    pub adapters: Arc<Adapters>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(adapters: Adapters, config: Config) -> Self {
        Self {
            adapters: Arc::new(adapters),
            config: Arc::new(config),
        }
    }
}


