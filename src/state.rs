//! Application state management

use std::sync::Arc;

use crate::config::Config;

/// Shared application state
///
/// Read-only after startup: every parse request builds its own working
/// state, so nothing here needs locking.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}
