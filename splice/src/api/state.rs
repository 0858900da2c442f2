use std::sync::Arc;

use crate::agent::Agent;
use crate::config::Config;
use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub agent: Agent,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(config: Config, agent: Agent, sessions: SessionManager) -> Self {
        Self {
            config: Arc::new(config),
            agent,
            sessions,
        }
    }
}
