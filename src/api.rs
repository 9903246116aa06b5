//! HTTP API
//!
//! Stands in for the chat platform: each request carries one user message
//! and gets back the bot's reply.

mod handlers;
mod messages;
mod sequencer;
mod types;

pub use handlers::create_router;
pub use sequencer::RequestSequencer;

use crate::service::{TokenProvider, TokenService, UserRepo};
use std::sync::Arc;

/// Service as wired into the HTTP layer
pub type AppService = TokenService<Arc<dyn UserRepo>, Arc<dyn TokenProvider>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AppService>,
    pub sequencer: Arc<RequestSequencer>,
    pub max_concurrent: usize,
}

impl AppState {
    pub fn new(service: AppService, max_concurrent: usize) -> Self {
        Self {
            service: Arc::new(service),
            sequencer: Arc::new(RequestSequencer::new()),
            max_concurrent,
        }
    }
}
