//! HTTP API for the USSD gateway

mod handlers;
mod types;

pub use handlers::create_router;

use crate::runtime::ProductionRuntime;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ProductionRuntime>,
}

impl AppState {
    pub fn new(runtime: ProductionRuntime) -> Self {
        Self {
            runtime: Arc::new(runtime),
        }
    }
}
