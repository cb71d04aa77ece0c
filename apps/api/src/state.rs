use std::sync::Arc;

use crate::tailor::TailorService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub tailor: Arc<TailorService>,
}
