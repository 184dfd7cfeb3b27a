use crate::screening::pipeline::ScreeningService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Scoring pipeline; also owns the ranking service used by the ranking routes.
    pub screening: ScreeningService,
}
