use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with the number of running sessions.
pub fn health_status(state: &SharedState) -> HealthResponse {
    let active_sessions = state.registry().len();
    debug!(active_sessions, "health check");
    HealthResponse::ok(active_sessions)
}
