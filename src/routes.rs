use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::AuthService;
use crate::error::ApiError;
use crate::generation::DescriptionGenerator;
use crate::handlers::{
    add_attendee_handler, create_event_handler, delete_attendee_handler, delete_event_handler,
    generate_description_handler, get_event_handler, health_handler, list_attendees_handler,
    list_events_handler, stats_handler, update_attendee_handler, update_event_handler,
};
use crate::model::EventStore;

/// Routes reachable without a session
const PUBLIC_PATHS: [&str; 1] = ["/health"];

#[derive(Clone)]
pub struct AppState {
    /// Auth service for session verification
    pub auth_service: Arc<AuthService>,
    /// Event and attendee storage
    pub db: Arc<dyn EventStore>,
    /// Upstream description generator
    pub generator: Arc<dyn DescriptionGenerator>,
}

/// Resolve the caller and attach it to the request, or reject with 401
async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if PUBLIC_PATHS.contains(&req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let user = state.auth_service.authenticate(req.headers())?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/generate-description", post(generate_description_handler))
        .route("/events", get(list_events_handler).post(create_event_handler))
        .route(
            "/events/{id}",
            get(get_event_handler)
                .patch(update_event_handler)
                .delete(delete_event_handler),
        )
        .route(
            "/events/{id}/attendees",
            get(list_attendees_handler).post(add_attendee_handler),
        )
        .route(
            "/attendees/{id}",
            patch(update_attendee_handler).delete(delete_attendee_handler),
        )
        .route("/dashboard/stats", get(stats_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_session))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
