use axum::{
    body::Bytes,
    extract::{Extension, State},
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::generation::{GenerationRequest, GenerationResponse};
use crate::routes::AppState;

/// `POST /generate-description`
///
/// The session is checked by the middleware before the body is read, so an
/// unauthenticated caller gets 401 whatever it sent. A body that is not JSON
/// fails the request with the generic generation error.
pub async fn generate_description_handler(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    body: Bytes,
) -> Result<Json<GenerationResponse>, ApiError> {
    let body: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::UpstreamFailure(format!("Unreadable request body: {}", e)))?;

    let prompt = GenerationRequest::from_body(&body)?.prompt()?;
    info!("Generating description for user {}", user.id);

    let description = state.generator.generate(&prompt).await?;
    Ok(Json(GenerationResponse { description }))
}
