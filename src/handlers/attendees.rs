use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::load_owned_event;
use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::model::{Attendee, AttendeeStatus};
use crate::routes::AppState;

/// Body of `POST /events/{id}/attendees`
#[derive(Debug, Deserialize)]
pub struct NewAttendee {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Body of `PATCH /attendees/{id}`
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: AttendeeStatus,
}

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Load an attendee whose event the user owns
async fn load_owned_attendee(
    state: &AppState,
    user: &SessionUser,
    id: Uuid,
) -> Result<Attendee, ApiError> {
    let attendee = state.db.get_attendee(id).await?.ok_or(ApiError::NotFound)?;
    load_owned_event(state, user, attendee.event_id).await?;
    Ok(attendee)
}

/// `GET /events/{id}/attendees`
pub async fn list_attendees_handler(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Path(event_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Vec<Attendee>>, ApiError> {
    let event = load_owned_event(&state, &user, event_id).await?;
    Ok(Json(state.db.list_attendees(event.id).await?))
}

/// `POST /events/{id}/attendees`
pub async fn add_attendee_handler(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Path(event_id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(input), _): WithRejection<Json<NewAttendee>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let event = load_owned_event(&state, &user, event_id).await?;

    let name = input.name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid("Name is required"));
    }
    let email = input.email.trim();
    if !valid_email(email) {
        return Err(ApiError::invalid("A valid email is required"));
    }

    let attendee = Attendee {
        id: Uuid::new_v4(),
        event_id: event.id,
        name: name.to_string(),
        email: email.to_string(),
        status: AttendeeStatus::Pending,
        created_at: Utc::now(),
    };
    state.db.insert_attendee(&attendee).await?;
    info!("Added attendee {} to event {}", attendee.id, event.id);

    Ok((StatusCode::CREATED, Json(attendee)))
}

/// `PATCH /attendees/{id}`
pub async fn update_attendee_handler(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(change), _): WithRejection<Json<StatusChange>, ApiError>,
) -> Result<Json<Attendee>, ApiError> {
    let mut attendee = load_owned_attendee(&state, &user, id).await?;
    attendee.status = change.status;
    state.db.update_attendee(&attendee).await?;
    info!("Attendee {} is now {}", attendee.id, attendee.status);

    Ok(Json(attendee))
}

/// `DELETE /attendees/{id}`
pub async fn delete_attendee_handler(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    let attendee = load_owned_attendee(&state, &user, id).await?;
    state.db.delete_attendee(attendee.id).await?;
    info!("Removed attendee {} from event {}", attendee.id, attendee.event_id);

    Ok(StatusCode::NO_CONTENT)
}
