use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{load_owned_event, load_visible_event, non_empty, visible_events};
use crate::auth::SessionUser;
use crate::error::{ApiError, TITLE_REQUIRED};
use crate::model::{Attendee, AttendeeStatus, Event};
use crate::routes::AppState;
use crate::utils::time::{matches_query, phase_of, Phase, PhaseCounts, PhaseFilter};

/// Query string of `GET /events`
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub phase: Option<String>,
}

/// An event as presented to a particular user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub phase: Phase,
    pub is_owner: bool,
}

impl EventView {
    fn new(event: Event, user: &SessionUser, now: DateTime<Utc>) -> Self {
        Self {
            phase: phase_of(&event, now),
            is_owner: event.created_by == user.id,
            event,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventList {
    pub events: Vec<EventView>,
    pub counts: PhaseCounts,
}

/// Attendee totals per status
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub confirmed: usize,
    pub pending: usize,
    pub cancelled: usize,
}

impl StatusSummary {
    pub fn of(attendees: &[Attendee]) -> Self {
        let mut summary = Self::default();
        for attendee in attendees {
            match attendee.status {
                AttendeeStatus::Confirmed => summary.confirmed += 1,
                AttendeeStatus::Pending => summary.pending += 1,
                AttendeeStatus::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventDetails {
    pub event: EventView,
    pub attendees: Vec<Attendee>,
    pub summary: StatusSummary,
}

/// Body of `POST /events`
#[derive(Debug, Deserialize)]
pub struct NewEvent {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Body of `PATCH /events/{id}`; absent fields stay as they are and empty
/// strings clear the optional ones
#[derive(Debug, Default, Deserialize)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl EventChanges {
    fn apply(self, event: &mut Event) {
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(description) = self.description {
            event.description = non_empty(Some(description));
        }
        if let Some(location) = self.location {
            event.location = non_empty(Some(location));
        }
        if let Some(image_url) = self.image_url {
            event.image_url = non_empty(Some(image_url));
        }
        if let Some(start_date) = self.start_date {
            event.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            event.end_date = end_date;
        }
    }
}

fn validate(event: &Event) -> Result<(), ApiError> {
    if event.title.trim().is_empty() {
        return Err(ApiError::invalid(TITLE_REQUIRED));
    }
    if event.end_date < event.start_date {
        return Err(ApiError::invalid("End date must not be before start date"));
    }
    Ok(())
}

/// `GET /events`
pub async fn list_events_handler(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ApiError>,
) -> Result<Json<EventList>, ApiError> {
    let filter: PhaseFilter = query
        .phase
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ApiError::InvalidInput)?;
    let search = query.q.unwrap_or_default();

    let now = Utc::now();
    let events = visible_events(&state, &user).await?;
    let counts = PhaseCounts::tally(&events, now);

    let events = events
        .into_iter()
        .filter(|e| matches_query(e, &search))
        .filter(|e| filter.matches(phase_of(e, now)))
        .map(|e| EventView::new(e, &user, now))
        .collect();

    Ok(Json(EventList { events, counts }))
}

/// `GET /events/{id}`
pub async fn get_event_handler(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<EventDetails>, ApiError> {
    let event = load_visible_event(&state, &user, id).await?;
    let attendees = state.db.list_attendees(event.id).await?;
    let summary = StatusSummary::of(&attendees);

    Ok(Json(EventDetails {
        event: EventView::new(event, &user, Utc::now()),
        attendees,
        summary,
    }))
}

/// `POST /events`
pub async fn create_event_handler(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Json(input), _): WithRejection<Json<NewEvent>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let event = Event {
        id: Uuid::new_v4(),
        title: input.title,
        description: non_empty(input.description),
        location: non_empty(input.location),
        image_url: non_empty(input.image_url),
        start_date: input.start_date,
        end_date: input.end_date,
        created_by: user.id.clone(),
        created_at: Utc::now(),
    };
    validate(&event)?;

    state.db.insert_event(&event).await?;
    info!("User {} created event {}", user.id, event.id);

    Ok((
        StatusCode::CREATED,
        Json(EventView::new(event, &user, Utc::now())),
    ))
}

/// `PATCH /events/{id}`
pub async fn update_event_handler(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(changes), _): WithRejection<Json<EventChanges>, ApiError>,
) -> Result<Json<EventView>, ApiError> {
    let mut event = load_owned_event(&state, &user, id).await?;
    changes.apply(&mut event);
    validate(&event)?;

    state.db.update_event(&event).await?;
    info!("User {} updated event {}", user.id, event.id);

    Ok(Json(EventView::new(event, &user, Utc::now())))
}

/// `DELETE /events/{id}`
pub async fn delete_event_handler(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    let event = load_owned_event(&state, &user, id).await?;
    state.db.delete_event(event.id).await?;
    info!("User {} deleted event {}", user.id, event.id);

    Ok(StatusCode::NO_CONTENT)
}
