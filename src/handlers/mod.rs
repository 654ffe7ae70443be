use std::collections::HashSet;
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::model::Event;
use crate::routes::AppState;

pub mod attendees;
pub mod dashboard;
pub mod events;
pub mod generate;

pub use attendees::{
    add_attendee_handler, delete_attendee_handler, list_attendees_handler,
    update_attendee_handler,
};
pub use dashboard::stats_handler;
pub use events::{
    create_event_handler, delete_event_handler, get_event_handler, list_events_handler,
    update_event_handler,
};
pub use generate::generate_description_handler;

/// Handler for API health check
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Events the user created or is listed as an attendee of, earliest first
pub(crate) async fn visible_events(
    state: &AppState,
    user: &SessionUser,
) -> Result<Vec<Event>, ApiError> {
    let events = state.db.list_events().await?;
    let attending = match &user.email {
        Some(email) => state.db.attendee_event_ids(email).await?,
        None => HashSet::new(),
    };

    Ok(events
        .into_iter()
        .filter(|e| e.created_by == user.id || attending.contains(&e.id))
        .collect())
}

/// Load an event the user may see; anything else is reported as missing
pub(crate) async fn load_visible_event(
    state: &AppState,
    user: &SessionUser,
    id: Uuid,
) -> Result<Event, ApiError> {
    let event = state.db.get_event(id).await?.ok_or(ApiError::NotFound)?;
    if event.created_by == user.id {
        return Ok(event);
    }

    let attending = match &user.email {
        Some(email) => state.db.attendee_event_ids(email).await?,
        None => HashSet::new(),
    };
    if attending.contains(&event.id) {
        Ok(event)
    } else {
        Err(ApiError::NotFound)
    }
}

/// Load an event the user owns
pub(crate) async fn load_owned_event(
    state: &AppState,
    user: &SessionUser,
    id: Uuid,
) -> Result<Event, ApiError> {
    let event = state.db.get_event(id).await?.ok_or(ApiError::NotFound)?;
    if event.created_by != user.id {
        return Err(ApiError::Forbidden);
    }
    Ok(event)
}

/// Treat empty optional text as absent
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some("Hall A".to_string())), Some("Hall A".to_string()));
    }
}
