use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::visible_events;
use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::routes::AppState;
use crate::utils::time::PhaseCounts;

/// Headline numbers for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_events: usize,
    pub upcoming_events: usize,
    pub total_attendees: usize,
}

/// `GET /dashboard/stats`
pub async fn stats_handler(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<DashboardStats>, ApiError> {
    let events = visible_events(&state, &user).await?;
    let counts = PhaseCounts::tally(&events, Utc::now());

    let ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
    let total_attendees = state.db.count_attendees(&ids).await?;

    Ok(Json(DashboardStats {
        total_events: counts.all,
        upcoming_events: counts.upcoming,
        total_attendees,
    }))
}
