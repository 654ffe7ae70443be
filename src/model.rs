use crate::error::AppResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// A scheduled occurrence owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// User id (`sub`) of the creator
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Invitation state of an attendee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttendeeStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl fmt::Display for AttendeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttendeeStatus::Pending => "pending",
            AttendeeStatus::Confirmed => "confirmed",
            AttendeeStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A named invitee of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub email: String,
    pub status: AttendeeStatus,
    pub created_at: DateTime<Utc>,
}

/// Storage for events and their attendees
#[async_trait::async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// All events ordered by start date, earliest first
    async fn list_events(&self) -> AppResult<Vec<Event>>;

    /// Get a single event
    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>>;

    /// Store a new event
    async fn insert_event(&self, event: &Event) -> AppResult<()>;

    /// Replace an existing event
    async fn update_event(&self, event: &Event) -> AppResult<()>;

    /// Delete an event together with its attendees
    async fn delete_event(&self, id: Uuid) -> AppResult<()>;

    /// Attendees of an event, newest first
    async fn list_attendees(&self, event_id: Uuid) -> AppResult<Vec<Attendee>>;

    /// Ids of events that list `email` as an attendee (case-insensitive)
    async fn attendee_event_ids(&self, email: &str) -> AppResult<HashSet<Uuid>>;

    /// Get a single attendee
    async fn get_attendee(&self, id: Uuid) -> AppResult<Option<Attendee>>;

    /// Store a new attendee
    async fn insert_attendee(&self, attendee: &Attendee) -> AppResult<()>;

    /// Replace an existing attendee
    async fn update_attendee(&self, attendee: &Attendee) -> AppResult<()>;

    /// Delete an attendee
    async fn delete_attendee(&self, id: Uuid) -> AppResult<()>;

    /// Number of attendees across the given events
    async fn count_attendees(&self, event_ids: &[Uuid]) -> AppResult<usize>;
}

/// Case-folded form of an email, used for every attendee lookup
pub(crate) fn normalize_email(email: &str) -> String {
    email.to_lowercase()
}

/// Sort events by start date, earliest first
pub(crate) fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
}

/// Sort attendees by creation time, newest first
pub(crate) fn sort_attendees(attendees: &mut [Attendee]) {
    attendees.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<Uuid, Event>,
    attendees: HashMap<Uuid, Attendee>,
}

/// In-memory implementation of the store (used when Redis is not configured)
#[derive(Debug, Default)]
pub struct InMemoryDb {
    tables: tokio::sync::RwLock<Tables>,
}

#[async_trait::async_trait]
impl EventStore for InMemoryDb {
    async fn list_events(&self) -> AppResult<Vec<Event>> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables.events.values().cloned().collect();
        sort_events(&mut events);
        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        let tables = self.tables.read().await;
        Ok(tables.events.get(&id).cloned())
    }

    async fn insert_event(&self, event: &Event) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn delete_event(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.events.remove(&id);
        tables.attendees.retain(|_, a| a.event_id != id);
        Ok(())
    }

    async fn list_attendees(&self, event_id: Uuid) -> AppResult<Vec<Attendee>> {
        let tables = self.tables.read().await;
        let mut attendees: Vec<Attendee> = tables
            .attendees
            .values()
            .filter(|a| a.event_id == event_id)
            .cloned()
            .collect();
        sort_attendees(&mut attendees);
        Ok(attendees)
    }

    async fn attendee_event_ids(&self, email: &str) -> AppResult<HashSet<Uuid>> {
        let tables = self.tables.read().await;
        let email = normalize_email(email);
        Ok(tables
            .attendees
            .values()
            .filter(|a| normalize_email(&a.email) == email)
            .map(|a| a.event_id)
            .collect())
    }

    async fn get_attendee(&self, id: Uuid) -> AppResult<Option<Attendee>> {
        let tables = self.tables.read().await;
        Ok(tables.attendees.get(&id).cloned())
    }

    async fn insert_attendee(&self, attendee: &Attendee) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.attendees.insert(attendee.id, attendee.clone());
        Ok(())
    }

    async fn update_attendee(&self, attendee: &Attendee) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.attendees.insert(attendee.id, attendee.clone());
        Ok(())
    }

    async fn delete_attendee(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.attendees.remove(&id);
        Ok(())
    }

    async fn count_attendees(&self, event_ids: &[Uuid]) -> AppResult<usize> {
        let tables = self.tables.read().await;
        let ids: HashSet<&Uuid> = event_ids.iter().collect();
        Ok(tables
            .attendees
            .values()
            .filter(|a| ids.contains(&a.event_id))
            .count())
    }
}
