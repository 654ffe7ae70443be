use crate::error::{storage_error, AppResult};
use crate::model::{normalize_email, sort_attendees, sort_events, Attendee, Event, EventStore};
use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

/// Redis keys
mod keys {
    /// Set of all event ids
    pub const EVENTS: &str = "evently:events";
    pub const EVENT_PREFIX: &str = "evently:event:";
    pub const ATTENDEE_PREFIX: &str = "evently:attendee:";
    /// Set of attendee ids per event
    pub const EVENT_ATTENDEES_PREFIX: &str = "evently:event_attendees:";
    /// Set of attendee ids per lowercased email
    pub const EMAIL_ATTENDEES_PREFIX: &str = "evently:email_attendees:";
}

fn event_key(id: Uuid) -> String {
    format!("{}{}", keys::EVENT_PREFIX, id)
}

fn attendee_key(id: Uuid) -> String {
    format!("{}{}", keys::ATTENDEE_PREFIX, id)
}

fn event_attendees_key(event_id: Uuid) -> String {
    format!("{}{}", keys::EVENT_ATTENDEES_PREFIX, event_id)
}

fn email_attendees_key(email: &str) -> String {
    format!("{}{}", keys::EMAIL_ATTENDEES_PREFIX, normalize_email(email))
}

/// Redis-backed event store
pub struct RedisDB {
    client: RedisClient,
}

impl RedisDB {
    /// Open a client and verify the server is reachable
    pub async fn connect(redis_url: &str) -> AppResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = RedisClient::open(redis_url)
            .map_err(|e| storage_error(&format!("Failed to create Redis client: {}", e)))?;
        let db = Self { client };

        let mut conn = db.get_connection().await?;
        let _: bool = conn
            .exists(keys::EVENTS)
            .await
            .map_err(|e| storage_error(&format!("Redis EXISTS error: {}", e)))?;

        Ok(db)
    }

    /// Get a Redis connection from the client
    async fn get_connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| storage_error(&format!("Failed to connect to Redis: {}", e)))
    }

    async fn get_json<T: DeserializeOwned>(
        conn: &mut redis::aio::MultiplexedConnection,
        key: &str,
    ) -> AppResult<Option<T>> {
        let data: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| storage_error(&format!("Redis GET error: {}", e)))?;

        data.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| storage_error(&format!("JSON parse error for {}: {}", key, e)))
        })
        .transpose()
    }

    async fn set_json<T: Serialize>(
        conn: &mut redis::aio::MultiplexedConnection,
        key: &str,
        value: &T,
    ) -> AppResult<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| storage_error(&format!("JSON serialization error: {}", e)))?;

        conn.set::<_, _, ()>(key, json)
            .await
            .map_err(|e| storage_error(&format!("Redis SET error: {}", e)))
    }

    async fn members(
        conn: &mut redis::aio::MultiplexedConnection,
        key: &str,
    ) -> AppResult<Vec<Uuid>> {
        let raw: Vec<String> = conn
            .smembers(key)
            .await
            .map_err(|e| storage_error(&format!("Redis SMEMBERS error: {}", e)))?;

        Ok(raw
            .iter()
            .filter_map(|id| match Uuid::parse_str(id) {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!("Skipping malformed id {} in {}", id, key);
                    None
                }
            })
            .collect())
    }

    async fn remove_attendee_row(
        conn: &mut redis::aio::MultiplexedConnection,
        attendee: &Attendee,
    ) -> AppResult<()> {
        let id = attendee.id.to_string();

        conn.del::<_, ()>(attendee_key(attendee.id))
            .await
            .map_err(|e| storage_error(&format!("Redis DEL error: {}", e)))?;
        conn.srem::<_, _, ()>(event_attendees_key(attendee.event_id), &id)
            .await
            .map_err(|e| storage_error(&format!("Redis SREM error: {}", e)))?;
        conn.srem::<_, _, ()>(email_attendees_key(&attendee.email), &id)
            .await
            .map_err(|e| storage_error(&format!("Redis SREM error: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl EventStore for RedisDB {
    async fn list_events(&self) -> AppResult<Vec<Event>> {
        let mut conn = self.get_connection().await?;

        let mut events = Vec::new();
        for id in Self::members(&mut conn, keys::EVENTS).await? {
            if let Some(event) = Self::get_json::<Event>(&mut conn, &event_key(id)).await? {
                events.push(event);
            }
        }

        sort_events(&mut events);
        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        let mut conn = self.get_connection().await?;
        Self::get_json(&mut conn, &event_key(id)).await
    }

    async fn insert_event(&self, event: &Event) -> AppResult<()> {
        let mut conn = self.get_connection().await?;

        Self::set_json(&mut conn, &event_key(event.id), event).await?;
        conn.sadd::<_, _, ()>(keys::EVENTS, event.id.to_string())
            .await
            .map_err(|e| storage_error(&format!("Redis SADD error: {}", e)))?;

        info!("Stored event {}", event.id);
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> AppResult<()> {
        let mut conn = self.get_connection().await?;
        Self::set_json(&mut conn, &event_key(event.id), event).await
    }

    async fn delete_event(&self, id: Uuid) -> AppResult<()> {
        let mut conn = self.get_connection().await?;

        // Remove the attendees first so no orphaned rows remain
        for attendee_id in Self::members(&mut conn, &event_attendees_key(id)).await? {
            if let Some(attendee) =
                Self::get_json::<Attendee>(&mut conn, &attendee_key(attendee_id)).await?
            {
                Self::remove_attendee_row(&mut conn, &attendee).await?;
            }
        }

        conn.del::<_, ()>(event_attendees_key(id))
            .await
            .map_err(|e| storage_error(&format!("Redis DEL error: {}", e)))?;
        conn.del::<_, ()>(event_key(id))
            .await
            .map_err(|e| storage_error(&format!("Redis DEL error: {}", e)))?;
        conn.srem::<_, _, ()>(keys::EVENTS, id.to_string())
            .await
            .map_err(|e| storage_error(&format!("Redis SREM error: {}", e)))?;

        info!("Deleted event {}", id);
        Ok(())
    }

    async fn list_attendees(&self, event_id: Uuid) -> AppResult<Vec<Attendee>> {
        let mut conn = self.get_connection().await?;

        let mut attendees = Vec::new();
        for id in Self::members(&mut conn, &event_attendees_key(event_id)).await? {
            if let Some(attendee) = Self::get_json::<Attendee>(&mut conn, &attendee_key(id)).await? {
                attendees.push(attendee);
            }
        }

        sort_attendees(&mut attendees);
        Ok(attendees)
    }

    async fn attendee_event_ids(&self, email: &str) -> AppResult<HashSet<Uuid>> {
        let mut conn = self.get_connection().await?;

        let mut event_ids = HashSet::new();
        for id in Self::members(&mut conn, &email_attendees_key(email)).await? {
            if let Some(attendee) = Self::get_json::<Attendee>(&mut conn, &attendee_key(id)).await? {
                event_ids.insert(attendee.event_id);
            }
        }

        Ok(event_ids)
    }

    async fn get_attendee(&self, id: Uuid) -> AppResult<Option<Attendee>> {
        let mut conn = self.get_connection().await?;
        Self::get_json(&mut conn, &attendee_key(id)).await
    }

    async fn insert_attendee(&self, attendee: &Attendee) -> AppResult<()> {
        let mut conn = self.get_connection().await?;
        let id = attendee.id.to_string();

        Self::set_json(&mut conn, &attendee_key(attendee.id), attendee).await?;
        conn.sadd::<_, _, ()>(event_attendees_key(attendee.event_id), &id)
            .await
            .map_err(|e| storage_error(&format!("Redis SADD error: {}", e)))?;
        conn.sadd::<_, _, ()>(email_attendees_key(&attendee.email), &id)
            .await
            .map_err(|e| storage_error(&format!("Redis SADD error: {}", e)))?;

        Ok(())
    }

    async fn update_attendee(&self, attendee: &Attendee) -> AppResult<()> {
        let mut conn = self.get_connection().await?;
        Self::set_json(&mut conn, &attendee_key(attendee.id), attendee).await
    }

    async fn delete_attendee(&self, id: Uuid) -> AppResult<()> {
        let mut conn = self.get_connection().await?;

        if let Some(attendee) = Self::get_json::<Attendee>(&mut conn, &attendee_key(id)).await? {
            Self::remove_attendee_row(&mut conn, &attendee).await?;
        }

        Ok(())
    }

    async fn count_attendees(&self, event_ids: &[Uuid]) -> AppResult<usize> {
        let mut conn = self.get_connection().await?;

        let mut total = 0;
        for id in event_ids {
            let count: usize = conn
                .scard(event_attendees_key(*id))
                .await
                .map_err(|e| storage_error(&format!("Redis SCARD error: {}", e)))?;
            total += count;
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            event_key(id),
            "evently:event:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            event_attendees_key(id),
            "evently:event_attendees:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            email_attendees_key("Ann@Example.COM"),
            "evently:email_attendees:ann@example.com"
        );
        assert_eq!(
            email_attendees_key("ÉVA@Exemple.FR"),
            email_attendees_key("éva@exemple.fr")
        );
    }
}
