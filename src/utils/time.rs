use crate::model::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Where an event sits relative to the current moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Upcoming,
    Ongoing,
    Past,
}

/// Classify an event. Both boundaries count as ongoing.
pub fn phase_of(event: &Event, now: DateTime<Utc>) -> Phase {
    if event.start_date > now {
        Phase::Upcoming
    } else if event.end_date < now {
        Phase::Past
    } else {
        Phase::Ongoing
    }
}

/// Tab filter for event listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseFilter {
    #[default]
    All,
    Only(Phase),
}

impl PhaseFilter {
    pub fn matches(&self, phase: Phase) -> bool {
        match self {
            PhaseFilter::All => true,
            PhaseFilter::Only(wanted) => *wanted == phase,
        }
    }
}

impl FromStr for PhaseFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(PhaseFilter::All),
            "upcoming" => Ok(PhaseFilter::Only(Phase::Upcoming)),
            "ongoing" => Ok(PhaseFilter::Only(Phase::Ongoing)),
            "past" => Ok(PhaseFilter::Only(Phase::Past)),
            other => Err(format!("Unknown phase: {}", other)),
        }
    }
}

/// Number of events per tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCounts {
    pub all: usize,
    pub upcoming: usize,
    pub ongoing: usize,
    pub past: usize,
}

impl PhaseCounts {
    pub fn tally<'a>(events: impl IntoIterator<Item = &'a Event>, now: DateTime<Utc>) -> Self {
        let mut counts = Self::default();
        for event in events {
            counts.all += 1;
            match phase_of(event, now) {
                Phase::Upcoming => counts.upcoming += 1,
                Phase::Ongoing => counts.ongoing += 1,
                Phase::Past => counts.past += 1,
            }
        }
        counts
    }
}

/// Case-insensitive match of `query` against title, description, or location.
/// An empty query matches everything.
pub fn matches_query(event: &Event, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }

    let contains = |field: &str| field.to_lowercase().contains(&query);

    contains(&event.title)
        || event.description.as_deref().is_some_and(contains)
        || event.location.as_deref().is_some_and(contains)
}
