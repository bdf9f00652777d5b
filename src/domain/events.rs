//! Domain Events
//!
//! Immutable facts emitted by the store on every successful mutation. They
//! drive incremental aggregation and the durable event log, and replaying
//! them in order rebuilds the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::location::LocationKey;
use super::visit::VisitRecord;

/// Visit-related events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VisitEvent {
    /// A visit record was created
    VisitCreated {
        /// Full snapshot of the record at creation
        record: VisitRecord,
    },

    /// A visit record was edited
    VisitUpdated {
        /// Full snapshot of the record after the edit
        record: VisitRecord,
        /// Location key before the edit; differs from the record's key when
        /// the edit moved the visit
        previous_location: LocationKey,
    },

    /// A visit record was tombstoned
    VisitDeleted {
        record_id: Uuid,
        owner_id: Uuid,
        location: LocationKey,
        deleted_at: DateTime<Utc>,
    },
}

impl VisitEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            VisitEvent::VisitCreated { .. } => "VisitCreated",
            VisitEvent::VisitUpdated { .. } => "VisitUpdated",
            VisitEvent::VisitDeleted { .. } => "VisitDeleted",
        }
    }

    /// Get the record ID this event relates to
    pub fn record_id(&self) -> Uuid {
        match self {
            VisitEvent::VisitCreated { record } => record.id(),
            VisitEvent::VisitUpdated { record, .. } => record.id(),
            VisitEvent::VisitDeleted { record_id, .. } => *record_id,
        }
    }

    /// Get the owning user ID this event relates to
    pub fn owner_id(&self) -> Uuid {
        match self {
            VisitEvent::VisitCreated { record } => record.owner_id(),
            VisitEvent::VisitUpdated { record, .. } => record.owner_id(),
            VisitEvent::VisitDeleted { owner_id, .. } => *owner_id,
        }
    }
}
