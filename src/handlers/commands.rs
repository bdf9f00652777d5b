//! Command definitions
//!
//! Plain data describing the mutations callers can request.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{Location, VisitPatch};

/// Command to record a new visit, owned by the caller
#[derive(Debug, Clone)]
pub struct CreateVisitCommand {
    pub location: Location,
    pub visit_date: NaiveDate,
    pub notes: String,
}

impl CreateVisitCommand {
    pub fn new(location: Location, visit_date: NaiveDate) -> Self {
        Self {
            location,
            visit_date,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Command to edit an existing visit
#[derive(Debug, Clone)]
pub struct UpdateVisitCommand {
    pub record_id: Uuid,
    pub patch: VisitPatch,
}

impl UpdateVisitCommand {
    pub fn new(record_id: Uuid, patch: VisitPatch) -> Self {
        Self { record_id, patch }
    }
}

/// Command to tombstone an existing visit
#[derive(Debug, Clone)]
pub struct DeleteVisitCommand {
    pub record_id: Uuid,
}

impl DeleteVisitCommand {
    pub fn new(record_id: Uuid) -> Self {
        Self { record_id }
    }
}
