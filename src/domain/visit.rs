//! Visit Record
//!
//! The central domain entity: one visit by one user to one location on one
//! date. Records move through a small lifecycle: created Active, edited
//! while Active, and tombstoned on delete. Deleted is terminal.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::DomainError;
use super::location::Location;

/// Maximum length of the free-text notes field
pub const MAX_NOTES_LEN: usize = 2_000;

/// Visit record lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisitStatus {
    Active,
    Deleted,
}

/// Input for creating a visit record
#[derive(Debug, Clone)]
pub struct NewVisit {
    pub location: Location,
    pub visit_date: NaiveDate,
    pub notes: String,
}

/// Partial update to a visit record. The owner is never patchable.
#[derive(Debug, Clone, Default)]
pub struct VisitPatch {
    pub location: Option<Location>,
    pub visit_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl VisitPatch {
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.visit_date.is_none() && self.notes.is_none()
    }
}

/// One visit by one user to one location
///
/// Repeat visits are allowed: (owner, location, date) need not be unique,
/// the record id always is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    /// Unique record ID
    id: Uuid,

    /// Owning user; immutable after creation
    owner_id: Uuid,

    /// Where the visit happened
    location: Location,

    /// Calendar date of the visit
    visit_date: NaiveDate,

    /// Free-text notes, private to the owner
    notes: String,

    /// Lifecycle state
    status: VisitStatus,

    /// Mutation counter, bumped on every applied change
    version: i64,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VisitRecord {
    /// Create a new Active record owned by `owner_id`
    pub fn create(owner_id: Uuid, new: NewVisit) -> Result<Self, DomainError> {
        validate_notes(&new.notes)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            location: new.location,
            visit_date: new.visit_date,
            notes: new.notes,
            status: VisitStatus::Active,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply an edit. Deleted records report NotFound so callers cannot
    /// distinguish a tombstone from a record that never existed.
    pub fn update(&mut self, patch: VisitPatch) -> Result<(), DomainError> {
        if self.status == VisitStatus::Deleted {
            return Err(DomainError::NotFound(self.id));
        }
        if patch.is_empty() {
            return Err(DomainError::validation("no changes provided"));
        }
        if let Some(notes) = &patch.notes {
            validate_notes(notes)?;
        }

        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(visit_date) = patch.visit_date {
            self.visit_date = visit_date;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }

        self.version += 1;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Tombstone the record. Deleted is terminal.
    pub fn delete(&mut self) -> Result<(), DomainError> {
        if self.status == VisitStatus::Deleted {
            return Err(DomainError::NotFound(self.id));
        }

        self.status = VisitStatus::Deleted;
        self.version += 1;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn visit_date(&self) -> NaiveDate {
        self.visit_date
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn status(&self) -> VisitStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == VisitStatus::Active
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn validate_notes(notes: &str) -> Result<(), DomainError> {
    if notes.len() > MAX_NOTES_LEN {
        return Err(DomainError::validation(format!(
            "notes exceed {} characters",
            MAX_NOTES_LEN
        )));
    }
    Ok(())
}
