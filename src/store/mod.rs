//! Visit Record Store
//!
//! Authoritative collection of visit records keyed by record id. The store
//! owns validation and the uniqueness invariant, and consults the
//! authorization gate before every mutation.
//!
//! Concurrency: records live behind per-record locks inside an outer map
//! lock, so mutations on the same record serialize while mutations on
//! different records proceed independently. Reads clone a record under its
//! lock, so a partially-written record is never observable. A monotonic
//! change sequence underpins the aggregation engine's consistency checks.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::auth::{Action, AuthorizationGate};
use crate::domain::{
    CallerIdentity, DomainError, NewVisit, VisitEvent, VisitPatch, VisitRecord,
};

/// Field to order a record listing by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Location,
}

/// Listing order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

type SharedRecord = Arc<RwLock<VisitRecord>>;

/// Authoritative visit record collection
#[derive(Debug, Default)]
pub struct VisitStore {
    records: RwLock<HashMap<Uuid, SharedRecord>>,
    change_seq: AtomicU64,
    gate: AuthorizationGate,
}

impl VisitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a visit owned by the caller
    pub fn create(
        &self,
        caller: &CallerIdentity,
        new: NewVisit,
    ) -> Result<(VisitRecord, VisitEvent), DomainError> {
        self.gate.authorize(caller, Action::CreateVisit)?;

        let record = VisitRecord::create(caller.user_id, new)?;
        let snapshot = record.clone();

        let mut map = write_guard(&self.records);
        map.insert(record.id(), Arc::new(RwLock::new(record)));
        self.bump_seq();
        drop(map);

        let event = VisitEvent::VisitCreated {
            record: snapshot.clone(),
        };
        Ok((snapshot, event))
    }

    /// Edit an existing record; only the owner or an admin may do so
    pub fn update(
        &self,
        record_id: Uuid,
        caller: &CallerIdentity,
        patch: VisitPatch,
    ) -> Result<(VisitRecord, VisitEvent), DomainError> {
        let shared = self.lookup(record_id)?;
        let mut record = write_guard(&shared);

        if !record.is_active() {
            return Err(DomainError::NotFound(record_id));
        }
        self.gate.authorize(
            caller,
            Action::UpdateVisit {
                owner_id: record.owner_id(),
            },
        )?;

        let previous_location = record.location().key();
        record.update(patch)?;
        self.bump_seq();

        let snapshot = record.clone();
        drop(record);

        let event = VisitEvent::VisitUpdated {
            record: snapshot.clone(),
            previous_location,
        };
        Ok((snapshot, event))
    }

    /// Tombstone an existing record; only the owner or an admin may do so
    pub fn delete(
        &self,
        record_id: Uuid,
        caller: &CallerIdentity,
    ) -> Result<VisitEvent, DomainError> {
        let shared = self.lookup(record_id)?;
        let mut record = write_guard(&shared);

        if !record.is_active() {
            return Err(DomainError::NotFound(record_id));
        }
        self.gate.authorize(
            caller,
            Action::DeleteVisit {
                owner_id: record.owner_id(),
            },
        )?;

        let location = record.location().key();
        record.delete()?;
        self.bump_seq();

        let event = VisitEvent::VisitDeleted {
            record_id,
            owner_id: record.owner_id(),
            location,
            deleted_at: Utc::now(),
        };
        Ok(event)
    }

    /// Read a single record, notes included; owner or admin only
    pub fn get(
        &self,
        record_id: Uuid,
        caller: &CallerIdentity,
    ) -> Result<VisitRecord, DomainError> {
        let shared = self.lookup(record_id)?;
        let record = read_guard(&shared);

        if !record.is_active() {
            return Err(DomainError::NotFound(record_id));
        }
        self.gate.authorize(
            caller,
            Action::ReadRecord {
                owner_id: record.owner_id(),
            },
        )?;

        Ok(record.clone())
    }

    /// Ordered snapshot of one owner's Active records
    ///
    /// The returned vector is a finite, restartable view: callers may
    /// iterate it any number of times without touching the store again.
    pub fn list_by_owner(
        &self,
        owner_id: Uuid,
        sort_key: SortKey,
        direction: SortDirection,
    ) -> Vec<VisitRecord> {
        let mut records: Vec<VisitRecord> = {
            let map = read_guard(&self.records);
            map.values()
                .filter_map(|shared| {
                    let record = read_guard(shared);
                    (record.is_active() && record.owner_id() == owner_id)
                        .then(|| record.clone())
                })
                .collect()
        };

        records.sort_by(|a, b| compare_records(a, b, sort_key, direction));
        records
    }

    /// Snapshot of all Active records, for aggregation scans
    pub fn snapshot_active(&self) -> Vec<VisitRecord> {
        let map = read_guard(&self.records);
        map.values()
            .filter_map(|shared| {
                let record = read_guard(shared);
                record.is_active().then(|| record.clone())
            })
            .collect()
    }

    /// Current change sequence; bumped by every successful mutation
    pub fn change_seq(&self) -> u64 {
        self.change_seq.load(AtomicOrdering::SeqCst)
    }

    /// Apply a replayed event without authorization or validation
    ///
    /// Replay trusts the event log: records arrive as full snapshots taken
    /// after the original, already-authorized mutation.
    pub fn apply_replayed(&self, event: VisitEvent) {
        match event {
            VisitEvent::VisitCreated { record } | VisitEvent::VisitUpdated { record, .. } => {
                let mut map = write_guard(&self.records);
                map.insert(record.id(), Arc::new(RwLock::new(record)));
            }
            VisitEvent::VisitDeleted { record_id, .. } => {
                let shared = {
                    let map = read_guard(&self.records);
                    map.get(&record_id).cloned()
                };
                match shared {
                    Some(shared) => {
                        let mut record = write_guard(&shared);
                        if record.delete().is_err() {
                            tracing::warn!(
                                record_id = %record_id,
                                "replayed delete for already-deleted record"
                            );
                        }
                    }
                    None => {
                        tracing::warn!(
                            record_id = %record_id,
                            "replayed delete for unknown record, skipping"
                        );
                    }
                }
            }
        }
        self.bump_seq();
    }

    fn lookup(&self, record_id: Uuid) -> Result<SharedRecord, DomainError> {
        let map = read_guard(&self.records);
        map.get(&record_id)
            .cloned()
            .ok_or(DomainError::NotFound(record_id))
    }

    fn bump_seq(&self) {
        self.change_seq.fetch_add(1, AtomicOrdering::SeqCst);
    }
}

fn compare_records(
    a: &VisitRecord,
    b: &VisitRecord,
    sort_key: SortKey,
    direction: SortDirection,
) -> Ordering {
    let primary = match sort_key {
        SortKey::Date => a.visit_date().cmp(&b.visit_date()),
        SortKey::Location => a.location().key().cmp(&b.location().key()),
    };
    let primary = match direction {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };

    // Tie-break on (created_at, id) so repeated queries return identical
    // orderings regardless of direction.
    primary
        .then_with(|| a.created_at().cmp(&b.created_at()))
        .then_with(|| a.id().cmp(&b.id()))
}

fn read_guard<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_guard<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
