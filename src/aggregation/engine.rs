//! Aggregation Engine
//!
//! Computes per-user and per-location counts from the visit store, either
//! by full recomputation on every query or by incremental maintenance of
//! tallies fed from store events.
//!
//! Consistency: a full scan records the store change sequence before and
//! after collecting records. A mismatch means the scan raced a mutation;
//! the scan is retried a bounded number of times and, if still racing, the
//! last snapshot is served best-effort instead of failing the query.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockWriteGuard};

use uuid::Uuid;

use crate::domain::{DomainError, LocationKey, VisitEvent, VisitRecord};
use crate::store::VisitStore;

use super::{LocationAggregate, UserAggregate};

/// Bounded retries for a scan that raced a store mutation
const MAX_SCAN_RETRIES: u32 = 3;

/// Recompute policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    /// Recompute from a full store scan on every query
    Full,
    /// Maintain tallies from store events, reconciled periodically
    Incremental,
}

/// Raw tallies the public aggregates are derived from.
///
/// Both maps count active visits, so a delete can decrement precisely:
/// per user we keep visits per location key, per location we keep visits
/// per visitor.
#[derive(Debug, Default)]
struct Tallies {
    by_user: HashMap<Uuid, HashMap<LocationKey, u64>>,
    by_location: HashMap<LocationKey, HashMap<Uuid, u64>>,
    /// Store sequence the tallies were last rebuilt at
    rebuilt_at_seq: u64,
    /// False until the first rebuild; Full mode never sets it
    fresh: bool,
}

impl Tallies {
    fn rebuild_from(records: &[VisitRecord], seq: u64) -> Self {
        let mut tallies = Self {
            rebuilt_at_seq: seq,
            fresh: true,
            ..Default::default()
        };
        for record in records {
            tallies.add(record.owner_id(), record.location().key());
        }
        tallies
    }

    fn add(&mut self, owner_id: Uuid, location: LocationKey) {
        *self
            .by_user
            .entry(owner_id)
            .or_default()
            .entry(location.clone())
            .or_insert(0) += 1;
        *self
            .by_location
            .entry(location)
            .or_default()
            .entry(owner_id)
            .or_insert(0) += 1;
    }

    fn remove(&mut self, owner_id: Uuid, location: &LocationKey) {
        if let Some(per_location) = self.by_user.get_mut(&owner_id) {
            if let Some(count) = per_location.get_mut(location) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    per_location.remove(location);
                }
            }
            if per_location.is_empty() {
                self.by_user.remove(&owner_id);
            }
        }
        if let Some(per_visitor) = self.by_location.get_mut(location) {
            if let Some(count) = per_visitor.get_mut(&owner_id) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    per_visitor.remove(&owner_id);
                }
            }
            if per_visitor.is_empty() {
                self.by_location.remove(location);
            }
        }
    }

    fn user_aggregates(&self) -> HashMap<Uuid, UserAggregate> {
        self.by_user
            .iter()
            .map(|(owner_id, per_location)| {
                (
                    *owner_id,
                    UserAggregate {
                        owner_id: *owner_id,
                        visit_count: per_location.values().sum(),
                        distinct_location_count: per_location.len() as u64,
                    },
                )
            })
            .collect()
    }

    fn location_aggregates(&self) -> HashMap<LocationKey, LocationAggregate> {
        self.by_location
            .iter()
            .map(|(location, per_visitor)| {
                (
                    location.clone(),
                    LocationAggregate {
                        location: location.clone(),
                        visit_count: per_visitor.values().sum(),
                        distinct_visitors: per_visitor.keys().copied().collect(),
                    },
                )
            })
            .collect()
    }
}

/// Derives aggregates from the store; see module docs for the consistency
/// protocol.
#[derive(Debug)]
pub struct AggregationEngine {
    store: Arc<VisitStore>,
    mode: AggregationMode,
    tallies: RwLock<Tallies>,
    /// Overlapping reconcile triggers coalesce on this lock
    reconcile_guard: Mutex<()>,
}

impl AggregationEngine {
    pub fn new(store: Arc<VisitStore>, mode: AggregationMode) -> Self {
        Self {
            store,
            mode,
            tallies: RwLock::new(Tallies::default()),
            reconcile_guard: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    /// Feed a store event into the engine
    ///
    /// In Incremental mode this applies the delta directly; in Full mode
    /// nothing is cached, so there is nothing to invalidate and the next
    /// query rescans anyway. A delta may race a concurrent rebuild and be
    /// counted twice; the reconcile pass bounds that drift.
    pub fn apply(&self, event: &VisitEvent) {
        if self.mode != AggregationMode::Incremental {
            return;
        }

        let mut tallies = self.write_tallies();
        if !tallies.fresh {
            // Nothing to patch yet; the first query rebuilds from scratch.
            return;
        }
        match event {
            VisitEvent::VisitCreated { record } => {
                tallies.add(record.owner_id(), record.location().key());
            }
            VisitEvent::VisitUpdated {
                record,
                previous_location,
            } => {
                let current = record.location().key();
                if current != *previous_location {
                    tallies.remove(record.owner_id(), previous_location);
                    tallies.add(record.owner_id(), current);
                }
            }
            VisitEvent::VisitDeleted {
                owner_id, location, ..
            } => {
                tallies.remove(*owner_id, location);
            }
        }
    }

    /// Per-user aggregates for every user with at least one active visit
    pub fn aggregate_by_user(&self) -> HashMap<Uuid, UserAggregate> {
        self.with_current_tallies(Tallies::user_aggregates)
    }

    /// Per-location aggregates for every location with at least one active
    /// visit
    pub fn aggregate_by_location(&self) -> HashMap<LocationKey, LocationAggregate> {
        self.with_current_tallies(Tallies::location_aggregates)
    }

    /// Rebuild tallies from a full store scan, replacing incremental state
    ///
    /// Returns false when another reconcile is already in flight; the
    /// trigger is coalesced rather than queued.
    pub fn reconcile(&self) -> bool {
        let Ok(_guard) = self.reconcile_guard.try_lock() else {
            tracing::debug!("reconcile already in flight, coalescing");
            return false;
        };

        let (seq, records) = self.scan_best_effort();
        let rebuilt = Tallies::rebuild_from(&records, seq);

        let mut tallies = self.write_tallies();
        if tallies.fresh {
            let drift = count_drift(&tallies, &rebuilt);
            if drift > 0 {
                tracing::warn!(
                    drift,
                    previous_seq = tallies.rebuilt_at_seq,
                    seq,
                    "aggregation drift detected, tallies replaced by full recompute"
                );
            }
        }
        *tallies = rebuilt;
        true
    }

    fn with_current_tallies<T>(&self, derive: impl Fn(&Tallies) -> T) -> T {
        if self.mode == AggregationMode::Incremental {
            let tallies = self.tallies.read().unwrap_or_else(PoisonError::into_inner);
            if tallies.fresh {
                return derive(&tallies);
            }
        }

        // Full mode, or first incremental query: rebuild from a scan.
        let (seq, records) = self.scan_best_effort();
        let rebuilt = Tallies::rebuild_from(&records, seq);
        let result = derive(&rebuilt);
        if self.mode == AggregationMode::Incremental {
            let mut tallies = self.write_tallies();
            if !tallies.fresh {
                *tallies = rebuilt;
            }
        }
        result
    }

    /// Scan the store, retrying while the change sequence moves under us
    fn scan_best_effort(&self) -> (u64, Vec<VisitRecord>) {
        let mut last_error = None;
        for _ in 0..MAX_SCAN_RETRIES {
            let before = self.store.change_seq();
            let records = self.store.snapshot_active();
            let after = self.store.change_seq();

            if before == after {
                return (after, records);
            }
            last_error = Some(DomainError::Consistency {
                expected: before,
                observed: after,
            });
        }

        // Still racing after bounded retries; serve the latest snapshot
        // rather than failing the query.
        let before = self.store.change_seq();
        let records = self.store.snapshot_active();
        if let Some(err) = last_error {
            tracing::warn!(error = %err, "aggregation scan stayed inconsistent, serving best-effort snapshot");
        }
        (before, records)
    }

    fn write_tallies(&self) -> RwLockWriteGuard<'_, Tallies> {
        self.tallies.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Number of (owner, location) tally cells whose counts differ
fn count_drift(current: &Tallies, rebuilt: &Tallies) -> usize {
    let mut drift = 0;
    for (owner_id, per_location) in &rebuilt.by_user {
        for (location, count) in per_location {
            let have = current
                .by_user
                .get(owner_id)
                .and_then(|m| m.get(location))
                .copied()
                .unwrap_or(0);
            if have != *count {
                drift += 1;
            }
        }
    }
    for (owner_id, per_location) in &current.by_user {
        for location in per_location.keys() {
            let exists = rebuilt
                .by_user
                .get(owner_id)
                .is_some_and(|m| m.contains_key(location));
            if !exists {
                drift += 1;
            }
        }
    }
    drift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CallerIdentity, Location, NewVisit, VisitPatch};
    use chrono::NaiveDate;

    fn visit(place: &str, lat: f64, lon: f64) -> NewVisit {
        NewVisit {
            location: Location::new(place, lat, lon).unwrap(),
            visit_date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            notes: String::new(),
        }
    }

    fn setup(mode: AggregationMode) -> (Arc<VisitStore>, AggregationEngine) {
        let store = Arc::new(VisitStore::new());
        let engine = AggregationEngine::new(store.clone(), mode);
        (store, engine)
    }

    /// A visits Lisbon, Lisbon, Porto; B visits Lisbon.
    fn seed_scenario(
        store: &VisitStore,
        engine: &AggregationEngine,
    ) -> (CallerIdentity, CallerIdentity, LocationKey) {
        let a = CallerIdentity::user(Uuid::new_v4());
        let b = CallerIdentity::user(Uuid::new_v4());
        let l1 = ("Lisbon", 38.7223, -9.1393);
        let l2 = ("Porto", 41.1579, -8.6291);

        for (place, lat, lon) in [l1, l1, l2] {
            let (_, event) = store.create(&a, visit(place, lat, lon)).unwrap();
            engine.apply(&event);
        }
        let (_, event) = store.create(&b, visit(l1.0, l1.1, l1.2)).unwrap();
        engine.apply(&event);

        (a, b, LocationKey::from_coordinates(l1.1, l1.2))
    }

    #[test]
    fn test_full_mode_counts_scenario() {
        let (store, engine) = setup(AggregationMode::Full);
        let (a, b, l1_key) = seed_scenario(&store, &engine);

        let by_user = engine.aggregate_by_user();
        assert_eq!(by_user[&a.user_id].distinct_location_count, 2);
        assert_eq!(by_user[&a.user_id].visit_count, 3);
        assert_eq!(by_user[&b.user_id].distinct_location_count, 1);

        let by_location = engine.aggregate_by_location();
        let l1 = &by_location[&l1_key];
        assert_eq!(l1.visit_count, 3);
        assert_eq!(l1.distinct_visitor_count(), 2);
        assert!(l1.visit_count >= l1.distinct_visitor_count());
    }

    #[test]
    fn test_incremental_mode_matches_full_recompute() {
        let (store, engine) = setup(AggregationMode::Incremental);
        let (a, _, l1_key) = seed_scenario(&store, &engine);

        // Prime incremental tallies, then mutate through events.
        assert_eq!(engine.aggregate_by_user()[&a.user_id].visit_count, 3);

        let (record, event) = store.create(&a, visit("Faro", 37.0194, -7.9304)).unwrap();
        engine.apply(&event);
        let event = store.delete(record.id(), &a).unwrap();
        engine.apply(&event);

        let incremental_users = engine.aggregate_by_user();
        let incremental_locations = engine.aggregate_by_location();

        let full = AggregationEngine::new(store.clone(), AggregationMode::Full);
        assert_eq!(incremental_users, full.aggregate_by_user());
        assert_eq!(incremental_locations, full.aggregate_by_location());
        assert_eq!(incremental_locations[&l1_key].visit_count, 3);
    }

    #[test]
    fn test_delete_removes_from_aggregates() {
        let (store, engine) = setup(AggregationMode::Incremental);
        let a = CallerIdentity::user(Uuid::new_v4());

        let (record, event) = store.create(&a, visit("Lisbon", 38.7223, -9.1393)).unwrap();
        engine.apply(&event);
        assert_eq!(engine.aggregate_by_user()[&a.user_id].visit_count, 1);

        let event = store.delete(record.id(), &a).unwrap();
        engine.apply(&event);

        assert!(engine.aggregate_by_user().get(&a.user_id).is_none());
        assert!(engine.aggregate_by_location().is_empty());
    }

    #[test]
    fn test_update_moves_visit_between_locations() {
        let (store, engine) = setup(AggregationMode::Incremental);
        let a = CallerIdentity::user(Uuid::new_v4());

        let (record, event) = store.create(&a, visit("Lisbon", 38.7223, -9.1393)).unwrap();
        engine.apply(&event);
        engine.aggregate_by_location(); // prime tallies

        let patch = VisitPatch {
            location: Some(Location::new("Porto", 41.1579, -8.6291).unwrap()),
            ..Default::default()
        };
        let (_, event) = store.update(record.id(), &a, patch).unwrap();
        engine.apply(&event);

        let by_location = engine.aggregate_by_location();
        let porto = LocationKey::from_coordinates(41.1579, -8.6291);
        let lisbon = LocationKey::from_coordinates(38.7223, -9.1393);
        assert_eq!(by_location[&porto].visit_count, 1);
        assert!(by_location.get(&lisbon).is_none());
    }

    #[test]
    fn test_reconcile_repairs_drifted_tallies() {
        let (store, engine) = setup(AggregationMode::Incremental);
        let a = CallerIdentity::user(Uuid::new_v4());

        let (record, event) = store.create(&a, visit("Lisbon", 38.7223, -9.1393)).unwrap();
        engine.apply(&event);
        engine.aggregate_by_user(); // prime tallies

        // Mutate the store without feeding the engine, simulating a lost
        // event notification.
        store.delete(record.id(), &a).unwrap();
        assert_eq!(engine.aggregate_by_user()[&a.user_id].visit_count, 1);

        assert!(engine.reconcile());
        assert!(engine.aggregate_by_user().get(&a.user_id).is_none());
    }

    #[test]
    fn test_aggregates_rebuilt_after_replay_without_events() {
        // Engine created over a store that was populated before the engine
        // saw any events (the startup replay path).
        let store = Arc::new(VisitStore::new());
        let a = CallerIdentity::user(Uuid::new_v4());
        store.create(&a, visit("Lisbon", 38.7223, -9.1393)).unwrap();

        let engine = AggregationEngine::new(store.clone(), AggregationMode::Incremental);
        assert_eq!(engine.aggregate_by_user()[&a.user_id].visit_count, 1);
    }
}
