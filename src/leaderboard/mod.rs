//! Leaderboard Service
//!
//! Stable, deterministic rankings over the aggregation engine's derived
//! state. Ordering is descending by count with ties broken by ascending
//! lexicographic identity, so pagination and test assertions are
//! reproducible.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::aggregation::AggregationEngine;
use crate::auth::{Action, AuthorizationGate};
use crate::domain::{CallerIdentity, DomainError, LocationKey};

/// One leaderboard row for a user, ranked by distinct locations visited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedUser {
    pub owner_id: Uuid,
    pub count: u64,
}

/// One leaderboard row for a location, ranked by total visits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedLocation {
    pub location: LocationKey,
    pub count: u64,
}

/// Read-only ranking view over the aggregation engine
#[derive(Debug, Clone)]
pub struct LeaderboardService {
    engine: Arc<AggregationEngine>,
    gate: AuthorizationGate,
}

impl LeaderboardService {
    pub fn new(engine: Arc<AggregationEngine>) -> Self {
        Self {
            engine,
            gate: AuthorizationGate::new(),
        }
    }

    /// Top users by distinct locations visited
    ///
    /// A limit beyond the number of available entries returns all entries.
    pub fn top_users(
        &self,
        caller: &CallerIdentity,
        limit: usize,
    ) -> Result<Vec<RankedUser>, DomainError> {
        self.gate.authorize(caller, Action::ReadAggregates)?;
        validate_limit(limit)?;

        let mut ranked: Vec<RankedUser> = self
            .engine
            .aggregate_by_user()
            .into_values()
            .map(|agg| RankedUser {
                owner_id: agg.owner_id,
                count: agg.distinct_location_count,
            })
            .collect();

        // Uuid byte order equals lexicographic order of the canonical hex
        // form, so this is the ascending-identity tie-break.
        ranked.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.owner_id.cmp(&b.owner_id))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Top locations by total active visits
    pub fn top_locations(
        &self,
        caller: &CallerIdentity,
        limit: usize,
    ) -> Result<Vec<RankedLocation>, DomainError> {
        self.gate.authorize(caller, Action::ReadAggregates)?;
        validate_limit(limit)?;

        let mut ranked: Vec<RankedLocation> = self
            .engine
            .aggregate_by_location()
            .into_values()
            .map(|agg| RankedLocation {
                count: agg.visit_count,
                location: agg.location,
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.location.cmp(&b.location))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }
}

fn validate_limit(limit: usize) -> Result<(), DomainError> {
    if limit == 0 {
        return Err(DomainError::validation("limit must be a positive integer"));
    }
    Ok(())
}
