//! Aggregation module
//!
//! Derived, recomputable views over the visit store. Aggregates are never
//! persisted as sources of truth: they are rebuilt from the store on query
//! or maintained incrementally from store events, with the store as the
//! single source of truth for reconciliation.

mod engine;

pub use engine::{AggregationEngine, AggregationMode};

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::LocationKey;

/// Per-user derived counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAggregate {
    pub owner_id: Uuid,
    /// Active visits by this user
    pub visit_count: u64,
    /// Distinct normalized locations this user has visited
    pub distinct_location_count: u64,
}

/// Per-location derived counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationAggregate {
    pub location: LocationKey,
    /// Active visits to this location, repeat visits included
    pub visit_count: u64,
    /// Distinct users with at least one active visit here
    pub distinct_visitors: HashSet<Uuid>,
}

impl LocationAggregate {
    pub fn distinct_visitor_count(&self) -> u64 {
        self.distinct_visitors.len() as u64
    }
}
