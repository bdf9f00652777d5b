//! History Query Service
//!
//! Filtered, sorted view of one user's visits. Access is owner-or-admin
//! scoped through the authorization gate; ordering is deterministic so
//! repeated queries without intervening mutation return identical output.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{Action, AuthorizationGate};
use crate::domain::{CallerIdentity, DomainError, VisitRecord};
use crate::store::{SortDirection, SortKey, VisitStore};

/// Read service over one owner's records
#[derive(Debug, Clone)]
pub struct HistoryService {
    store: Arc<VisitStore>,
    gate: AuthorizationGate,
}

impl HistoryService {
    pub fn new(store: Arc<VisitStore>) -> Self {
        Self {
            store,
            gate: AuthorizationGate::new(),
        }
    }

    /// Ordered history of `owner_id`'s active visits
    ///
    /// Fails with Forbidden unless the caller is the owner or holds the
    /// administrative capability.
    pub fn history(
        &self,
        caller: &CallerIdentity,
        owner_id: Uuid,
        sort_key: SortKey,
        direction: SortDirection,
    ) -> Result<Vec<VisitRecord>, DomainError> {
        self.gate
            .authorize(caller, Action::ReadHistory { owner_id })?;

        Ok(self.store.list_by_owner(owner_id, sort_key, direction))
    }
}
