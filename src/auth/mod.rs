//! Authorization module
//!
//! The single authorization chokepoint. Every read of private data and
//! every mutation goes through [`AuthorizationGate::authorize`]; no other
//! component re-implements the policy.

mod tokens;

pub use tokens::{hash_token, TokenRegistry};

use uuid::Uuid;

use crate::domain::{CallerIdentity, DomainError};

/// An operation a caller wants to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a visit owned by the caller
    CreateVisit,
    /// Read a single record, notes included
    ReadRecord { owner_id: Uuid },
    /// Read one user's visit history
    ReadHistory { owner_id: Uuid },
    /// Edit an existing record
    UpdateVisit { owner_id: Uuid },
    /// Tombstone an existing record
    DeleteVisit { owner_id: Uuid },
    /// Read aggregate or leaderboard data; exposes counts, never notes
    ReadAggregates,
}

impl Action {
    fn describe(&self) -> &'static str {
        match self {
            Action::CreateVisit => "create visit",
            Action::ReadRecord { .. } => "read visit",
            Action::ReadHistory { .. } => "read history",
            Action::UpdateVisit { .. } => "update visit",
            Action::DeleteVisit { .. } => "delete visit",
            Action::ReadAggregates => "read aggregates",
        }
    }
}

/// Capability check consulted before every scoped operation
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGate;

impl AuthorizationGate {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether `caller` may perform `action`
    ///
    /// Policy: aggregate reads and creation of one's own records are open
    /// to every authenticated caller; owner-scoped reads and all mutations
    /// require the caller to be the owner or to hold the administrative
    /// capability.
    pub fn authorize(
        &self,
        caller: &CallerIdentity,
        action: Action,
    ) -> Result<(), DomainError> {
        let owner_id = match action {
            Action::CreateVisit | Action::ReadAggregates => return Ok(()),
            Action::ReadRecord { owner_id }
            | Action::ReadHistory { owner_id }
            | Action::UpdateVisit { owner_id }
            | Action::DeleteVisit { owner_id } => owner_id,
        };

        if caller.is_owner(owner_id) || caller.admin {
            Ok(())
        } else {
            Err(DomainError::forbidden(format!(
                "caller {} may not {} owned by {}",
                caller.user_id,
                action.describe(),
                owner_id
            )))
        }
    }
}
