//! Caller Identity
//!
//! The authenticated identity attached to every request. Credential
//! verification happens outside this crate; the token layer hands us an
//! opaque, already-authenticated identity and we trust it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// The user this caller acts as
    pub user_id: Uuid,

    /// Administrative capability: may read and mutate records owned by
    /// other users
    pub admin: bool,
}

impl CallerIdentity {
    /// A regular user caller
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id,
            admin: false,
        }
    }

    /// A caller holding the administrative capability
    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            admin: true,
        }
    }

    /// Check whether this caller owns the given identity
    pub fn is_owner(&self, owner_id: Uuid) -> bool {
        self.user_id == owner_id
    }
}
