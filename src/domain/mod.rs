//! Domain module
//!
//! Core domain types and business rules.

pub mod error;
pub mod events;
pub mod identity;
pub mod location;
pub mod visit;

pub use error::DomainError;
pub use events::VisitEvent;
pub use identity::CallerIdentity;
pub use location::{Location, LocationKey};
pub use visit::{NewVisit, VisitPatch, VisitRecord, VisitStatus};
