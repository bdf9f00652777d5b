//! Command Handlers module
//!
//! Handlers orchestrate a mutation across the store, the event log and the
//! aggregation engine.

mod commands;
mod visit_handler;


pub use commands::{CreateVisitCommand, DeleteVisitCommand, UpdateVisitCommand};
pub use visit_handler::{CreateVisitHandler, DeleteVisitHandler, UpdateVisitHandler};
