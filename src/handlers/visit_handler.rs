//! Visit Command Handlers
//!
//! Each handler runs one mutation end to end: gate-checked store change,
//! durable event-log append, then the aggregation delta. The store change
//! is the commit point; the log and the engine follow it.

use std::sync::Arc;

use crate::aggregation::AggregationEngine;
use crate::domain::{CallerIdentity, NewVisit, VisitEvent, VisitRecord};
use crate::error::AppError;
use crate::event_log::EventLog;
use crate::store::VisitStore;

use super::{CreateVisitCommand, DeleteVisitCommand, UpdateVisitCommand};

/// Shared wiring for the three mutation handlers
#[derive(Clone)]
struct MutationPipeline {
    store: Arc<VisitStore>,
    engine: Arc<AggregationEngine>,
    event_log: Option<Arc<EventLog>>,
}

impl MutationPipeline {
    /// Persist and project an event after the store accepted the mutation
    fn finish(&self, event: &VisitEvent) -> Result<(), AppError> {
        if let Some(log) = &self.event_log {
            log.append(event)?;
        }
        self.engine.apply(event);

        tracing::debug!(
            event_type = event.event_type(),
            record_id = %event.record_id(),
            owner_id = %event.owner_id(),
            "visit mutation applied"
        );
        Ok(())
    }
}

/// Handler for visit creation
pub struct CreateVisitHandler {
    pipeline: MutationPipeline,
}

impl CreateVisitHandler {
    pub fn new(
        store: Arc<VisitStore>,
        engine: Arc<AggregationEngine>,
        event_log: Option<Arc<EventLog>>,
    ) -> Self {
        Self {
            pipeline: MutationPipeline {
                store,
                engine,
                event_log,
            },
        }
    }

    /// Execute the create visit command
    pub fn execute(
        &self,
        command: CreateVisitCommand,
        caller: &CallerIdentity,
    ) -> Result<VisitRecord, AppError> {
        let new = NewVisit {
            location: command.location,
            visit_date: command.visit_date,
            notes: command.notes,
        };
        let (record, event) = self.pipeline.store.create(caller, new)?;
        self.pipeline.finish(&event)?;
        Ok(record)
    }
}

/// Handler for visit edits
pub struct UpdateVisitHandler {
    pipeline: MutationPipeline,
}

impl UpdateVisitHandler {
    pub fn new(
        store: Arc<VisitStore>,
        engine: Arc<AggregationEngine>,
        event_log: Option<Arc<EventLog>>,
    ) -> Self {
        Self {
            pipeline: MutationPipeline {
                store,
                engine,
                event_log,
            },
        }
    }

    /// Execute the update visit command
    pub fn execute(
        &self,
        command: UpdateVisitCommand,
        caller: &CallerIdentity,
    ) -> Result<VisitRecord, AppError> {
        let (record, event) = self
            .pipeline
            .store
            .update(command.record_id, caller, command.patch)?;
        self.pipeline.finish(&event)?;
        Ok(record)
    }
}

/// Handler for visit deletion
pub struct DeleteVisitHandler {
    pipeline: MutationPipeline,
}

impl DeleteVisitHandler {
    pub fn new(
        store: Arc<VisitStore>,
        engine: Arc<AggregationEngine>,
        event_log: Option<Arc<EventLog>>,
    ) -> Self {
        Self {
            pipeline: MutationPipeline {
                store,
                engine,
                event_log,
            },
        }
    }

    /// Execute the delete visit command
    pub fn execute(
        &self,
        command: DeleteVisitCommand,
        caller: &CallerIdentity,
    ) -> Result<(), AppError> {
        let event = self.pipeline.store.delete(command.record_id, caller)?;
        self.pipeline.finish(&event)?;
        Ok(())
    }
}
