//! Scheduled Jobs
//!
//! Background maintenance loops. The only recurring job is the aggregation
//! reconcile pass, which replaces incremental tallies with a full
//! recompute so lost or raced deltas cannot accumulate.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::aggregation::AggregationEngine;

/// Spawn the reconcile loop on the runtime
pub fn spawn_reconcile_loop(
    engine: Arc<AggregationEngine>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(run_reconcile_loop(engine, period))
}

/// Run aggregation reconciliation on a fixed period
pub async fn run_reconcile_loop(engine: Arc<AggregationEngine>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so startup does not
    // race the event log replay.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let started = std::time::Instant::now();
        if engine.reconcile() {
            tracing::debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "aggregation reconcile pass completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::AggregationMode;
    use crate::domain::{CallerIdentity, Location, NewVisit};
    use crate::store::VisitStore;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_loop_repairs_missed_events() {
        let store = Arc::new(VisitStore::new());
        let engine = Arc::new(AggregationEngine::new(
            store.clone(),
            AggregationMode::Incremental,
        ));
        let caller = CallerIdentity::user(Uuid::new_v4());

        let (record, event) = store
            .create(
                &caller,
                NewVisit {
                    location: Location::new("Lisbon", 38.7223, -9.1393).unwrap(),
                    visit_date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
                    notes: String::new(),
                },
            )
            .unwrap();
        engine.apply(&event);
        engine.aggregate_by_user(); // prime tallies

        // Mutate without notifying the engine
        store.delete(record.id(), &caller).unwrap();
        assert_eq!(engine.aggregate_by_user().len(), 1);

        let handle = spawn_reconcile_loop(engine.clone(), Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(11)).await;
        handle.abort();

        assert!(engine.aggregate_by_user().is_empty());
    }
}
