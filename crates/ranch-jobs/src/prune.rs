//! Retention pruning of finished jobs.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::store::JobStore;

/// Remove every finished job whose age exceeds `retention`.
///
/// Returns how many records were removed. Queued and running jobs are never
/// touched.
pub(crate) fn prune(store: &mut JobStore, now: DateTime<Utc>, retention: Duration) -> usize {
    let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);

    let mut stale = Vec::new();
    store.for_each(|record| {
        if !record.status.is_terminal() {
            return;
        }
        if let Some(finished_at) = record.finished_at
            && now.signed_duration_since(finished_at) > retention
        {
            stale.push(record.id.clone());
        }
    });

    for id in &stale {
        store.delete(id);
    }
    stale.len()
}
