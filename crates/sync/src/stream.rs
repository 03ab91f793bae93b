use crate::SyncEngine;
use crate::model::{RecordRequest, SyncEntry, SyncOutcome};
use async_stream::stream;
use futures::Stream;

/// Progress events emitted by [`SyncEngine::sync_records_stream`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once, with the number of selected
///    records.
/// 2. [`Synced`](Self::Synced) once per selected record, in request order.
/// 3. [`Complete`](Self::Complete) exactly once, with the totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Started(u64),
    Synced(SyncEntry),
    Complete(SyncOutcome),
}

impl SyncEngine {
    /// Streaming form of [`sync_records`](Self::sync_records), for callers
    /// that report progress while a batch runs.
    pub fn sync_records_stream<'a>(&'a self, requests: &'a [RecordRequest]) -> impl Stream<Item = SyncEvent> + 'a {
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            let selected: Vec<&RecordRequest> = requests.iter().filter(|r| r.selected).collect();
            // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
            yield SyncEvent::Started(u64::try_from(selected.len()).unwrap_or(0));

            let mut outcome = SyncOutcome::default();
            for request in selected {
                let entry = self.sync_one(request).await;
                outcome.push(entry.clone());
                yield SyncEvent::Synced(entry);
            }

            yield SyncEvent::Complete(outcome);
        })
    }
}
