//! Cancellable concurrent fetch pipeline
//!
//! A fixed-size pool of workers drains one shared FIFO queue. Each worker
//! claims an item with a non-blocking pop, fetches the bytes, persists them
//! into the content store, and runs the tag writer in the blocking pool.
//! Cancellation drains the unclaimed remainder of the queue; in-flight
//! fetches always run to completion, so no item is ever left half-claimed.
//!
//! Updated ledger entries travel back in worker reports rather than through
//! shared state: the control thread merges them after the pool has fully
//! drained, which keeps the ledger single-threaded.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::SyncError;
use crate::library::{MediaStore, SongEntry};
use crate::remote::MediaFetcher;
use crate::tags;

/// One song queued for fetch. The entry is snapshotted at submission so
/// workers never touch the ledger.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: String,
    pub entry: SongEntry,
}

/// Per-slot download percentages, the only progress surface the interaction
/// layer sees
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    pub slots: Vec<u8>,
}

/// What one worker did before its queue view emptied or it hit a failure
#[derive(Debug, Default)]
struct WorkerReport {
    completed: Vec<(String, SongEntry)>,
    failed: Vec<(String, SyncError)>,
}

/// Aggregate result of one pipeline invocation
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    /// Fetched, stored, and tagged items with their advanced entries
    pub completed: Vec<(String, SongEntry)>,
    /// Items whose fetch or tag write failed, isolated from the rest
    pub failed: Vec<(String, SyncError)>,
}

impl PipelineOutcome {
    /// First failure, for re-raising once all completions are merged
    pub fn take_first_error(&mut self) -> Option<(String, SyncError)> {
        if self.failed.is_empty() {
            None
        } else {
            Some(self.failed.remove(0))
        }
    }
}

/// Builds pipeline invocations over a fetcher and a content store
pub struct FetchPipeline {
    fetcher: Arc<dyn MediaFetcher>,
    store: MediaStore,
    parallel: usize,
    genre: String,
}

impl FetchPipeline {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        store: MediaStore,
        parallel: usize,
        genre: &str,
    ) -> Self {
        Self {
            fetcher,
            store,
            parallel: parallel.max(1),
            genre: genre.to_string(),
        }
    }

    /// Start one invocation over a worklist.
    ///
    /// Items are claimed in submission order; completion order is
    /// unspecified. The caller is responsible for the one-running-invocation
    /// guard per playlist.
    pub fn submit(&self, items: Vec<WorkItem>) -> FetchHandle {
        let submitted = items.len();
        let queue = Arc::new(Mutex::new(VecDeque::from(items)));
        let slots: Arc<Vec<AtomicU8>> =
            Arc::new((0..self.parallel).map(|_| AtomicU8::new(0)).collect());

        debug!(
            "Submitting {} items to {} fetch workers",
            submitted, self.parallel
        );

        let workers = (0..self.parallel)
            .map(|slot| {
                let queue = Arc::clone(&queue);
                let slots = Arc::clone(&slots);
                let fetcher = Arc::clone(&self.fetcher);
                let store = self.store.clone();
                let genre = self.genre.clone();
                tokio::spawn(run_worker(slot, queue, slots, fetcher, store, genre))
            })
            .collect();

        FetchHandle {
            queue,
            slots,
            workers,
        }
    }
}

/// Handle on one running invocation: progress, cancellation, and a
/// non-blocking completion poll
pub struct FetchHandle {
    queue: Arc<Mutex<VecDeque<WorkItem>>>,
    slots: Arc<Vec<AtomicU8>>,
    workers: Vec<JoinHandle<WorkerReport>>,
}

impl FetchHandle {
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Drain every not-yet-claimed item. Best-effort and non-blocking;
    /// in-flight fetches are not aborted. Returns how many items were
    /// drained.
    pub fn cancel(&self) -> usize {
        let Ok(mut queue) = self.queue.lock() else {
            return 0;
        };
        let drained = queue.len();
        queue.clear();
        if drained > 0 {
            debug!("Cancelled: drained {} unclaimed items", drained);
        }
        drained
    }

    /// Current per-slot percentages
    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            slots: self.slots.iter().map(|s| s.load(Ordering::Relaxed)).collect(),
        }
    }

    /// True once every worker has stopped
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(JoinHandle::is_finished)
    }

    /// Non-blocking completion check: `None` while any worker is still
    /// running, the aggregated outcome once the pool has fully drained.
    pub async fn poll(&mut self) -> Option<PipelineOutcome> {
        if !self.is_finished() {
            return None;
        }
        Some(self.collect().await)
    }

    /// Block until every worker has stopped and return the outcome
    pub async fn wait(mut self) -> PipelineOutcome {
        self.collect().await
    }

    async fn collect(&mut self) -> PipelineOutcome {
        let mut outcome = PipelineOutcome::default();

        for (slot, worker) in self.workers.drain(..).enumerate() {
            match worker.await {
                Ok(report) => {
                    outcome.completed.extend(report.completed);
                    outcome.failed.extend(report.failed);
                }
                Err(e) => {
                    error!("Fetch worker {} aborted: {}", slot, e);
                    outcome.failed.push((
                        format!("worker-{}", slot),
                        SyncError::FetchFailed {
                            id: format!("worker-{}", slot),
                            reason: format!("worker task aborted: {}", e),
                        },
                    ));
                }
            }
        }

        outcome
    }
}

/// Worker loop: claim, fetch, persist, tag, repeat.
///
/// The pop is non-blocking so a drained queue is observed promptly. A failed
/// item stops this worker's claims (its report carries the failure); sibling
/// workers keep draining the queue.
async fn run_worker(
    slot: usize,
    queue: Arc<Mutex<VecDeque<WorkItem>>>,
    slots: Arc<Vec<AtomicU8>>,
    fetcher: Arc<dyn MediaFetcher>,
    store: MediaStore,
    genre: String,
) -> WorkerReport {
    let mut report = WorkerReport::default();

    loop {
        let item = match queue.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(_) => None,
        };
        let Some(item) = item else {
            break;
        };

        slots[slot].store(0, Ordering::Relaxed);
        debug!("Worker {} fetching {}", slot, item.id);

        match fetch_one(slot, &item, &slots, &fetcher, &store, &genre).await {
            Ok(entry) => {
                slots[slot].store(100, Ordering::Relaxed);
                report.completed.push((item.id, entry));
            }
            Err(e) => {
                warn!("Worker {} failed on {}: {}", slot, item.id, e);
                report.failed.push((item.id, e));
                break;
            }
        }
    }

    report
}

async fn fetch_one(
    slot: usize,
    item: &WorkItem,
    slots: &Arc<Vec<AtomicU8>>,
    fetcher: &Arc<dyn MediaFetcher>,
    store: &MediaStore,
    genre: &str,
) -> Result<SongEntry, SyncError> {
    let progress_slots = Arc::clone(slots);
    let on_progress = move |pct: u8| {
        // 100 is reserved for the fully tagged item
        progress_slots[slot].store(pct.min(99), Ordering::Relaxed);
    };

    let media = fetcher.fetch(&item.id, &on_progress).await?;
    let (_, digest) = store.write(&item.id, &media.extension, &media.data).await?;

    let mut entry = item.entry.clone();
    entry.sha256 = Some(digest);

    // Tagging is blocking lofty work; keep it off the async runtime
    let blocking_store = store.clone();
    let id = item.id.clone();
    let blocking_entry = entry.clone();
    let genre = genre.to_string();
    tokio::task::spawn_blocking(move || {
        tags::write_tags(&blocking_store, &id, &blocking_entry, &genre)
    })
    .await
    .map_err(|e| SyncError::FetchFailed {
        id: item.id.clone(),
        reason: format!("tag task aborted: {}", e),
    })?
}
