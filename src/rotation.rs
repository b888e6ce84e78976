//! The rotation queue: the display-side state machine.
//!
//! A single task owns the queue. It seeds itself from a snapshot of approved
//! records, folds live change events into the queue, and advances the shown
//! photo on a fixed cadence. Consumers watch a [`DisplayFrame`] channel; they
//! never touch the queue directly.
//!
//! Image URLs are resolved off the rotation task. Each advance tags the
//! in-flight resolution with the record id it was started for, and a result
//! is dropped unless that id is still the one on screen. A slow resolver can
//! therefore never paint a photo under the wrong record.

use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;

use crate::{
    model::{ChangeEvent, ModerationStatus, SubmissionRecord},
    ports::{BlobStore, RecordStore},
};

/// Buffer for resolved-URL handoffs back to the rotation task. At most one
/// resolution is interesting at a time; the rest are stale by construction.
const RESOLUTION_BUFFER: usize = 8;

/// What the queue holds per record: just the fields the wall renders.
#[derive(Clone, Debug, PartialEq)]
pub struct QueueItem {
    pub id: String,
    pub display_name: String,
    pub instagram: Option<String>,
    pub caption: Option<String>,
    pub pet_name: Option<String>,
    pub pet_age: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub storage_path: String,
}

impl From<SubmissionRecord> for QueueItem {
    fn from(r: SubmissionRecord) -> Self {
        Self {
            id: r.id,
            display_name: r.display_name,
            instagram: r.instagram,
            caption: r.caption,
            pet_name: r.pet_name,
            pet_age: r.pet_age,
            city: r.city,
            region: r.region,
            storage_path: r.storage_path,
        }
    }
}

/// What the wall shows right now.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayFrame {
    /// The record on screen, or `None` while the queue is empty.
    pub item: Option<QueueItem>,
    /// Resolved image URL. `None` while resolution is still in flight, so a
    /// consumer can show the text overlay immediately and the photo when it
    /// lands.
    pub image_url: Option<String>,
    /// Queue size at publish time, for the "N pets on the wall" counter.
    pub approved_count: usize,
}

/// Pure queue state. All mutation goes through the reducers below; the actor
/// in [`RotationQueue::run`] is just plumbing around them.
#[derive(Debug)]
pub struct RotationState {
    queue: Vec<QueueItem>,
    current: Option<QueueItem>,
    cap: usize,
}

impl RotationState {
    pub fn new(cap: usize) -> Self {
        Self {
            queue: Vec::new(),
            current: None,
            cap: cap.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn current(&self) -> Option<&QueueItem> {
        self.current.as_ref()
    }

    fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.id.as_str())
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.queue.iter().position(|q| q.id == id)
    }

    /// Replaces the queue with a fresh snapshot (newest first, truncated to
    /// the cap). The current photo survives only if it is still a member;
    /// with no current photo the head is seeded so the wall is never blank
    /// while items exist.
    pub fn load_snapshot(&mut self, records: Vec<SubmissionRecord>) {
        self.queue = records.into_iter().map(QueueItem::from).collect();
        self.queue.truncate(self.cap);

        let kept = self
            .current_id()
            .and_then(|id| self.position_of(id))
            .map(|pos| self.queue[pos].clone());
        self.current = match kept {
            // Refresh the copy in case fields changed under us.
            Some(item) => Some(item),
            None => self.queue.first().cloned(),
        };
    }

    /// Folds one change event into the queue.
    ///
    /// A row that is (still) approved is updated in place when already
    /// queued, otherwise prepended as the newest entry. Anything else means
    /// the row left the approved set and is removed. Eviction past the cap
    /// does not disturb the current photo even when that photo was evicted;
    /// the next advance lands back on the head.
    pub fn apply_change(&mut self, event: &ChangeEvent) {
        let Some(row) = event.row() else { return };
        let id = row.id.clone();

        if row.status == ModerationStatus::Approved {
            let item = QueueItem::from(row.clone());
            match self.position_of(&id) {
                Some(pos) => {
                    self.queue[pos] = item.clone();
                    if self.current_id() == Some(id.as_str()) {
                        self.current = Some(item.clone());
                    }
                }
                None => {
                    self.queue.insert(0, item.clone());
                    self.queue.truncate(self.cap);
                }
            }
            // A blank wall picks up the record that just arrived, wherever
            // it sits in the queue.
            if self.current.is_none() {
                self.current = Some(item);
            }
        } else {
            self.queue.retain(|q| q.id != id);
            if self.current_id() == Some(id.as_str()) {
                self.current = None;
            }
        }
    }

    /// Moves to the next photo and returns it. Order is queue order,
    /// wrapping; the position is looked up fresh each time, so inserts and
    /// removals since the last tick are respected. A current photo that is
    /// no longer queued restarts from the head.
    pub fn advance(&mut self) -> Option<&QueueItem> {
        if self.queue.is_empty() {
            self.current = None;
            return None;
        }
        let next = match self.current_id().and_then(|id| self.position_of(id)) {
            Some(pos) => (pos + 1) % self.queue.len(),
            None => 0,
        };
        self.current = Some(self.queue[next].clone());
        self.current.as_ref()
    }
}

struct Resolution {
    id: String,
    url: Option<String>,
}

/// Drives the rotation loop: snapshot, change feed, slide timer.
pub struct RotationQueue<R, B> {
    records: Arc<R>,
    blobs: Arc<B>,
    slide_interval: Duration,
    queue_cap: usize,
}

/// Owner-side handle for a spawned rotation loop.
pub struct RotationHandle {
    display: watch::Receiver<DisplayFrame>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RotationHandle {
    /// A fresh watch receiver; each consumer gets its own.
    pub fn display(&self) -> watch::Receiver<DisplayFrame> {
        self.display.clone()
    }

    /// Stops the loop and waits for the task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

impl<R, B> RotationQueue<R, B>
where
    R: RecordStore + 'static,
    B: BlobStore + 'static,
{
    pub fn new(
        records: Arc<R>,
        blobs: Arc<B>,
        slide_interval: Duration,
        queue_cap: usize,
    ) -> Self {
        Self {
            records,
            blobs,
            slide_interval,
            queue_cap,
        }
    }

    /// Spawns the rotation task and returns its handle. The first frame is
    /// published as soon as the startup snapshot lands; the first advance
    /// happens one full slide interval later.
    pub fn spawn(self) -> RotationHandle {
        let (display_tx, display_rx) = watch::channel(DisplayFrame::default());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(display_tx, cancel.clone()));
        RotationHandle {
            display: display_rx,
            cancel,
            task,
        }
    }

    async fn run(self, display: watch::Sender<DisplayFrame>, cancel: CancellationToken) {
        tracing::info!(
            interval_ms = self.slide_interval.as_millis() as u64,
            cap = self.queue_cap,
            "rotation started"
        );

        // Subscribe before the snapshot so no event can slip between them.
        let mut events = self.records.subscribe();
        let mut live_events = true;

        let mut state = RotationState::new(self.queue_cap);
        match self.records.list_approved(self.queue_cap).await {
            Ok(records) => state.load_snapshot(records),
            Err(error) => {
                tracing::warn!(%error, "startup snapshot failed, starting empty");
            }
        }

        let (url_tx, mut url_rx) = mpsc::channel::<Resolution>(RESOLUTION_BUFFER);

        // The id the wall currently shows, from the display side's point of
        // view. Resolutions for any other id are stale.
        let mut shown: Option<String> = None;
        self.sync_display(&state, &mut shown, &display, &url_tx);

        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.slide_interval,
            self.slide_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                _ = ticker.tick() => {
                    state.advance();
                    self.sync_display(&state, &mut shown, &display, &url_tx);
                }

                event = events.recv(), if live_events => match event {
                    Ok(event) => {
                        state.apply_change(&event);
                        self.sync_display(&state, &mut shown, &display, &url_tx);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "change feed lagged, resyncing from snapshot");
                        match self.records.list_approved(self.queue_cap).await {
                            Ok(records) => state.load_snapshot(records),
                            Err(error) => {
                                tracing::warn!(%error, "resync snapshot failed, keeping stale queue");
                            }
                        }
                        self.sync_display(&state, &mut shown, &display, &url_tx);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Timer keeps the wall rotating over what we have.
                        live_events = false;
                    }
                },

                Some(res) = url_rx.recv() => {
                    let on_screen = shown.as_deref() == Some(res.id.as_str())
                        && state.current_id() == Some(res.id.as_str());
                    if on_screen {
                        display.send_modify(|frame| frame.image_url = res.url);
                    } else {
                        tracing::debug!(id = %res.id, "discarding stale image resolution");
                    }
                }
            }
        }

        tracing::info!("rotation stopped");
    }

    /// Publishes the current frame. A change of record resets the image URL
    /// and kicks off a fresh resolution for the new record.
    fn sync_display(
        &self,
        state: &RotationState,
        shown: &mut Option<String>,
        display: &watch::Sender<DisplayFrame>,
        url_tx: &mpsc::Sender<Resolution>,
    ) {
        let current_id = state.current_id().map(str::to_string);
        let changed = *shown != current_id;

        if changed {
            *shown = current_id;
            display.send_replace(DisplayFrame {
                item: state.current().cloned(),
                image_url: None,
                approved_count: state.len(),
            });

            if let Some(item) = state.current() {
                let blobs = Arc::clone(&self.blobs);
                let id = item.id.clone();
                let key = item.storage_path.clone();
                let tx = url_tx.clone();
                tokio::spawn(async move {
                    let url = match blobs.public_url(&key).await {
                        Ok(url) => Some(url),
                        Err(error) => {
                            tracing::warn!(%error, key, "image url resolution failed");
                            None
                        }
                    };
                    let _ = tx.send(Resolution { id, url }).await;
                });
            }
        } else {
            // Same record on screen; refresh count and overlay fields only.
            display.send_modify(|frame| {
                frame.item = state.current().cloned();
                frame.approved_count = state.len();
            });
        }
    }
}
