use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::snapshot::SaveSnapshot;
use super::{LoadError, SaveError, SaveStore};

const WORKER_STOPPED: &str = "save worker stopped";

/// Completion of a save or load request, tagged with the request number
#[derive(Debug, Clone, PartialEq)]
pub enum SaveEvent {
    Saved { seq: u64 },
    SaveFailed { seq: u64, error: SaveError },
    Loaded { seq: u64, snapshot: Option<SaveSnapshot> },
    LoadFailed { seq: u64, error: LoadError },
}

impl SaveEvent {
    fn stopped_save(seq: u64) -> Self {
        SaveEvent::SaveFailed {
            seq,
            error: SaveError::Network(WORKER_STOPPED.to_string()),
        }
    }

    fn stopped_load(seq: u64) -> Self {
        SaveEvent::LoadFailed {
            seq,
            error: LoadError::Network(WORKER_STOPPED.to_string()),
        }
    }
}

enum Request {
    Save { seq: u64, snapshot: Box<SaveSnapshot> },
    Load { seq: u64 },
}

impl Request {
    fn seq(&self) -> u64 {
        match self {
            Request::Save { seq, .. } | Request::Load { seq } => *seq,
        }
    }
}

/// Background thread that owns a [`SaveStore`].
///
/// Requests never block the caller. Requests that queue up while the store
/// is busy collapse to the newest save and the newest load. A load result is
/// dropped on [`poll`](Self::poll) once any later request, save or load, has
/// been made, so an old remote state never overwrites newer live state.
///
/// If the thread dies, every request still waiting on it is reported as a
/// failure rather than vanishing.
pub struct SaveWorker {
    requests: Option<Sender<Request>>,
    events: Receiver<SaveEvent>,
    /// Failures raised on this side of the channel
    local: Vec<SaveEvent>,
    next_seq: u64,
    latest_save: u64,
    latest_load: u64,
    done_save: u64,
    done_load: u64,
    handle: Option<JoinHandle<()>>,
}

impl SaveWorker {
    pub fn spawn<S: SaveStore + 'static>(store: S) -> Self {
        let (request_tx, request_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("save-worker".to_string())
            .spawn(move || run(store, request_rx, event_tx))
            .map_err(|e| log::error!("Failed to start save worker: {}", e))
            .ok();

        Self {
            requests: Some(request_tx),
            events: event_rx,
            local: Vec::new(),
            next_seq: 1,
            latest_save: 0,
            latest_load: 0,
            done_save: 0,
            done_load: 0,
            handle,
        }
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Hand a request to the thread, or fail it on the spot if the thread is gone
    fn submit(&mut self, request: Request) {
        let seq = request.seq();
        let failed = match request {
            Request::Save { .. } => SaveEvent::stopped_save(seq),
            Request::Load { .. } => SaveEvent::stopped_load(seq),
        };
        let sent = self
            .requests
            .as_ref()
            .map_or(false, |tx| tx.send(request).is_ok());
        if !sent {
            log::warn!("Save worker is gone, request {} failed", seq);
            self.record(&failed);
            self.local.push(failed);
        }
    }

    /// Queue a save of `snapshot`; returns the request number
    pub fn request_save(&mut self, snapshot: SaveSnapshot) -> u64 {
        let seq = self.take_seq();
        self.latest_save = seq;
        self.submit(Request::Save {
            seq,
            snapshot: Box::new(snapshot),
        });
        seq
    }

    /// Queue a load; returns the request number
    pub fn request_load(&mut self) -> u64 {
        let seq = self.take_seq();
        self.latest_load = seq;
        self.submit(Request::Load { seq });
        seq
    }

    fn record(&mut self, event: &SaveEvent) {
        match event {
            SaveEvent::Saved { seq } | SaveEvent::SaveFailed { seq, .. } => {
                self.done_save = self.done_save.max(*seq);
            }
            SaveEvent::Loaded { seq, .. } | SaveEvent::LoadFailed { seq, .. } => {
                self.done_load = self.done_load.max(*seq);
            }
        }
    }

    /// Failures for the latest save and load the dead thread never answered
    fn abandoned(&mut self) -> Vec<SaveEvent> {
        let mut failed = Vec::new();
        if self.latest_save > self.done_save {
            failed.push(SaveEvent::stopped_save(self.latest_save));
            self.done_save = self.latest_save;
        }
        if self.latest_load > self.done_load {
            failed.push(SaveEvent::stopped_load(self.latest_load));
            self.done_load = self.latest_load;
        }
        if !failed.is_empty() {
            log::warn!("Save worker stopped with {} request(s) pending", failed.len());
        }
        failed
    }

    fn is_stale(&self, event: &SaveEvent) -> bool {
        match event {
            SaveEvent::Loaded { seq, .. } | SaveEvent::LoadFailed { seq, .. } => {
                *seq < self.latest_load || *seq < self.latest_save
            }
            _ => false,
        }
    }

    /// Completed requests since the last poll, without blocking
    pub fn poll(&mut self) -> Vec<SaveEvent> {
        let mut events = std::mem::take(&mut self.local);
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.record(&event);
                    events.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    events.extend(self.abandoned());
                    break;
                }
            }
        }
        events.into_iter().filter(|e| !self.is_stale(e)).collect()
    }

    /// Block up to `timeout` for the next non-stale completion
    pub fn wait(&mut self, timeout: Duration) -> Option<SaveEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.local.is_empty() {
                let event = self.local.remove(0);
                if self.is_stale(&event) {
                    continue;
                }
                return Some(event);
            }

            let left = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(left) {
                Ok(event) => {
                    self.record(&event);
                    if !self.is_stale(&event) {
                        return Some(event);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => {
                    let failed = self.abandoned();
                    if failed.is_empty() {
                        return None;
                    }
                    self.local.extend(failed);
                }
            }
        }
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop once queued work is done
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Keep only the newest save and newest load of a batch, in request order
fn coalesce(batch: Vec<Request>) -> Vec<Request> {
    let mut save = None;
    let mut load = None;
    for request in batch {
        match request {
            Request::Save { .. } => save = Some(request),
            Request::Load { .. } => load = Some(request),
        }
    }
    let mut out: Vec<Request> = save.into_iter().chain(load).collect();
    out.sort_by_key(Request::seq);
    out
}

fn run<S: SaveStore>(store: S, requests: Receiver<Request>, events: Sender<SaveEvent>) {
    while let Ok(first) = requests.recv() {
        let mut batch = vec![first];
        batch.extend(requests.try_iter());
        let queued = batch.len();
        let batch = coalesce(batch);
        if batch.len() < queued {
            log::debug!("Coalesced {} save requests into {}", queued, batch.len());
        }

        for request in batch {
            let event = match request {
                Request::Save { seq, snapshot } => match store.save(&snapshot) {
                    Ok(()) => SaveEvent::Saved { seq },
                    Err(error) => SaveEvent::SaveFailed { seq, error },
                },
                Request::Load { seq } => match store.load() {
                    Ok(snapshot) => SaveEvent::Loaded { seq, snapshot },
                    Err(error) => SaveEvent::LoadFailed { seq, error },
                },
            };
            if events.send(event).is_err() {
                return;
            }
        }
    }
}
