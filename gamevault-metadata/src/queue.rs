//! In-process merge job queue, deduplicated by entry id.
//!
//! An entry id is tracked from the moment it is added until its job guard is
//! dropped, so adding it again while it is pending or being processed is a
//! no-op. Jobs are handed out in FIFO order.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<i64>,
    /// Pending and in-flight ids.
    tracked: HashSet<i64>,
    in_flight: usize,
    closed: bool,
}

/// Merge jobs waiting to be processed.
#[derive(Debug, Default)]
pub struct MergeQueue {
    state: Mutex<QueueState>,
    changed: Notify,
}

/// A job taken from the queue. Dropping it marks the entry as done.
#[derive(Debug)]
pub struct MergeJob<'a> {
    entry_id: i64,
    queue: &'a MergeQueue,
}

impl MergeJob<'_> {
    pub fn entry_id(&self) -> i64 {
        self.entry_id
    }
}

impl Drop for MergeJob<'_> {
    fn drop(&mut self) {
        self.queue.finish(self.entry_id);
    }
}

impl MergeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a merge for `entry_id` unless one is already pending or in
    /// flight. Returns true if the job was newly queued.
    pub fn add(&self, entry_id: i64) -> bool {
        let added = {
            let mut state = self.lock();
            if state.closed || !state.tracked.insert(entry_id) {
                false
            } else {
                state.pending.push_back(entry_id);
                true
            }
        };
        if added {
            log::debug!("Queued merge job for entry {}", entry_id);
            self.changed.notify_waiters();
        }
        added
    }

    /// Take the next job without waiting.
    pub fn try_next(&self) -> Option<MergeJob<'_>> {
        let mut state = self.lock();
        let entry_id = state.pending.pop_front()?;
        state.in_flight += 1;
        Some(MergeJob {
            entry_id,
            queue: self,
        })
    }

    /// Wait for the next job. Returns `None` once the queue is closed and
    /// no jobs remain.
    pub async fn next(&self) -> Option<MergeJob<'_>> {
        self.next_when(|state| state.closed).await
    }

    /// Wait for the next job. Returns `None` as soon as nothing is pending
    /// and nothing is in flight, i.e. no more jobs can appear from workers.
    pub async fn next_until_idle(&self) -> Option<MergeJob<'_>> {
        self.next_when(|state| state.closed || state.in_flight == 0)
            .await
    }

    async fn next_when(&self, give_up: impl Fn(&QueueState) -> bool) -> Option<MergeJob<'_>> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(entry_id) = state.pending.pop_front() {
                    state.in_flight += 1;
                    return Some(MergeJob {
                        entry_id,
                        queue: self,
                    });
                }
                if give_up(&state) {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Stop accepting jobs and wake every waiter. Pending jobs are still
    /// handed out.
    pub fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn contains(&self, entry_id: i64) -> bool {
        self.lock().tracked.contains(&entry_id)
    }

    /// Number of pending (not yet taken) jobs.
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// True when nothing is pending and nothing is being processed.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.pending.is_empty() && state.in_flight == 0
    }

    fn finish(&self, entry_id: i64) {
        {
            let mut state = self.lock();
            state.tracked.remove(&entry_id);
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.changed.notify_waiters();
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/queue_tests.rs"]
mod tests;
