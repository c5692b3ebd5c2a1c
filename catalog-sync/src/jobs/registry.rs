//! Job registry
//!
//! Every job gets a `watch` channel carrying its [`JobStatus`]; the API
//! reads the latest value, callers can await completion. Finished jobs are
//! kept up to a retention cap, oldest evicted first.

use std::collections::VecDeque;

use dashmap::DashMap;
use parking_lot::Mutex;
use shared::sync::{JobState, JobStatus};
use tokio::sync::watch;
use uuid::Uuid;

pub const DEFAULT_JOB_RETENTION: usize = 1000;

pub struct JobRegistry {
    jobs: DashMap<Uuid, watch::Sender<JobStatus>>,
    finished: Mutex<VecDeque<Uuid>>,
    retention: usize,
}

impl JobRegistry {
    pub fn new(retention: usize) -> Self {
        Self {
            jobs: DashMap::new(),
            finished: Mutex::new(VecDeque::new()),
            retention: retention.max(1),
        }
    }

    pub fn register(&self, status: JobStatus) -> watch::Receiver<JobStatus> {
        let job_id = status.job_id;
        let (tx, rx) = watch::channel(status);
        self.jobs.insert(job_id, tx);
        rx
    }

    /// Drop a job that never made it onto the queue
    pub fn remove(&self, job_id: &Uuid) {
        self.jobs.remove(job_id);
    }

    pub fn get(&self, job_id: &Uuid) -> Option<JobStatus> {
        self.jobs.get(job_id).map(|tx| tx.borrow().clone())
    }

    pub fn subscribe(&self, job_id: &Uuid) -> Option<watch::Receiver<JobStatus>> {
        self.jobs.get(job_id).map(|tx| tx.subscribe())
    }

    /// Apply `f` and publish; finished jobs enter the retention window
    pub fn update(&self, job_id: &Uuid, f: impl FnOnce(&mut JobStatus)) {
        let finished = match self.jobs.get(job_id) {
            Some(tx) => {
                let mut finished = false;
                tx.send_modify(|status| {
                    let was_finished = status.state.is_finished();
                    f(status);
                    finished = !was_finished && status.state.is_finished();
                });
                finished
            }
            None => return,
        };

        if finished {
            self.retire(*job_id);
        }
    }

    /// Whether the scope has a queued or running job
    pub fn has_active(&self, merchant_scope_id: &str) -> bool {
        self.jobs.iter().any(|entry| {
            let status = entry.value().borrow();
            status.merchant_scope_id == merchant_scope_id && !status.state.is_finished()
        })
    }

    pub fn count_in(&self, state: JobState) -> usize {
        self.jobs
            .iter()
            .filter(|entry| entry.value().borrow().state == state)
            .count()
    }

    fn retire(&self, job_id: Uuid) {
        let mut finished = self.finished.lock();
        finished.push_back(job_id);
        while finished.len() > self.retention {
            if let Some(old) = finished.pop_front() {
                self.jobs.remove(&old);
            }
        }
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_JOB_RETENTION)
    }
}
