use std::collections::HashMap;

use crate::jobs::record::JobRecord;
use crate::registry::ConnId;

/// Outcome of a bid against a pending job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidOutcome {
    /// First accepted bid; the job is now claimed.
    Won,
    /// The job was already claimed by an earlier bid.
    Lost,
}

/// Mapping from server-assigned job id to its live record.
///
/// Owned and mutated exclusively by the coordinator task, so it carries no
/// interior locking. Id uniqueness is guaranteed by the generator, not
/// checked on insert.
#[derive(Debug, Default)]
pub struct PendingTable {
    jobs: HashMap<String, JobRecord>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh unclaimed record for `job_id`.
    pub fn insert(&mut self, job_id: String, submitter: ConnId) {
        self.jobs.insert(job_id, JobRecord::new(submitter));
    }

    pub fn get(&self, job_id: &str) -> Option<&JobRecord> {
        self.jobs.get(job_id)
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.jobs.contains_key(job_id)
    }

    /// Register a bid. The first bid wins and claims the job; every later
    /// bid loses. Returns `None` for ids with no live record.
    pub fn claim(&mut self, job_id: &str) -> Option<BidOutcome> {
        let record = self.jobs.get_mut(job_id)?;
        if record.claimed {
            Some(BidOutcome::Lost)
        } else {
            record.claimed = true;
            Some(BidOutcome::Won)
        }
    }

    pub fn remove(&mut self, job_id: &str) -> Option<JobRecord> {
        self.jobs.remove(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
