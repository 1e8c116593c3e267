use chrono::{DateTime, Utc};

use crate::registry::ConnId;

/// Live state of a submitted job while it waits for a result.
///
/// `submitter` is an identity, not a handle; it is resolved against the
/// registry at write time and may be stale if the submitter disconnected
/// before completion.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub submitter: ConnId,
    /// Set by the first accepted bid, never reset.
    pub claimed: bool,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(submitter: ConnId) -> Self {
        Self {
            submitter,
            claimed: false,
            created_at: Utc::now(),
        }
    }
}
