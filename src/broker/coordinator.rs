use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{BrokerError, Result};
use crate::jobs::{BidOutcome, PendingTable};
use crate::registry::ConnId;
use crate::wire::{BrokerFrame, ClientFrame, Inbound, Outbound, Target};

pub const REASON_CLIENT_CANCEL: &str = "Client cancel";
pub const REASON_QUEUE_TIMEOUT: &str = "Queue timeout";

/// Unit of work for the coordinator: a frame read from a peer, or a
/// synthetic expiry marking the end of a job's bounded lifetime.
#[derive(Debug)]
pub enum Event {
    Frame(Inbound),
    Timeout { job_id: String },
}

/// Single-task owner of the pending table.
///
/// Every job state transition happens here, in event arrival order. Timeout
/// tasks re-enter through the event queue instead of touching the table, so
/// the table never needs a lock.
pub struct Coordinator {
    pending: PendingTable,
    queue_timeout: Duration,
    events: mpsc::UnboundedSender<Event>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Coordinator {
    pub fn new(
        queue_timeout: Duration,
        events: mpsc::UnboundedSender<Event>,
        outbound: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            pending: PendingTable::new(),
            queue_timeout,
            events,
            outbound,
        }
    }

    pub fn pending(&self) -> &PendingTable {
        &self.pending
    }

    /// Drain events until the queue closes or shutdown is requested.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<Event>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("coordinator stopping");
                    break;
                }
                event = events.recv() => {
                    match event {
                        Some(event) => self.process(event),
                        None => break,
                    }
                }
            }
        }
    }

    /// Apply one event to the job state machine. Failures here are routine
    /// for a lossy broker (malformed frames, references to dead jobs) and
    /// are dropped after a debug log.
    pub fn process(&mut self, event: Event) {
        if let Err(e) = self.apply(event) {
            tracing::debug!(error = %e, "dropping event");
        }
    }

    fn apply(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Frame(inbound) => self.apply_frame(inbound),
            Event::Timeout { job_id } => {
                self.expire(&job_id);
                Ok(())
            }
        }
    }

    fn apply_frame(&mut self, inbound: Inbound) -> Result<()> {
        let Inbound { origin, line } = inbound;
        let frame: ClientFrame = serde_json::from_str(&line)?;
        match frame {
            ClientFrame::Submit { id, topic, payload } => self.submit(origin, id, topic, payload),
            ClientFrame::Bid { id } => self.bid(origin, id),
            ClientFrame::Cancel { id } => self.cancel(origin, &id),
            ClientFrame::JobSuccess { id, value } => {
                tracing::debug!(job_id = %id, value = %value, "result received");
                self.forward_result(origin, &id, line)
            }
            ClientFrame::JobFailure { id, reason } => {
                tracing::debug!(job_id = %id, reason = %reason, "failure received");
                self.forward_result(origin, &id, line)
            }
        }
    }

    /// Accept a submission: ack it, record it, fan it out to the other
    /// peers under a fresh server id, and start its lifetime clock.
    fn submit(&mut self, origin: ConnId, client_id: String, topic: String, payload: Value) -> Result<()> {
        let job_id = Uuid::new_v4().to_string();

        self.send(
            origin,
            Target::Direct,
            &BrokerFrame::SubmitAck {
                id: job_id.clone(),
                client_id,
            },
        );

        self.pending.insert(job_id.clone(), origin);
        self.schedule_timeout(job_id.clone());

        self.send(
            origin,
            Target::Spread,
            &BrokerFrame::Submit {
                id: job_id.clone(),
                topic,
                payload,
            },
        );

        tracing::info!(job_id = %job_id, conn = %origin, "job submitted");
        Ok(())
    }

    /// First bid claims the job and is acked; every later bid is rejected.
    /// Bids against unknown ids get no reply at all.
    fn bid(&mut self, origin: ConnId, job_id: String) -> Result<()> {
        match self.pending.claim(&job_id) {
            Some(BidOutcome::Won) => {
                tracing::info!(job_id = %job_id, conn = %origin, "bid accepted");
                self.send(origin, Target::Direct, &BrokerFrame::BidAck { id: job_id });
                Ok(())
            }
            Some(BidOutcome::Lost) => {
                self.send(origin, Target::Direct, &BrokerFrame::BidReject { id: job_id });
                Ok(())
            }
            None => Err(BrokerError::UnknownJob(job_id)),
        }
    }

    /// Cancellation is only honored from the job's submitter; anyone else
    /// referencing a live id is dropped without a reply.
    fn cancel(&mut self, origin: ConnId, job_id: &str) -> Result<()> {
        let record = self
            .pending
            .get(job_id)
            .ok_or_else(|| BrokerError::UnknownJob(job_id.to_string()))?;
        if record.submitter != origin {
            return Err(BrokerError::NotSubmitter(job_id.to_string()));
        }

        self.send(
            origin,
            Target::Direct,
            &BrokerFrame::JobFailure {
                id: job_id.to_string(),
                reason: REASON_CLIENT_CANCEL.to_string(),
            },
        );
        self.pending.remove(job_id);

        tracing::info!(job_id = %job_id, "job cancelled by submitter");
        Ok(())
    }

    /// Route a worker's terminal frame to the submitter, byte for byte as it
    /// arrived. The record is reaped here so a later timeout finds nothing
    /// and the submitter sees exactly one terminal frame.
    fn forward_result(&mut self, origin: ConnId, job_id: &str, line: String) -> Result<()> {
        let record = self
            .pending
            .remove(job_id)
            .ok_or_else(|| BrokerError::UnknownJob(job_id.to_string()))?;

        let _ = self.outbound.send(Outbound {
            origin: record.submitter,
            line,
            target: Target::Direct,
        });

        tracing::info!(
            job_id = %job_id,
            submitter = %record.submitter,
            worker = %origin,
            "job result forwarded"
        );
        Ok(())
    }

    /// Lifetime clock expiry. A job that already terminated is long gone
    /// from the table and the tick is a no-op.
    fn expire(&mut self, job_id: &str) {
        let Some(record) = self.pending.remove(job_id) else {
            return;
        };

        self.send(
            record.submitter,
            Target::Direct,
            &BrokerFrame::JobFailure {
                id: job_id.to_string(),
                reason: REASON_QUEUE_TIMEOUT.to_string(),
            },
        );

        tracing::info!(job_id = %job_id, submitter = %record.submitter, "job timed out");
    }

    fn schedule_timeout(&self, job_id: String) {
        let events = self.events.clone();
        let timeout = self.queue_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = events.send(Event::Timeout { job_id });
        });
    }

    /// Serialize and queue a broker frame. Encoding failures are dropped;
    /// the affected job is reaped by its timeout.
    fn send(&self, origin: ConnId, target: Target, frame: &BrokerFrame) {
        match serde_json::to_string(frame) {
            Ok(line) => {
                let _ = self.outbound.send(Outbound {
                    origin,
                    line,
                    target,
                });
            }
            Err(e) => tracing::debug!(error = %e, "dropping unencodable frame"),
        }
    }
}
