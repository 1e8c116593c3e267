use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::registry::ConnectionRegistry;
use crate::wire::{Outbound, Target};

/// Single consumer of the outbound queue.
///
/// Fans each envelope out, in queue order, to the registered peers its
/// target mode selects. The actual socket writes happen on the
/// per-connection writer tasks, so a slow or dead peer never stalls
/// delivery to the others.
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Drain envelopes until the queue closes or shutdown is requested.
    pub async fn run(
        self,
        mut outbound: mpsc::UnboundedReceiver<Outbound>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("dispatcher stopping");
                    break;
                }
                envelope = outbound.recv() => {
                    match envelope {
                        Some(envelope) => self.dispatch(envelope),
                        None => break,
                    }
                }
            }
        }
    }

    /// Deliver one envelope to every peer its target selects. A peer whose
    /// writer has gone away is skipped; it is reaped when its reader fails.
    pub fn dispatch(&self, envelope: Outbound) {
        let Outbound {
            origin,
            line,
            target,
        } = envelope;

        self.registry.for_each(|peer| {
            let selected = match target {
                Target::Direct => peer.id() == origin,
                Target::Spread => peer.id() != origin,
                Target::Broadcast => true,
            };
            if selected && !peer.enqueue(line.clone()) {
                tracing::debug!(conn = %peer.id(), "dropping frame for closed connection");
            }
        });
    }
}
