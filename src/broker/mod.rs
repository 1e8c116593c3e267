//! Broker assembly: the coordinator (job lifecycle), the dispatcher
//! (outbound fan-out), and the value tying them to a listening socket.

pub mod coordinator;
pub mod dispatcher;

pub use coordinator::{Coordinator, Event, REASON_CLIENT_CANCEL, REASON_QUEUE_TIMEOUT};
pub use dispatcher::Dispatcher;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::BrokerConfig;
use crate::error::Result;
use crate::registry::ConnectionRegistry;
use crate::transport;

/// A job-auction broker.
///
/// The registry, the pending table, and both queues are owned here (or by
/// the tasks spawned here) rather than living in process globals, so
/// several brokers can coexist in one process and tear down independently
/// through their cancellation tokens.
pub struct Broker {
    config: BrokerConfig,
    registry: Arc<ConnectionRegistry>,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// The set of registered peer connections, shared with the transport.
    /// Lets an embedder observe connection churn while the broker runs.
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        self.registry.clone()
    }

    /// Run the broker until the token is cancelled.
    ///
    /// Spawns the coordinator and dispatcher tasks, then blocks on the
    /// accept loop. Reader, writer, and timeout tasks are spawned as
    /// connections and jobs arrive.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let registry = self.registry;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let coordinator =
            Coordinator::new(self.config.queue_timeout, event_tx.clone(), outbound_tx);
        let coordinator_shutdown = shutdown.clone();
        tokio::spawn(async move {
            coordinator.run(event_rx, coordinator_shutdown).await;
        });

        let dispatcher = Dispatcher::new(registry.clone());
        let dispatcher_shutdown = shutdown.clone();
        tokio::spawn(async move {
            dispatcher.run(outbound_rx, dispatcher_shutdown).await;
        });

        transport::run_listener(self.config, registry, event_tx, shutdown).await
    }
}
