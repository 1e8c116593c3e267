//! TCP transport: the accept loop and the per-connection reader and writer
//! tasks. Frames are newline-delimited JSON; one line is one frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;

use crate::broker::Event;
use crate::config::BrokerConfig;
use crate::error::Result;
use crate::registry::{ConnId, ConnectionRegistry, PeerHandle};
use crate::wire::Inbound;

/// Accept loop. Binds the configured address and attaches each accepted
/// stream to the broker until shutdown.
pub async fn run_listener(
    config: BrokerConfig,
    registry: Arc<ConnectionRegistry>,
    events: mpsc::UnboundedSender<Event>,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "broker listening");

    let next_id = AtomicU64::new(1);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("listener stopping");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        let id = ConnId::new(next_id.fetch_add(1, Ordering::Relaxed));
                        tracing::info!(conn = %id, %peer_addr, "connection accepted");
                        attach(id, stream, config.max_frame_bytes, registry.clone(), events.clone());
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }
}

/// Register a connection and spawn its writer and reader tasks.
fn attach(
    id: ConnId,
    stream: TcpStream,
    max_frame_bytes: usize,
    registry: Arc<ConnectionRegistry>,
    events: mpsc::UnboundedSender<Event>,
) {
    let (read_half, write_half) = stream.into_split();
    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();

    registry.add(PeerHandle::new(id, outbox_tx));

    tokio::spawn(write_loop(id, write_half, outbox_rx, max_frame_bytes));
    tokio::spawn(read_loop(id, read_half, max_frame_bytes, registry, events));
}

/// Drain the connection's outbox into the socket, one line per frame, in
/// enqueue order. Exits when the outbox closes (the peer was removed from
/// the registry) or a write fails; failed writes are not retried.
async fn write_loop(
    id: ConnId,
    write_half: OwnedWriteHalf,
    mut outbox: mpsc::UnboundedReceiver<String>,
    max_frame_bytes: usize,
) {
    let mut writer = FramedWrite::new(
        write_half,
        LinesCodec::new_with_max_length(max_frame_bytes),
    );
    while let Some(line) = outbox.recv().await {
        if let Err(e) = writer.send(line).await {
            tracing::warn!(conn = %id, error = %e, "write failed");
            break;
        }
    }
}

/// Read frames until the peer disconnects or framing fails, handing each to
/// the coordinator. Deregisters the connection on exit, which closes its
/// outbox and ends the writer.
async fn read_loop(
    id: ConnId,
    read_half: OwnedReadHalf,
    max_frame_bytes: usize,
    registry: Arc<ConnectionRegistry>,
    events: mpsc::UnboundedSender<Event>,
) {
    let mut reader = FramedRead::new(
        read_half,
        LinesCodec::new_with_max_length(max_frame_bytes),
    );
    loop {
        match reader.next().await {
            Some(Ok(line)) => {
                let _ = events.send(Event::Frame(Inbound { origin: id, line }));
            }
            Some(Err(e)) => {
                tracing::debug!(conn = %id, error = %e, "read failed");
                break;
            }
            None => break,
        }
    }

    registry.remove(id);
    tracing::info!(conn = %id, "connection closed");
}
