use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Watch for SIGTERM/SIGINT and cancel the returned token on the first one.
///
/// Cancellation stops the accept loop, the coordinator, and the dispatcher;
/// per-connection tasks end as their sockets close. Jobs still pending at
/// that point are dropped without a failure notice, consistent with the
/// broker's best-effort delivery.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    tokio::spawn(watch_signals(token.clone()));
    token
}

async fn watch_signals(token: CancellationToken) {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "failed to install SIGTERM handler");
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            return;
        }
    };

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    tracing::info!(signal = received, "shutting down broker");
    token.cancel();
}
