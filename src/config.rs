use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub listen_addr: SocketAddr,
    /// Bounded lifetime of a pending job; jobs with no result by then are
    /// failed back to their submitter.
    pub queue_timeout: Duration,
    /// Maximum accepted frame length in bytes. Longer lines fail the
    /// connection's framing and close it.
    pub max_frame_bytes: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7171".parse().unwrap(),
            queue_timeout: Duration::from_secs(30),
            max_frame_bytes: 64 * 1024,
        }
    }
}

impl BrokerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_queue_timeout(mut self, queue_timeout: Duration) -> Self {
        self.queue_timeout = queue_timeout;
        self
    }
}
