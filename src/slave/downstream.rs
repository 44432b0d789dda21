use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::info;

/// Downstream replica connections, accepted by the ingest task and written
/// to by the apply task. Handed off together with the ring buffer during a
/// checkpoint-preserving reconfiguration.
#[derive(Default)]
pub struct DownstreamRegistry {
    peers: Mutex<Vec<TcpStream>>,
}

impl DownstreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attach(
        &self,
        socket: TcpStream,
    ) {
        self.peers.lock().await.push(socket);
    }

    /// Forwards one record to every attached replica; peers whose
    /// connection has gone away are dropped.
    pub async fn forward(
        &self,
        record: &[u8],
    ) {
        let mut peers = self.peers.lock().await;
        let mut alive = Vec::with_capacity(peers.len());
        for mut peer in peers.drain(..) {
            match peer.write_all(record).await {
                Ok(()) => alive.push(peer),
                Err(e) => info!("downstream replica detached: {e}"),
            }
        }
        *peers = alive;
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.lock().await.len()
    }
}
