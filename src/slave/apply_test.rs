use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::tempdir;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::apply;
use super::DownstreamRegistry;
use super::TaskContext;
use crate::constants::CHECKPOINT_FLUSH_EVERY;
use crate::CheckpointStore;
use crate::Endpoint;
use crate::RingBuffer;

#[tokio::test(flavor = "multi_thread")]
async fn apply_forwards_records_and_flushes_the_checkpoint() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("slave.info");
    std::fs::write(&path, "bin.000001,0").unwrap();
    let store = Arc::new(CheckpointStore::open(&path).unwrap());
    let checkpoint = store.load().unwrap();

    let endpoint = Endpoint {
        addr: "127.0.0.1".to_string(),
        port: 6379,
    };
    let ctx = Arc::new(TaskContext {
        listen: endpoint.clone(),
        upstream: endpoint,
        buffer: RingBuffer::allocate(64, 2 * CHECKPOINT_FLUSH_EVERY).unwrap(),
        store,
        position: Arc::new(Mutex::new(checkpoint)),
        downstream: Arc::new(DownstreamRegistry::new()),
    });

    // Local socket pair standing in for an attached replica.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (connected, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    let mut replica = connected.unwrap();
    let (peer, _) = accepted.unwrap();
    ctx.downstream.attach(peer).await;
    assert_eq!(ctx.downstream.peer_count().await, 1);

    // Exactly one flush interval's worth of ten-byte records.
    for _ in 0..CHECKPOINT_FLUSH_EVERY {
        ctx.buffer.push(b"0123456789").await;
    }

    let token = CancellationToken::new();
    let task = tokio::spawn(apply::run(Arc::clone(&ctx), token.clone()));

    let mut received = vec![0u8; 10 * CHECKPOINT_FLUSH_EVERY];
    timeout(Duration::from_secs(5), replica.read_exact(&mut received))
        .await
        .unwrap()
        .unwrap();
    assert!(received.chunks(10).all(|chunk| chunk == b"0123456789"));

    // The flush lands after the last record; poll the store file for it.
    let expected = format!("bin.000001,{}", 10 * CHECKPOINT_FLUSH_EVERY);
    let mut flushed = String::new();
    for _ in 0..50 {
        flushed = std::fs::read_to_string(&path).unwrap();
        if flushed == expected {
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(flushed, expected);

    token.cancel();
    let outcome = timeout(Duration::from_secs(5), task).await;
    assert!(matches!(outcome, Ok(Ok(()))));
}
