//! Ingest task body: pulls the upstream command stream into the shared ring
//! buffer and accepts downstream replica connections.
//!
//! The wire protocol itself is opaque to the control plane; records are
//! moved as raw chunks of at most one slot each. Cancellation is checked at
//! every loop boundary and the listener/upstream sockets are released on the
//! way out.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::warn;

use super::TaskContext;
use crate::constants::UPSTREAM_RECONNECT_DELAY_MS;

pub(crate) async fn run(
    ctx: Arc<TaskContext>,
    token: CancellationToken,
) -> io::Result<()> {
    // A cancelled predecessor releases the listen socket at its own loop
    // boundary, which may be after this task starts. Bind failures are
    // retried at the reconnect cadence until cancellation.
    let listener = loop {
        match TcpListener::bind((ctx.listen.addr.as_str(), ctx.listen.port)).await {
            Ok(listener) => break listener,
            Err(e) => {
                warn!("could not bind {}, retrying: {:?}", ctx.listen, e);
            }
        }

        tokio::select! {
            _ = token.cancelled() => {
                info!("ingest task exiting");
                return Ok(());
            }
            _ = sleep(Duration::from_millis(UPSTREAM_RECONNECT_DELAY_MS)) => {}
        }
    };
    info!("listening for downstream replicas on {}", ctx.listen);

    loop {
        if token.is_cancelled() {
            info!("ingest task exiting");
            return Ok(());
        }

        match pull_upstream(&ctx, &token, &listener).await {
            // Only cancellation ends a session cleanly.
            Ok(()) => {
                info!("ingest task exiting");
                return Ok(());
            }
            Err(e) => {
                warn!("upstream session to {} ended: {:?}", ctx.upstream, e);
            }
        }

        tokio::select! {
            _ = token.cancelled() => {
                info!("ingest task exiting");
                return Ok(());
            }
            _ = sleep(Duration::from_millis(UPSTREAM_RECONNECT_DELAY_MS)) => {}
        }
    }
}

async fn pull_upstream(
    ctx: &TaskContext,
    token: &CancellationToken,
    listener: &TcpListener,
) -> io::Result<()> {
    let mut upstream = TcpStream::connect((ctx.upstream.addr.as_str(), ctx.upstream.port)).await?;

    // Announce the resume position so the upstream replays from the
    // checkpoint instead of the head of its stream.
    let resume = format!("{}\n", *ctx.position.lock());
    upstream.write_all(resume.as_bytes()).await?;
    info!("pulling from {} starting at {}", ctx.upstream, resume.trim_end());

    let mut chunk = vec![0u8; ctx.buffer.slot_size()];
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                return Ok(());
            }
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                info!("downstream replica attached from {peer}");
                ctx.downstream.attach(socket).await;
            }
            read = upstream.read(&mut chunk) => {
                let n = read?;
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "upstream closed the command stream",
                    ));
                }
                ctx.buffer.push(&chunk[..n]).await;
            }
        }
    }
}
