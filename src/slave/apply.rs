//! Apply task body: drains the shared ring buffer, forwards records to
//! attached downstream replicas, and advances the durable checkpoint.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::TaskContext;
use crate::constants::CHECKPOINT_FLUSH_EVERY;

pub(crate) async fn run(
    ctx: Arc<TaskContext>,
    token: CancellationToken,
) {
    info!("apply task draining into checkpoint {:?}", ctx.store.path());

    let mut since_flush = 0usize;
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("apply task exiting");
                return;
            }
            record = ctx.buffer.pop() => {
                ctx.downstream.forward(&record).await;

                {
                    let mut position = ctx.position.lock();
                    position.offset = position.offset.saturating_add(record.len() as u32);
                }

                since_flush += 1;
                if since_flush >= CHECKPOINT_FLUSH_EVERY && flush_position(&ctx).await {
                    since_flush = 0;
                }
            }
        }
    }
}

/// A failed flush is fatal to this iteration but recoverable at the next:
/// it is logged and the cadence counter stays elevated so the write is
/// retried on the following record.
async fn flush_position(ctx: &TaskContext) -> bool {
    let snapshot = ctx.position.lock().clone();
    match ctx.store.flush(&snapshot) {
        Ok(()) => {
            debug!(
                "flushed checkpoint {snapshot}, forwarding to {} replicas",
                ctx.downstream.peer_count().await
            );
            true
        }
        Err(e) => {
            error!("checkpoint flush failed: {:?}", e);
            false
        }
    }
}
