//! Starts and cancels the detached ingest/apply tasks.
//!
//! Tasks are fire-and-forget: their `JoinHandle`s are dropped at spawn and
//! no caller ever joins them. Cancellation is cooperative: the handle's
//! token is fired and the task observes it at its next loop boundary,
//! releasing its own resources on the way out.

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;

use super::apply;
use super::ingest;
use super::TaskContext;
use crate::ThreadStartError;

/// Handle to a detached relay task. Carries only the role name and the
/// cancellation token; the task itself is never joined.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    role: &'static str,
    token: CancellationToken,
}

impl TaskHandle {
    pub(crate) fn new(role: &'static str) -> Self {
        Self {
            role,
            token: CancellationToken::new(),
        }
    }

    pub fn role(&self) -> &'static str {
        self.role
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Seam between the orchestrator and the task scheduling primitive.
#[cfg_attr(test, automock)]
pub trait TaskLifecycle: Send + Sync + 'static {
    /// Launches the long-running task that pulls the upstream command
    /// stream into the buffer and accepts downstream connections.
    fn start_ingest(
        &self,
        ctx: Arc<TaskContext>,
    ) -> std::result::Result<TaskHandle, ThreadStartError>;

    /// Launches the task that drains the buffer, forwards records, and
    /// periodically flushes the checkpoint.
    fn start_apply(
        &self,
        ctx: Arc<TaskContext>,
    ) -> std::result::Result<TaskHandle, ThreadStartError>;

    /// Requests cooperative cancellation. Best-effort and asynchronous: the
    /// caller does not wait for the task to observe it.
    fn cancel(
        &self,
        handle: &TaskHandle,
    );
}

/// Production lifecycle: detached tokio tasks on the current runtime.
pub struct TokioLifecycle;

impl TokioLifecycle {
    fn runtime(role: &'static str) -> std::result::Result<tokio::runtime::Handle, ThreadStartError> {
        tokio::runtime::Handle::try_current().map_err(|_| ThreadStartError::NoRuntime { role })
    }
}

impl TaskLifecycle for TokioLifecycle {
    fn start_ingest(
        &self,
        ctx: Arc<TaskContext>,
    ) -> std::result::Result<TaskHandle, ThreadStartError> {
        let runtime = Self::runtime("ingest")?;
        let handle = TaskHandle::new("ingest");
        let token = handle.token();

        info!("ingest task start");
        runtime.spawn(async move {
            if let Err(e) = ingest::run(ctx, token).await {
                error!("ingest task stopped with error: {:?}", e);
            }
        });

        Ok(handle)
    }

    fn start_apply(
        &self,
        ctx: Arc<TaskContext>,
    ) -> std::result::Result<TaskHandle, ThreadStartError> {
        let runtime = Self::runtime("apply")?;
        let handle = TaskHandle::new("apply");
        let token = handle.token();

        info!("apply task start");
        runtime.spawn(async move {
            apply::run(ctx, token).await;
        });

        Ok(handle)
    }

    fn cancel(
        &self,
        handle: &TaskHandle,
    ) {
        info!("start exiting {} task", handle.role());
        handle.token.cancel();
    }
}
