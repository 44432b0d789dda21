//! The reconfiguration orchestrator: a transactional swap of the running
//! [`SlaveInstance`] for a newly constructed one.
//!
//! On startup or on a reload signal the orchestrator builds a brand-new
//! instance from configuration plus the checkpoint store, diffs it against
//! the current instance, and executes the minimal set of cancel /
//! reallocate / start actions implied by the diff, leaving the unchanged
//! dimensions (and the buffer they share) running undisturbed.
//!
//! Reconfiguration calls are serialized by `&mut self`; the orchestrator is
//! the single writer of the current-instance slot.

use tracing::error;
use tracing::info;
use tracing::warn;

use super::SlaveInstance;
use super::TaskLifecycle;
use crate::constants::SYNC_SLOT_COUNT;
use crate::constants::SYNC_SLOT_SIZE;
use crate::ReconfigureError;
use crate::RingBuffer;
use crate::Settings;

/// Operational state of the relay control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveState {
    /// No instance has been started yet
    Unconfigured,
    /// The current instance is fully started and serving
    Running,
    /// Still serving on the previous instance after a failed swap
    Degraded,
}

/// Independent diff flags between the running instance and its candidate
/// replacement; each flag decides the fate of one resource dimension.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InstanceDiff {
    pub(crate) checkpoint_changed: bool,
    pub(crate) upstream_changed: bool,
    pub(crate) listen_changed: bool,
}

impl InstanceDiff {
    /// A checkpoint change invalidates buffered-but-unflushed data (the
    /// buffer's content is keyed to a specific replay position), so it
    /// forces both task restarts regardless of endpoint equality.
    fn between(
        old: &SlaveInstance,
        new: &SlaveInstance,
    ) -> Self {
        let checkpoint_changed = old.position() != new.checkpoint;
        Self {
            checkpoint_changed,
            upstream_changed: old.upstream != new.upstream || checkpoint_changed,
            listen_changed: old.listen != new.listen || checkpoint_changed,
        }
    }

    /// First startup: both tasks start and a fresh buffer is allocated.
    fn bootstrap() -> Self {
        Self {
            checkpoint_changed: true,
            upstream_changed: true,
            listen_changed: true,
        }
    }
}

pub struct Orchestrator<L>
where
    L: TaskLifecycle,
{
    lifecycle: L,
    current: Option<SlaveInstance>,
    state: SlaveState,
}

impl<L> Orchestrator<L>
where
    L: TaskLifecycle,
{
    pub fn new(lifecycle: L) -> Self {
        Self {
            lifecycle,
            current: None,
            state: SlaveState::Unconfigured,
        }
    }

    pub fn state(&self) -> SlaveState {
        self.state
    }

    pub fn current(&self) -> Option<&SlaveInstance> {
        self.current.as_ref()
    }

    /// Builds a new instance from `settings` and swaps it in.
    ///
    /// Construction failures abort with the current instance completely
    /// untouched. Start failures roll back: the replacement is torn down
    /// and the cancelled roles are restarted on the previous instance's own
    /// resources, which remains current (state becomes [`SlaveState::Degraded`]).
    pub fn reconfigure(
        &mut self,
        settings: &Settings,
    ) -> std::result::Result<(), ReconfigureError> {
        let mut new = SlaveInstance::from_settings(settings)?;

        let mut old = self.current.take();
        let diff = match &old {
            Some(old) => InstanceDiff::between(old, &new),
            None => InstanceDiff::bootstrap(),
        };
        info!(
            "reconfigure diff: checkpoint_changed={}, upstream_changed={}, listen_changed={}",
            diff.checkpoint_changed, diff.upstream_changed, diff.listen_changed
        );

        // Cancel the outgoing task of each changed dimension first, so a
        // stale task never writes into a buffer the replacement also owns.
        // The requests are asynchronous; the tasks release their own
        // resources (listener socket included) at the next loop boundary.
        if let Some(old) = old.as_mut() {
            if diff.listen_changed {
                if let Some(handle) = old.ingest.take() {
                    self.lifecycle.cancel(&handle);
                }
            }
            if diff.upstream_changed {
                if let Some(handle) = old.apply.take() {
                    self.lifecycle.cancel(&handle);
                }
            }
        }

        // Buffer hand-off or fresh allocation. An unchanged checkpoint
        // means the in-flight buffered data is still valid: the replacement
        // adopts the predecessor's buffer, downstream registry, and live
        // position, and any surviving task handle moves over with them.
        if diff.checkpoint_changed {
            match RingBuffer::allocate(SYNC_SLOT_SIZE, SYNC_SLOT_COUNT) {
                Ok(buffer) => new.install_buffer(buffer),
                Err(e) => return Err(self.rollback(old, new, &diff, e.into())),
            }
        } else if let Some(old) = old.as_mut() {
            new.adopt_shared_state(old);
            if !diff.listen_changed {
                new.ingest = old.ingest.take();
            }
            if !diff.upstream_changed {
                new.apply = old.apply.take();
            }
        }

        if diff.listen_changed {
            match self.lifecycle.start_ingest(new.task_context()) {
                Ok(handle) => new.ingest = Some(handle),
                Err(e) => return Err(self.rollback(old, new, &diff, e.into())),
            }
        }

        if diff.upstream_changed {
            match self.lifecycle.start_apply(new.task_context()) {
                Ok(handle) => new.apply = Some(handle),
                Err(e) => return Err(self.rollback(old, new, &diff, e.into())),
            }
        }

        // Commit. Dropping the old instance closes its checkpoint handle
        // and releases its buffer reference; the buffer itself is freed
        // only when it was not handed off.
        if old.is_some() {
            info!("replaced running instance, now serving {} -> {}", new.upstream, new.listen);
        }
        self.current = Some(new);
        self.state = SlaveState::Running;
        Ok(())
    }

    /// Start-phase failure path. Tears down everything the replacement
    /// started (handles adopted from the predecessor are handed back, not
    /// cancelled), drops the replacement with its freshly allocated buffer,
    /// and restarts the cancelled roles on the previous instance's own
    /// context, never on the discarded replacement.
    fn rollback(
        &mut self,
        mut old: Option<SlaveInstance>,
        mut new: SlaveInstance,
        diff: &InstanceDiff,
        cause: ReconfigureError,
    ) -> ReconfigureError {
        warn!("reconfiguration failed, rolling back: {:?}", cause);

        if diff.listen_changed {
            if let Some(handle) = new.ingest.take() {
                self.lifecycle.cancel(&handle);
            }
        } else if let Some(old) = old.as_mut() {
            old.ingest = new.ingest.take();
        }

        if diff.upstream_changed {
            if let Some(handle) = new.apply.take() {
                self.lifecycle.cancel(&handle);
            }
        } else if let Some(old) = old.as_mut() {
            old.apply = new.apply.take();
        }

        drop(new);

        match old {
            Some(mut old) => {
                info!("rollback: restarting previous instance tasks");

                if diff.listen_changed && old.ingest.is_none() {
                    match self.lifecycle.start_ingest(old.task_context()) {
                        Ok(handle) => old.ingest = Some(handle),
                        Err(e) => error!("rollback could not restart the ingest task: {:?}", e),
                    }
                }
                if diff.upstream_changed && old.apply.is_none() {
                    match self.lifecycle.start_apply(old.task_context()) {
                        Ok(handle) => old.apply = Some(handle),
                        Err(e) => error!("rollback could not restart the apply task: {:?}", e),
                    }
                }

                self.current = Some(old);
                self.state = SlaveState::Degraded;
            }
            None => {
                self.state = SlaveState::Unconfigured;
            }
        }

        cause
    }
}
