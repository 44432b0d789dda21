use std::sync::Arc;

use parking_lot::Mutex;

use super::DownstreamRegistry;
use super::TaskHandle;
use crate::Checkpoint;
use crate::CheckpointStore;
use crate::Endpoint;
use crate::ReconfigureError;
use crate::RingBuffer;
use crate::Settings;

/// The live unit of work: one configured relay generation.
///
/// Exactly one instance is current at any time. An instance is created by
/// the orchestrator at startup or at each successful reconfiguration, and
/// destroyed (tasks already cancelled, buffer freed or handed off, file
/// handle closed) either immediately on construction failure or after its
/// successor has fully started.
pub struct SlaveInstance {
    /// Where downstream replicas may attach
    pub(crate) listen: Endpoint,
    /// The Redis node this instance pulls from
    pub(crate) upstream: Endpoint,
    /// Replay position as loaded from disk at construction; the "new" side
    /// of a reconfiguration diff.
    pub(crate) checkpoint: Checkpoint,
    /// Open for the instance's lifetime; all reads/writes use this handle
    store: Arc<CheckpointStore>,
    /// Live in-flight position, advanced only by the apply task; the "old"
    /// side of a reconfiguration diff. Shared with a successor on hand-off.
    position: Arc<Mutex<Checkpoint>>,
    /// Installed by the orchestrator (hand-off or fresh allocation) before
    /// any task starts
    pub(crate) buffer: Option<Arc<RingBuffer>>,
    pub(crate) downstream: Arc<DownstreamRegistry>,
    pub(crate) ingest: Option<TaskHandle>,
    pub(crate) apply: Option<TaskHandle>,
}

impl SlaveInstance {
    /// Builds a not-yet-started instance from validated settings plus the
    /// checkpoint store. Fails without side effects beyond releasing the
    /// partially built resources.
    pub fn from_settings(settings: &Settings) -> std::result::Result<Self, ReconfigureError> {
        settings.validate()?;

        let store = Arc::new(CheckpointStore::open(&settings.slave.info)?);
        let checkpoint = store.load()?;

        Ok(Self {
            listen: settings.listen.clone(),
            upstream: settings.redis.clone(),
            position: Arc::new(Mutex::new(checkpoint.clone())),
            checkpoint,
            store,
            buffer: None,
            downstream: Arc::new(DownstreamRegistry::new()),
            ingest: None,
            apply: None,
        })
    }

    /// Snapshot of the live in-flight replay position.
    pub fn position(&self) -> Checkpoint {
        self.position.lock().clone()
    }

    pub(crate) fn install_buffer(
        &mut self,
        buffer: Arc<RingBuffer>,
    ) {
        self.buffer = Some(buffer);
    }

    /// Hand-off from the predecessor: with an unchanged checkpoint the
    /// buffered data is still keyed to the same replay position, so the
    /// buffer, the downstream registry, and the live position all carry
    /// over. Surviving tasks keep running against these same objects
    /// without interruption.
    pub(crate) fn adopt_shared_state(
        &mut self,
        old: &SlaveInstance,
    ) {
        self.buffer = old.buffer.clone();
        self.downstream = Arc::clone(&old.downstream);
        self.position = Arc::clone(&old.position);
    }

    /// Context captured by a task at start; owns shared handles so the task
    /// outlives any instance swap until it observes cancellation.
    pub(crate) fn task_context(&self) -> Arc<TaskContext> {
        let buffer = self
            .buffer
            .clone()
            .expect("orchestrator installs the buffer before starting tasks");

        Arc::new(TaskContext {
            listen: self.listen.clone(),
            upstream: self.upstream.clone(),
            buffer,
            store: Arc::clone(&self.store),
            position: Arc::clone(&self.position),
            downstream: Arc::clone(&self.downstream),
        })
    }
}

/// Everything an ingest or apply task needs, detached from the instance
/// that started it.
pub struct TaskContext {
    pub(crate) listen: Endpoint,
    pub(crate) upstream: Endpoint,
    pub(crate) buffer: Arc<RingBuffer>,
    pub(crate) store: Arc<CheckpointStore>,
    pub(crate) position: Arc<Mutex<Checkpoint>>,
    pub(crate) downstream: Arc<DownstreamRegistry>,
}
