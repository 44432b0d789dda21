// -
// Checkpoint record limits

/// Upper bound on the persisted source name, in bytes (PATH_MAX).
pub(crate) const SOURCE_NAME_MAX: usize = 4096;

// -
// Ring buffer geometry

/// Payload capacity of a single ring buffer slot.
pub(crate) const SYNC_SLOT_SIZE: usize = 4096;

/// Number of slots allocated per ring buffer.
pub(crate) const SYNC_SLOT_COUNT: usize = 2046;

// -
// Apply task cadence

/// Records applied between two checkpoint flushes.
pub(crate) const CHECKPOINT_FLUSH_EVERY: usize = 64;

/// Delay before the ingest task redials a failed upstream session, in
/// milliseconds.
pub(crate) const UPSTREAM_RECONNECT_DELAY_MS: u64 = 1000;
