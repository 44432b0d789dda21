//! The live slave instance and its reconfiguration control plane.
//!
//! A [`SlaveInstance`] bundles the endpoints, the checkpoint store, the
//! shared ring buffer, and the detached ingest/apply task pair. The
//! [`Orchestrator`] is the only writer of the "current instance" slot: it
//! builds a replacement instance from freshly loaded settings, diffs it
//! against the running one, and executes the minimal thread-stop /
//! buffer-reallocate / thread-start actions implied by the diff.

mod apply;
mod downstream;
mod ingest;
mod instance;
mod lifecycle;
mod orchestrator;

pub use downstream::*;
pub use instance::*;
pub use lifecycle::*;
pub use orchestrator::*;

#[cfg(test)]
mod apply_test;
