//! Virtual-client scheduler
//!
//! Runs inside a worker process on a single-threaded runtime: one ramp-up
//! ticker plus one cooperative task per client slot, all sharing the worker's
//! [`RunContext`](crate::context::RunContext) without locks.

mod executor;

pub use executor::ClientScheduler;
