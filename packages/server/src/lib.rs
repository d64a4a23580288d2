//! Server runtime for the therapy revenue extraction pipeline.
//!
//! Wires the `revmine` library to Postgres: document intake with
//! content-hash dedup, a job queue with leasing and retries, and a worker
//! loop that runs extractions and persists reconciled results.

pub mod config;
pub mod intake;
pub mod queue;
pub mod store;
pub mod worker;
