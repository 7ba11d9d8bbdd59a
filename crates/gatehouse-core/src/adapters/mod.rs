//! # Job Sink Adapters
//!
//! Concrete [`JobSink`](crate::jobs::JobSink) implementations.
//!
//! - [`InMemoryJobSink`] keeps submitted jobs in process; used for local runs
//!   and tests
//! - [`HttpJobSink`] posts jobs as JSON to the enqueue endpoint of an external
//!   job runtime

pub mod http_job_sink;
pub mod memory_job_sink;

pub use http_job_sink::HttpJobSink;
pub use memory_job_sink::InMemoryJobSink;
