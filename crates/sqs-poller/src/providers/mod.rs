//! Queue service implementations.
//!
//! This module contains the concrete [`crate::QueueService`] backends: the
//! SQS Query API over HTTP and an in-memory service for tests.

pub mod memory;
pub mod sqs;
pub(crate) mod xml;

pub use memory::InMemoryQueueService;
pub use sqs::SqsHttpService;
