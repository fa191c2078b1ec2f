//! # SQS Poller
//!
//! Thin client for AWS SQS that resolves queue names to handles once and
//! reuses them for every later call.
//!
//! This library provides:
//! - Queue lookup, existence checks, creation and purge by name
//! - Receiving one or up to ten messages with pass-through receive options
//! - Sending messages with delays and typed message attributes
//! - Batched deletes with a per-entry outcome
//! - Configuration from explicit values or the environment
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Queue names, handles, messages and per-call options
//! - [`config`] - Credentials, region and endpoint resolution
//! - [`service`] - The remote service interface
//! - [`providers`] - SQS over HTTP and in-memory service implementations
//! - [`client`] - The caching client
//!
//! ## Example
//!
//! ```no_run
//! use sqs_poller::{ClientConfig, QueueClient, ReceiveOptions};
//!
//! # async fn example() -> Result<(), sqs_poller::QueueError> {
//! let config = ClientConfig::builder().region("eu-west-1").build()?;
//! let client = QueueClient::new(config)?;
//!
//! let messages = client
//!     .receive_many("orders", 10, &ReceiveOptions::new().with_wait_time_seconds(20))
//!     .await?;
//!
//! let entries: Vec<_> = messages
//!     .iter()
//!     .enumerate()
//!     .map(|(i, m)| m.delete_entry(i.to_string()))
//!     .collect();
//! if !entries.is_empty() {
//!     client.delete_many("orders", &entries).await?;
//! }
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod providers;
pub mod service;

// Re-export commonly used types at crate root for convenience
pub use client::QueueClient;
pub use config::{ClientConfig, ClientConfigBuilder, Credentials, DEFAULT_REGION};
pub use error::{ConfigurationError, QueueError, RemoteServiceError, ValidationError};
pub use message::{
    BatchResultError, DeleteEntry, DeleteResult, Message, MessageAttributeValue, MessageId,
    QueueHandle, QueueName, ReceiptHandle, ReceiveOptions, SendOptions, SendResult,
    MAX_DELETE_BATCH, MAX_RECEIVE_BATCH,
};
pub use providers::{InMemoryQueueService, SqsHttpService};
pub use service::{QueueService, ServiceOperation};
