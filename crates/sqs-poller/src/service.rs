//! The remote queue service the client forwards to.
//!
//! [`QueueService`] is the seam between [`crate::QueueClient`] and whatever
//! actually stores messages: the SQS HTTP API in production or the in-memory
//! service in tests.

use crate::error::QueueError;
use crate::message::{
    DeleteEntry, DeleteResult, Message, QueueHandle, QueueName, ReceiveOptions, SendOptions,
    SendResult,
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Remote operations offered by the queue service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceOperation {
    GetQueueUrl,
    CreateQueue,
    PurgeQueue,
    ReceiveMessage,
    SendMessage,
    DeleteMessageBatch,
}

impl ServiceOperation {
    /// Query API action name
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetQueueUrl => "GetQueueUrl",
            Self::CreateQueue => "CreateQueue",
            Self::PurgeQueue => "PurgeQueue",
            Self::ReceiveMessage => "ReceiveMessage",
            Self::SendMessage => "SendMessage",
            Self::DeleteMessageBatch => "DeleteMessageBatch",
        }
    }
}

impl std::fmt::Display for ServiceOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.action())
    }
}

/// Interface implemented by queue service backends.
///
/// Every method is exactly one remote call. Implementations report a missing
/// queue as [`QueueError::QueueNotFound`] and every other service failure as
/// [`QueueError::RemoteService`] with the original details intact.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Look up a queue by name
    async fn get_queue_url(&self, name: &QueueName) -> Result<QueueHandle, QueueError>;

    /// Create a queue, or return the existing one with the same name
    async fn create_queue(
        &self,
        name: &QueueName,
        attributes: &HashMap<String, String>,
        tags: &HashMap<String, String>,
    ) -> Result<QueueHandle, QueueError>;

    /// Delete every message in the queue
    async fn purge_queue(&self, queue: &QueueHandle) -> Result<(), QueueError>;

    /// Receive up to `max_messages` messages
    async fn receive_messages(
        &self,
        queue: &QueueHandle,
        max_messages: u32,
        options: &ReceiveOptions,
    ) -> Result<Vec<Message>, QueueError>;

    /// Send one message
    async fn send_message(
        &self,
        queue: &QueueHandle,
        body: &str,
        options: &SendOptions,
    ) -> Result<SendResult, QueueError>;

    /// Delete several deliveries in one call
    async fn delete_message_batch(
        &self,
        queue: &QueueHandle,
        entries: &[DeleteEntry],
    ) -> Result<DeleteResult, QueueError>;

    /// Short name of the backend, used in logs
    fn service_name(&self) -> &'static str;
}
