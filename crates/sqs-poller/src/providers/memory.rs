//! In-memory queue service for testing and development.
//!
//! This module provides a process-local implementation of [`QueueService`]
//! that:
//! - Creates queues idempotently and rejects conflicting attributes
//! - Hides received messages for their visibility timeout
//! - Honours per-message delivery delays and long-poll waits
//! - Issues a fresh receipt handle for every delivery
//! - Counts calls per operation so cache behaviour can be observed
//!
//! Ordering is first-in first-out within a queue.

use crate::error::{QueueError, RemoteServiceError};
use crate::message::{
    BatchResultError, DeleteEntry, DeleteResult, Message, MessageAttributeValue, MessageId,
    QueueHandle, QueueName, ReceiptHandle, ReceiveOptions, SendOptions, SendResult,
    MAX_DELAY_SECONDS, MAX_VISIBILITY_TIMEOUT,
};
use crate::providers::sqs::md5_hex;
use crate::service::{QueueService, ServiceOperation};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// Base URL of queues created by the in-memory service
pub const IN_MEMORY_BASE_URL: &str = "http://localhost:9324/000000000000";

const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: i64 = 30;
const SENDER_ID: &str = "000000000000";
const LONG_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(20);

// ============================================================================
// Internal Storage Structures
// ============================================================================

#[derive(Default)]
struct ServiceState {
    queues: HashMap<QueueName, InMemoryQueue>,
    calls: HashMap<ServiceOperation, usize>,
}

impl ServiceState {
    fn queue_for_handle(&mut self, handle: &QueueHandle) -> Result<&mut InMemoryQueue, QueueError> {
        self.queues
            .values_mut()
            .find(|q| q.url == handle.url())
            .ok_or_else(|| QueueError::QueueNotFound {
                queue_name: handle.name().as_str().to_string(),
            })
    }
}

struct InMemoryQueue {
    url: String,
    attributes: HashMap<String, String>,
    messages: Vec<StoredMessage>,
    next_sequence_number: u64,
}

impl InMemoryQueue {
    // Both attributes are range-checked in create_queue
    fn visibility_timeout(&self) -> i64 {
        self.attributes
            .get("VisibilityTimeout")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_VISIBILITY_TIMEOUT_SECONDS)
    }

    fn delay_seconds(&self) -> i64 {
        self.attributes
            .get("DelaySeconds")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

/// Reject timing attributes outside the ranges SQS accepts
fn validate_queue_attributes(attributes: &HashMap<String, String>) -> Result<(), QueueError> {
    let limits = [
        ("VisibilityTimeout", MAX_VISIBILITY_TIMEOUT),
        ("DelaySeconds", MAX_DELAY_SECONDS),
    ];

    for (attribute, max) in limits {
        let Some(raw) = attributes.get(attribute) else {
            continue;
        };

        match raw.parse::<u32>() {
            Ok(value) if value <= max => {}
            _ => {
                return Err(RemoteServiceError::Service {
                    status: 400,
                    code: "InvalidAttributeValue".to_string(),
                    message: format!(
                        "Invalid value for the parameter {}: {} (must be 0-{})",
                        attribute, raw, max
                    ),
                }
                .into())
            }
        }
    }

    Ok(())
}

struct StoredMessage {
    message_id: MessageId,
    body: String,
    md5_of_body: String,
    message_attributes: HashMap<String, MessageAttributeValue>,
    sent_at: DateTime<Utc>,
    first_received_at: Option<DateTime<Utc>>,
    visible_at: DateTime<Utc>,
    receive_count: u32,
    /// Receipt handle of the latest delivery
    receipt_handle: Option<String>,
}

impl StoredMessage {
    fn system_attributes(&self, requested: &[String]) -> HashMap<String, String> {
        let all = requested.iter().any(|n| n == "All");
        let mut attributes = HashMap::new();
        let mut add = |name: &str, value: String| {
            if all || requested.iter().any(|n| n == name) {
                attributes.insert(name.to_string(), value);
            }
        };

        add("SenderId", SENDER_ID.to_string());
        add("SentTimestamp", self.sent_at.timestamp_millis().to_string());
        add("ApproximateReceiveCount", self.receive_count.to_string());
        if let Some(first) = self.first_received_at {
            add(
                "ApproximateFirstReceiveTimestamp",
                first.timestamp_millis().to_string(),
            );
        }

        attributes
    }

    fn selected_message_attributes(
        &self,
        requested: &[String],
    ) -> HashMap<String, MessageAttributeValue> {
        self.message_attributes
            .iter()
            .filter(|(name, _)| {
                requested.iter().any(|r| {
                    r == "All"
                        || r == ".*"
                        || *r == **name
                        || r.strip_suffix(".*")
                            .map(|prefix| name.starts_with(prefix))
                            .unwrap_or(false)
                })
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

// ============================================================================
// InMemoryQueueService
// ============================================================================

/// In-memory queue service
///
/// Cloning is cheap and clones share the same queues.
#[derive(Clone, Default)]
pub struct InMemoryQueueService {
    state: Arc<RwLock<ServiceState>>,
}

impl InMemoryQueueService {
    /// Create an empty service
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls made for `operation`
    pub fn call_count(&self, operation: ServiceOperation) -> usize {
        self.state
            .read()
            .map(|state| state.calls.get(&operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of calls made across all operations
    pub fn total_calls(&self) -> usize {
        self.state
            .read()
            .map(|state| state.calls.values().sum())
            .unwrap_or(0)
    }

    /// Delete a queue and its messages, as if removed by another client
    pub fn delete_queue(&self, name: &QueueName) -> Result<(), QueueError> {
        let mut state = self.write_state()?;
        state
            .queues
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| QueueError::QueueNotFound {
                queue_name: name.as_str().to_string(),
            })
    }

    /// Number of messages stored in a queue, including in-flight ones
    pub fn message_count(&self, name: &QueueName) -> Result<usize, QueueError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        state
            .queues
            .get(name)
            .map(|q| q.messages.len())
            .ok_or_else(|| QueueError::QueueNotFound {
                queue_name: name.as_str().to_string(),
            })
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, ServiceState>, QueueError> {
        self.state.write().map_err(|_| poisoned())
    }

    /// Lock the state for one call and count it
    fn begin(
        &self,
        operation: ServiceOperation,
    ) -> Result<std::sync::RwLockWriteGuard<'_, ServiceState>, QueueError> {
        let mut state = self.write_state()?;
        *state.calls.entry(operation).or_insert(0) += 1;
        Ok(state)
    }

    /// Take up to `max_messages` visible messages; never blocks
    fn take_visible(
        &self,
        queue: &QueueHandle,
        max_messages: u32,
        options: &ReceiveOptions,
    ) -> Result<Vec<Message>, QueueError> {
        let mut state = self.write_state()?;
        let stored = state.queue_for_handle(queue)?;

        let now = Utc::now();
        let visibility = options
            .visibility_timeout
            .map(i64::from)
            .unwrap_or_else(|| stored.visibility_timeout());
        let url = stored.url.clone();

        let mut received = Vec::new();
        for message in stored
            .messages
            .iter_mut()
            .filter(|m| m.visible_at <= now)
            .take(max_messages as usize)
        {
            let receipt = uuid::Uuid::new_v4().to_string();
            message.receive_count += 1;
            message.first_received_at.get_or_insert(now);
            message.visible_at = now + Duration::seconds(visibility);
            message.receipt_handle = Some(receipt.clone());

            received.push(Message {
                message_id: message.message_id.clone(),
                receipt_handle: ReceiptHandle::new(receipt),
                body: message.body.clone(),
                md5_of_body: message.md5_of_body.clone(),
                attributes: message.system_attributes(&options.attribute_names),
                message_attributes: message
                    .selected_message_attributes(&options.message_attribute_names),
                queue_url: url.clone(),
            });
        }

        Ok(received)
    }
}

impl std::fmt::Debug for InMemoryQueueService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue_count = self.state.read().map(|s| s.queues.len()).unwrap_or(0);
        f.debug_struct("InMemoryQueueService")
            .field("queues", &queue_count)
            .finish()
    }
}

#[async_trait]
impl QueueService for InMemoryQueueService {
    async fn get_queue_url(&self, name: &QueueName) -> Result<QueueHandle, QueueError> {
        let state = self.begin(ServiceOperation::GetQueueUrl)?;
        state
            .queues
            .get(name)
            .map(|q| QueueHandle::new(name.clone(), q.url.clone()))
            .ok_or_else(|| QueueError::QueueNotFound {
                queue_name: name.as_str().to_string(),
            })
    }

    async fn create_queue(
        &self,
        name: &QueueName,
        attributes: &HashMap<String, String>,
        _tags: &HashMap<String, String>,
    ) -> Result<QueueHandle, QueueError> {
        let mut state = self.begin(ServiceOperation::CreateQueue)?;
        validate_queue_attributes(attributes)?;

        if let Some(existing) = state.queues.get(name) {
            let conflicting = attributes
                .iter()
                .any(|(key, value)| existing.attributes.get(key) != Some(value));
            if conflicting {
                return Err(RemoteServiceError::Service {
                    status: 400,
                    code: "QueueAlreadyExists".to_string(),
                    message: format!(
                        "A queue already exists with the same name and a different value for attribute(s): {}",
                        name
                    ),
                }
                .into());
            }

            return Ok(QueueHandle::new(name.clone(), existing.url.clone()));
        }

        let url = format!("{}/{}", IN_MEMORY_BASE_URL, name);
        state.queues.insert(
            name.clone(),
            InMemoryQueue {
                url: url.clone(),
                attributes: attributes.clone(),
                messages: Vec::new(),
                next_sequence_number: 1,
            },
        );

        debug!(queue = %name, url = %url, "Created in-memory queue");
        Ok(QueueHandle::new(name.clone(), url))
    }

    async fn purge_queue(&self, queue: &QueueHandle) -> Result<(), QueueError> {
        let mut state = self.begin(ServiceOperation::PurgeQueue)?;
        state.queue_for_handle(queue)?.messages.clear();
        Ok(())
    }

    async fn receive_messages(
        &self,
        queue: &QueueHandle,
        max_messages: u32,
        options: &ReceiveOptions,
    ) -> Result<Vec<Message>, QueueError> {
        drop(self.begin(ServiceOperation::ReceiveMessage)?);

        let deadline = tokio::time::Instant::now()
            + std::time::Duration::from_secs(u64::from(options.wait_time_seconds.unwrap_or(0)));

        loop {
            let received = self.take_visible(queue, max_messages, options)?;
            if !received.is_empty() || tokio::time::Instant::now() >= deadline {
                return Ok(received);
            }
            tokio::time::sleep(LONG_POLL_INTERVAL).await;
        }
    }

    async fn send_message(
        &self,
        queue: &QueueHandle,
        body: &str,
        options: &SendOptions,
    ) -> Result<SendResult, QueueError> {
        let mut state = self.begin(ServiceOperation::SendMessage)?;
        let stored = state.queue_for_handle(queue)?;

        let sequence_number = if queue.name().is_fifo() {
            if options.message_group_id.is_none() {
                return Err(RemoteServiceError::Service {
                    status: 400,
                    code: "MissingParameter".to_string(),
                    message: "The request must contain the parameter MessageGroupId.".to_string(),
                }
                .into());
            }
            let number = stored.next_sequence_number;
            stored.next_sequence_number += 1;
            Some(format!("{:020}", number))
        } else {
            None
        };

        let now = Utc::now();
        let delay = options
            .delay_seconds
            .map(i64::from)
            .unwrap_or_else(|| stored.delay_seconds());
        let message_id = MessageId::new();
        let md5_of_body = md5_hex(body);

        stored.messages.push(StoredMessage {
            message_id: message_id.clone(),
            body: body.to_string(),
            md5_of_body: md5_of_body.clone(),
            message_attributes: options.message_attributes.clone(),
            sent_at: now,
            first_received_at: None,
            visible_at: now + Duration::seconds(delay),
            receive_count: 0,
            receipt_handle: None,
        });

        Ok(SendResult {
            message_id,
            md5_of_body,
            sequence_number,
        })
    }

    async fn delete_message_batch(
        &self,
        queue: &QueueHandle,
        entries: &[DeleteEntry],
    ) -> Result<DeleteResult, QueueError> {
        let mut state = self.begin(ServiceOperation::DeleteMessageBatch)?;
        let stored = state.queue_for_handle(queue)?;

        let mut result = DeleteResult::default();
        for entry in entries {
            let position = stored.messages.iter().position(|m| {
                m.receipt_handle.as_deref() == Some(entry.receipt_handle.as_str())
            });

            match position {
                Some(idx) => {
                    stored.messages.remove(idx);
                    result.successful.push(entry.id.clone());
                }
                None => result.failed.push(BatchResultError {
                    id: entry.id.clone(),
                    code: "ReceiptHandleIsInvalid".to_string(),
                    message: Some(format!(
                        "The input receipt handle \"{}\" is not a valid receipt handle.",
                        entry.receipt_handle
                    )),
                    sender_fault: true,
                }),
            }
        }

        Ok(result)
    }

    fn service_name(&self) -> &'static str {
        "InMemory"
    }
}

fn poisoned() -> QueueError {
    RemoteServiceError::Transport {
        message: "in-memory queue state lock poisoned".to_string(),
    }
    .into()
}
