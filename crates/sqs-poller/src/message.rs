//! Message types for queue operations including core domain identifiers.

use crate::error::ValidationError;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Maximum number of messages a single receive call may return
pub const MAX_RECEIVE_BATCH: u32 = 10;

/// Maximum number of entries in a single batch delete
pub const MAX_DELETE_BATCH: usize = 10;

/// Maximum message body size in bytes (256 KiB)
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Longest long-poll wait the service accepts, in seconds
pub const MAX_WAIT_TIME_SECONDS: u32 = 20;

/// Longest visibility timeout the service accepts, in seconds (12 hours)
pub const MAX_VISIBILITY_TIMEOUT: u32 = 43_200;

/// Longest delivery delay the service accepts, in seconds (15 minutes)
pub const MAX_DELAY_SECONDS: u32 = 900;

const MAX_QUEUE_NAME_LENGTH: usize = 80;
const MAX_BATCH_ENTRY_ID_LENGTH: usize = 80;
const FIFO_SUFFIX: &str = ".fifo";

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated queue name.
///
/// Names are 1-80 characters of ASCII alphanumerics, hyphens and underscores.
/// FIFO queues carry a `.fifo` suffix, which counts towards the length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() || name.len() > MAX_QUEUE_NAME_LENGTH {
            return Err(ValidationError::OutOfRange {
                field: "queue_name".to_string(),
                message: format!("must be 1-{} characters", MAX_QUEUE_NAME_LENGTH),
            });
        }

        let base = name.strip_suffix(FIFO_SUFFIX).unwrap_or(&name);
        if base.is_empty()
            || !base
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidFormat {
                field: "queue_name".to_string(),
                message: "only ASCII alphanumeric, hyphens, underscores and a '.fifo' suffix allowed"
                    .to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this names a FIFO queue
    pub fn is_fifo(&self) -> bool {
        self.0.ends_with(FIFO_SUFFIX)
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Opaque reference to a remote queue, as returned by the service.
///
/// The service owns the queue; this only records where to find it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    name: QueueName,
    url: String,
}

impl QueueHandle {
    /// Create a handle for a queue URL resolved for `name`
    pub fn new(name: QueueName, url: impl Into<String>) -> Self {
        Self {
            name,
            url: url.into(),
        }
    }

    /// Name the handle was resolved for
    pub fn name(&self) -> &QueueName {
        &self.name
    }

    /// Queue URL assigned by the service
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Service-assigned message identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// One-time token returned with a received message, needed to delete that delivery
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    /// Wrap a receipt handle string
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Get handle string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// Typed message attribute value.
///
/// `data_type` is `String`, `Number`, or one of those with a custom suffix
/// such as `Number.float`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAttributeValue {
    pub data_type: String,
    pub string_value: String,
}

impl MessageAttributeValue {
    /// String-typed attribute
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: "String".to_string(),
            string_value: value.into(),
        }
    }

    /// Number-typed attribute, carried as its decimal text
    pub fn number(value: impl ToString) -> Self {
        Self {
            data_type: "Number".to_string(),
            string_value: value.to_string(),
        }
    }
}

/// A message received from a queue
#[derive(Debug, Clone)]
pub struct Message {
    pub message_id: MessageId,
    pub receipt_handle: ReceiptHandle,
    pub body: String,
    pub md5_of_body: String,
    /// System attributes such as `SentTimestamp` and `ApproximateReceiveCount`
    pub attributes: HashMap<String, String>,
    pub message_attributes: HashMap<String, MessageAttributeValue>,
    /// URL of the queue the message was received from
    pub queue_url: String,
}

impl Message {
    /// Number of times the message has been received, if that attribute was requested
    pub fn receive_count(&self) -> Option<u32> {
        self.attributes
            .get("ApproximateReceiveCount")
            .and_then(|v| v.parse().ok())
    }

    /// Time the service accepted the message, if that attribute was requested
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.attributes
            .get("SentTimestamp")
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
    }

    /// Build a batch delete entry for this delivery
    pub fn delete_entry(&self, id: impl Into<String>) -> DeleteEntry {
        DeleteEntry::new(id, self.receipt_handle.clone())
    }
}

/// Service response to a send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    pub message_id: MessageId,
    pub md5_of_body: String,
    /// Only assigned for FIFO queues
    pub sequence_number: Option<String>,
}

// ============================================================================
// Batch Delete
// ============================================================================

/// One entry in a batch delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    /// Caller-chosen identifier, unique within the batch
    pub id: String,
    pub receipt_handle: ReceiptHandle,
}

impl DeleteEntry {
    pub fn new(id: impl Into<String>, receipt_handle: ReceiptHandle) -> Self {
        Self {
            id: id.into(),
            receipt_handle,
        }
    }

    /// Validate a batch before it is sent.
    ///
    /// The batch must hold 1-10 entries with unique ids of 1-80 characters
    /// (alphanumerics, hyphens, underscores) and non-empty receipt handles.
    pub fn validate_batch(entries: &[DeleteEntry]) -> Result<(), ValidationError> {
        if entries.is_empty() {
            return Err(ValidationError::Required {
                field: "entries".to_string(),
            });
        }

        if entries.len() > MAX_DELETE_BATCH {
            return Err(ValidationError::OutOfRange {
                field: "entries".to_string(),
                message: format!(
                    "batch of {} exceeds limit of {}",
                    entries.len(),
                    MAX_DELETE_BATCH
                ),
            });
        }

        let mut seen = HashSet::new();
        for entry in entries {
            if entry.id.is_empty()
                || entry.id.len() > MAX_BATCH_ENTRY_ID_LENGTH
                || !entry
                    .id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(ValidationError::InvalidFormat {
                    field: "entries.id".to_string(),
                    message: format!(
                        "'{}' must be 1-{} alphanumeric, hyphen or underscore characters",
                        entry.id, MAX_BATCH_ENTRY_ID_LENGTH
                    ),
                });
            }

            if entry.receipt_handle.as_str().is_empty() {
                return Err(ValidationError::Required {
                    field: format!("entries[{}].receipt_handle", entry.id),
                });
            }

            if !seen.insert(entry.id.as_str()) {
                return Err(ValidationError::Duplicate {
                    field: "entries.id".to_string(),
                    value: entry.id.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Failure reported by the service for one batch entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResultError {
    pub id: String,
    pub code: String,
    pub message: Option<String>,
    /// True when the caller, not the service, caused the failure
    pub sender_fault: bool,
}

/// Per-entry outcome of a batch delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteResult {
    /// Ids of entries that were deleted
    pub successful: Vec<String>,
    pub failed: Vec<BatchResultError>,
}

impl DeleteResult {
    /// True when every entry in the batch was deleted
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Outcome for the entry with the given id, or `None` if the id was not in the batch
    pub fn outcome(&self, id: &str) -> Option<Result<(), &BatchResultError>> {
        if self.successful.iter().any(|s| s == id) {
            return Some(Ok(()));
        }

        self.failed.iter().find(|f| f.id == id).map(Err)
    }
}

// ============================================================================
// Send and Receive Options
// ============================================================================

/// Options passed through to the service when sending
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Delay before the message becomes visible, 0-900 seconds
    pub delay_seconds: Option<u32>,
    pub message_attributes: HashMap<String, MessageAttributeValue>,
    /// Required for FIFO queues
    pub message_group_id: Option<String>,
    pub message_deduplication_id: Option<String>,
}

impl SendOptions {
    /// Create new send options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay delivery
    pub fn with_delay_seconds(mut self, seconds: u32) -> Self {
        self.delay_seconds = Some(seconds);
        self
    }

    /// Add a message attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: MessageAttributeValue) -> Self {
        self.message_attributes.insert(name.into(), value);
        self
    }

    /// Set the FIFO message group
    pub fn with_message_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.message_group_id = Some(group_id.into());
        self
    }

    /// Set the FIFO deduplication id
    pub fn with_deduplication_id(mut self, dedup_id: impl Into<String>) -> Self {
        self.message_deduplication_id = Some(dedup_id.into());
        self
    }

    /// Check the options against the limits the service enforces
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(delay) = self.delay_seconds {
            if delay > MAX_DELAY_SECONDS {
                return Err(ValidationError::OutOfRange {
                    field: "delay_seconds".to_string(),
                    message: format!("{} exceeds maximum of {}", delay, MAX_DELAY_SECONDS),
                });
            }
        }

        for (name, value) in &self.message_attributes {
            if name.is_empty() {
                return Err(ValidationError::Required {
                    field: "message_attributes.name".to_string(),
                });
            }

            if !is_supported_data_type(&value.data_type) {
                return Err(ValidationError::InvalidFormat {
                    field: format!("message_attributes.{}", name),
                    message: format!("unsupported data type '{}'", value.data_type),
                });
            }
        }

        Ok(())
    }
}

/// Options passed through to the service when receiving
#[derive(Debug, Clone, Default)]
pub struct ReceiveOptions {
    /// Long-poll wait, 0-20 seconds
    pub wait_time_seconds: Option<u32>,
    /// How long received messages stay hidden from other receivers
    pub visibility_timeout: Option<u32>,
    /// System attributes to return, e.g. `All` or `ApproximateReceiveCount`
    pub attribute_names: Vec<String>,
    /// Message attributes to return, e.g. `All`
    pub message_attribute_names: Vec<String>,
    /// FIFO receive deduplication token
    pub receive_request_attempt_id: Option<String>,
}

impl ReceiveOptions {
    /// Create new receive options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Long-poll for up to `seconds`
    pub fn with_wait_time_seconds(mut self, seconds: u32) -> Self {
        self.wait_time_seconds = Some(seconds);
        self
    }

    /// Override the queue's visibility timeout for this receive
    pub fn with_visibility_timeout(mut self, seconds: u32) -> Self {
        self.visibility_timeout = Some(seconds);
        self
    }

    /// Request a system attribute
    pub fn with_attribute_name(mut self, name: impl Into<String>) -> Self {
        self.attribute_names.push(name.into());
        self
    }

    /// Request a message attribute
    pub fn with_message_attribute_name(mut self, name: impl Into<String>) -> Self {
        self.message_attribute_names.push(name.into());
        self
    }

    /// Set the FIFO receive request attempt id
    pub fn with_receive_request_attempt_id(mut self, attempt_id: impl Into<String>) -> Self {
        self.receive_request_attempt_id = Some(attempt_id.into());
        self
    }

    /// Check the options against the limits the service enforces
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(wait) = self.wait_time_seconds {
            if wait > MAX_WAIT_TIME_SECONDS {
                return Err(ValidationError::OutOfRange {
                    field: "wait_time_seconds".to_string(),
                    message: format!("{} exceeds maximum of {}", wait, MAX_WAIT_TIME_SECONDS),
                });
            }
        }

        if let Some(timeout) = self.visibility_timeout {
            if timeout > MAX_VISIBILITY_TIMEOUT {
                return Err(ValidationError::OutOfRange {
                    field: "visibility_timeout".to_string(),
                    message: format!("{} exceeds maximum of {}", timeout, MAX_VISIBILITY_TIMEOUT),
                });
            }
        }

        Ok(())
    }
}

/// `String` or `Number`, optionally followed by `.` and a custom label
fn is_supported_data_type(data_type: &str) -> bool {
    ["String", "Number"].iter().any(|base| {
        data_type == *base
            || data_type
                .strip_prefix(base)
                .and_then(|rest| rest.strip_prefix('.'))
                .map(|label| !label.is_empty())
                .unwrap_or(false)
    })
}

/// Check a message body against the service size limits
pub(crate) fn validate_body(body: &str) -> Result<(), ValidationError> {
    if body.is_empty() {
        return Err(ValidationError::Required {
            field: "body".to_string(),
        });
    }

    if body.len() > MAX_MESSAGE_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "body".to_string(),
            message: format!(
                "{} bytes exceeds maximum of {}",
                body.len(),
                MAX_MESSAGE_SIZE
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
