//! Queue client with a cache of resolved queue handles.
//!
//! [`QueueClient`] turns queue names into [`QueueHandle`]s through the
//! [`QueueService`], remembers them, and forwards every message operation to
//! the service using the cached handle.
//!
//! ## Caching
//!
//! A handle is looked up once per name and then reused until a bypassing
//! [`QueueClient::resolve`], a [`QueueClient::create`] or an explicit
//! [`QueueClient::invalidate`] replaces it. The client does not notice when a
//! queue is deleted elsewhere; calls made with the stale handle fail with
//! whatever the service reports.
//!
//! The cache lock is held across the remote lookup, so concurrent first
//! access to a name costs a single lookup.

use crate::config::ClientConfig;
use crate::error::{QueueError, RemoteServiceError, ValidationError};
use crate::message::{
    validate_body, DeleteEntry, DeleteResult, Message, QueueHandle, QueueName, ReceiptHandle,
    ReceiveOptions, SendOptions, SendResult, MAX_RECEIVE_BATCH,
};
use crate::providers::SqsHttpService;
use crate::service::QueueService;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Entry id used by [`QueueClient::delete_one`]
const SINGLE_DELETE_ID: &str = "single";

/// Client for a queue service, caching name to handle lookups
///
/// The client is `Send + Sync`; share it between tasks with `Arc`.
///
/// ## Example
///
/// ```no_run
/// use sqs_poller::{QueueClient, ReceiveOptions, SendOptions};
///
/// # async fn example() -> Result<(), sqs_poller::QueueError> {
/// let client = QueueClient::from_env()?;
///
/// client.send("orders", "hello", &SendOptions::new()).await?;
///
/// if let Some(message) = client.receive_one("orders", &ReceiveOptions::new()).await? {
///     client.delete_one("orders", &message.receipt_handle).await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct QueueClient {
    service: Arc<dyn QueueService>,
    handles: Mutex<HashMap<QueueName, Arc<QueueHandle>>>,
}

impl QueueClient {
    /// Create a client that talks to SQS using `config`
    pub fn new(config: ClientConfig) -> Result<Self, QueueError> {
        let service = SqsHttpService::new(&config)?;
        Ok(Self::with_service(Arc::new(service)))
    }

    /// Create a client configured from the process environment
    pub fn from_env() -> Result<Self, QueueError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client on top of any queue service
    pub fn with_service(service: Arc<dyn QueueService>) -> Self {
        Self {
            service,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a queue name to its handle.
    ///
    /// Returns the cached handle unless `bypass_cache` is set or there is
    /// none, in which case the service is asked and the answer is cached.
    ///
    /// # Errors
    ///
    /// - [`QueueError::QueueNotFound`] if the lookup finds no such queue.
    ///   A failed lookup leaves the cache unchanged.
    /// - [`QueueError::InvalidArgument`] if `name` is not a valid queue name
    #[instrument(skip_all, fields(queue = %name, bypass_cache = bypass_cache))]
    pub async fn resolve(
        &self,
        name: &str,
        bypass_cache: bool,
    ) -> Result<Arc<QueueHandle>, QueueError> {
        let name = QueueName::new(name)?;
        let mut handles = self.handles.lock().await;

        if !bypass_cache {
            if let Some(handle) = handles.get(&name) {
                debug!("Queue handle cache hit");
                return Ok(Arc::clone(handle));
            }
            debug!("Queue handle cache miss");
        }

        let handle = Arc::new(self.service.get_queue_url(&name).await?);
        debug!(
            url = %handle.url(),
            service = self.service.service_name(),
            "Resolved queue"
        );

        handles.insert(name, Arc::clone(&handle));
        Ok(handle)
    }

    /// Check whether a queue exists, always asking the service.
    ///
    /// A name that no queue could have, such as an empty or dotted one, does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Only failures other than [`QueueError::QueueNotFound`] are returned.
    #[instrument(skip_all, fields(queue = %name))]
    pub async fn exists(&self, name: &str) -> Result<bool, QueueError> {
        if let Err(reason) = QueueName::new(name) {
            debug!(%reason, "Name cannot refer to a queue");
            return Ok(false);
        }

        match self.resolve(name, true).await {
            Ok(_) => Ok(true),
            Err(QueueError::QueueNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create a queue, or fetch it if it already exists with the same
    /// attributes. The returned handle replaces any cached one.
    #[instrument(skip_all, fields(queue = %name))]
    pub async fn create(
        &self,
        name: &str,
        attributes: &HashMap<String, String>,
        tags: &HashMap<String, String>,
    ) -> Result<Arc<QueueHandle>, QueueError> {
        let name = QueueName::new(name)?;

        let handle = Arc::new(self.service.create_queue(&name, attributes, tags).await?);
        info!(url = %handle.url(), "Created queue");

        self.handles
            .lock()
            .await
            .insert(name, Arc::clone(&handle));
        Ok(handle)
    }

    /// Delete every message in a queue
    #[instrument(skip_all, fields(queue = %name))]
    pub async fn purge(&self, name: &str) -> Result<(), QueueError> {
        let handle = self.resolve(name, false).await?;
        self.service.purge_queue(&handle).await?;
        info!("Purged queue");
        Ok(())
    }

    /// Receive up to `max_count` messages.
    ///
    /// `max_count` above 10 is lowered to 10. The result may be empty.
    ///
    /// # Errors
    ///
    /// [`QueueError::InvalidArgument`] for a `max_count` of zero or options
    /// outside the service limits.
    #[instrument(skip_all, fields(queue = %name, max_count = max_count))]
    pub async fn receive_many(
        &self,
        name: &str,
        max_count: u32,
        options: &ReceiveOptions,
    ) -> Result<Vec<Message>, QueueError> {
        if max_count == 0 {
            return Err(ValidationError::OutOfRange {
                field: "max_count".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }
        options.validate()?;

        let max_count = if max_count > MAX_RECEIVE_BATCH {
            warn!(
                requested = max_count,
                limit = MAX_RECEIVE_BATCH,
                "Receive count above service limit, lowering"
            );
            MAX_RECEIVE_BATCH
        } else {
            max_count
        };

        let handle = self.resolve(name, false).await?;
        let messages = self
            .service
            .receive_messages(&handle, max_count, options)
            .await?;

        debug!(received = messages.len(), "Received messages");
        Ok(messages)
    }

    /// Receive at most one message
    pub async fn receive_one(
        &self,
        name: &str,
        options: &ReceiveOptions,
    ) -> Result<Option<Message>, QueueError> {
        let messages = self.receive_many(name, 1, options).await?;
        Ok(messages.into_iter().next())
    }

    /// Send one message.
    ///
    /// # Errors
    ///
    /// [`QueueError::InvalidArgument`] for an empty or oversized body or
    /// options outside the service limits. Nothing is sent in that case.
    #[instrument(skip_all, fields(queue = %name, body_len = body.len()))]
    pub async fn send(
        &self,
        name: &str,
        body: &str,
        options: &SendOptions,
    ) -> Result<SendResult, QueueError> {
        validate_body(body)?;
        options.validate()?;

        let handle = self.resolve(name, false).await?;
        let result = self.service.send_message(&handle, body, options).await?;

        debug!(message_id = %result.message_id, "Sent message");
        Ok(result)
    }

    /// Delete several received messages in one call.
    ///
    /// The batch is checked before anything is sent: 1-10 entries, unique
    /// ids of 1-80 alphanumerics, hyphens or underscores, and non-empty
    /// receipt handles. Per-entry failures reported by the service are
    /// returned in the [`DeleteResult`], not as an error.
    #[instrument(skip_all, fields(queue = %name, entries = entries.len()))]
    pub async fn delete_many(
        &self,
        name: &str,
        entries: &[DeleteEntry],
    ) -> Result<DeleteResult, QueueError> {
        DeleteEntry::validate_batch(entries)?;

        let handle = self.resolve(name, false).await?;
        let result = self.service.delete_message_batch(&handle, entries).await?;

        if !result.is_complete_success() {
            warn!(
                deleted = result.successful.len(),
                failed = result.failed.len(),
                "Batch delete partially failed"
            );
        }

        Ok(result)
    }

    /// Delete a single received message.
    ///
    /// A failure the service reports for the entry is returned as a
    /// [`RemoteServiceError::Service`] carrying its code.
    pub async fn delete_one(
        &self,
        name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), QueueError> {
        let entry = DeleteEntry::new(SINGLE_DELETE_ID, receipt_handle.clone());
        let result = self.delete_many(name, std::slice::from_ref(&entry)).await?;

        match result.failed.into_iter().next() {
            None => Ok(()),
            Some(failure) => Err(RemoteServiceError::Service {
                status: if failure.sender_fault { 400 } else { 500 },
                message: failure.message.unwrap_or_else(|| failure.code.clone()),
                code: failure.code,
            }
            .into()),
        }
    }

    /// Cached handle for a name, without asking the service
    pub async fn cached_handle(&self, name: &str) -> Option<Arc<QueueHandle>> {
        let name = QueueName::new(name).ok()?;
        self.handles.lock().await.get(&name).cloned()
    }

    /// Forget the cached handle for a name. Returns true if one was cached.
    pub async fn invalidate(&self, name: &str) -> bool {
        let Ok(name) = QueueName::new(name) else {
            return false;
        };
        self.handles.lock().await.remove(&name).is_some()
    }

    /// Forget every cached handle
    pub async fn clear_cache(&self) {
        self.handles.lock().await.clear();
    }

    /// Name of the underlying service
    pub fn service_name(&self) -> &'static str {
        self.service.service_name()
    }
}

impl std::fmt::Debug for QueueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueClient")
            .field("service", &self.service.service_name())
            .finish_non_exhaustive()
    }
}
