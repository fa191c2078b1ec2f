//! Tests for the in-memory queue service.

use super::*;

fn name(value: &str) -> QueueName {
    QueueName::new(value).unwrap()
}

async fn create(service: &InMemoryQueueService, value: &str) -> QueueHandle {
    service
        .create_queue(&name(value), &HashMap::new(), &HashMap::new())
        .await
        .unwrap()
}

fn all_attributes() -> ReceiveOptions {
    ReceiveOptions::new().with_attribute_name("All")
}

// ============================================================================
// Queue Management
// ============================================================================

mod queue_management {
    use super::*;

    /// Verify that a created queue can be looked up by name.
    #[tokio::test]
    async fn test_create_then_get_queue_url() {
        let service = InMemoryQueueService::new();

        let created = create(&service, "orders").await;
        let found = service.get_queue_url(&name("orders")).await.unwrap();

        assert_eq!(created, found);
        assert_eq!(found.url(), "http://localhost:9324/000000000000/orders");
    }

    /// Verify that looking up an unknown queue reports it as not found.
    #[tokio::test]
    async fn test_get_queue_url_for_unknown_queue() {
        let service = InMemoryQueueService::new();

        let result = service.get_queue_url(&name("missing")).await;

        assert!(matches!(
            result,
            Err(QueueError::QueueNotFound { ref queue_name }) if queue_name == "missing"
        ));
    }

    /// Verify that creating an existing queue with the same attributes is a no-op.
    #[tokio::test]
    async fn test_create_is_idempotent() {
        let service = InMemoryQueueService::new();
        let mut attributes = HashMap::new();
        attributes.insert("VisibilityTimeout".to_string(), "60".to_string());

        let first = service
            .create_queue(&name("orders"), &attributes, &HashMap::new())
            .await
            .unwrap();
        let second = service
            .create_queue(&name("orders"), &attributes, &HashMap::new())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(service.call_count(ServiceOperation::CreateQueue), 2);
    }

    /// Verify that conflicting attributes on an existing queue are rejected.
    #[tokio::test]
    async fn test_create_with_conflicting_attributes() {
        let service = InMemoryQueueService::new();
        create(&service, "orders").await;

        let mut attributes = HashMap::new();
        attributes.insert("VisibilityTimeout".to_string(), "60".to_string());
        let result = service
            .create_queue(&name("orders"), &attributes, &HashMap::new())
            .await;

        match result {
            Err(QueueError::RemoteService(RemoteServiceError::Service { status, code, .. })) => {
                assert_eq!(status, 400);
                assert_eq!(code, "QueueAlreadyExists");
            }
            other => panic!("Expected QueueAlreadyExists, got {:?}", other),
        }
    }

    /// Verify that out-of-range timing attributes are rejected at creation.
    #[tokio::test]
    async fn test_create_rejects_invalid_timing_attributes() {
        let service = InMemoryQueueService::new();
        let invalid = [
            ("VisibilityTimeout", "9223372036854775"),
            ("VisibilityTimeout", "43201"),
            ("VisibilityTimeout", "-1"),
            ("DelaySeconds", "901"),
            ("DelaySeconds", "soon"),
        ];

        for (attribute, value) in invalid {
            let mut attributes = HashMap::new();
            attributes.insert(attribute.to_string(), value.to_string());

            let result = service
                .create_queue(&name("orders"), &attributes, &HashMap::new())
                .await;

            match result {
                Err(QueueError::RemoteService(RemoteServiceError::Service {
                    status, code, ..
                })) => {
                    assert_eq!(status, 400, "{}={}", attribute, value);
                    assert_eq!(code, "InvalidAttributeValue", "{}={}", attribute, value);
                }
                other => panic!(
                    "Expected InvalidAttributeValue for {}={}, got {:?}",
                    attribute, value, other
                ),
            }
        }

        assert!(service.get_queue_url(&name("orders")).await.is_err());
    }

    /// Verify that the largest accepted visibility timeout can be used for receives.
    #[tokio::test]
    async fn test_maximum_visibility_timeout_attribute() {
        let service = InMemoryQueueService::new();
        let mut attributes = HashMap::new();
        attributes.insert("VisibilityTimeout".to_string(), "43200".to_string());
        let handle = service
            .create_queue(&name("orders"), &attributes, &HashMap::new())
            .await
            .unwrap();
        service
            .send_message(&handle, "hello", &SendOptions::new())
            .await
            .unwrap();

        let first = service
            .receive_messages(&handle, 1, &ReceiveOptions::new())
            .await
            .unwrap();
        let second = service
            .receive_messages(&handle, 1, &ReceiveOptions::new())
            .await
            .unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    /// Verify that operations on a deleted queue report it as not found.
    #[tokio::test]
    async fn test_operations_after_delete_queue() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders").await;

        service.delete_queue(&name("orders")).unwrap();

        let result = service.send_message(&handle, "hello", &SendOptions::new()).await;
        assert!(result.unwrap_err().is_queue_not_found());

        let result = service.purge_queue(&handle).await;
        assert!(result.unwrap_err().is_queue_not_found());
    }

    /// Verify that purge removes every message, including in-flight ones.
    #[tokio::test]
    async fn test_purge_removes_all_messages() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders").await;
        for body in ["a", "b", "c"] {
            service
                .send_message(&handle, body, &SendOptions::new())
                .await
                .unwrap();
        }
        service
            .receive_messages(&handle, 1, &ReceiveOptions::new())
            .await
            .unwrap();

        service.purge_queue(&handle).await.unwrap();

        assert_eq!(service.message_count(&name("orders")).unwrap(), 0);
    }
}

// ============================================================================
// Send and Receive
// ============================================================================

mod send_and_receive {
    use super::*;

    /// Verify that messages come back in the order they were sent.
    #[tokio::test]
    async fn test_receive_in_send_order() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders").await;
        for body in ["first", "second", "third"] {
            service
                .send_message(&handle, body, &SendOptions::new())
                .await
                .unwrap();
        }

        let messages = service
            .receive_messages(&handle, 10, &ReceiveOptions::new())
            .await
            .unwrap();

        let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "third"]);
        assert!(messages.iter().all(|m| m.queue_url == handle.url()));
    }

    /// Verify that the send result carries the body digest.
    #[tokio::test]
    async fn test_send_reports_md5_of_body() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders").await;

        let result = service
            .send_message(&handle, "hello", &SendOptions::new())
            .await
            .unwrap();

        assert_eq!(result.md5_of_body, "5d41402abc4b2a76b9719d911017c592");
        assert!(result.sequence_number.is_none());
    }

    /// Verify that receive returns at most the requested number of messages.
    #[tokio::test]
    async fn test_receive_respects_max_messages() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders").await;
        for i in 0..5 {
            service
                .send_message(&handle, &format!("m{}", i), &SendOptions::new())
                .await
                .unwrap();
        }

        let messages = service
            .receive_messages(&handle, 2, &ReceiveOptions::new())
            .await
            .unwrap();

        assert_eq!(messages.len(), 2);
    }

    /// Verify that received messages stay hidden for the visibility timeout.
    #[tokio::test]
    async fn test_received_message_is_hidden() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders").await;
        service
            .send_message(&handle, "hello", &SendOptions::new())
            .await
            .unwrap();

        let first = service
            .receive_messages(&handle, 10, &ReceiveOptions::new())
            .await
            .unwrap();
        let second = service
            .receive_messages(&handle, 10, &ReceiveOptions::new())
            .await
            .unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(service.message_count(&name("orders")).unwrap(), 1);
    }

    /// Verify that a zero visibility timeout redelivers with a new receipt handle.
    #[tokio::test]
    async fn test_redelivery_issues_new_receipt_handle() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders").await;
        service
            .send_message(&handle, "hello", &SendOptions::new())
            .await
            .unwrap();
        let options = all_attributes().with_visibility_timeout(0);

        let first = service
            .receive_messages(&handle, 1, &options)
            .await
            .unwrap();
        let second = service
            .receive_messages(&handle, 1, &options)
            .await
            .unwrap();

        assert_eq!(first[0].message_id, second[0].message_id);
        assert_ne!(first[0].receipt_handle, second[0].receipt_handle);
        assert_eq!(first[0].receive_count(), Some(1));
        assert_eq!(second[0].receive_count(), Some(2));
    }

    /// Verify that delayed messages are not delivered before their delay.
    #[tokio::test]
    async fn test_delayed_message_is_not_visible() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders").await;
        service
            .send_message(&handle, "later", &SendOptions::new().with_delay_seconds(60))
            .await
            .unwrap();

        let messages = service
            .receive_messages(&handle, 10, &ReceiveOptions::new())
            .await
            .unwrap();

        assert!(messages.is_empty());
        assert_eq!(service.message_count(&name("orders")).unwrap(), 1);
    }

    /// Verify that the queue's DelaySeconds applies when a send sets no delay.
    #[tokio::test]
    async fn test_queue_delay_is_default_for_sends() {
        let service = InMemoryQueueService::new();
        let mut attributes = HashMap::new();
        attributes.insert("DelaySeconds".to_string(), "60".to_string());
        let handle = service
            .create_queue(&name("orders"), &attributes, &HashMap::new())
            .await
            .unwrap();

        service
            .send_message(&handle, "queued", &SendOptions::new())
            .await
            .unwrap();
        service
            .send_message(&handle, "now", &SendOptions::new().with_delay_seconds(0))
            .await
            .unwrap();

        let messages = service
            .receive_messages(&handle, 10, &ReceiveOptions::new())
            .await
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "now");
    }

    /// Verify that a long poll returns a message sent while it waits.
    #[tokio::test]
    async fn test_long_poll_picks_up_late_message() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders").await;

        let sender = service.clone();
        let sender_handle = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            sender
                .send_message(&sender_handle, "late", &SendOptions::new())
                .await
                .unwrap();
        });

        let messages = service
            .receive_messages(&handle, 1, &ReceiveOptions::new().with_wait_time_seconds(5))
            .await
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "late");
    }

    /// Verify that attributes are only returned when requested.
    #[tokio::test]
    async fn test_attributes_returned_on_request() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders").await;
        let send_options = SendOptions::new()
            .with_attribute("tenant", MessageAttributeValue::string("acme"))
            .with_attribute("priority", MessageAttributeValue::number(5));
        service
            .send_message(&handle, "a", &send_options)
            .await
            .unwrap();
        service
            .send_message(&handle, "b", &send_options)
            .await
            .unwrap();

        let bare = service
            .receive_messages(&handle, 1, &ReceiveOptions::new())
            .await
            .unwrap();
        assert!(bare[0].attributes.is_empty());
        assert!(bare[0].message_attributes.is_empty());

        let options = ReceiveOptions::new()
            .with_attribute_name("SentTimestamp")
            .with_message_attribute_name("tenant");
        let selected = service
            .receive_messages(&handle, 1, &options)
            .await
            .unwrap();

        assert!(selected[0].sent_at().is_some());
        assert!(selected[0].receive_count().is_none());
        assert_eq!(selected[0].message_attributes.len(), 1);
        assert_eq!(
            selected[0].message_attributes.get("tenant"),
            Some(&MessageAttributeValue::string("acme"))
        );
    }
}

// ============================================================================
// FIFO Queues
// ============================================================================

mod fifo {
    use super::*;

    /// Verify that FIFO sends without a message group are rejected.
    #[tokio::test]
    async fn test_fifo_send_requires_group_id() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders.fifo").await;

        let result = service
            .send_message(&handle, "hello", &SendOptions::new())
            .await;

        assert!(matches!(
            result,
            Err(QueueError::RemoteService(RemoteServiceError::Service { ref code, .. }))
                if code == "MissingParameter"
        ));
    }

    /// Verify that FIFO sends are assigned increasing sequence numbers.
    #[tokio::test]
    async fn test_fifo_sequence_numbers_increase() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders.fifo").await;
        let options = SendOptions::new().with_message_group_id("group-1");

        let first = service.send_message(&handle, "a", &options).await.unwrap();
        let second = service.send_message(&handle, "b", &options).await.unwrap();

        let first = first.sequence_number.unwrap();
        let second = second.sequence_number.unwrap();
        assert!(first < second);
    }
}

// ============================================================================
// Batch Delete
// ============================================================================

mod batch_delete {
    use super::*;

    /// Verify that a batch delete reports each entry separately.
    #[tokio::test]
    async fn test_partial_batch_delete() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders").await;
        service
            .send_message(&handle, "hello", &SendOptions::new())
            .await
            .unwrap();
        let received = service
            .receive_messages(&handle, 1, &ReceiveOptions::new())
            .await
            .unwrap();

        let entries = vec![
            received[0].delete_entry("good"),
            DeleteEntry::new("bad", ReceiptHandle::new("not-a-receipt")),
        ];
        let result = service
            .delete_message_batch(&handle, &entries)
            .await
            .unwrap();

        assert_eq!(result.successful, vec!["good".to_string()]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].id, "bad");
        assert_eq!(result.failed[0].code, "ReceiptHandleIsInvalid");
        assert!(result.failed[0].sender_fault);
        assert_eq!(service.message_count(&name("orders")).unwrap(), 0);
    }

    /// Verify that a stale receipt handle no longer deletes the message.
    #[tokio::test]
    async fn test_stale_receipt_handle_is_rejected() {
        let service = InMemoryQueueService::new();
        let handle = create(&service, "orders").await;
        service
            .send_message(&handle, "hello", &SendOptions::new())
            .await
            .unwrap();
        let options = ReceiveOptions::new().with_visibility_timeout(0);
        let stale = service
            .receive_messages(&handle, 1, &options)
            .await
            .unwrap();
        let fresh = service
            .receive_messages(&handle, 1, &options)
            .await
            .unwrap();

        let result = service
            .delete_message_batch(&handle, &[stale[0].delete_entry("stale")])
            .await
            .unwrap();
        assert!(!result.is_complete_success());

        let result = service
            .delete_message_batch(&handle, &[fresh[0].delete_entry("fresh")])
            .await
            .unwrap();
        assert!(result.is_complete_success());
    }
}

// ============================================================================
// Call Counting
// ============================================================================

mod call_counting {
    use super::*;

    /// Verify that each trait call is counted once, even when it fails.
    #[tokio::test]
    async fn test_calls_are_counted_per_operation() {
        let service = InMemoryQueueService::new();
        let _ = service.get_queue_url(&name("missing")).await;
        create(&service, "orders").await;
        let _ = service.get_queue_url(&name("orders")).await;

        assert_eq!(service.call_count(ServiceOperation::GetQueueUrl), 2);
        assert_eq!(service.call_count(ServiceOperation::CreateQueue), 1);
        assert_eq!(service.call_count(ServiceOperation::SendMessage), 0);
        assert_eq!(service.total_calls(), 3);
    }

    /// Verify that clones share queues and counters.
    #[tokio::test]
    async fn test_clones_share_state() {
        let service = InMemoryQueueService::new();
        let clone = service.clone();

        create(&clone, "orders").await;

        assert!(service.get_queue_url(&name("orders")).await.is_ok());
        assert_eq!(service.total_calls(), 2);
        assert_eq!(service.service_name(), "InMemory");
    }
}
