//! Delivers one rendered message to every contact with bounded retries.
//!
//! Each contact is handled independently: a contact whose sends keep
//! failing never blocks the next one. Exactly one delivery record is
//! produced per contact, `sent` on the first success or `failed` once the
//! retry budget is spent.

use std::sync::Arc;

use chrono::Utc;

use parabens_core::{Contact, DeliveryRecord, Employee, MessageKind, NewDeliveryRecord, RetryPolicy};
use parabens_storage::Storage;

use crate::channel::MessageChannel;
use crate::templating::TemplateRenderer;

/// Sends notifications through a channel and appends the outcome to storage.
#[derive(Clone)]
pub struct NotificationDispatcher {
    channel: Arc<dyn MessageChannel>,
    storage: Arc<dyn Storage>,
}

impl NotificationDispatcher {
    pub fn new(channel: Arc<dyn MessageChannel>, storage: Arc<dyn Storage>) -> Self {
        Self { channel, storage }
    }

    /// Render `template` for `employee` and deliver it to each contact.
    ///
    /// Returns the records that were persisted. A record whose append fails
    /// is logged and left out of the result.
    pub async fn dispatch(
        &self,
        employee: &Employee,
        contacts: &[Contact],
        template: &str,
        kind: MessageKind,
        retry: &RetryPolicy,
        renderer: &TemplateRenderer,
    ) -> Vec<DeliveryRecord> {
        if contacts.is_empty() {
            tracing::debug!(employee = %employee.name, %kind, "No contacts to notify");
            return Vec::new();
        }

        let content = renderer.render(template, employee);
        let mut records = Vec::with_capacity(contacts.len());

        for contact in contacts {
            let outcome = self.deliver(employee, contact, &content, kind, retry).await;
            match self.storage.create_delivery(outcome).await {
                Ok(record) => records.push(record),
                Err(e) => tracing::error!(
                    employee = %employee.name,
                    contact = %contact.name,
                    %kind,
                    error = %e,
                    "Failed to store delivery record"
                ),
            }
        }

        records
    }

    /// Try one contact up to `retry.max_attempts` times.
    async fn deliver(
        &self,
        employee: &Employee,
        contact: &Contact,
        content: &str,
        kind: MessageKind,
        retry: &RetryPolicy,
    ) -> NewDeliveryRecord {
        let max_attempts = retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let start = std::time::Instant::now();
            match self.channel.send_message(&contact.phone, content).await {
                Ok(()) => {
                    tracing::info!(
                        employee = %employee.name,
                        contact = %contact.name,
                        %kind,
                        attempt,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Notification delivered"
                    );
                    return NewDeliveryRecord::sent(
                        employee.id,
                        contact.id,
                        kind,
                        content.to_string(),
                        Utc::now(),
                    );
                }
                Err(e) => {
                    last_error = format!("Failed to send message (attempt {attempt}): {e}");
                    tracing::warn!(
                        employee = %employee.name,
                        contact = %contact.name,
                        %kind,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(retry.backoff).await;
            }
        }

        tracing::error!(
            employee = %employee.name,
            contact = %contact.name,
            %kind,
            attempts = max_attempts,
            "Giving up on notification"
        );
        NewDeliveryRecord::failed(employee.id, contact.id, kind, content.to_string(), last_error)
    }
}
