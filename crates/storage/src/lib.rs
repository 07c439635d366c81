//! Record storage for employees, contacts, delivery records and the
//! notification settings.
//!
//! The scheduler and dispatcher only ever see the [`Storage`] trait. The
//! concrete backend is picked once at startup by [`open_storage`]:
//! PostgreSQL when `DATABASE_URL` is set, otherwise the in-memory store.

pub mod error;
pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use parabens_core::{
    Contact, ContactPatch, DeliveryRecord, Employee, EmployeePatch, NewContact,
    NewDeliveryRecord, NewEmployee, NotificationConfig,
};

pub use error::StorageError;
pub use memory::MemStorage;
pub use postgres::PgStorage;

/// Capability set shared by every storage backend.
///
/// Listing operations return records in a stable order (insertion order for
/// the in-memory store, creation order for PostgreSQL).
#[async_trait]
pub trait Storage: Send + Sync {
    // Employees
    async fn list_employees(&self) -> Result<Vec<Employee>, StorageError>;
    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, StorageError>;
    async fn create_employee(&self, input: NewEmployee) -> Result<Employee, StorageError>;
    async fn update_employee(
        &self,
        id: Uuid,
        patch: EmployeePatch,
    ) -> Result<Option<Employee>, StorageError>;
    async fn delete_employee(&self, id: Uuid) -> Result<bool, StorageError>;

    // Contacts
    async fn list_contacts(&self) -> Result<Vec<Contact>, StorageError>;
    async fn get_contact(&self, id: Uuid) -> Result<Option<Contact>, StorageError>;
    async fn create_contact(&self, input: NewContact) -> Result<Contact, StorageError>;
    async fn update_contact(
        &self,
        id: Uuid,
        patch: ContactPatch,
    ) -> Result<Option<Contact>, StorageError>;
    async fn delete_contact(&self, id: Uuid) -> Result<bool, StorageError>;

    // Delivery records (append-only from the scheduler's side)
    async fn list_deliveries(&self) -> Result<Vec<DeliveryRecord>, StorageError>;
    async fn get_delivery(&self, id: Uuid) -> Result<Option<DeliveryRecord>, StorageError>;
    async fn create_delivery(&self, input: NewDeliveryRecord)
        -> Result<DeliveryRecord, StorageError>;
    async fn delete_delivery(&self, id: Uuid) -> Result<bool, StorageError>;

    // Settings singleton
    async fn get_config(&self) -> Result<Option<NotificationConfig>, StorageError>;
    async fn save_config(
        &self,
        config: NotificationConfig,
    ) -> Result<NotificationConfig, StorageError>;

    /// Active contacts only, in listing order.
    async fn active_contacts(&self) -> Result<Vec<Contact>, StorageError> {
        Ok(self
            .list_contacts()
            .await?
            .into_iter()
            .filter(|c| c.is_active)
            .collect())
    }
}

/// Blanket implementation so `Arc<dyn Storage>` can be used directly.
#[async_trait]
impl<T: Storage + ?Sized> Storage for Arc<T> {
    async fn list_employees(&self) -> Result<Vec<Employee>, StorageError> {
        (**self).list_employees().await
    }
    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, StorageError> {
        (**self).get_employee(id).await
    }
    async fn create_employee(&self, input: NewEmployee) -> Result<Employee, StorageError> {
        (**self).create_employee(input).await
    }
    async fn update_employee(
        &self,
        id: Uuid,
        patch: EmployeePatch,
    ) -> Result<Option<Employee>, StorageError> {
        (**self).update_employee(id, patch).await
    }
    async fn delete_employee(&self, id: Uuid) -> Result<bool, StorageError> {
        (**self).delete_employee(id).await
    }
    async fn list_contacts(&self) -> Result<Vec<Contact>, StorageError> {
        (**self).list_contacts().await
    }
    async fn get_contact(&self, id: Uuid) -> Result<Option<Contact>, StorageError> {
        (**self).get_contact(id).await
    }
    async fn create_contact(&self, input: NewContact) -> Result<Contact, StorageError> {
        (**self).create_contact(input).await
    }
    async fn update_contact(
        &self,
        id: Uuid,
        patch: ContactPatch,
    ) -> Result<Option<Contact>, StorageError> {
        (**self).update_contact(id, patch).await
    }
    async fn delete_contact(&self, id: Uuid) -> Result<bool, StorageError> {
        (**self).delete_contact(id).await
    }
    async fn list_deliveries(&self) -> Result<Vec<DeliveryRecord>, StorageError> {
        (**self).list_deliveries().await
    }
    async fn get_delivery(&self, id: Uuid) -> Result<Option<DeliveryRecord>, StorageError> {
        (**self).get_delivery(id).await
    }
    async fn create_delivery(
        &self,
        input: NewDeliveryRecord,
    ) -> Result<DeliveryRecord, StorageError> {
        (**self).create_delivery(input).await
    }
    async fn delete_delivery(&self, id: Uuid) -> Result<bool, StorageError> {
        (**self).delete_delivery(id).await
    }
    async fn get_config(&self) -> Result<Option<NotificationConfig>, StorageError> {
        (**self).get_config().await
    }
    async fn save_config(
        &self,
        config: NotificationConfig,
    ) -> Result<NotificationConfig, StorageError> {
        (**self).save_config(config).await
    }
}

/// Select the storage backend from config.
///
/// A configured database that cannot be reached is an error: silently
/// dropping to memory would lose every record written afterwards.
pub async fn open_storage(
    config: &parabens_core::config::DatabaseConfig,
) -> Result<Arc<dyn Storage>, StorageError> {
    match config.url.as_deref() {
        Some(url) => {
            let pg = PgStorage::connect(url, config.max_connections).await?;
            pg.ensure_default_config().await?;
            info!("Storage: PostgreSQL ({})", config.redacted_url());
            Ok(Arc::new(pg))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory storage (records are lost on restart)");
            Ok(Arc::new(MemStorage::new()))
        }
    }
}
