//! In-memory storage backend for development and tests.

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use parabens_core::{
    Contact, ContactPatch, DeliveryRecord, Employee, EmployeePatch, NewContact,
    NewDeliveryRecord, NewEmployee, NotificationConfig,
};

use crate::{Storage, StorageError};

#[derive(Default)]
struct Tables {
    employees: IndexMap<Uuid, Employee>,
    contacts: IndexMap<Uuid, Contact>,
    deliveries: IndexMap<Uuid, DeliveryRecord>,
    config: Option<NotificationConfig>,
}

/// Keeps every record in insertion-ordered maps behind a single lock.
/// Seeded with the default notification settings.
pub struct MemStorage {
    tables: RwLock<Tables>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                config: Some(NotificationConfig::default()),
                ..Default::default()
            }),
        }
    }

    /// A store with no settings row, as a fresh database would look.
    pub fn without_config() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn list_employees(&self) -> Result<Vec<Employee>, StorageError> {
        Ok(self.tables.read().await.employees.values().cloned().collect())
    }

    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, StorageError> {
        Ok(self.tables.read().await.employees.get(&id).cloned())
    }

    async fn create_employee(&self, input: NewEmployee) -> Result<Employee, StorageError> {
        let employee = input.into_employee(Uuid::new_v4());
        self.tables
            .write()
            .await
            .employees
            .insert(employee.id, employee.clone());
        Ok(employee)
    }

    async fn update_employee(
        &self,
        id: Uuid,
        patch: EmployeePatch,
    ) -> Result<Option<Employee>, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables.employees.get_mut(&id).map(|existing| {
            patch.apply(existing);
            existing.clone()
        }))
    }

    async fn delete_employee(&self, id: Uuid) -> Result<bool, StorageError> {
        Ok(self.tables.write().await.employees.shift_remove(&id).is_some())
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, StorageError> {
        Ok(self.tables.read().await.contacts.values().cloned().collect())
    }

    async fn get_contact(&self, id: Uuid) -> Result<Option<Contact>, StorageError> {
        Ok(self.tables.read().await.contacts.get(&id).cloned())
    }

    async fn create_contact(&self, input: NewContact) -> Result<Contact, StorageError> {
        let contact = input.into_contact(Uuid::new_v4());
        self.tables
            .write()
            .await
            .contacts
            .insert(contact.id, contact.clone());
        Ok(contact)
    }

    async fn update_contact(
        &self,
        id: Uuid,
        patch: ContactPatch,
    ) -> Result<Option<Contact>, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables.contacts.get_mut(&id).map(|existing| {
            patch.apply(existing);
            existing.clone()
        }))
    }

    async fn delete_contact(&self, id: Uuid) -> Result<bool, StorageError> {
        Ok(self.tables.write().await.contacts.shift_remove(&id).is_some())
    }

    async fn list_deliveries(&self) -> Result<Vec<DeliveryRecord>, StorageError> {
        Ok(self.tables.read().await.deliveries.values().cloned().collect())
    }

    async fn get_delivery(&self, id: Uuid) -> Result<Option<DeliveryRecord>, StorageError> {
        Ok(self.tables.read().await.deliveries.get(&id).cloned())
    }

    async fn create_delivery(
        &self,
        input: NewDeliveryRecord,
    ) -> Result<DeliveryRecord, StorageError> {
        let record = input.into_record(Uuid::new_v4());
        self.tables
            .write()
            .await
            .deliveries
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete_delivery(&self, id: Uuid) -> Result<bool, StorageError> {
        Ok(self.tables.write().await.deliveries.shift_remove(&id).is_some())
    }

    async fn get_config(&self) -> Result<Option<NotificationConfig>, StorageError> {
        Ok(self.tables.read().await.config.clone())
    }

    async fn save_config(
        &self,
        config: NotificationConfig,
    ) -> Result<NotificationConfig, StorageError> {
        config.validate()?;
        self.tables.write().await.config = Some(config.clone());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use parabens_core::{DeliveryStatus, MessageKind};

    fn new_employee(name: &str) -> NewEmployee {
        NewEmployee {
            name: name.to_string(),
            birth_date: NaiveDate::from_ymd_opt(1988, 7, 2).unwrap(),
            position: "Analista".to_string(),
            email: None,
        }
    }

    fn new_contact(name: &str, active: bool) -> NewContact {
        NewContact {
            name: name.to_string(),
            phone: "11987654321".to_string(),
            role: "RH".to_string(),
            is_active: Some(active),
        }
    }

    #[tokio::test]
    async fn seeded_with_default_config() {
        let store = MemStorage::new();
        assert_eq!(store.get_config().await.unwrap(), Some(NotificationConfig::default()));
        assert_eq!(MemStorage::without_config().get_config().await.unwrap(), None);
    }

    #[tokio::test]
    async fn employees_keep_insertion_order_after_delete() {
        let store = MemStorage::new();
        let a = store.create_employee(new_employee("A")).await.unwrap();
        let b = store.create_employee(new_employee("B")).await.unwrap();
        let c = store.create_employee(new_employee("C")).await.unwrap();

        assert!(store.delete_employee(b.id).await.unwrap());
        assert!(!store.delete_employee(b.id).await.unwrap());

        let names: Vec<_> = store
            .list_employees()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(store.get_employee(a.id).await.unwrap().unwrap().name, "A");
        assert_eq!(store.get_employee(c.id).await.unwrap().unwrap().name, "C");
    }

    #[tokio::test]
    async fn update_missing_returns_none() {
        let store = MemStorage::new();
        let res = store
            .update_contact(Uuid::new_v4(), ContactPatch::default())
            .await
            .unwrap();
        assert!(res.is_none());
    }

    #[tokio::test]
    async fn active_contacts_filters_inactive() {
        let store = MemStorage::new();
        let on = store.create_contact(new_contact("on", true)).await.unwrap();
        let off = store.create_contact(new_contact("off", true)).await.unwrap();
        store
            .update_contact(
                off.id,
                ContactPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let active = store.active_contacts().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, on.id);
    }

    #[tokio::test]
    async fn deliveries_are_appended() {
        let store = MemStorage::new();
        let rec = store
            .create_delivery(NewDeliveryRecord::failed(
                Uuid::new_v4(),
                Uuid::new_v4(),
                MessageKind::Reminder,
                "msg".to_string(),
                "offline".to_string(),
            ))
            .await
            .unwrap();
        let all = store.list_deliveries().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, rec.id);
        assert_eq!(all[0].status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn save_config_rejects_invalid() {
        let store = MemStorage::new();
        let bad = NotificationConfig {
            retry_attempts: 0,
            ..Default::default()
        };
        assert!(store.save_config(bad).await.is_err());
        assert_eq!(store.get_config().await.unwrap().unwrap().retry_attempts, 2);
    }
}
