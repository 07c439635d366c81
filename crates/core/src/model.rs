//! Records shared by storage, dispatch and the HTTP layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParabensError;

// ── Employee ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    /// The year is only used for the `[IDADE]` placeholder, never for matching.
    pub birth_date: NaiveDate,
    pub position: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub birth_date: NaiveDate,
    pub position: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl NewEmployee {
    pub fn into_employee(self, id: Uuid) -> Employee {
        Employee {
            id,
            name: self.name,
            birth_date: self.birth_date,
            position: self.position,
            email: self.email.filter(|e| !e.is_empty()),
        }
    }
}

/// Partial update: only the supplied fields overwrite the stored record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmployeePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl EmployeePatch {
    pub fn apply(self, employee: &mut Employee) {
        if let Some(name) = self.name {
            employee.name = name;
        }
        if let Some(birth_date) = self.birth_date {
            employee.birth_date = birth_date;
        }
        if let Some(position) = self.position {
            employee.position = position;
        }
        if let Some(email) = self.email {
            employee.email = Some(email).filter(|e| !e.is_empty());
        }
    }
}

// ── Contact ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub role: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    pub role: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl NewContact {
    pub fn into_contact(self, id: Uuid) -> Contact {
        Contact {
            id,
            name: self.name,
            phone: self.phone,
            role: self.role,
            is_active: self.is_active.unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl ContactPatch {
    pub fn apply(self, contact: &mut Contact) {
        if let Some(name) = self.name {
            contact.name = name;
        }
        if let Some(phone) = self.phone {
            contact.phone = phone;
        }
        if let Some(role) = self.role {
            contact.role = role;
        }
        if let Some(is_active) = self.is_active {
            contact.is_active = is_active;
        }
    }
}

// ── Delivery records ──────────────────────────────────────────

/// Which trigger produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Reminder,
    Birthday,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Reminder => "reminder",
            MessageKind::Birthday => "birthday",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ParabensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reminder" => Ok(MessageKind::Reminder),
            "birthday" => Ok(MessageKind::Birthday),
            other => Err(ParabensError::UnknownVariant {
                kind: "message kind",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = ParabensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(ParabensError::UnknownVariant {
                kind: "delivery status",
                value: other.to_string(),
            }),
        }
    }
}

/// Audit trail entry: one per (employee, contact, firing), never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub contact_id: Uuid,
    pub kind: MessageKind,
    pub content: String,
    pub status: DeliveryStatus,
    /// Always `None` for immediate sends.
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeliveryRecord {
    pub employee_id: Uuid,
    pub contact_id: Uuid,
    pub kind: MessageKind,
    pub content: String,
    pub status: DeliveryStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl NewDeliveryRecord {
    /// A successful delivery stamped with the moment it went out.
    pub fn sent(
        employee_id: Uuid,
        contact_id: Uuid,
        kind: MessageKind,
        content: String,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            employee_id,
            contact_id,
            kind,
            content,
            status: DeliveryStatus::Sent,
            scheduled_for: None,
            sent_at: Some(sent_at),
            error_message: None,
        }
    }

    /// A delivery that exhausted every attempt.
    pub fn failed(
        employee_id: Uuid,
        contact_id: Uuid,
        kind: MessageKind,
        content: String,
        error: String,
    ) -> Self {
        Self {
            employee_id,
            contact_id,
            kind,
            content,
            status: DeliveryStatus::Failed,
            scheduled_for: None,
            sent_at: None,
            error_message: Some(error),
        }
    }

    pub fn into_record(self, id: Uuid) -> DeliveryRecord {
        DeliveryRecord {
            id,
            employee_id: self.employee_id,
            contact_id: self.contact_id,
            kind: self.kind,
            content: self.content,
            status: self.status,
            scheduled_for: self.scheduled_for,
            sent_at: self.sent_at,
            error_message: self.error_message,
        }
    }
}
