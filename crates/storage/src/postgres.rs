//! PostgreSQL storage backend.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use parabens_core::{
    Contact, ContactPatch, DeliveryRecord, Employee, EmployeePatch, NewContact,
    NewDeliveryRecord, NewEmployee, NotificationConfig,
};

use crate::{Storage, StorageError};

// ── Rows ─────────────────────────────────────────────────────────

const EMPLOYEE_COLUMNS: &str = "id, name, birth_date, position, email";
const CONTACT_COLUMNS: &str = "id, name, phone, role, is_active";
const MESSAGE_COLUMNS: &str =
    "id, employee_id, contact_id, type, content, status, scheduled_for, sent_at, error_message";
const SETTINGS_COLUMNS: &str = "reminder_template, birthday_template, reminder_time, \
     birthday_time, weekends_enabled, retry_attempts, retry_interval";

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    id: Uuid,
    name: String,
    birth_date: NaiveDate,
    position: String,
    email: Option<String>,
}

impl From<EmployeeRow> for Employee {
    fn from(r: EmployeeRow) -> Self {
        Employee {
            id: r.id,
            name: r.name,
            birth_date: r.birth_date,
            position: r.position,
            email: r.email,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: Uuid,
    name: String,
    phone: String,
    role: String,
    is_active: bool,
}

impl From<ContactRow> for Contact {
    fn from(r: ContactRow) -> Self {
        Contact {
            id: r.id,
            name: r.name,
            phone: r.phone,
            role: r.role,
            is_active: r.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    employee_id: Uuid,
    contact_id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    content: String,
    status: String,
    scheduled_for: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl TryFrom<MessageRow> for DeliveryRecord {
    type Error = StorageError;

    fn try_from(r: MessageRow) -> Result<Self, Self::Error> {
        Ok(DeliveryRecord {
            id: r.id,
            employee_id: r.employee_id,
            contact_id: r.contact_id,
            kind: r.kind.parse()?,
            content: r.content,
            status: r.status.parse()?,
            scheduled_for: r.scheduled_for,
            sent_at: r.sent_at,
            error_message: r.error_message,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    reminder_template: String,
    birthday_template: String,
    reminder_time: String,
    birthday_time: String,
    weekends_enabled: bool,
    retry_attempts: i32,
    retry_interval: i32,
}

impl TryFrom<SettingsRow> for NotificationConfig {
    type Error = StorageError;

    fn try_from(r: SettingsRow) -> Result<Self, Self::Error> {
        let non_negative = |v: i32, field: &str| {
            u32::try_from(v).map_err(|_| StorageError::Corrupt {
                table: "settings",
                reason: format!("{field} is negative: {v}"),
            })
        };
        Ok(NotificationConfig {
            reminder_template: r.reminder_template,
            birthday_template: r.birthday_template,
            reminder_time: r.reminder_time.parse()?,
            birthday_time: r.birthday_time.parse()?,
            weekends_enabled: r.weekends_enabled,
            retry_attempts: non_negative(r.retry_attempts, "retry_attempts")?,
            retry_interval: non_negative(r.retry_interval, "retry_interval")?,
        })
    }
}

fn to_i32(v: u32, field: &str) -> Result<i32, StorageError> {
    i32::try_from(v).map_err(|_| StorageError::Other(format!("{field} out of range: {v}")))
}

// ── Store ────────────────────────────────────────────────────────

/// PostgreSQL-backed store. Schema lives in `migrations/` and is applied on connect.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Connect, run migrations and return the store.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(url)
            .await?;
        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("Database migrations applied successfully");
        Ok(Self { pool })
    }

    /// Seed the settings row on first boot; existing settings are left untouched.
    pub async fn ensure_default_config(&self) -> Result<(), StorageError> {
        let defaults = NotificationConfig::default();
        let result = sqlx::query(
            "INSERT INTO settings (id, reminder_template, birthday_template, reminder_time, \
                 birthday_time, weekends_enabled, retry_attempts, retry_interval) \
             VALUES (1, $1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&defaults.reminder_template)
        .bind(&defaults.birthday_template)
        .bind(defaults.reminder_time.to_string())
        .bind(defaults.birthday_time.to_string())
        .bind(defaults.weekends_enabled)
        .bind(to_i32(defaults.retry_attempts, "retry_attempts")?)
        .bind(to_i32(defaults.retry_interval, "retry_interval")?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!("Default notification settings created");
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn list_employees(&self) -> Result<Vec<Employee>, StorageError> {
        let rows = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Employee::from).collect())
    }

    async fn get_employee(&self, id: Uuid) -> Result<Option<Employee>, StorageError> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Employee::from))
    }

    async fn create_employee(&self, input: NewEmployee) -> Result<Employee, StorageError> {
        let e = input.into_employee(Uuid::new_v4());
        let row = sqlx::query_as::<_, EmployeeRow>(&format!(
            "INSERT INTO employees (id, name, birth_date, position, email) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {EMPLOYEE_COLUMNS}"
        ))
        .bind(e.id)
        .bind(&e.name)
        .bind(e.birth_date)
        .bind(&e.position)
        .bind(&e.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_employee(
        &self,
        id: Uuid,
        patch: EmployeePatch,
    ) -> Result<Option<Employee>, StorageError> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!(
            "UPDATE employees SET \
                name       = COALESCE($2, name), \
                birth_date = COALESCE($3, birth_date), \
                position   = COALESCE($4, position), \
                email      = CASE WHEN $5::text IS NULL THEN email ELSE NULLIF($5, '') END \
             WHERE id = $1 RETURNING {EMPLOYEE_COLUMNS}"
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(patch.birth_date)
        .bind(&patch.position)
        .bind(&patch.email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Employee::from))
    }

    async fn delete_employee(&self, id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, StorageError> {
        let rows = sqlx::query_as::<_, ContactRow>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Contact::from).collect())
    }

    async fn get_contact(&self, id: Uuid) -> Result<Option<Contact>, StorageError> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Contact::from))
    }

    async fn create_contact(&self, input: NewContact) -> Result<Contact, StorageError> {
        let c = input.into_contact(Uuid::new_v4());
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            "INSERT INTO contacts (id, name, phone, role, is_active) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(c.id)
        .bind(&c.name)
        .bind(&c.phone)
        .bind(&c.role)
        .bind(c.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_contact(
        &self,
        id: Uuid,
        patch: ContactPatch,
    ) -> Result<Option<Contact>, StorageError> {
        let row = sqlx::query_as::<_, ContactRow>(&format!(
            "UPDATE contacts SET \
                name      = COALESCE($2, name), \
                phone     = COALESCE($3, phone), \
                role      = COALESCE($4, role), \
                is_active = COALESCE($5, is_active) \
             WHERE id = $1 RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.phone)
        .bind(&patch.role)
        .bind(patch.is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Contact::from))
    }

    async fn delete_contact(&self, id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_deliveries(&self) -> Result<Vec<DeliveryRecord>, StorageError> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DeliveryRecord::try_from).collect()
    }

    async fn get_delivery(&self, id: Uuid) -> Result<Option<DeliveryRecord>, StorageError> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DeliveryRecord::try_from).transpose()
    }

    async fn create_delivery(
        &self,
        input: NewDeliveryRecord,
    ) -> Result<DeliveryRecord, StorageError> {
        let r = input.into_record(Uuid::new_v4());
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "INSERT INTO messages (id, employee_id, contact_id, type, content, status, \
                 scheduled_for, sent_at, error_message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(r.id)
        .bind(r.employee_id)
        .bind(r.contact_id)
        .bind(r.kind.as_str())
        .bind(&r.content)
        .bind(r.status.as_str())
        .bind(r.scheduled_for)
        .bind(r.sent_at)
        .bind(&r.error_message)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn delete_delivery(&self, id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_config(&self) -> Result<Option<NotificationConfig>, StorageError> {
        let row = sqlx::query_as::<_, SettingsRow>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM settings WHERE id = 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.map(NotificationConfig::try_from).transpose()
    }

    async fn save_config(
        &self,
        config: NotificationConfig,
    ) -> Result<NotificationConfig, StorageError> {
        config.validate()?;
        let row = sqlx::query_as::<_, SettingsRow>(&format!(
            "INSERT INTO settings (id, {SETTINGS_COLUMNS}) \
             VALUES (1, $1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET \
                reminder_template = EXCLUDED.reminder_template, \
                birthday_template = EXCLUDED.birthday_template, \
                reminder_time     = EXCLUDED.reminder_time, \
                birthday_time     = EXCLUDED.birthday_time, \
                weekends_enabled  = EXCLUDED.weekends_enabled, \
                retry_attempts    = EXCLUDED.retry_attempts, \
                retry_interval    = EXCLUDED.retry_interval \
             RETURNING {SETTINGS_COLUMNS}"
        ))
        .bind(&config.reminder_template)
        .bind(&config.birthday_template)
        .bind(config.reminder_time.to_string())
        .bind(config.birthday_time.to_string())
        .bind(config.weekends_enabled)
        .bind(to_i32(config.retry_attempts, "retry_attempts")?)
        .bind(to_i32(config.retry_interval, "retry_interval")?)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }
}
