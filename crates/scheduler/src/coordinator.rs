//! [`ScheduleCoordinator`]: owns the two daily triggers and runs the firings.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Datelike, Local, NaiveDate};
use cron::Schedule;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use parabens_core::{DeliveryRecord, MessageKind, NotificationConfig};
use parabens_notify::{NotificationDispatcher, TemplateRenderer};
use parabens_storage::Storage;

use crate::cron::daily_schedule;
use crate::error::SchedulerError;
use crate::matcher::{find_matches, is_weekend};
use crate::trigger::DailyTrigger;

#[derive(Default)]
struct Triggers {
    reminder: Option<DailyTrigger>,
    birthday: Option<DailyTrigger>,
}

impl Triggers {
    fn count(&self) -> usize {
        usize::from(self.reminder.is_some()) + usize::from(self.birthday.is_some())
    }

    /// Drop both triggers. Returns how many were running.
    fn clear(&mut self) -> usize {
        let n = self.count();
        self.reminder = None;
        self.birthday = None;
        n
    }
}

/// Next fire instants of the installed triggers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NextFireTimes {
    pub reminder: Option<DateTime<Local>>,
    pub birthday: Option<DateTime<Local>>,
}

struct Inner {
    storage: Arc<dyn Storage>,
    dispatcher: NotificationDispatcher,
    triggers: Mutex<Triggers>,
    /// Held while reading settings, roster and contacts for one firing.
    snapshot: Mutex<()>,
}

/// Installs the reminder and birthday triggers and executes their firings.
///
/// Cheap to clone; clones share the same triggers.
#[derive(Clone)]
pub struct ScheduleCoordinator {
    inner: Arc<Inner>,
}

impl ScheduleCoordinator {
    pub fn new(storage: Arc<dyn Storage>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                dispatcher,
                triggers: Mutex::new(Triggers::default()),
                snapshot: Mutex::new(()),
            }),
        }
    }

    /// Install the triggers from the stored settings.
    pub async fn initialize(&self) -> Result<(), SchedulerError> {
        self.update_schedules().await?;
        info!("Birthday scheduler initialized");
        Ok(())
    }

    /// Cancel both triggers and reinstall them at the configured times.
    ///
    /// With no stored settings this is a logged no-op.
    pub async fn update_schedules(&self) -> Result<(), SchedulerError> {
        let Some(config) = self.inner.storage.get_config().await? else {
            info!("No notification settings found, triggers not installed");
            return Ok(());
        };

        let reminder = daily_schedule(config.reminder_time)?;
        let birthday = daily_schedule(config.birthday_time)?;
        self.install(reminder, birthday).await;

        info!(
            reminder_time = %config.reminder_time,
            birthday_time = %config.birthday_time,
            "Notification triggers scheduled"
        );
        Ok(())
    }

    /// Replace both triggers with ones firing on the given schedules.
    pub(crate) async fn install(&self, reminder: Schedule, birthday: Schedule) {
        let mut triggers = self.inner.triggers.lock().await;
        let cancelled = triggers.clear();
        if cancelled > 0 {
            debug!(cancelled, "Previous triggers cancelled");
        }

        let weak = Arc::downgrade(&self.inner);
        triggers.reminder = Some(DailyTrigger::spawn("reminder", reminder, move || {
            let weak = weak.clone();
            async move {
                if let Some(coordinator) = Self::upgrade(&weak) {
                    coordinator.on_reminder_fire().await;
                }
            }
        }));

        let weak = Arc::downgrade(&self.inner);
        triggers.birthday = Some(DailyTrigger::spawn("birthday", birthday, move || {
            let weak = weak.clone();
            async move {
                if let Some(coordinator) = Self::upgrade(&weak) {
                    coordinator.on_birthday_fire().await;
                }
            }
        }));
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Trigger entry point for the reminder time.
    pub async fn on_reminder_fire(&self) {
        let today = Local::now().date_naive();
        match self.fire_reminder(today).await {
            Ok(records) => info!(today = %today, deliveries = records.len(), "Reminder check finished"),
            Err(e) => error!(error = %e, "Reminder check failed"),
        }
    }

    /// Trigger entry point for the birthday time.
    pub async fn on_birthday_fire(&self) {
        let today = Local::now().date_naive();
        match self.fire_birthday(today).await {
            Ok(records) => info!(today = %today, deliveries = records.len(), "Birthday check finished"),
            Err(e) => error!(error = %e, "Birthday check failed"),
        }
    }

    /// Send reminders for birthdays falling on the day after `today`.
    pub async fn fire_reminder(&self, today: NaiveDate) -> Result<Vec<DeliveryRecord>, SchedulerError> {
        self.fire(MessageKind::Reminder, today).await
    }

    /// Send greetings for birthdays falling on `today`.
    pub async fn fire_birthday(&self, today: NaiveDate) -> Result<Vec<DeliveryRecord>, SchedulerError> {
        self.fire(MessageKind::Birthday, today).await
    }

    async fn fire(&self, kind: MessageKind, today: NaiveDate) -> Result<Vec<DeliveryRecord>, SchedulerError> {
        let (config, employees, contacts) = {
            let _snapshot = self.inner.snapshot.lock().await;
            let storage = &self.inner.storage;
            (
                storage.get_config().await?,
                storage.list_employees().await?,
                storage.active_contacts().await?,
            )
        };

        let Some(config) = config else {
            debug!(%kind, "No notification settings, skipping");
            return Ok(Vec::new());
        };

        let (offset_days, event_date) = match kind {
            MessageKind::Reminder => (1, today.succ_opt()),
            MessageKind::Birthday => (0, Some(today)),
        };
        let Some(event_date) = event_date else {
            return Ok(Vec::new());
        };

        if !config.weekends_enabled && is_weekend(event_date) {
            info!(%kind, date = %event_date, "Weekend notifications disabled, skipping");
            return Ok(Vec::new());
        }

        if contacts.is_empty() {
            info!(%kind, "No active contacts, nothing to send");
            return Ok(Vec::new());
        }

        let matches = find_matches(&employees, today, offset_days);
        if matches.is_empty() {
            debug!(%kind, date = %event_date, "No birthdays");
            return Ok(Vec::new());
        }

        let template = template_for(&config, kind);
        let retry = config.retry_policy();
        let renderer = TemplateRenderer::new(today.year());

        let mut records = Vec::new();
        for employee in matches {
            info!(%kind, employee = %employee.name, contacts = contacts.len(), "Dispatching notification");
            let sent = self
                .inner
                .dispatcher
                .dispatch(employee, &contacts, template, kind, &retry, &renderer)
                .await;
            records.extend(sent);
        }
        Ok(records)
    }

    /// Cancel both triggers. Firings already running finish on their own.
    pub async fn stop(&self) {
        let stopped = self.inner.triggers.lock().await.clear();
        if stopped > 0 {
            info!(stopped, "Notification triggers stopped");
        }
    }

    /// Number of triggers currently installed (0, 1 or 2).
    pub async fn installed_triggers(&self) -> usize {
        self.inner.triggers.lock().await.count()
    }

    pub async fn next_fire_times(&self) -> NextFireTimes {
        let triggers = self.inner.triggers.lock().await;
        NextFireTimes {
            reminder: triggers.reminder.as_ref().and_then(DailyTrigger::next_fire),
            birthday: triggers.birthday.as_ref().and_then(DailyTrigger::next_fire),
        }
    }
}

fn template_for(config: &NotificationConfig, kind: MessageKind) -> &str {
    match kind {
        MessageKind::Reminder => &config.reminder_template,
        MessageKind::Birthday => &config.birthday_template,
    }
}
