//! Tests for the schedule coordinator.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::NaiveDate;

    use parabens_core::{
        DeliveryStatus, MessageKind, NewContact, NewEmployee, NotificationConfig, TimeOfDay,
    };
    use parabens_notify::{ChannelError, ChannelStatus, MessageChannel, NotificationDispatcher};
    use parabens_storage::{MemStorage, Storage};

    use crate::ScheduleCoordinator;

    struct CountingChannel {
        sends: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MessageChannel for CountingChannel {
        async fn connect(&self) -> ChannelStatus {
            ChannelStatus::simulated()
        }
        async fn send_message(&self, _address: &str, _text: &str) -> Result<(), ChannelError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn status(&self) -> ChannelStatus {
            ChannelStatus::simulated()
        }
        async fn test_connection(&self) -> bool {
            true
        }
        async fn refresh_pairing_artifact(&self) -> Option<String> {
            None
        }
        async fn enable_simulation(&self) {}
        async fn enable_real(&self) {}
        fn channel_name(&self) -> &str {
            "counting"
        }
    }

    struct Fixture {
        coordinator: ScheduleCoordinator,
        storage: Arc<MemStorage>,
        channel: Arc<CountingChannel>,
    }

    fn fixture_with(storage: MemStorage) -> Fixture {
        let storage = Arc::new(storage);
        let channel = Arc::new(CountingChannel {
            sends: AtomicUsize::new(0),
        });
        let dispatcher = NotificationDispatcher::new(channel.clone(), storage.clone());
        Fixture {
            coordinator: ScheduleCoordinator::new(storage.clone(), dispatcher),
            storage,
            channel,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MemStorage::new())
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn add_employee(storage: &MemStorage, name: &str, birth: NaiveDate) {
        storage
            .create_employee(NewEmployee {
                name: name.to_string(),
                birth_date: birth,
                position: "Engenheira".to_string(),
                email: None,
            })
            .await
            .unwrap();
    }

    async fn add_contact(storage: &MemStorage, phone: &str, active: bool) {
        storage
            .create_contact(NewContact {
                name: format!("contact {phone}"),
                phone: phone.to_string(),
                role: "Gestor".to_string(),
                is_active: Some(active),
            })
            .await
            .unwrap();
    }

    async fn set_config(storage: &MemStorage, f: impl FnOnce(&mut NotificationConfig)) {
        let mut config = NotificationConfig::default();
        f(&mut config);
        storage.save_config(config).await.unwrap();
    }

    #[tokio::test]
    async fn reminder_targets_tomorrow() {
        let fx = fixture();
        add_employee(&fx.storage, "Ana", d(1990, 3, 15)).await;
        add_employee(&fx.storage, "Bruno", d(1985, 3, 14)).await;
        add_contact(&fx.storage, "11911111111", true).await;
        add_contact(&fx.storage, "11922222222", true).await;
        set_config(&fx.storage, |c| c.reminder_template = "Amanhã: [NOME] ([IDADE])".to_string()).await;

        // 2024-03-14 is a Thursday.
        let records = fx.coordinator.fire_reminder(d(2024, 3, 14)).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.kind == MessageKind::Reminder));
        assert!(records.iter().all(|r| r.status == DeliveryStatus::Sent));
        assert!(records.iter().all(|r| r.content == "Amanhã: Ana (34)"));
        assert_eq!(fx.channel.sends.load(Ordering::SeqCst), 2);
        assert_eq!(fx.storage.list_deliveries().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn birthday_targets_today() {
        let fx = fixture();
        add_employee(&fx.storage, "Ana", d(1990, 3, 15)).await;
        add_employee(&fx.storage, "Bruno", d(1985, 3, 14)).await;
        add_contact(&fx.storage, "11911111111", true).await;

        let records = fx.coordinator.fire_birthday(d(2024, 3, 14)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, MessageKind::Birthday);
        assert!(records[0].content.contains("Bruno"));
    }

    #[tokio::test]
    async fn weekend_reminder_suppressed_when_disabled() {
        let fx = fixture();
        // 2024-03-16 is a Saturday.
        add_employee(&fx.storage, "Ana", d(1990, 3, 16)).await;
        add_contact(&fx.storage, "11911111111", true).await;
        set_config(&fx.storage, |c| c.weekends_enabled = false).await;

        let records = fx.coordinator.fire_reminder(d(2024, 3, 15)).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(fx.channel.sends.load(Ordering::SeqCst), 0);

        let records = fx.coordinator.fire_birthday(d(2024, 3, 16)).await.unwrap();
        assert!(records.is_empty());
        assert!(fx.storage.list_deliveries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn weekend_allowed_when_enabled() {
        let fx = fixture();
        add_employee(&fx.storage, "Ana", d(1990, 3, 16)).await;
        add_contact(&fx.storage, "11911111111", true).await;

        let records = fx.coordinator.fire_reminder(d(2024, 3, 15)).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn inactive_contacts_are_skipped() {
        let fx = fixture();
        add_employee(&fx.storage, "Ana", d(1990, 3, 15)).await;
        add_contact(&fx.storage, "11911111111", false).await;

        let records = fx.coordinator.fire_birthday(d(2024, 3, 15)).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(fx.channel.sends.load(Ordering::SeqCst), 0);

        add_contact(&fx.storage, "11922222222", true).await;
        let records = fx.coordinator.fire_birthday(d(2024, 3, 15)).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn absent_config_is_a_no_op() {
        let fx = fixture_with(MemStorage::without_config());
        add_employee(&fx.storage, "Ana", d(1990, 3, 15)).await;
        add_contact(&fx.storage, "11911111111", true).await;

        fx.coordinator.initialize().await.unwrap();
        assert_eq!(fx.coordinator.installed_triggers().await, 0);
        assert!(fx.coordinator.fire_birthday(d(2024, 3, 15)).await.unwrap().is_empty());
        assert_eq!(fx.channel.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rescheduling_is_idempotent() {
        let fx = fixture();
        fx.coordinator.initialize().await.unwrap();
        assert_eq!(fx.coordinator.installed_triggers().await, 2);

        set_config(&fx.storage, |c| {
            c.reminder_time = TimeOfDay::new(7, 30).unwrap();
            c.birthday_time = TimeOfDay::new(10, 15).unwrap();
        })
        .await;
        fx.coordinator.update_schedules().await.unwrap();
        fx.coordinator.update_schedules().await.unwrap();
        assert_eq!(fx.coordinator.installed_triggers().await, 2);

        let next = fx.coordinator.next_fire_times().await;
        let reminder = next.reminder.unwrap();
        let birthday = next.birthday.unwrap();
        assert_eq!(reminder.format("%H:%M").to_string(), "07:30");
        assert_eq!(birthday.format("%H:%M").to_string(), "10:15");
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let fx = fixture();
        fx.coordinator.initialize().await.unwrap();
        fx.coordinator.stop().await;
        assert_eq!(fx.coordinator.installed_triggers().await, 0);
        fx.coordinator.stop().await;
        assert_eq!(fx.coordinator.installed_triggers().await, 0);
        assert_eq!(fx.coordinator.next_fire_times().await, Default::default());
    }

    #[tokio::test]
    async fn every_match_notifies_every_contact() {
        let fx = fixture();
        add_employee(&fx.storage, "Ana", d(1990, 7, 1)).await;
        add_employee(&fx.storage, "Caio", d(2001, 7, 1)).await;
        for phone in ["1", "2", "3"] {
            add_contact(&fx.storage, phone, true).await;
        }

        let records = fx.coordinator.fire_birthday(d(2024, 7, 1)).await.unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(fx.channel.sends.load(Ordering::SeqCst), 6);
    }

    /// Schedule with a single tick `secs` seconds from now.
    fn one_shot_in(secs: i64) -> cron::Schedule {
        let at = chrono::Local::now() + chrono::Duration::seconds(secs);
        let expr = at.format("%-S %-M %-H %-d %-m * %Y").to_string();
        expr.parse().unwrap()
    }

    #[tokio::test]
    async fn reinstalled_triggers_fire_exactly_once() {
        let fx = fixture();
        let today = chrono::Local::now().date_naive();
        add_employee(&fx.storage, "Ana", today).await;
        add_contact(&fx.storage, "11911111111", true).await;

        let reminder = one_shot_in(2);
        let birthday = one_shot_in(2);
        fx.coordinator.install(reminder.clone(), birthday.clone()).await;
        fx.coordinator.install(reminder, birthday).await;
        assert_eq!(fx.coordinator.installed_triggers().await, 2);

        tokio::time::sleep(std::time::Duration::from_millis(4000)).await;

        // Only the birthday pass matches; the reminder looks at tomorrow.
        assert_eq!(fx.channel.sends.load(Ordering::SeqCst), 1);
        let deliveries = fx.storage.list_deliveries().await.unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].kind, MessageKind::Birthday);
        fx.coordinator.stop().await;
    }
}
