//! A daily wall-clock trigger running on its own tokio task.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local};
use cron::Schedule;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cron::next_fire_after;

/// Fires `on_fire` on each tick of a cron schedule, normally once a day.
///
/// Each firing is spawned as its own task, so cancelling the trigger (or
/// dropping it) stops future firings without interrupting one in progress.
pub struct DailyTrigger {
    name: &'static str,
    schedule: Schedule,
    handle: JoinHandle<()>,
}

impl DailyTrigger {
    /// Fire on every tick of `schedule`, evaluated in local time. Daily
    /// schedules come from [`daily_schedule`](crate::cron::daily_schedule).
    pub fn spawn<F, Fut>(name: &'static str, schedule: Schedule, on_fire: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task_schedule = schedule.clone();

        let handle = tokio::spawn(async move {
            let mut last_target: Option<DateTime<Local>> = None;
            loop {
                let now = Local::now();
                let from = match last_target {
                    Some(last) if last > now => last,
                    _ => now,
                };
                let Some(next) = next_fire_after(&task_schedule, &from) else {
                    warn!(trigger = name, "No upcoming fire time, trigger stopped");
                    break;
                };

                let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
                debug!(trigger = name, next = %next, wait_secs = wait.as_secs(), "Trigger armed");
                tokio::time::sleep(wait).await;

                last_target = Some(next);
                debug!(trigger = name, "Trigger fired");
                tokio::spawn(on_fire());
            }
        });

        Self {
            name,
            schedule,
            handle,
        }
    }

    /// Next local instant this trigger will fire.
    pub fn next_fire(&self) -> Option<DateTime<Local>> {
        next_fire_after(&self.schedule, &Local::now())
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop future firings.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for DailyTrigger {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl std::fmt::Debug for DailyTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyTrigger")
            .field("name", &self.name)
            .field("next_fire", &self.next_fire())
            .finish()
    }
}
