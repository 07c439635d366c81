//! Daily cron expressions for wall-clock trigger times.

use std::str::FromStr;

use chrono::{DateTime, TimeZone};
use cron::Schedule;

use parabens_core::TimeOfDay;

use crate::error::SchedulerError;

/// 6-field expression (`sec min hour dom month dow`) firing once a day at `time`.
pub fn time_to_cron(time: TimeOfDay) -> String {
    format!("0 {} {} * * *", time.minute(), time.hour())
}

/// Parse a daily schedule for `time`.
pub fn daily_schedule(time: TimeOfDay) -> Result<Schedule, SchedulerError> {
    let expr = time_to_cron(time);
    Schedule::from_str(&expr).map_err(|e| SchedulerError::InvalidCron(format!("{expr}: {e}")))
}

/// First tick strictly after `after`.
pub fn next_fire_after<Z: TimeZone>(schedule: &Schedule, after: &DateTime<Z>) -> Option<DateTime<Z>> {
    schedule.after(after).next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn expression_has_seconds_field() {
        let t = TimeOfDay::new(8, 5).unwrap();
        assert_eq!(time_to_cron(t), "0 5 8 * * *");
    }

    #[test]
    fn next_fire_is_same_day_or_next() {
        let schedule = daily_schedule(TimeOfDay::new(9, 0).unwrap()).unwrap();

        let before = Utc.with_ymd_and_hms(2024, 3, 14, 7, 0, 0).unwrap();
        assert_eq!(
            next_fire_after(&schedule, &before),
            Some(Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap())
        );

        // Exactly on the tick rolls over to tomorrow.
        let on_tick = Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap();
        assert_eq!(
            next_fire_after(&schedule, &on_tick),
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn every_valid_time_parses() {
        for (h, m) in [(0, 0), (23, 59), (12, 30)] {
            assert!(daily_schedule(TimeOfDay::new(h, m).unwrap()).is_ok());
        }
    }
}
