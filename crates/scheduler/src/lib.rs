//! Daily birthday scheduling.
//!
//! Two cron-driven daily triggers (reminder and birthday) wake the
//! [`ScheduleCoordinator`], which snapshots settings, roster and contacts,
//! picks the employees whose birthday falls on the target date and hands
//! them to the notification dispatcher.

pub mod coordinator;
pub mod cron;
pub mod error;
pub mod matcher;
pub mod trigger;

#[cfg(test)]
mod tests;

pub use coordinator::{NextFireTimes, ScheduleCoordinator};
pub use error::SchedulerError;
pub use matcher::{
    birthdays_in_month, find_matches, is_weekend, matches_offset, upcoming_birthdays,
    UpcomingBirthday,
};
pub use trigger::DailyTrigger;
