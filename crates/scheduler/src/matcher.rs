//! Birthday matching on month/day, ignoring the birth year.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;

use parabens_core::Employee;

/// Shift `date` by a signed number of days. `None` past the calendar range.
fn shift(date: NaiveDate, offset_days: i64) -> Option<NaiveDate> {
    let days = Days::new(offset_days.unsigned_abs());
    if offset_days >= 0 {
        date.checked_add_days(days)
    } else {
        date.checked_sub_days(days)
    }
}

/// True when `birth` falls on the month/day of `reference + offset_days`.
///
/// A Feb 29 birth date only matches on Feb 29.
pub fn matches_offset(birth: NaiveDate, reference: NaiveDate, offset_days: i64) -> bool {
    shift(reference, offset_days)
        .is_some_and(|target| birth.month() == target.month() && birth.day() == target.day())
}

/// Employees whose birthday is `offset_days` after `reference`, in input order.
pub fn find_matches(employees: &[Employee], reference: NaiveDate, offset_days: i64) -> Vec<&Employee> {
    employees
        .iter()
        .filter(|e| matches_offset(e.birth_date, reference, offset_days))
        .collect()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// A birthday coming up within the look-ahead window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingBirthday {
    pub employee: Employee,
    /// 0 means today.
    pub days_until: u32,
    pub date: NaiveDate,
}

/// Birthdays from `today` through `today + within_days`, soonest first.
pub fn upcoming_birthdays(employees: &[Employee], today: NaiveDate, within_days: u32) -> Vec<UpcomingBirthday> {
    let mut upcoming = Vec::new();
    for days_until in 0..=within_days {
        let Some(date) = shift(today, i64::from(days_until)) else {
            break;
        };
        for employee in find_matches(employees, today, i64::from(days_until)) {
            upcoming.push(UpcomingBirthday {
                employee: employee.clone(),
                days_until,
                date,
            });
        }
    }
    upcoming
}

/// Employees born in `month` (1-12), in input order.
pub fn birthdays_in_month(employees: &[Employee], month: u32) -> Vec<&Employee> {
    employees.iter().filter(|e| e.birth_date.month() == month).collect()
}
