//! Dashboard summary.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{Datelike, Local};
use serde::Serialize;

use parabens_core::{DeliveryRecord, DeliveryStatus};
use parabens_scheduler::{birthdays_in_month, find_matches, upcoming_birthdays, UpcomingBirthday};

use crate::state::AppState;

use super::{internal_error, ApiResult};

const UPCOMING_WINDOW_DAYS: u32 = 7;
const RECENT_MESSAGES: usize = 10;

#[derive(Serialize)]
pub struct StatsResponse {
    pub total_employees: usize,
    pub this_month_birthdays: usize,
    pub today_birthdays: usize,
    pub messages_sent: usize,
    pub upcoming_birthdays: Vec<UpcomingBirthday>,
    pub recent_messages: Vec<DeliveryRecord>,
}

/// GET /api/stats
pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<StatsResponse>> {
    let employees = state.storage.list_employees().await.map_err(internal_error)?;
    let deliveries = state.storage.list_deliveries().await.map_err(internal_error)?;
    let today = Local::now().date_naive();

    let messages_sent = deliveries
        .iter()
        .filter(|d| d.status == DeliveryStatus::Sent)
        .count();

    let mut recent_messages: Vec<DeliveryRecord> =
        deliveries.into_iter().filter(|d| d.sent_at.is_some()).collect();
    recent_messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
    recent_messages.truncate(RECENT_MESSAGES);

    Ok(Json(StatsResponse {
        total_employees: employees.len(),
        this_month_birthdays: birthdays_in_month(&employees, today.month()).len(),
        today_birthdays: find_matches(&employees, today, 0).len(),
        messages_sent,
        upcoming_birthdays: upcoming_birthdays(&employees, today, UPCOMING_WINDOW_DAYS),
        recent_messages,
    }))
}
