use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Статус события. `Expired` в базе не хранится: он вычисляется по дате при чтении.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Actual,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    #[serde(rename = "descr", default)]
    pub description: String,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
    pub status: EventStatus,
    #[serde(rename = "eventdate")]
    pub event_date: NaiveDate,
    #[serde(rename = "total")]
    pub total_seats: i32,
    #[serde(rename = "avail")]
    pub avail_seats: i32,
    /// Seconds a tentative booking stays valid.
    #[serde(rename = "period")]
    pub book_window: i32,
}

/// An event starts at 00:00 UTC of its date.
pub fn starts_at(event_date: NaiveDate) -> DateTime<Utc> {
    event_date.and_time(NaiveTime::MIN).and_utc()
}

impl Event {
    /// Status as seen at `now`: a stored `actual` event that has already started reads as expired.
    pub fn effective_status(&self, now: DateTime<Utc>) -> EventStatus {
        match self.status {
            EventStatus::Actual if starts_at(self.event_date) < now => EventStatus::Expired,
            status => status,
        }
    }

    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == EventStatus::Actual
    }
}

// Payload администратора для создания события
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewEvent {
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(rename = "descr", default)]
    pub description: String,
    #[serde(rename = "eventdate")]
    pub event_date: NaiveDate,
    #[serde(rename = "total")]
    #[validate(range(min = 1))]
    pub total_seats: i32,
    #[serde(rename = "period")]
    #[validate(range(min = 1))]
    pub book_window: i32,
}
