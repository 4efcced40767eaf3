use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Created,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Created and confirmed bookings hold a seat; cancelled ones don't.
    pub fn holds_seat(self) -> bool {
        matches!(self, BookingStatus::Created | BookingStatus::Confirmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    #[serde(rename = "eventid")]
    pub event_id: i64,
    #[serde(rename = "userid")]
    pub user_id: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub confirm_deadline: DateTime<Utc>,
}

impl Booking {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.confirm_deadline < now
    }
}

/// Row to insert for a fresh reservation; status is always `created`.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub event_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub confirm_deadline: DateTime<Utc>,
}
