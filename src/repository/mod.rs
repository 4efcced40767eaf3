//! Data access contract.
//!
//! Every operation takes the execution handle explicitly as `&mut Self::Conn`.
//! A standalone handle (`acquire`) and an open transaction (`begin`) both deref
//! to that type, so multi-step work is made atomic by threading the same
//! transaction through each call, and single-step work simply passes a bare
//! connection.

pub mod memory;
pub mod postgres;
#[cfg(test)]
pub(crate) mod recording;

use chrono::{DateTime, Utc};
use std::future::Future;
use std::ops::DerefMut;

use crate::models::{Booking, BookingStatus, Event, NewBooking, NewEvent, NewUser, User};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("unique constraint violated: {0}")]
    Duplicate(String),
    #[error("available seats of event {event_id} cannot be {direction}")]
    SeatCounter {
        event_id: i64,
        direction: &'static str,
    },
    #[error("store is closed")]
    Closed,
}

/// One atomic unit of work. Dropping it without `commit` rolls it back, and
/// `commit` consumes the handle, so a rollback can never follow a commit.
pub trait UnitOfWork: Send {
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;
    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

pub trait Repository: Send + Sync + 'static {
    /// Shared execution surface of connections and transactions.
    type Conn: Send + ?Sized;
    type Handle: DerefMut<Target = Self::Conn> + Send;
    type Tx: DerefMut<Target = Self::Conn> + UnitOfWork;

    fn acquire(&self) -> impl Future<Output = Result<Self::Handle, StoreError>> + Send;
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send;
    fn close(&self) -> impl Future<Output = ()> + Send;

    // events
    fn create_event(
        &self,
        conn: &mut Self::Conn,
        event: &NewEvent,
        created_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Event, StoreError>> + Send;

    /// Returns `false` when no such event existed. Bookings go with it.
    /// The event's bookings are locked before the event row, the same order
    /// cancel and sweep take them in, so run it inside a `Tx`.
    fn delete_event(
        &self,
        conn: &mut Self::Conn,
        event_id: i64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn get_event(
        &self,
        conn: &mut Self::Conn,
        event_id: i64,
    ) -> impl Future<Output = Result<Option<Event>, StoreError>> + Send;

    /// Locking read: holds the event row until the surrounding transaction ends.
    fn get_event_for_update(
        &self,
        conn: &mut Self::Conn,
        event_id: i64,
    ) -> impl Future<Output = Result<Option<Event>, StoreError>> + Send;

    fn list_events(
        &self,
        conn: &mut Self::Conn,
    ) -> impl Future<Output = Result<Vec<Event>, StoreError>> + Send;

    /// Fails with [`StoreError::SeatCounter`] if seats would exceed the total.
    fn increment_avail_seats(
        &self,
        conn: &mut Self::Conn,
        event_id: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fails with [`StoreError::SeatCounter`] if seats would drop below zero.
    fn decrement_avail_seats(
        &self,
        conn: &mut Self::Conn,
        event_id: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    // bookings
    fn create_booking(
        &self,
        conn: &mut Self::Conn,
        booking: &NewBooking,
    ) -> impl Future<Output = Result<Booking, StoreError>> + Send;

    fn delete_booking(
        &self,
        conn: &mut Self::Conn,
        booking_id: i64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn update_booking_status(
        &self,
        conn: &mut Self::Conn,
        booking_id: i64,
        status: BookingStatus,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn get_booking(
        &self,
        conn: &mut Self::Conn,
        booking_id: i64,
    ) -> impl Future<Output = Result<Option<Booking>, StoreError>> + Send;

    fn get_booking_for_update(
        &self,
        conn: &mut Self::Conn,
        booking_id: i64,
    ) -> impl Future<Output = Result<Option<Booking>, StoreError>> + Send;

    /// Newest first.
    fn list_bookings_by_user(
        &self,
        conn: &mut Self::Conn,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<Booking>, StoreError>> + Send;

    /// Locked rows whose deadline is before `now` and which were never confirmed.
    fn list_expired_bookings(
        &self,
        conn: &mut Self::Conn,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Booking>, StoreError>> + Send;

    // users
    fn create_user(
        &self,
        conn: &mut Self::Conn,
        user: &NewUser,
    ) -> impl Future<Output = Result<User, StoreError>> + Send;

    fn get_user(
        &self,
        conn: &mut Self::Conn,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    fn get_user_by_email(
        &self,
        conn: &mut Self::Conn,
        email: &str,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;
}
