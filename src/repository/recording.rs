//! Store wrapper for tests: forwards to [`MemoryRepository`] and logs every
//! contract call by name, so tests can assert which reads an operation takes.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

use super::memory::{MemoryConn, MemoryTx};
use super::{MemoryRepository, Repository, StoreError};
use crate::models::{Booking, BookingStatus, Event, NewBooking, NewEvent, NewUser, User};

#[derive(Clone, Default)]
pub struct RecordingRepository {
    inner: MemoryRepository,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls made since the last `take_calls`.
    pub fn take_calls(&self) -> Vec<&'static str> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Repository for RecordingRepository {
    type Conn = MemoryConn;
    type Handle = Box<MemoryConn>;
    type Tx = MemoryTx;

    async fn acquire(&self) -> Result<Self::Handle, StoreError> {
        self.record("acquire");
        self.inner.acquire().await
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        self.record("begin");
        self.inner.begin().await
    }

    async fn close(&self) {
        self.inner.close().await
    }

    async fn create_event(
        &self,
        conn: &mut MemoryConn,
        event: &NewEvent,
        created_at: DateTime<Utc>,
    ) -> Result<Event, StoreError> {
        self.record("create_event");
        self.inner.create_event(conn, event, created_at).await
    }

    async fn delete_event(&self, conn: &mut MemoryConn, event_id: i64) -> Result<bool, StoreError> {
        self.record("delete_event");
        self.inner.delete_event(conn, event_id).await
    }

    async fn get_event(&self, conn: &mut MemoryConn, event_id: i64) -> Result<Option<Event>, StoreError> {
        self.record("get_event");
        self.inner.get_event(conn, event_id).await
    }

    async fn get_event_for_update(
        &self,
        conn: &mut MemoryConn,
        event_id: i64,
    ) -> Result<Option<Event>, StoreError> {
        self.record("get_event_for_update");
        self.inner.get_event_for_update(conn, event_id).await
    }

    async fn list_events(&self, conn: &mut MemoryConn) -> Result<Vec<Event>, StoreError> {
        self.record("list_events");
        self.inner.list_events(conn).await
    }

    async fn increment_avail_seats(&self, conn: &mut MemoryConn, event_id: i64) -> Result<(), StoreError> {
        self.record("increment_avail_seats");
        self.inner.increment_avail_seats(conn, event_id).await
    }

    async fn decrement_avail_seats(&self, conn: &mut MemoryConn, event_id: i64) -> Result<(), StoreError> {
        self.record("decrement_avail_seats");
        self.inner.decrement_avail_seats(conn, event_id).await
    }

    async fn create_booking(&self, conn: &mut MemoryConn, booking: &NewBooking) -> Result<Booking, StoreError> {
        self.record("create_booking");
        self.inner.create_booking(conn, booking).await
    }

    async fn delete_booking(&self, conn: &mut MemoryConn, booking_id: i64) -> Result<bool, StoreError> {
        self.record("delete_booking");
        self.inner.delete_booking(conn, booking_id).await
    }

    async fn update_booking_status(
        &self,
        conn: &mut MemoryConn,
        booking_id: i64,
        status: BookingStatus,
    ) -> Result<bool, StoreError> {
        self.record("update_booking_status");
        self.inner.update_booking_status(conn, booking_id, status).await
    }

    async fn get_booking(&self, conn: &mut MemoryConn, booking_id: i64) -> Result<Option<Booking>, StoreError> {
        self.record("get_booking");
        self.inner.get_booking(conn, booking_id).await
    }

    async fn get_booking_for_update(
        &self,
        conn: &mut MemoryConn,
        booking_id: i64,
    ) -> Result<Option<Booking>, StoreError> {
        self.record("get_booking_for_update");
        self.inner.get_booking_for_update(conn, booking_id).await
    }

    async fn list_bookings_by_user(&self, conn: &mut MemoryConn, user_id: i64) -> Result<Vec<Booking>, StoreError> {
        self.record("list_bookings_by_user");
        self.inner.list_bookings_by_user(conn, user_id).await
    }

    async fn list_expired_bookings(
        &self,
        conn: &mut MemoryConn,
        now: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        self.record("list_expired_bookings");
        self.inner.list_expired_bookings(conn, now).await
    }

    async fn create_user(&self, conn: &mut MemoryConn, user: &NewUser) -> Result<User, StoreError> {
        self.record("create_user");
        self.inner.create_user(conn, user).await
    }

    async fn get_user(&self, conn: &mut MemoryConn, user_id: i64) -> Result<Option<User>, StoreError> {
        self.record("get_user");
        self.inner.get_user(conn, user_id).await
    }

    async fn get_user_by_email(&self, conn: &mut MemoryConn, email: &str) -> Result<Option<User>, StoreError> {
        self.record("get_user_by_email");
        self.inner.get_user_by_email(conn, email).await
    }
}
