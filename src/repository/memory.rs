//! In-memory implementation of the data access contract.
//!
//! Every handle holds the single store-wide lock for as long as it lives, so
//! transactions are fully serialized. That is stricter than the per-row locks
//! of the Postgres store, but gives the same guarantees the engine relies on:
//! a locking read can't observe a stale seat count, and a dropped transaction
//! leaves no trace. Foreign keys to users are not enforced.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Repository, StoreError, UnitOfWork};
use crate::models::{Booking, BookingStatus, Event, EventStatus, NewBooking, NewEvent, NewUser, User};

#[derive(Debug, Clone, Default)]
struct Tables {
    events: BTreeMap<i64, Event>,
    bookings: BTreeMap<i64, Booking>,
    users: BTreeMap<i64, User>,
    last_event_id: i64,
    last_booking_id: i64,
    last_user_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<Mutex<Tables>>,
    closed: Arc<AtomicBool>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock(&self) -> Result<MemoryConn, StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(MemoryConn {
            tables: self.tables.clone().lock_owned().await,
        })
    }
}

/// Exclusive access to the tables; the execution surface of this store.
pub struct MemoryConn {
    tables: OwnedMutexGuard<Tables>,
}

pub struct MemoryTx {
    conn: MemoryConn,
    // Состояние до начала транзакции; возвращается при drop без commit.
    snapshot: Option<Tables>,
}

impl Deref for MemoryTx {
    type Target = MemoryConn;

    fn deref(&self) -> &MemoryConn {
        &self.conn
    }
}

impl DerefMut for MemoryTx {
    fn deref_mut(&mut self) -> &mut MemoryConn {
        &mut self.conn
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.conn.tables = snapshot;
        }
    }
}

impl UnitOfWork for MemoryTx {
    async fn commit(mut self) -> Result<(), StoreError> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        drop(self);
        Ok(())
    }
}

impl Repository for MemoryRepository {
    type Conn = MemoryConn;
    type Handle = Box<MemoryConn>;
    type Tx = MemoryTx;

    async fn acquire(&self) -> Result<Self::Handle, StoreError> {
        Ok(Box::new(self.lock().await?))
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let conn = self.lock().await?;
        let snapshot = Some(conn.tables.clone());
        Ok(MemoryTx { conn, snapshot })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    async fn create_event(
        &self,
        conn: &mut MemoryConn,
        event: &NewEvent,
        created_at: DateTime<Utc>,
    ) -> Result<Event, StoreError> {
        let tables = &mut *conn.tables;
        tables.last_event_id += 1;
        let created = Event {
            id: tables.last_event_id,
            title: event.title.clone(),
            description: event.description.clone(),
            created_at,
            status: EventStatus::Actual,
            event_date: event.event_date,
            total_seats: event.total_seats,
            avail_seats: event.total_seats,
            book_window: event.book_window,
        };
        tables.events.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_event(&self, conn: &mut MemoryConn, event_id: i64) -> Result<bool, StoreError> {
        let tables = &mut *conn.tables;
        if tables.events.remove(&event_id).is_none() {
            return Ok(false);
        }
        tables.bookings.retain(|_, booking| booking.event_id != event_id);
        Ok(true)
    }

    async fn get_event(&self, conn: &mut MemoryConn, event_id: i64) -> Result<Option<Event>, StoreError> {
        Ok(conn.tables.events.get(&event_id).cloned())
    }

    async fn get_event_for_update(
        &self,
        conn: &mut MemoryConn,
        event_id: i64,
    ) -> Result<Option<Event>, StoreError> {
        Ok(conn.tables.events.get(&event_id).cloned())
    }

    async fn list_events(&self, conn: &mut MemoryConn) -> Result<Vec<Event>, StoreError> {
        let mut events: Vec<Event> = conn.tables.events.values().cloned().collect();
        events.sort_by_key(|event| (event.event_date, event.id));
        Ok(events)
    }

    async fn increment_avail_seats(&self, conn: &mut MemoryConn, event_id: i64) -> Result<(), StoreError> {
        match conn.tables.events.get_mut(&event_id) {
            Some(event) if event.avail_seats < event.total_seats => {
                event.avail_seats += 1;
                Ok(())
            }
            _ => Err(StoreError::SeatCounter {
                event_id,
                direction: "incremented",
            }),
        }
    }

    async fn decrement_avail_seats(&self, conn: &mut MemoryConn, event_id: i64) -> Result<(), StoreError> {
        match conn.tables.events.get_mut(&event_id) {
            Some(event) if event.avail_seats > 0 => {
                event.avail_seats -= 1;
                Ok(())
            }
            _ => Err(StoreError::SeatCounter {
                event_id,
                direction: "decremented",
            }),
        }
    }

    async fn create_booking(&self, conn: &mut MemoryConn, booking: &NewBooking) -> Result<Booking, StoreError> {
        let tables = &mut *conn.tables;
        if !tables.events.contains_key(&booking.event_id) {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }
        tables.last_booking_id += 1;
        let created = Booking {
            id: tables.last_booking_id,
            event_id: booking.event_id,
            user_id: booking.user_id,
            status: BookingStatus::Created,
            created_at: booking.created_at,
            confirm_deadline: booking.confirm_deadline,
        };
        tables.bookings.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_booking(&self, conn: &mut MemoryConn, booking_id: i64) -> Result<bool, StoreError> {
        Ok(conn.tables.bookings.remove(&booking_id).is_some())
    }

    async fn update_booking_status(
        &self,
        conn: &mut MemoryConn,
        booking_id: i64,
        status: BookingStatus,
    ) -> Result<bool, StoreError> {
        match conn.tables.bookings.get_mut(&booking_id) {
            Some(booking) => {
                booking.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_booking(&self, conn: &mut MemoryConn, booking_id: i64) -> Result<Option<Booking>, StoreError> {
        Ok(conn.tables.bookings.get(&booking_id).cloned())
    }

    async fn get_booking_for_update(
        &self,
        conn: &mut MemoryConn,
        booking_id: i64,
    ) -> Result<Option<Booking>, StoreError> {
        Ok(conn.tables.bookings.get(&booking_id).cloned())
    }

    async fn list_bookings_by_user(&self, conn: &mut MemoryConn, user_id: i64) -> Result<Vec<Booking>, StoreError> {
        let mut bookings: Vec<Booking> = conn
            .tables
            .bookings
            .values()
            .filter(|booking| booking.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(bookings)
    }

    async fn list_expired_bookings(
        &self,
        conn: &mut MemoryConn,
        now: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        Ok(conn
            .tables
            .bookings
            .values()
            .filter(|booking| booking.is_expired(now) && booking.status != BookingStatus::Confirmed)
            .cloned()
            .collect())
    }

    async fn create_user(&self, conn: &mut MemoryConn, user: &NewUser) -> Result<User, StoreError> {
        let tables = &mut *conn.tables;
        if tables.users.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::Duplicate(format!(
                "duplicate key value violates unique constraint \"users_email_key\": {}",
                user.email
            )));
        }
        tables.last_user_id += 1;
        let created = User {
            id: tables.last_user_id,
            role: user.role,
            created_at: user.created_at,
            name: user.name.clone(),
            surname: user.surname.clone(),
            tel: user.tel.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, conn: &mut MemoryConn, user_id: i64) -> Result<Option<User>, StoreError> {
        Ok(conn.tables.users.get(&user_id).cloned())
    }

    async fn get_user_by_email(&self, conn: &mut MemoryConn, email: &str) -> Result<Option<User>, StoreError> {
        Ok(conn.tables.users.values().find(|user| user.email == email).cloned())
    }
}
