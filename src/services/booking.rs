//! Booking engine.
//!
//! Each public operation is one unit of work: it opens a transaction, runs its
//! steps through the data access contract, and commits only if every step
//! succeeded. The `*_in` variants run the same steps inside a unit of work the
//! caller already holds and never open or finish a transaction themselves.
//!
//! Seat mutations for one event are serialized by the locking read of the
//! event row (booking) or of the booking row (confirm, cancel, sweep). Where
//! both kinds of row get locked (cancel, sweep, event deletion), booking rows
//! come first.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::error::ServiceError;
use crate::models::{Booking, BookingStatus, Event, EventStatus, NewBooking, NewEvent, Principal};
use crate::repository::{Repository, StoreError, UnitOfWork};
use crate::services::sweeper::ExpiredBooksCleaner;
use crate::services::validation::validate_event;

/// Logs a storage failure in full and hides it behind [`ServiceError::Internal`].
pub(crate) fn internal(op: &'static str) -> impl FnOnce(StoreError) -> ServiceError {
    move |err| {
        error!(op, error = %err, "storage failure");
        ServiceError::Internal
    }
}

/// Commits on success, rolls back on failure. The outcome error always wins
/// over a failed rollback.
pub(crate) async fn finish<U: UnitOfWork, T>(
    tx: U,
    op: &'static str,
    outcome: Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(internal(op))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(op, error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

pub struct BookingService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> Clone for BookingService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<R: Repository> BookingService<R> {
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /* ---------- EVENTS ---------- */

    pub async fn create_event(&self, mut event: NewEvent) -> Result<Event, ServiceError> {
        validate_event(&mut event, self.clock.now())?;

        let mut conn = self.repo.acquire().await.map_err(internal("create_event"))?;
        let created = self
            .repo
            .create_event(&mut *conn, &event, self.clock.now())
            .await
            .map_err(internal("create_event"))?;

        info!(event_id = created.id, total_seats = created.total_seats, "event created");
        Ok(created)
    }

    /// Admins see every event; users see only the ones still open for booking.
    /// Returned events carry the status as of now.
    pub async fn get_events_list(&self, principal: &Principal) -> Result<Vec<Event>, ServiceError> {
        let mut conn = self.repo.acquire().await.map_err(internal("get_events_list"))?;
        let events = self
            .repo
            .list_events(&mut *conn)
            .await
            .map_err(internal("get_events_list"))?;

        let now = self.clock.now();
        Ok(events
            .into_iter()
            .map(|mut event| {
                event.status = event.effective_status(now);
                event
            })
            .filter(|event| principal.is_admin() || event.status == EventStatus::Actual)
            .collect())
    }

    /// Role checks belong to the caller.
    pub async fn delete_event(&self, event_id: i64) -> Result<(), ServiceError> {
        if event_id <= 0 {
            return Err(ServiceError::EventNotFound);
        }

        let mut tx = self.repo.begin().await.map_err(internal("delete_event"))?;
        let outcome = match self.repo.delete_event(&mut *tx, event_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ServiceError::EventNotFound),
            Err(err) => Err(internal("delete_event")(err)),
        };
        finish(tx, "delete_event", outcome).await?;

        info!(event_id, "event deleted");
        Ok(())
    }

    /* ---------- BOOKINGS ---------- */

    pub async fn book_event(&self, principal: &Principal, event_id: i64) -> Result<Booking, ServiceError> {
        check_book_ids(principal, event_id)?;

        let mut tx = self.repo.begin().await.map_err(internal("book_event"))?;
        let outcome = self.book_event_in(&mut *tx, principal, event_id).await;
        finish(tx, "book_event", outcome).await
    }

    pub async fn book_event_in(
        &self,
        conn: &mut R::Conn,
        principal: &Principal,
        event_id: i64,
    ) -> Result<Booking, ServiceError> {
        check_book_ids(principal, event_id)?;

        // Блокирующее чтение: параллельные брони одного события выстраиваются здесь.
        let event = self
            .repo
            .get_event_for_update(conn, event_id)
            .await
            .map_err(internal("book_event"))?
            .ok_or(ServiceError::EventNotFound)?;

        let now = self.clock.now();
        if !event.is_bookable(now) {
            return Err(ServiceError::EventExpired);
        }
        if event.avail_seats <= 0 {
            return Err(ServiceError::NoSeatsAvailable);
        }

        let booking = self
            .repo
            .create_booking(
                conn,
                &NewBooking {
                    event_id: event.id,
                    user_id: principal.user_id,
                    created_at: now,
                    confirm_deadline: now + Duration::seconds(i64::from(event.book_window)),
                },
            )
            .await
            .map_err(internal("book_event"))?;

        self.repo
            .decrement_avail_seats(conn, event.id)
            .await
            .map_err(internal("book_event"))?;

        info!(
            booking_id = booking.id,
            event_id = event.id,
            user_id = principal.user_id,
            confirm_deadline = %booking.confirm_deadline,
            "seat reserved"
        );
        Ok(booking)
    }

    pub async fn confirm_book(&self, principal: &Principal, book_id: i64) -> Result<(), ServiceError> {
        if book_id <= 0 {
            return Err(ServiceError::BookNotFound);
        }

        let mut tx = self.repo.begin().await.map_err(internal("confirm_book"))?;
        let outcome = self.confirm_book_in(&mut *tx, principal, book_id).await;
        finish(tx, "confirm_book", outcome).await
    }

    /// Seat count never changes here: the seat was taken when the booking was made.
    pub async fn confirm_book_in(
        &self,
        conn: &mut R::Conn,
        principal: &Principal,
        book_id: i64,
    ) -> Result<(), ServiceError> {
        let booking = self.owned_booking_for_update(conn, principal, book_id, "confirm_book").await?;

        match booking.status {
            BookingStatus::Cancelled => Err(ServiceError::BookIsCancelled),
            BookingStatus::Confirmed => Err(ServiceError::BookAlreadyConfirmed),
            BookingStatus::Created if booking.is_expired(self.clock.now()) => Err(ServiceError::BookExpired),
            BookingStatus::Created => {
                let updated = self
                    .repo
                    .update_booking_status(conn, book_id, BookingStatus::Confirmed)
                    .await
                    .map_err(internal("confirm_book"))?;
                if !updated {
                    return Err(ServiceError::BookNotFound);
                }
                info!(booking_id = book_id, user_id = principal.user_id, "booking confirmed");
                Ok(())
            }
        }
    }

    /// Idempotent: cancelling a cancelled booking succeeds without touching seats.
    pub async fn cancel_book(&self, principal: &Principal, book_id: i64) -> Result<(), ServiceError> {
        if book_id <= 0 {
            return Err(ServiceError::BookNotFound);
        }

        let mut tx = self.repo.begin().await.map_err(internal("cancel_book"))?;
        let outcome = self.cancel_book_in(&mut *tx, principal, book_id).await;
        finish(tx, "cancel_book", outcome).await
    }

    /// Returns the seat exactly once per booking; the sweeper relies on that
    /// and never returns seats of cancelled bookings.
    pub async fn cancel_book_in(
        &self,
        conn: &mut R::Conn,
        principal: &Principal,
        book_id: i64,
    ) -> Result<(), ServiceError> {
        let booking = self.owned_booking_for_update(conn, principal, book_id, "cancel_book").await?;

        if booking.status == BookingStatus::Cancelled {
            debug!(booking_id = book_id, "booking already cancelled");
            return Ok(());
        }

        self.repo
            .update_booking_status(conn, book_id, BookingStatus::Cancelled)
            .await
            .map_err(internal("cancel_book"))?;
        self.repo
            .increment_avail_seats(conn, booking.event_id)
            .await
            .map_err(internal("cancel_book"))?;

        info!(booking_id = book_id, event_id = booking.event_id, "booking cancelled, seat released");
        Ok(())
    }

    pub async fn get_books_list_by_user_id(&self, principal: &Principal) -> Result<Vec<Booking>, ServiceError> {
        let mut conn = self
            .repo
            .acquire()
            .await
            .map_err(internal("get_books_list_by_user_id"))?;
        self.repo
            .list_bookings_by_user(&mut *conn, principal.user_id)
            .await
            .map_err(internal("get_books_list_by_user_id"))
    }

    /* ---------- EXPIRY ---------- */

    /// One sweep: removes every lapsed unconfirmed booking and returns the
    /// seats still held by them, all in a single transaction.
    pub async fn clean_expired_books(&self) -> Result<usize, ServiceError> {
        let mut tx = self.repo.begin().await.map_err(internal("clean_expired_books"))?;
        let outcome = self.clean_expired_books_in(&mut *tx).await;
        let cleaned = finish(tx, "clean_expired_books", outcome).await?;

        if cleaned > 0 {
            info!(cleaned, "expired bookings cleaned");
        }
        Ok(cleaned)
    }

    pub async fn clean_expired_books_in(&self, conn: &mut R::Conn) -> Result<usize, ServiceError> {
        let expired = self
            .repo
            .list_expired_bookings(conn, self.clock.now())
            .await
            .map_err(internal("clean_expired_books"))?;

        for booking in &expired {
            // У отменённой брони место уже вернула отмена.
            if booking.status != BookingStatus::Cancelled {
                self.repo
                    .increment_avail_seats(conn, booking.event_id)
                    .await
                    .map_err(internal("clean_expired_books"))?;
            }
            self.repo
                .delete_booking(conn, booking.id)
                .await
                .map_err(internal("clean_expired_books"))?;
            debug!(booking_id = booking.id, event_id = booking.event_id, status = ?booking.status, "expired booking removed");
        }

        Ok(expired.len())
    }

    /// Locking read of a booking owned by `principal`. Someone else's booking
    /// reads as missing.
    async fn owned_booking_for_update(
        &self,
        conn: &mut R::Conn,
        principal: &Principal,
        book_id: i64,
        op: &'static str,
    ) -> Result<Booking, ServiceError> {
        self.repo
            .get_booking_for_update(conn, book_id)
            .await
            .map_err(internal(op))?
            .filter(|booking| booking.user_id == principal.user_id)
            .ok_or(ServiceError::BookNotFound)
    }
}

impl<R: Repository> ExpiredBooksCleaner for BookingService<R> {
    async fn clean_expired_books(&self) -> Result<usize, ServiceError> {
        BookingService::clean_expired_books(self).await
    }
}

fn check_book_ids(principal: &Principal, event_id: i64) -> Result<(), ServiceError> {
    if event_id <= 0 || principal.user_id <= 0 {
        return Err(ServiceError::EmptyBookInfo);
    }
    Ok(())
}
