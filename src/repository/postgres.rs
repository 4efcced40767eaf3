use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::{Repository, StoreError, UnitOfWork};
use crate::models::{Booking, BookingStatus, Event, NewBooking, NewEvent, NewUser, User};

/// PostgreSQL implementation of the data access contract.
///
/// Row locks (`FOR UPDATE`) only last as long as the surrounding transaction,
/// so the locking reads are meaningful only when called with a `Tx`.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// unique_violation -> Duplicate, остальное как есть
fn map_unique(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(db.message().to_owned())
        }
        other => StoreError::Database(other),
    }
}

impl UnitOfWork for Transaction<'static, Postgres> {
    async fn commit(self) -> Result<(), StoreError> {
        Transaction::commit(self).await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Transaction::rollback(self).await?;
        Ok(())
    }
}

impl Repository for PgRepository {
    type Conn = PgConnection;
    type Handle = PoolConnection<Postgres>;
    type Tx = Transaction<'static, Postgres>;

    async fn acquire(&self) -> Result<Self::Handle, StoreError> {
        Ok(self.pool.acquire().await?)
    }

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(self.pool.begin().await?)
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    async fn create_event(
        &self,
        conn: &mut PgConnection,
        event: &NewEvent,
        created_at: DateTime<Utc>,
    ) -> Result<Event, StoreError> {
        let created = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events
                (title, description, created_at, status, event_date, total_seats, avail_seats, book_window)
            VALUES ($1, $2, $3, 'actual', $4, $5, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(created_at)
        .bind(event.event_date)
        .bind(event.total_seats)
        .bind(event.book_window)
        .fetch_one(&mut *conn)
        .await?;

        Ok(created)
    }

    async fn delete_event(&self, conn: &mut PgConnection, event_id: i64) -> Result<bool, StoreError> {
        // Сначала брони, потом событие: тот же порядок блокировок, что у отмены и уборщика.
        sqlx::query("SELECT id FROM bookings WHERE event_id = $1 ORDER BY id FOR UPDATE")
            .bind(event_id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_event(
        &self,
        conn: &mut PgConnection,
        event_id: i64,
    ) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(event)
    }

    async fn get_event_for_update(
        &self,
        conn: &mut PgConnection,
        event_id: i64,
    ) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(event)
    }

    async fn list_events(&self, conn: &mut PgConnection) -> Result<Vec<Event>, StoreError> {
        let events = sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY event_date, id")
            .fetch_all(&mut *conn)
            .await?;

        Ok(events)
    }

    async fn increment_avail_seats(
        &self,
        conn: &mut PgConnection,
        event_id: i64,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE events SET avail_seats = avail_seats + 1
             WHERE id = $1 AND avail_seats < total_seats",
        )
        .bind(event_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::SeatCounter {
                event_id,
                direction: "incremented",
            });
        }
        Ok(())
    }

    async fn decrement_avail_seats(
        &self,
        conn: &mut PgConnection,
        event_id: i64,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE events SET avail_seats = avail_seats - 1
             WHERE id = $1 AND avail_seats > 0",
        )
        .bind(event_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::SeatCounter {
                event_id,
                direction: "decremented",
            });
        }
        Ok(())
    }

    async fn create_booking(
        &self,
        conn: &mut PgConnection,
        booking: &NewBooking,
    ) -> Result<Booking, StoreError> {
        let created = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (event_id, user_id, status, created_at, confirm_deadline)
            VALUES ($1, $2, 'created', $3, $4)
            RETURNING *
            "#,
        )
        .bind(booking.event_id)
        .bind(booking.user_id)
        .bind(booking.created_at)
        .bind(booking.confirm_deadline)
        .fetch_one(&mut *conn)
        .await?;

        Ok(created)
    }

    async fn delete_booking(&self, conn: &mut PgConnection, booking_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_booking_status(
        &self,
        conn: &mut PgConnection,
        booking_id: i64,
        status: BookingStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE bookings SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(booking_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_booking(
        &self,
        conn: &mut PgConnection,
        booking_id: i64,
    ) -> Result<Option<Booking>, StoreError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(booking)
    }

    async fn get_booking_for_update(
        &self,
        conn: &mut PgConnection,
        booking_id: i64,
    ) -> Result<Option<Booking>, StoreError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(booking_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(booking)
    }

    async fn list_bookings_by_user(
        &self,
        conn: &mut PgConnection,
        user_id: i64,
    ) -> Result<Vec<Booking>, StoreError> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(bookings)
    }

    async fn list_expired_bookings(
        &self,
        conn: &mut PgConnection,
        now: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        // Под READ COMMITTED строка, изменённая параллельной отменой, перечитывается
        // после снятия блокировки, поэтому статус ниже всегда актуальный.
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE confirm_deadline < $1
              AND status <> 'confirmed'
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(now)
        .fetch_all(&mut *conn)
        .await?;

        Ok(bookings)
    }

    async fn create_user(&self, conn: &mut PgConnection, user: &NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (role, created_at, name, surname, tel, email, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user.role)
        .bind(user.created_at)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&user.tel)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_unique)
    }

    async fn get_user(&self, conn: &mut PgConnection, user_id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(user)
    }

    async fn get_user_by_email(
        &self,
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(user)
    }
}
