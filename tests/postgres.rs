//! Runs against a real database. Needs `DATABASE_URL`:
//! `DATABASE_URL=postgres://... cargo test --test postgres -- --ignored`

use chrono::{Duration, Utc};
use futures::future::join_all;
use std::sync::Arc;

use event_booker::clock::ManualClock;
use event_booker::database::Database;
use event_booker::error::ServiceError;
use event_booker::models::{NewEvent, Principal, SignUp};
use event_booker::repository::{PgRepository, Repository};
use event_booker::services::{BookingService, JwtKeys, UserService};

async fn setup() -> (Arc<PgRepository>, Arc<ManualClock>) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::connect(&url, 10).await.unwrap();
    db.run_migrations().await.unwrap();
    (Arc::new(db.repository()), Arc::new(ManualClock::new(Utc::now())))
}

async fn new_user(users: &UserService<PgRepository>, tag: &str) -> Principal {
    let email = format!("{tag}-{}@example.com", Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let user = users
        .create_user(SignUp {
            role: "user".into(),
            name: "Pg".into(),
            surname: "Test".into(),
            tel: String::new(),
            email,
            password: "pw".into(),
        })
        .await
        .unwrap();
    Principal { user_id: user.id, role: user.role }
}

fn new_event(seats: i32) -> NewEvent {
    NewEvent {
        title: "Pg event".into(),
        description: String::new(),
        event_date: (Utc::now() + Duration::days(30)).date_naive(),
        total_seats: seats,
        book_window: 60,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs a running Postgres"]
async fn row_locks_prevent_overselling() {
    let (repo, clock) = setup().await;
    let users = UserService::new(repo.clone(), clock.clone(), JwtKeys::new("pg", 1)).with_hash_cost(4);
    let bookings = BookingService::new(repo.clone(), clock.clone());

    let event = bookings.create_event(new_event(3)).await.unwrap();
    let mut principals = Vec::new();
    for i in 0..12 {
        principals.push(new_user(&users, &format!("racer{i}")).await);
    }

    let tasks = principals.into_iter().map(|principal| {
        let bookings = bookings.clone();
        tokio::spawn(async move { bookings.book_event(&principal, event.id).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    let mut conn = repo.acquire().await.unwrap();
    let stored = repo.get_event(&mut conn, event.id).await.unwrap().unwrap();
    assert_eq!(stored.avail_seats, 0);
    drop(conn);

    bookings.delete_event(event.id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a running Postgres"]
async fn sweep_commits_seat_returns() {
    let (repo, clock) = setup().await;
    let users = UserService::new(repo.clone(), clock.clone(), JwtKeys::new("pg", 1)).with_hash_cost(4);
    let bookings = BookingService::new(repo.clone(), clock.clone());

    let event = bookings.create_event(new_event(1)).await.unwrap();
    let late = new_user(&users, "late").await;
    let book = bookings.book_event(&late, event.id).await.unwrap();

    clock.advance(Duration::seconds(61));
    assert_eq!(bookings.confirm_book(&late, book.id).await, Err(ServiceError::BookExpired));
    assert!(bookings.clean_expired_books().await.unwrap() >= 1);

    let mut conn = repo.acquire().await.unwrap();
    assert_eq!(repo.get_event(&mut conn, event.id).await.unwrap().unwrap().avail_seats, 1);
    assert!(repo.get_booking(&mut conn, book.id).await.unwrap().is_none());
    drop(conn);

    bookings.delete_event(event.id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs a running Postgres"]
async fn event_deletion_races_cancels_without_deadlock() {
    let (repo, clock) = setup().await;
    let users = UserService::new(repo.clone(), clock.clone(), JwtKeys::new("pg", 1)).with_hash_cost(4);
    let bookings = BookingService::new(repo.clone(), clock.clone());

    let event = bookings.create_event(new_event(6)).await.unwrap();
    let mut booked = Vec::new();
    for i in 0..6 {
        let principal = new_user(&users, &format!("leaver{i}")).await;
        let book = bookings.book_event(&principal, event.id).await.unwrap();
        booked.push((principal, book.id));
    }

    let cancels = booked.into_iter().map(|(principal, book_id)| {
        let bookings = bookings.clone();
        tokio::spawn(async move { bookings.cancel_book(&principal, book_id).await })
    });
    let delete = {
        let bookings = bookings.clone();
        tokio::spawn(async move { bookings.delete_event(event.id).await })
    };

    assert_eq!(delete.await.unwrap(), Ok(()));
    for result in join_all(cancels).await {
        // Отмена либо успела до удаления, либо бронь уже исчезла вместе с событием.
        match result.unwrap() {
            Ok(()) | Err(ServiceError::BookNotFound) => {}
            other => panic!("cancel raced delete into {other:?}"),
        }
    }
}
