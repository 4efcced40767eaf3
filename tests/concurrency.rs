use chrono::{NaiveDate, TimeZone, Utc};
use futures::future::join_all;
use std::sync::Arc;

use event_booker::clock::ManualClock;
use event_booker::error::ServiceError;
use event_booker::models::{Event, NewEvent, Principal, Role};
use event_booker::repository::{MemoryRepository, Repository};
use event_booker::services::BookingService;

fn service() -> (Arc<MemoryRepository>, BookingService<MemoryRepository>) {
    let repo = Arc::new(MemoryRepository::new());
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap()));
    (repo.clone(), BookingService::new(repo, clock))
}

async fn event_with(service: &BookingService<MemoryRepository>, seats: i32) -> Event {
    service
        .create_event(NewEvent {
            title: "Finals".into(),
            description: String::new(),
            event_date: NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
            total_seats: seats,
            book_window: 120,
        })
        .await
        .unwrap()
}

async fn avail(repo: &MemoryRepository, event_id: i64) -> i32 {
    let mut conn = repo.acquire().await.unwrap();
    repo.get_event(&mut conn, event_id).await.unwrap().unwrap().avail_seats
}

fn user(id: i64) -> Principal {
    Principal { user_id: id, role: Role::User }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_bookers_one_seat() {
    let (repo, service) = service();
    let event = event_with(&service, 1).await;

    let a = tokio::spawn({
        let service = service.clone();
        async move { service.book_event(&user(1), event.id).await }
    });
    let b = tokio::spawn({
        let service = service.clone();
        async move { service.book_event(&user(2), event.id).await }
    });
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| r.as_ref().err() == Some(&ServiceError::NoSeatsAvailable)));
    assert_eq!(avail(&repo, event.id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn many_bookers_never_oversell() {
    let (repo, service) = service();
    let seats = 7;
    let event = event_with(&service, seats).await;

    let tasks = (1..=50).map(|id| {
        let service = service.clone();
        tokio::spawn(async move { service.book_event(&user(id), event.id).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let won = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(won, seats as usize);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|err| *err == ServiceError::NoSeatsAvailable));
    assert_eq!(avail(&repo, event.id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_cancels_return_the_seat_once() {
    let (repo, service) = service();
    let event = event_with(&service, 3).await;
    let booking = service.book_event(&user(1), event.id).await.unwrap();

    let tasks = (0..10).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.cancel_book(&user(1), booking.id).await })
    });
    for joined in join_all(tasks).await {
        joined.unwrap().unwrap();
    }

    assert_eq!(avail(&repo, event.id).await, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelled_future_leaves_no_trace() {
    let (repo, service) = service();
    let event = event_with(&service, 2).await;

    // держим хранилище, чтобы бронь не успела начаться
    let guard = repo.acquire().await.unwrap();
    let pending = tokio::spawn({
        let service = service.clone();
        async move { service.book_event(&user(1), event.id).await }
    });
    tokio::task::yield_now().await;
    pending.abort();
    drop(guard);

    assert!(pending.await.unwrap_err().is_cancelled());
    assert_eq!(avail(&repo, event.id).await, 2);
    assert!(service.get_books_list_by_user_id(&user(1)).await.unwrap().is_empty());
}
