use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::middleware::AuthUser;
use crate::models::Booking;
use crate::repository::Repository;
use crate::AppState;

pub fn routes<R: Repository>() -> Router<Arc<AppState<R>>> {
    Router::new()
        .route("/books", post(create_booking::<R>))
        .route("/books/my", get(my_bookings::<R>))
        .route("/books/{id}", delete(cancel_booking::<R>))
        .route("/books/{id}/confirm", post(confirm_booking::<R>))
}

/* ---------- BOOKINGS ---------- */

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    // 0 означает "не передан", сервис ответит EmptyBookInfo
    #[serde(default)]
    eventid: i64,
}

// POST /books
async fn create_booking<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    AuthUser(principal): AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let booking = state.bookings.book_event(&principal, req.eventid).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// POST /books/{id}/confirm
async fn confirm_booking<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    AuthUser(principal): AuthUser,
    Path(book_id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.bookings.confirm_book(&principal, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /books/my
async fn my_bookings<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Vec<Booking>>, ServiceError> {
    let bookings = state.bookings.get_books_list_by_user_id(&principal).await?;
    Ok(Json(bookings))
}

// DELETE /books/{id}
async fn cancel_booking<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    AuthUser(principal): AuthUser,
    Path(book_id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.bookings.cancel_book(&principal, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
