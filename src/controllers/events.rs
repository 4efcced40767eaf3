use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use std::sync::Arc;

use crate::error::ServiceError;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::{Event, NewEvent};
use crate::repository::Repository;
use crate::AppState;

pub fn routes<R: Repository>() -> Router<Arc<AppState<R>>> {
    Router::new()
        .route("/events", get(list_events::<R>).post(create_event::<R>))
        .route("/events/{id}", delete(delete_event::<R>))
}

// GET /events
async fn list_events<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Vec<Event>>, ServiceError> {
    let events = state.bookings.get_events_list(&principal).await?;
    Ok(Json(events))
}

// POST /events
async fn create_event<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<NewEvent>,
) -> Result<impl IntoResponse, ServiceError> {
    let event = state.bookings.create_event(req).await?;
    tracing::info!(event_id = event.id, admin_id = admin.user_id, "event created via api");
    Ok((StatusCode::CREATED, Json(event)))
}

// DELETE /events/{id}
async fn delete_event<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    AdminUser(_): AdminUser,
    Path(event_id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    state.bookings.delete_event(event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
