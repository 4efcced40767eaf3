pub mod auth;
pub mod bookings;
pub mod events;

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::repository::Repository;
use crate::AppState;

pub fn routes<R: Repository>() -> Router<Arc<AppState<R>>> {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .merge(auth::routes::<R>())
        .merge(events::routes::<R>())
        .merge(bookings::routes::<R>())
}

/// Full application router. A request that runs past `request_timeout` is
/// answered with 408 and its in-flight transaction is dropped, which rolls it back.
pub fn router<R: Repository>(state: Arc<AppState<R>>, request_timeout: Duration) -> Router {
    routes::<R>()
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
