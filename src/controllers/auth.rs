use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ServiceError;
use crate::models::{Role, SignUp, User};
use crate::repository::Repository;
use crate::AppState;

pub fn routes<R: Repository>() -> Router<Arc<AppState<R>>> {
    Router::new()
        .route("/auth/signup", post(sign_up::<R>))
        .route("/auth/login", post(login::<R>))
}

#[derive(Debug, Serialize)]
struct SignUpUser {
    id: i64,
    email: String,
    role: Role,
}

#[derive(Debug, Serialize)]
struct SignUpResponse {
    user: SignUpUser,
}

// POST /auth/signup
async fn sign_up<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<SignUp>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.users.create_user(req).await?;
    let body = SignUpResponse {
        user: SignUpUser {
            id: user.id,
            email: user.email,
            role: user.role,
        },
    };
    Ok((StatusCode::CREATED, Json(body)))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user: User,
}

// POST /auth/login
async fn login<R: Repository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    let (token, user) = state.users.login_user(&req.email, &req.password).await?;
    Ok(Json(LoginResponse { token, user }))
}
