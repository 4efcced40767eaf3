use std::sync::Arc;
use tracing::{error, info};

use crate::clock::Clock;
use crate::error::ServiceError;
use crate::models::{NewUser, SignUp, User};
use crate::repository::{Repository, StoreError};
use crate::services::booking::internal;
use crate::services::tokens::JwtKeys;
use crate::services::validation::validate_sign_up;

pub struct UserService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
    tokens: JwtKeys,
    hash_cost: u32,
}

impl<R> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            clock: self.clock.clone(),
            tokens: self.tokens.clone(),
            hash_cost: self.hash_cost,
        }
    }
}

impl<R: Repository> UserService<R> {
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>, tokens: JwtKeys) -> Self {
        Self {
            repo,
            clock,
            tokens,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn tokens(&self) -> &JwtKeys {
        &self.tokens
    }

    pub async fn create_user(&self, sign_up: SignUp) -> Result<User, ServiceError> {
        let checked = validate_sign_up(&sign_up)?;

        let cost = self.hash_cost;
        let password = sign_up.password;
        // bcrypt медленный, не держим на нём рантайм
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|err| {
                error!(error = %err, "password hashing task failed");
                ServiceError::Internal
            })?
            .map_err(|err| {
                error!(error = %err, "failed to hash password");
                ServiceError::Internal
            })?;

        let new_user = NewUser {
            role: checked.role,
            created_at: self.clock.now(),
            name: sign_up.name.trim().to_owned(),
            surname: sign_up.surname.trim().to_owned(),
            tel: checked.tel,
            email: checked.email,
            password_hash,
        };

        let mut conn = self.repo.acquire().await.map_err(internal("create_user"))?;
        let user = match self.repo.create_user(&mut *conn, &new_user).await {
            Ok(user) => user,
            Err(StoreError::Duplicate(_)) => return Err(ServiceError::UserAlreadyExists),
            Err(err) => return Err(internal("create_user")(err)),
        };

        info!(user_id = user.id, role = ?user.role, "user registered");
        Ok(user)
    }

    /// Returns a fresh access token together with the user.
    pub async fn login_user(&self, email: &str, password: &str) -> Result<(String, User), ServiceError> {
        let email = email.trim().to_lowercase();

        let mut conn = self.repo.acquire().await.map_err(internal("login_user"))?;
        let user = self
            .repo
            .get_user_by_email(&mut *conn, &email)
            .await
            .map_err(internal("login_user"))?
            .ok_or(ServiceError::InvalidCredentials)?;
        drop(conn);

        let password = password.to_owned();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|err| {
                error!(error = %err, "password check task failed");
                ServiceError::Internal
            })?
            .unwrap_or(false);
        if !matches {
            return Err(ServiceError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user)?;
        info!(user_id = user.id, "user logged in");
        Ok((token, user))
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, ServiceError> {
        let mut conn = self.repo.acquire().await.map_err(internal("get_user"))?;
        self.repo
            .get_user(&mut *conn, user_id)
            .await
            .map_err(internal("get_user"))
    }
}
