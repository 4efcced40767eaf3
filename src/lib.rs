pub mod clock;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;

use std::sync::Arc;

use clock::Clock;
use repository::{PgRepository, Repository};
use services::{BookingService, JwtKeys, UserService};

// Shared state для всего приложения
pub struct AppState<R = PgRepository> {
    pub bookings: BookingService<R>,
    pub users: UserService<R>,
}

impl<R: Repository> AppState<R> {
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>, tokens: JwtKeys) -> Self {
        Self {
            bookings: BookingService::new(repo.clone(), clock.clone()),
            users: UserService::new(repo, clock, tokens),
        }
    }

    pub fn with_users(mut self, users: UserService<R>) -> Self {
        self.users = users;
        self
    }
}
