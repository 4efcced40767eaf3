pub mod booking;
pub mod sweeper;
pub mod tokens;
pub mod users;
pub mod validation;

pub use booking::BookingService;
pub use sweeper::{ExpiredBooksCleaner, ExpirySweeper};
pub use tokens::JwtKeys;
pub use users::UserService;
