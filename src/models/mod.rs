pub mod booking;
pub mod event;
pub mod user;

pub use booking::{Booking, BookingStatus, NewBooking};
pub use event::{starts_at, Event, EventStatus, NewEvent};
pub use user::{NewUser, Principal, Role, SignUp, User};
