use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Broad class of a [`ServiceError`]; drives HTTP status mapping and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Unauthorized,
    Forbidden,
    Internal,
}

/// Errors surfaced by the services. The display text is what callers see.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ServiceError {
    // validation
    #[error("incomplete data to book event")]
    EmptyBookInfo,
    #[error("incomplete data to create event")]
    EmptyEventInfo,
    #[error("event date cannot be in the past")]
    IncorrectEventTime,
    #[error("incorrect user role is provided")]
    IncorrectUserRole,
    #[error("incorrect email provided")]
    IncorrectEmail,
    #[error("incorrect telephone number provided")]
    IncorrectPhone,
    #[error("password must not be empty")]
    EmptyPassword,

    // conflicts
    #[error("no more seats to book for this event")]
    NoSeatsAvailable,
    #[error("the event you are trying to book has expired")]
    EventExpired,
    #[error("the book is already cancelled")]
    BookIsCancelled,
    #[error("the book is already confirmed")]
    BookAlreadyConfirmed,
    #[error("confirmation deadline for this book has passed")]
    BookExpired,
    #[error("user with this email already exists")]
    UserAlreadyExists,

    // not found
    #[error("event not found")]
    EventNotFound,
    #[error("book not found")]
    BookNotFound,

    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("missing or invalid access token")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,

    #[error("something went wrong. Try again later")]
    Internal,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        use ServiceError::*;
        match self {
            EmptyBookInfo | EmptyEventInfo | IncorrectEventTime | IncorrectUserRole
            | IncorrectEmail | IncorrectPhone | EmptyPassword => ErrorKind::Validation,
            NoSeatsAvailable | EventExpired | BookIsCancelled | BookAlreadyConfirmed
            | BookExpired | UserAlreadyExists => ErrorKind::Conflict,
            EventNotFound | BookNotFound => ErrorKind::NotFound,
            InvalidCredentials | Unauthorized => ErrorKind::Unauthorized,
            Forbidden => ErrorKind::Forbidden,
            Internal => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rules_map_to_conflict() {
        for err in [
            ServiceError::NoSeatsAvailable,
            ServiceError::EventExpired,
            ServiceError::BookIsCancelled,
        ] {
            assert_eq!(err.kind(), ErrorKind::Conflict);
            assert_eq!(err.status_code(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn internal_error_hides_details() {
        let err = ServiceError::Internal;
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "something went wrong. Try again later");
    }

    #[test]
    fn no_seats_message_is_stable() {
        assert_eq!(
            ServiceError::NoSeatsAvailable.to_string(),
            "no more seats to book for this event"
        );
    }
}
