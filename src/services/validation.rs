use chrono::{DateTime, Utc};
use validator::{Validate, ValidateEmail};

use crate::error::ServiceError;
use crate::models::{starts_at, NewEvent, Role, SignUp};

/// Trims the title and checks the event payload against `now`. An event
/// dated today has already started and is refused.
pub fn validate_event(event: &mut NewEvent, now: DateTime<Utc>) -> Result<(), ServiceError> {
    event.title = event.title.trim().to_owned();
    event
        .validate()
        .map_err(|_| ServiceError::EmptyEventInfo)?;
    if starts_at(event.event_date) < now {
        return Err(ServiceError::IncorrectEventTime);
    }
    Ok(())
}

/// Normalized sign-up fields, password still in plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedSignUp {
    pub role: Role,
    pub email: String,
    pub tel: Option<String>,
}

pub fn validate_sign_up(sign_up: &SignUp) -> Result<CheckedSignUp, ServiceError> {
    let role = match sign_up.role.trim() {
        "admin" => Role::Admin,
        "user" => Role::User,
        _ => return Err(ServiceError::IncorrectUserRole),
    };

    let email = sign_up.email.trim().to_lowercase();
    if !email.validate_email() {
        return Err(ServiceError::IncorrectEmail);
    }

    let tel = match sign_up.tel.trim() {
        "" => None,
        raw => {
            let tel = normalize_phone(raw);
            if !is_valid_phone(&tel) {
                return Err(ServiceError::IncorrectPhone);
            }
            Some(tel)
        }
    };

    if sign_up.password.is_empty() {
        return Err(ServiceError::EmptyPassword);
    }

    Ok(CheckedSignUp { role, email, tel })
}

// "00 7 (912) 345-67-89" -> "+79123456789"
pub fn normalize_phone(raw: &str) -> String {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    match compact.strip_prefix("00") {
        Some(rest) => format!("+{rest}"),
        None => compact,
    }
}

/// `+`, a non-zero digit, then 7 to 14 more digits.
fn is_valid_phone(tel: &str) -> bool {
    let Some(digits) = tel.strip_prefix('+') else {
        return false;
    };
    let mut chars = digits.chars();
    let first_ok = matches!(chars.next(), Some('1'..='9'));
    let rest = chars.as_str();
    first_ok && (7..=14).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn sign_up(role: &str, email: &str, tel: &str) -> SignUp {
        SignUp {
            role: role.into(),
            name: "Ivan".into(),
            surname: "Petrov".into(),
            tel: tel.into(),
            email: email.into(),
            password: "secret".into(),
        }
    }

    fn event(title: &str, date: NaiveDate) -> NewEvent {
        NewEvent {
            title: title.into(),
            description: String::new(),
            event_date: date,
            total_seats: 10,
            book_window: 60,
        }
    }

    #[test]
    fn phone_is_normalized() {
        assert_eq!(normalize_phone(" 00 7 (912) 345-67-89 "), "+79123456789");
        assert_eq!(normalize_phone("+44 20 7946 0958"), "+442079460958");
    }

    #[test]
    fn phone_shape_is_checked() {
        assert!(is_valid_phone("+79123456789"));
        assert!(!is_valid_phone("79123456789"));
        assert!(!is_valid_phone("+0123456789"));
        assert!(!is_valid_phone("+1234"));
        assert!(!is_valid_phone("+7912345678x"));
    }

    #[test]
    fn sign_up_is_normalized() {
        let checked = validate_sign_up(&sign_up("user", "  Ivan@Example.COM ", "8 (912) 345-67-89")).unwrap_err();
        assert_eq!(checked, ServiceError::IncorrectPhone);

        let checked = validate_sign_up(&sign_up("admin", "  Ivan@Example.COM ", "+7 912 345 67 89")).unwrap();
        assert_eq!(checked.role, Role::Admin);
        assert_eq!(checked.email, "ivan@example.com");
        assert_eq!(checked.tel.as_deref(), Some("+79123456789"));
    }

    #[test]
    fn sign_up_rejects_bad_fields() {
        assert_eq!(
            validate_sign_up(&sign_up("root", "a@b.io", "")),
            Err(ServiceError::IncorrectUserRole)
        );
        assert_eq!(
            validate_sign_up(&sign_up("user", "not-an-email", "")),
            Err(ServiceError::IncorrectEmail)
        );

        let mut no_password = sign_up("user", "a@b.io", "");
        no_password.password.clear();
        assert_eq!(validate_sign_up(&no_password), Err(ServiceError::EmptyPassword));
    }

    #[test]
    fn event_checks() {
        let now = Utc.with_ymd_and_hms(2030, 3, 1, 23, 0, 0).unwrap();
        let today = NaiveDate::from_ymd_opt(2030, 3, 1).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2030, 3, 2).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2030, 2, 28).unwrap();

        let mut ok = event("  Opera  ", tomorrow);
        assert!(validate_event(&mut ok, now).is_ok());
        assert_eq!(ok.title, "Opera");

        assert_eq!(
            validate_event(&mut event("   ", tomorrow), now),
            Err(ServiceError::EmptyEventInfo)
        );
        assert_eq!(
            validate_event(&mut event("Opera", yesterday), now),
            Err(ServiceError::IncorrectEventTime)
        );

        let mut no_window = event("Opera", tomorrow);
        no_window.book_window = 0;
        assert_eq!(validate_event(&mut no_window, now), Err(ServiceError::EmptyEventInfo));
    }

    #[test]
    fn event_dated_today_has_already_started() {
        let today = NaiveDate::from_ymd_opt(2030, 3, 1).unwrap();
        let late_evening = Utc.with_ymd_and_hms(2030, 3, 1, 23, 0, 0).unwrap();
        let midnight = Utc.with_ymd_and_hms(2030, 3, 1, 0, 0, 0).unwrap();

        assert_eq!(
            validate_event(&mut event("Opera", today), late_evening),
            Err(ServiceError::IncorrectEventTime)
        );
        assert!(validate_event(&mut event("Opera", today), midnight).is_ok());
    }
}
