use chrono::NaiveDate;

use crate::api::BookingStatus;

/// Client-side form check failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid email address '{0}'")]
    InvalidEmail(String),

    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("at least one guest is required")]
    NoGuests,

    #[error("arrival {0} is in the past")]
    StartInPast(NaiveDate),

    #[error("departure {end} must be after arrival {start}")]
    EmptyStay { start: NaiveDate, end: NaiveDate },

    #[error("{0} must be a non-negative amount")]
    InvalidAmount(&'static str),

    #[error("invalid currency code '{0}'")]
    InvalidCurrency(String),

    #[error("booking {0} is already {1:?}")]
    BookingClosed(String, BookingStatus),

    #[error("admin role required")]
    NotAdmin,
}
