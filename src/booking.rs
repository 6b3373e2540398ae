use chrono::NaiveDate;

use crate::api::{Booking, BookingRequest, BookingStatus};
use crate::validation::ValidationError;

pub fn nights(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

pub fn booking_request(campsite_id: &str, start: NaiveDate, end: NaiveDate, guests: u32, today: NaiveDate) -> Result<BookingRequest, ValidationError> {
    let campsite_id = campsite_id.trim();
    if campsite_id.is_empty() {
        return Err(ValidationError::Missing("campsite"));
    }
    if guests == 0 {
        return Err(ValidationError::NoGuests);
    }
    if start < today {
        return Err(ValidationError::StartInPast(start));
    }
    if nights(start, end) < 1 {
        return Err(ValidationError::EmptyStay { start, end });
    }

    Ok(BookingRequest {
        campsite_id: campsite_id.to_string(),
        start_date: start,
        end_date: end,
        guests: guests
    })
}

#[derive(Debug,Clone,Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    /// keep only stays that have not ended before this day
    pub upcoming_from: Option<NaiveDate>
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(status) = self.status {
            if booking.status != status {
                return false;
            }
        }
        if let Some(today) = self.upcoming_from {
            if booking.end_date < today {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, bookings: Vec<Booking>) -> Vec<Booking> {
        let mut result: Vec<Booking> = bookings.into_iter()
            .filter(|b| self.matches(b))
            .collect();
        result.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));
        result
    }
}

/// Refuse cancelling a booking already known to be closed.
pub fn check_cancellable(booking_id: &str, known: &[Booking]) -> Result<(), ValidationError> {
    match known.iter().find(|b| b.id == booking_id) {
        Some(b) if b.status.is_closed() => Err(ValidationError::BookingClosed(b.id.clone(), b.status)),
        _ => Ok(())
    }
}
