//! Year-agnostic birthday arithmetic.

use time::{Date, Month};

/// The birthday's month/day placed in `year`. Feb 29 falls on Mar 1 in common years.
fn anniversary_in(birthday: Date, year: i32) -> Option<Date> {
    Date::from_calendar_date(year, birthday.month(), birthday.day())
        .or_else(|_| Date::from_calendar_date(year, Month::March, 1))
        .ok()
}

/// First anniversary of `birthday` on or after `today`.
pub fn next_anniversary(birthday: Date, today: Date) -> Option<Date> {
    let this_year = anniversary_in(birthday, today.year())?;
    if this_year >= today {
        Some(this_year)
    } else {
        anniversary_in(birthday, today.year() + 1)
    }
}

pub fn days_until(birthday: Date, today: Date) -> Option<i64> {
    next_anniversary(birthday, today).map(|d| (d - today).whole_days())
}

/// True when the next anniversary lies in `[today, today + days]`.
pub fn is_upcoming(birthday: Date, today: Date, days: i64) -> bool {
    days_until(birthday, today).is_some_and(|n| n <= days)
}
