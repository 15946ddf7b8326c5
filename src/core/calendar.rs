//! Calendar-month helpers
//!
//! The engine and the aggregator reason in whole calendar months; these
//! helpers compute month windows without ever panicking on out-of-range dates.

use chrono::{Datelike, Months, NaiveDate};

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`
pub fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

/// Number of days in the month containing `date`
pub fn days_in_month(date: NaiveDate) -> u32 {
    month_end(date).day()
}

/// Same day `n` months earlier, clamped to the month's last day
pub fn months_back(date: NaiveDate, n: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(n)).unwrap_or(date)
}

/// Same day `n` months later, clamped to the month's last day
pub fn months_ahead(date: NaiveDate, n: u32) -> NaiveDate {
    date.checked_add_months(Months::new(n)).unwrap_or(date)
}

/// Whether `date` lies in the same calendar month as `reference`
pub fn same_month(date: NaiveDate, reference: NaiveDate) -> bool {
    date.year() == reference.year() && date.month() == reference.month()
}

/// Inclusive `[first, last]` window of the month containing `date`
pub fn month_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    (month_start(date), month_end(date))
}
