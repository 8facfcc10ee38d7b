use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::utils::{
    percentage::{ratio_percentage, Percentage},
    time::days_in_month,
};

/// How far the current month has gone, drives the month progress bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthProgress {
    pub elapsed: Percentage,
    pub days_left: u32,
    pub days_in_month: u32,
}

impl MonthProgress {
    /// Hours count as fractions of a day, minutes are ignored.
    pub fn at(now: NaiveDateTime) -> Self {
        let total = days_in_month(now.date());
        let elapsed_days = (now.day() - 1) as f64 + now.hour() as f64 / 24.;
        let elapsed = ratio_percentage(elapsed_days, total as f64).unwrap_or(Percentage::FULL);
        let days_left = (*elapsed.complement() / 100. * total as f64).ceil() as u32;
        Self {
            elapsed,
            days_left,
            days_in_month: total,
        }
    }
}
