use chrono::{Datelike, NaiveDate};

/// This is the standard way of naming the penalty document of a month.
pub fn date_to_month_key(date: NaiveDate) -> String {
    date.format("penalties-%Y-%m").to_string()
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}
