//! Release date formatting for Italian-language clients

use chrono::{Datelike, NaiveDate};

const ITALIAN_MONTHS: [&str; 12] = [
    "Gennaio",
    "Febbraio",
    "Marzo",
    "Aprile",
    "Maggio",
    "Giugno",
    "Luglio",
    "Agosto",
    "Settembre",
    "Ottobre",
    "Novembre",
    "Dicembre",
];

/// Format a `YYYY-MM-DD` date as `15 Gennaio 2024`.
///
/// Empty input yields `None`; input that is not an ISO date is returned
/// unchanged.
///
/// # Examples
/// ```
/// use reelcheck_core::locale::format_italian_date;
///
/// assert_eq!(format_italian_date("2024-01-15").as_deref(), Some("15 Gennaio 2024"));
/// assert_eq!(format_italian_date("soon").as_deref(), Some("soon"));
/// assert_eq!(format_italian_date(""), None);
/// ```
pub fn format_italian_date(date: &str) -> Option<String> {
    let trimmed = date.trim();
    if trimmed.is_empty() {
        return None;
    }

    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(parsed) => Some(format!(
            "{} {} {}",
            parsed.day(),
            ITALIAN_MONTHS[parsed.month0() as usize],
            parsed.year()
        )),
        Err(_) => Some(date.to_string()),
    }
}
