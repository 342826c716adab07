use time::macros::format_description;
use time::{Date, Month};

/// Leading-integer parse over trimmed text: optional sign, then digits.
/// Anything else (including an empty field) is 0. Legacy numeric fields
/// are dirty, so this never fails; `"12.50"` reads as 12.
pub fn parse_int(s: &str) -> i64 {
    let t = s.trim();
    let (neg, digits) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    let Ok(v) = digits[..end].parse::<i64>() else {
        return 0;
    };
    if neg { -v } else { v }
}

/// Strict code parse: non-empty and all ASCII digits.
pub fn parse_code(s: &str) -> Option<u64> {
    let t = s.trim();
    if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    t.parse().ok()
}

/// `YYYYMMDD` to a calendar date; any other length or an impossible date
/// yields `None`.
pub fn parse_yyyymmdd(s: &str) -> Option<Date> {
    let t = s.trim();
    if t.len() != 8 || !t.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = t[0..4].parse().ok()?;
    let month: u8 = t[4..6].parse().ok()?;
    let day: u8 = t[6..8].parse().ok()?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

/// `YYYY-MM-DD`, the form target dates are configured in.
pub fn parse_iso_date(s: &str) -> Option<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]")).ok()
}

pub fn format_iso_date(d: Date) -> String {
    format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day())
}
