//! Buddhist-era calendar formatting and Thai digit conversion.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

/// Offset between the Common Era and the Buddhist Era.
const BE_OFFSET: i32 = 543;

const THAI_MONTHS: [&str; 12] = [
    "มกราคม",
    "กุมภาพันธ์",
    "มีนาคม",
    "เมษายน",
    "พฤษภาคม",
    "มิถุนายน",
    "กรกฎาคม",
    "สิงหาคม",
    "กันยายน",
    "ตุลาคม",
    "พฤศจิกายน",
    "ธันวาคม",
];

const THAI_DAYS: [&str; 7] = [
    "วันจันทร์",
    "วันอังคาร",
    "วันพุธ",
    "วันพฤหัสบดี",
    "วันศุกร์",
    "วันเสาร์",
    "วันอาทิตย์",
];

/// A calendar date in both eras, with Thai names resolved.
#[derive(Debug, Clone, Serialize)]
pub struct BuddhistDate {
    pub year_be: i32,
    pub year_ce: i32,
    pub month: u32,
    pub day: u32,
    pub thai_month_name: String,
    pub thai_day_name: String,
}

pub fn ce_to_be(year_ce: i32) -> i32 {
    year_ce + BE_OFFSET
}

pub fn be_to_ce(year_be: i32) -> i32 {
    year_be - BE_OFFSET
}

/// Replace western digits with Thai digits (U+0E50..U+0E59).
pub fn to_thai_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '0'..='9' => char::from_u32(0x0E50 + (c as u32 - '0' as u32)).unwrap(),
            other => other,
        })
        .collect()
}

pub fn buddhist_date(at: DateTime<Utc>) -> BuddhistDate {
    let month = at.month();
    BuddhistDate {
        year_be: ce_to_be(at.year()),
        year_ce: at.year(),
        month,
        day: at.day(),
        thai_month_name: THAI_MONTHS[(month - 1) as usize].to_string(),
        thai_day_name: THAI_DAYS[at.weekday().num_days_from_monday() as usize].to_string(),
    }
}

/// Format a date the way Thai receivers announce it, e.g.
/// `วันพุธ ๑๕ พฤษภาคม ๒๕๖๗`. Set `thai_digits` to false for western numerals.
pub fn format_buddhist_date(at: DateTime<Utc>, thai_digits: bool) -> String {
    let date = buddhist_date(at);
    let text = format!(
        "{} {} {} {}",
        date.thai_day_name, date.day, date.thai_month_name, date.year_be
    );
    if thai_digits {
        to_thai_digits(&text)
    } else {
        text
    }
}
