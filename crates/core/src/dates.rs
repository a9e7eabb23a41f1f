use chrono::{Datelike, NaiveDate};

/// Parse a statement-local date string.
///
/// Bank statements print dates without a year ("Jun 30"); the caller supplies
/// the statement year. Full forms (ISO, M/D/YYYY, M/D/YY) are accepted as
/// well. No year-rollover correction is applied.
pub fn parse_statement_date(s: &str, default_year: i32) -> Option<NaiveDate> {
    let s = s.trim();

    if let Some(d) = try_abbr_month_day(s, default_year) {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in &["%m/%d/%Y", "%m/%d/%y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// "Jun 30" / "Jun 5" / "June 30" with the year supplied by the caller.
fn try_abbr_month_day(s: &str, year: i32) -> Option<NaiveDate> {
    let (month_str, day_str) = s.split_once(' ')?;
    let month = month_to_num(month_str)?;
    let day: u32 = day_str.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_to_num(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "jan" | "january" => Some(1),
        "feb" | "february" => Some(2),
        "mar" | "march" => Some(3),
        "apr" | "april" => Some(4),
        "may" => Some(5),
        "jun" | "june" => Some(6),
        "jul" | "july" => Some(7),
        "aug" | "august" => Some(8),
        "sep" | "september" => Some(9),
        "oct" | "october" => Some(10),
        "nov" | "november" => Some(11),
        "dec" | "december" => Some(12),
        _ => None,
    }
}

/// Format a date the way the sheet's date-header rows expect: "6/30/25".
pub fn format_sheet_date(date: NaiveDate) -> String {
    format!("{}/{}/{:02}", date.month(), date.day(), date.year() % 100)
}
