// Utility helpers for parsing and basic statistics.
//
// This module centralizes the "dirty" CSV text handling (counts, dates,
// survey percentages) so the rest of the code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Separators that join two dates in a range, e.g. `10/01/2024 y 12/01/2024`.
const RANGE_CONJUNCTIONS: [&str; 2] = [" y ", " and "];

/// Parse a count column (hours, participants, ...) while being forgiving
/// about formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace and strips thousands separators.
/// - Rejects values that contain alphabetic characters.
/// - Truncates fractional values (`12.0` and `12.7` both give 12).
/// - Returns `None` for anything negative, non-finite or unparseable.
pub fn parse_count_safe(s: Option<&str>) -> Option<u32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    let v = s.parse::<f64>().ok()?;
    if !v.is_finite() || v < 0.0 || v > u32::MAX as f64 {
        return None;
    }
    Some(v.trunc() as u32)
}

/// Resolve the representative start date of a free-form date cell.
///
/// Ranges (`10/01/2024 - 12/01/2024`) and conjunctions
/// (`10/01/2024 y 12/01/2024`) resolve to their first date. The token is
/// read day-first. Anything else resolves to `None`.
pub fn resolve_start_date(text: &str) -> Option<NaiveDate> {
    let first = text.split('-').next().unwrap_or(text);
    let token = RANGE_CONJUNCTIONS
        .iter()
        .fold(first, |t, sep| t.split(sep).next().unwrap_or(t))
        .trim();
    if token.is_empty() {
        return None;
    }
    parse_day_first(token)
}

fn parse_day_first(token: &str) -> Option<NaiveDate> {
    let token = token.replace('.', "/");
    let parts: Vec<&str> = token.split('/').map(str::trim).collect();
    if parts.len() != 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    // `yyyy/mm/dd` is the only year-first shape we accept.
    let fmt = if parts[0].len() == 4 {
        "%Y/%m/%d"
    } else if parts[2].len() == 4 {
        "%d/%m/%Y"
    } else if parts[2].len() == 2 {
        "%d/%m/%y"
    } else {
        return None;
    };
    NaiveDate::parse_from_str(&parts.join("/"), fmt).ok()
}

/// Parse a survey cell such as `92%` into a percentage.
///
/// Placeholders like `-%`, free text and values outside 0..=100 give `None`.
pub fn parse_survey_pct(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s.strip_suffix('%').unwrap_or(s).trim();
    if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let v = s.parse::<f64>().ok()?;
    if !(0.0..=100.0).contains(&v) {
        return None;
    }
    Some(v)
}

/// `numerator / denominator` as a percentage, `None` when the denominator is 0.
pub fn rate_pct(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        return None;
    }
    Some(numerator as f64 * 100.0 / denominator as f64)
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed number of decimals plus thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

pub fn display_pct(v: &f64) -> String {
    format!("{:.1}%", v)
}

pub fn display_opt_pct(v: &Option<f64>) -> String {
    match v {
        Some(v) => display_pct(v),
        None => "-".to_string(),
    }
}
