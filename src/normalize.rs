use chrono::NaiveDate;

pub const SQFT_PER_ACRE: f64 = 43_560.0;

pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

pub fn clean_text(raw: Option<&str>) -> Option<String> {
    let cleaned = normalize_ws(raw?);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

pub fn parse_currency(raw: &str) -> Option<f64> {
    let value = parse_decimal(raw)?;
    Some((value * 100.0).round() / 100.0)
}

/// Accepts `MM/DD/YYYY` (one or two digit month/day) and `M/YYYY`, which is
/// pinned to the first of the month. Every other shape is rejected.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let parts: Vec<&str> = trimmed.split('/').collect();
    if !parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    match parts.as_slice() {
        [month, day, year] if month.len() <= 2 && day.len() <= 2 && year.len() == 4 => {
            NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
        }
        [month, year] if month.len() <= 2 && year.len() == 4 => {
            NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
        }
        _ => None,
    }
}

pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn parse_decimal(raw: &str) -> Option<f64> {
    let digits = numeric_text(raw)?;
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn numeric_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let negative = trimmed.starts_with('-') || (trimmed.starts_with('(') && trimmed.ends_with(')'));
    let mut out: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if out.is_empty() || out.parse::<f64>().is_err() {
        return None;
    }
    if negative {
        out.insert(0, '-');
    }
    Some(out)
}

pub fn parse_area(raw: &str) -> Option<f64> {
    parse_decimal(raw).filter(|v| *v >= 0.0)
}

pub fn parse_acreage(raw: &str) -> Option<f64> {
    parse_area(raw)
}

pub fn acres_to_sqft(acres: f64) -> f64 {
    acres * SQFT_PER_ACRE
}

pub fn sqft_to_acres(sqft: f64) -> f64 {
    sqft / SQFT_PER_ACRE
}

pub fn parse_int(raw: &str) -> Option<i64> {
    let value = parse_decimal(raw)?;
    if value.fract() != 0.0 {
        return None;
    }
    Some(value as i64)
}

pub fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if trimmed.len() != 4 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = trimmed.parse().ok()?;
    (1600..=2200).contains(&year).then_some(year)
}

pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|token| {
            let lower = token.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
