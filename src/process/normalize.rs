//! Cleaning of loosely-typed scraped fields: dates, seasons, minutes
//!
//! Scraped values arrive as strings in whatever shape the source page used.
//! Malformed values coerce to documented defaults instead of failing; a
//! single bad field must never abort processing of a league.

use chrono::NaiveDate;

/// Normalize a date string to `DD/MM/YYYY`.
///
/// Accepts `DD/MM/YYYY` (passed through), `DD-MM-YYYY`, and ISO
/// `YYYY-MM-DD`. Unparseable input yields `None` with a warning.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return None;
    }

    let slash_parts: Vec<&str> = raw.split('/').collect();
    if slash_parts.len() == 3 && slash_parts[0].len() <= 2 && slash_parts[2].len() == 4 {
        return Some(raw.to_string());
    }

    let dash_parts: Vec<&str> = raw.split('-').collect();
    if dash_parts.len() == 3 {
        if dash_parts[0].len() <= 2 && dash_parts[2].len() == 4 {
            if let Ok(date) = NaiveDate::parse_from_str(raw, "%d-%m-%Y") {
                return Some(date.format("%d/%m/%Y").to_string());
            }
        }
        if dash_parts[0].len() == 4 {
            if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                return Some(date.format("%d/%m/%Y").to_string());
            }
        }
    }

    log::warn!("Could not parse date: '{}'", raw);
    None
}

/// Normalize a season label to `YYYY-YY` (`"2024-2025"` → `"2024-25"`)
pub fn normalize_season(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return String::new();
    }
    match raw.split_once('-') {
        Some((start, end)) if end.len() >= 2 => {
            format!("{}-{}", start, &end[end.len() - 2..])
        }
        _ => raw.to_string(),
    }
}

/// Minutes played from `"MM:SS"` (or a bare number) to whole minutes,
/// rounding up at 30 seconds. Unparseable input counts as 0.
pub fn normalize_minutes(raw: &str) -> u32 {
    let raw = raw.trim();
    if let Some((mins, secs)) = raw.split_once(':') {
        let mins: u32 = match mins.trim().parse() {
            Ok(m) => m,
            Err(_) => return 0,
        };
        let secs: u32 = secs.trim().parse().unwrap_or(0);
        if secs >= 30 {
            mins + 1
        } else {
            mins
        }
    } else {
        raw.parse().unwrap_or(0)
    }
}

/// Safe string coercion: `None`/whitespace/NaN-like become the empty string
pub fn safe_str(value: Option<&str>) -> String {
    match value {
        None => String::new(),
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.eq_ignore_ascii_case("nan") {
                String::new()
            } else {
                trimmed.to_string()
            }
        }
    }
}

/// Safe integer coercion with a default (accepts "3" and "3.0" shapes)
pub fn safe_int(value: &str, default: i64) -> i64 {
    let value = value.trim();
    value
        .parse::<i64>()
        .or_else(|_| value.parse::<f64>().map(|f| f as i64))
        .unwrap_or(default)
}

/// Safe float coercion with a default
pub fn safe_float(value: &str, default: f64) -> f64 {
    value.trim().parse().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_date_formats() {
        assert_eq!(normalize_date("12/11/2024").as_deref(), Some("12/11/2024"));
        assert_eq!(normalize_date("12-11-2024").as_deref(), Some("12/11/2024"));
        assert_eq!(normalize_date("2024-11-12").as_deref(), Some("12/11/2024"));
        assert_eq!(normalize_date("5/3/2024").as_deref(), Some("5/3/2024"));
    }

    #[test]
    fn test_normalize_date_rejects_garbage() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("nan"), None);
        assert_eq!(normalize_date("yesterday"), None);
        assert_eq!(normalize_date("99-99-2024"), None);
    }

    #[test]
    fn test_normalize_season() {
        assert_eq!(normalize_season("2024-2025"), "2024-25");
        assert_eq!(normalize_season("2024-25"), "2024-25");
        assert_eq!(normalize_season(""), "");
        assert_eq!(normalize_season("NaN"), "");
        assert_eq!(normalize_season("2024"), "2024");
    }

    #[test]
    fn test_normalize_minutes() {
        assert_eq!(normalize_minutes("24:29"), 24);
        assert_eq!(normalize_minutes("24:30"), 25);
        assert_eq!(normalize_minutes("31"), 31);
        assert_eq!(normalize_minutes("DNP"), 0);
        assert_eq!(normalize_minutes(""), 0);
    }

    #[test]
    fn test_safe_coercions() {
        assert_eq!(safe_str(None), "");
        assert_eq!(safe_str(Some("  nan ")), "");
        assert_eq!(safe_str(Some(" 1.98 ")), "1.98");
        assert_eq!(safe_int("7", 0), 7);
        assert_eq!(safe_int("7.0", 0), 7);
        assert_eq!(safe_int("x", -1), -1);
        assert_eq!(safe_float("58.3", 0.0), 58.3);
        assert_eq!(safe_float("", 0.0), 0.0);
    }
}
