// Utility helpers for coercion, ordering and number formatting.
//
// This module centralizes all the "dirty" spreadsheet handling so the
// rest of the code can assume clean, typed values.
use crate::types::RawValue;
use num_format::{Locale, ToFormattedString};
use std::cmp::Ordering;

/// Parse a string-like value into `f64` while being forgiving about
/// the formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Accepts scientific notation (`"1.2E-02"`).
/// - Returns `None` for anything that cannot be parsed or is not finite
///   (`"NaN"`, `"inf"`).
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce a raw cell to a number. Never fails: empty cells, stray text and
/// non-finite numbers all become 0.
pub fn to_num(v: Option<&RawValue>) -> f64 {
    match v {
        Some(RawValue::Number(n)) if n.is_finite() => *n,
        Some(RawValue::Text(s)) => parse_f64_safe(Some(s)).unwrap_or(0.0),
        Some(RawValue::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Like `to_num` but keeps "absent" apart from zero.
pub fn to_num_opt(v: Option<&RawValue>) -> Option<f64> {
    match v {
        Some(RawValue::Number(n)) if n.is_finite() => Some(*n),
        Some(RawValue::Text(s)) => parse_f64_safe(Some(s)),
        _ => None,
    }
}

/// Render a cell as trimmed text; numbers lose a trailing `.0`.
pub fn to_text(v: Option<&RawValue>) -> String {
    match v {
        Some(RawValue::Text(s)) => s.trim().to_string(),
        Some(RawValue::Number(n)) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        Some(RawValue::Bool(b)) => b.to_string(),
        Some(RawValue::Empty) | None => String::new(),
    }
}

/// A header names a year column when it is all ASCII digits and falls in
/// the inclusive range.
pub fn parse_year_header(header: &str, min: i32, max: i32) -> Option<i32> {
    let h = header.trim();
    if h.is_empty() || !h.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    h.parse::<i32>().ok().filter(|y| (min..=max).contains(y))
}

/// Lowercase and strip the Spanish diacritics.
pub fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'Á' | 'À' | 'Ä' | 'Â' => 'a',
            'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' | 'Í' | 'Ì' | 'Ï' | 'Î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'Ó' | 'Ò' | 'Ö' | 'Ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' | 'Ú' | 'Ù' | 'Ü' | 'Û' => 'u',
            'ñ' | 'Ñ' => 'n',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Header key used for fuzzy column lookup: accents folded, only
/// alphanumerics kept.
pub fn normalize_key(s: &str) -> String {
    fold_accents(s)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Locale-aware ordering for place names: accent- and case-insensitive
/// first, then the raw string so the order stays total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    fold_accents(a)
        .cmp(&fold_accents(b))
        .then_with(|| a.cmp(b))
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
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - thousands separators (e.g., `1,234,567.89`).
    let n = if n.is_finite() { n } else { 0.0 };
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    // `-0.00` reads badly in a ficha
    let is_zero = s.chars().all(|c| c == '0' || c == '.');
    if n.is_sign_negative() && !is_zero {
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

/// Round to the nearest integer and group thousands, the way the KPI cards
/// show populations and densities.
pub fn format_rounded(n: f64) -> String {
    format_number(n.round(), 0)
}

/// Percentage with two decimals, from a fraction (0.0123 -> `1.23%`).
pub fn format_percent(fraction: f64) -> String {
    format!("{}%", format_number(fraction * 100.0, 2))
}

/// Keep `[A-Za-z0-9_-]`, replace everything else with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_never_fails() {
        assert_eq!(to_num(None), 0.0);
        assert_eq!(to_num(Some(&RawValue::Empty)), 0.0);
        assert_eq!(to_num(Some(&RawValue::Text("sin dato".into()))), 0.0);
        assert_eq!(to_num(Some(&RawValue::Text(" 12.5 ".into()))), 12.5);
        assert_eq!(to_num(Some(&RawValue::Number(f64::NAN))), 0.0);
        assert_eq!(to_num(Some(&RawValue::Bool(true))), 1.0);
        assert_eq!(to_num(Some(&RawValue::Text("inf".into()))), 0.0);
        assert_eq!(to_num(Some(&RawValue::Text("NaN".into()))), 0.0);
    }

    #[test]
    fn scientific_notation_text_is_a_number() {
        assert_eq!(to_num(Some(&RawValue::Text("1.2E-02".into()))), 0.012);
        assert_eq!(to_num(Some(&RawValue::Text("1e3".into()))), 1000.0);
        assert_eq!(parse_f64_safe(Some(" -3.5e1 ")), Some(-35.0));
    }

    #[test]
    fn year_headers_must_be_digits_in_range() {
        assert_eq!(parse_year_header("2025", 2025, 2035), Some(2025));
        assert_eq!(parse_year_header(" 2035 ", 2025, 2035), Some(2035));
        assert_eq!(parse_year_header("2024", 2025, 2035), None);
        assert_eq!(parse_year_header("2036", 2025, 2035), None);
        assert_eq!(parse_year_header("DP_2025", 2025, 2035), None);
        assert_eq!(parse_year_header("2025.0", 2025, 2035), None);
    }

    #[test]
    fn names_sort_ignoring_accents_and_case() {
        let mut v = vec!["Zipaquirá", "Ábrego", "cota", "Bogotá"];
        v.sort_by(|a, b| compare_names(a, b));
        assert_eq!(v, vec!["Ábrego", "Bogotá", "cota", "Zipaquirá"]);
    }

    #[test]
    fn number_formatting_matches_kpi_cards() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_rounded(1499.5), "1,500");
        assert_eq!(format_percent(0.01234), "1.23%");
        assert_eq!(format_percent(-0.005), "-0.50%");
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("La Vega_El Roble"), "La_Vega_El_Roble");
        assert_eq!(sanitize_filename("Guatavitá-2"), "Guatavit_-2");
    }
}
