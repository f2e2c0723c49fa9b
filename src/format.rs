//! Display helpers shared by the CLI tables and the PDF report.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

pub const NOT_INFORMED: &str = "Não informado";

/// 11 digits → CPF mask, 14 digits → CNPJ mask, anything else untouched
pub fn cpf_cnpj(raw: &str) -> String {
    let d: Vec<char> = raw.chars().collect();
    let all_digits = d.iter().all(|c| c.is_ascii_digit());
    let s = |range: std::ops::Range<usize>| d[range].iter().collect::<String>();
    match d.len() {
        11 if all_digits => format!("{}.{}.{}-{}", s(0..3), s(3..6), s(6..9), s(9..11)),
        14 if all_digits => format!("{}.{}.{}/{}-{}", s(0..2), s(2..5), s(5..8), s(8..12), s(12..14)),
        _ => raw.to_string(),
    }
}

/// Progressive CPF mask for user input: keeps at most 11 digits and only
/// places separators that already have digits after them.
pub fn mask_cpf_input(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(|c| c.is_ascii_digit()).take(11).collect();
    let mut out = String::with_capacity(14);
    for (i, c) in digits.iter().enumerate() {
        match i {
            3 | 6 => out.push('.'),
            9 => out.push('-'),
            _ => {}
        }
        out.push(*c);
    }
    out
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `dd/mm/yyyy` (UTC); unparseable input is echoed back
pub fn date_br(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(dt) => dt.format("%d/%m/%Y").to_string(),
        None => raw.to_string(),
    }
}

/// `dd/mm/yyyy HH:MM` (UTC); empty input reads as "not informed"
pub fn datetime_br(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => "Data não informada".to_string(),
        Some(r) => match parse_timestamp(r) {
            Some(dt) => dt.format("%d/%m/%Y %H:%M").to_string(),
            None => r.to_string(),
        },
    }
}

/// Text for loosely-typed API fields (numbers, strings, null)
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NOT_INFORMED.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => NOT_INFORMED.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn text_or_default(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_INFORMED)
        .to_string()
}
