// ABOUTME: Parser for PDF date strings (D:YYYYMMDDHHmmss+HH'mm') and ISO-like fallbacks.
// ABOUTME: Produces UTC RFC 3339 with millisecond precision; unparsable input yields None.

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;

static PDF_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})(\d{2})?(\d{2})?(\d{2})?(\d{2})?(\d{2})?([Zz]|[+-]\d{2}(?:\d{2})?)?")
        .unwrap()
});

static ISO_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}").unwrap());

fn to_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_offset(raw: Option<&str>) -> Option<FixedOffset> {
    let Some(raw) = raw else {
        return FixedOffset::east_opt(0);
    };
    if raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    let sign = if raw.starts_with('-') { -1 } else { 1 };
    let digits = &raw[1..];
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = match digits.get(2..4) {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_loose(value: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(to_iso(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(to_iso(dt.with_timezone(&Utc)));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(to_iso(Utc.from_utc_datetime(&naive)));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| to_iso(Utc.from_utc_datetime(&naive)))
}

/// Parses a PDF info date into `YYYY-MM-DDTHH:MM:SS.sssZ`.
///
/// Missing components default to the start of the period (`D:2023` is
/// January 1st, midnight UTC). Strings that already look like ISO dates are
/// parsed as such.
pub fn parse_pdf_date(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let without_prefix = trimmed.strip_prefix("D:").unwrap_or(trimmed);
    let cleaned = without_prefix.replace('\'', "");

    if ISO_LIKE.is_match(&cleaned) {
        return parse_loose(trimmed);
    }

    let Some(caps) = PDF_DATE.captures(&cleaned) else {
        return parse_loose(trimmed);
    };

    let num = |idx: usize, default: u32| -> Option<u32> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(2, 1)?, num(3, 1)?)?;
    let naive = date.and_hms_opt(num(4, 0)?, num(5, 0)?, num(6, 0)?)?;
    let offset = parse_offset(caps.get(7).map(|m| m.as_str()))?;
    let local = offset.from_local_datetime(&naive).single()?;
    Some(to_iso(local.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_utc_pdf_date() {
        assert_eq!(
            parse_pdf_date("D:20230615120000Z").as_deref(),
            Some("2023-06-15T12:00:00.000Z")
        );
    }

    #[test]
    fn applies_offsets() {
        assert_eq!(
            parse_pdf_date("D:20230615120000+02'00'").as_deref(),
            Some("2023-06-15T10:00:00.000Z")
        );
        assert_eq!(
            parse_pdf_date("D:20230615120000-05").as_deref(),
            Some("2023-06-15T17:00:00.000Z")
        );
    }

    #[test]
    fn fills_missing_components() {
        assert_eq!(parse_pdf_date("D:2023").as_deref(), Some("2023-01-01T00:00:00.000Z"));
        assert_eq!(parse_pdf_date("202306").as_deref(), Some("2023-06-01T00:00:00.000Z"));
    }

    #[test]
    fn accepts_iso_strings() {
        assert_eq!(
            parse_pdf_date("2024-03-05T08:09:10+01:00").as_deref(),
            Some("2024-03-05T07:09:10.000Z")
        );
        assert_eq!(parse_pdf_date("2024-03-05").as_deref(), Some("2024-03-05T00:00:00.000Z"));
    }

    #[test]
    fn unparsable_input_is_none() {
        assert_eq!(parse_pdf_date(""), None);
        assert_eq!(parse_pdf_date("   "), None);
        assert_eq!(parse_pdf_date("yesterday-ish"), None);
        assert_eq!(parse_pdf_date("D:20231345000000Z"), None);
    }
}
