//! Parsing of `Date:` header values.
//!
//! RFC 2822 is the expected shape (`Wed, 01 Jan 2020 10:00:00 +0000`), but
//! real mailboxes contain plenty of variants, so several fallbacks are tried
//! before giving up.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::error::DateError;

/// Layouts tried after the weekday has been stripped.
const FALLBACK_FORMATS: [&str; 8] = [
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S",
    "%b %d %H:%M:%S %Y",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// Longer names first so `CEST` is not read as `EST`.
const NAMED_ZONES: [(&str, &str); 13] = [
    ("CEST", "+0200"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
    ("GMT", "+0000"),
    ("UTC", "+0000"),
    ("CET", "+0100"),
    ("JST", "+0900"),
];

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parse a raw `Date:` header value into UTC.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, DateError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DateError::Missing);
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Drop trailing comments such as "(UTC)" and the weekday.
    let core = strip_comment(trimmed);
    let core = strip_weekday(core);
    let imap = imap_to_rfc(core);
    let zoned = replace_named_zone(core);
    let zoned_imap = replace_named_zone(&imap);

    for candidate in [core, imap.as_str(), zoned.as_str(), zoned_imap.as_str()] {
        if let Some(dt) = try_formats(candidate) {
            return Ok(dt);
        }
    }

    mail_parser_date(trimmed).ok_or_else(|| DateError::Unrecognized(trimmed.to_string()))
}

fn try_formats(candidate: &str) -> Option<DateTime<Utc>> {
    for fmt in FALLBACK_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(ndt) = NaiveDateTime::parse_from_str(candidate, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    None
}

/// Last resort: let `mail-parser` read a one-header message.
fn mail_parser_date(input: &str) -> Option<DateTime<Utc>> {
    let fake = format!("Date: {input}\n\n");
    let parsed = mail_parser::MessageParser::default().parse(fake.as_bytes())?;
    let rfc3339 = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&rfc3339)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn strip_comment(s: &str) -> &str {
    match s.find('(') {
        Some(pos) if s.trim_end().ends_with(')') => s[..pos].trim_end(),
        _ => s,
    }
}

/// `"Thu, 04 Jan 2024 ..."` → `"04 Jan 2024 ..."`.
fn strip_weekday(s: &str) -> &str {
    for day in WEEKDAYS {
        if let Some(rest) = s.strip_prefix(day) {
            if let Some(rest) = rest.strip_prefix(',').or_else(|| rest.strip_prefix(' ')) {
                return rest.trim_start();
            }
        }
    }
    s
}

/// IMAP `INTERNALDATE` style: `"16-JUL-2025 03:01:03"` → `"16 Jul 2025 03:01:03"`.
fn imap_to_rfc(s: &str) -> String {
    for month in MONTHS {
        for variant in [month.to_uppercase(), month.to_lowercase(), month.to_string()] {
            let pattern = format!("-{variant}-");
            if s.contains(&pattern) {
                return s.replacen(&pattern, &format!(" {month} "), 1);
            }
        }
    }
    s.to_string()
}

fn replace_named_zone(s: &str) -> String {
    for (name, offset) in NAMED_ZONES {
        if let Some(head) = s.strip_suffix(name) {
            return format!("{head}{offset}");
        }
    }
    s.to_string()
}
