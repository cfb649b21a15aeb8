//! Draft-07 `format` predicates and the static inclusion table between formats.
//!
//! `validate_format` answers `Some(true|false)` for known formats and `None`
//! for names it does not know: callers skip the constraint instead of failing.

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;
use url::Url;
use uuid::Uuid;

/// Known `sub ⊆ sup` relations between distinct formats.
const FORMAT_SUPERSETS: &[(&str, &str)] = &[
    ("email", "idn-email"),
    ("hostname", "idn-hostname"),
    ("uri", "iri"),
    ("uri-reference", "iri-reference"),
];

static DATE_TIME_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[Tt]\d{2}:\d{2}:\d{2}(\.\d+)?([Zz]|[+-]\d{2}:\d{2})$").ok()
});
static DATE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").ok());
static TIME_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(\.\d+)?([Zz]|[+-](\d{2}):(\d{2}))?$").ok()
});
static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .ok()
});
static IDN_EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+$").ok());

fn matches_static(re: &LazyLock<Option<Regex>>, s: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(s))
}

/// Validates `value` against the named format.
///
/// Non-string values always pass (formats only constrain strings); unknown
/// format names yield `None`.
#[must_use]
pub fn validate_format(value: &Value, format: &str) -> Option<bool> {
    let Some(s) = value.as_str() else {
        return Some(true);
    };
    let check: fn(&str) -> bool = match format {
        "date-time" => is_date_time,
        "date" => is_date,
        "time" => is_time,
        "email" => is_email,
        "idn-email" => is_idn_email,
        "hostname" => is_hostname,
        "idn-hostname" => is_idn_hostname,
        "ipv4" => is_ipv4,
        "ipv6" => is_ipv6,
        "uri" => is_uri,
        "uri-reference" => is_uri_reference,
        "iri" => is_iri,
        "iri-reference" => is_iri_reference,
        "uri-template" => is_uri_template,
        "uuid" => is_uuid,
        "json-pointer" => is_json_pointer,
        "relative-json-pointer" => is_relative_json_pointer,
        "regex" => is_regex,
        _ => return None,
    };
    Some(check(s))
}

/// `true` when [`validate_format`] has a predicate for `format`.
#[must_use]
pub fn is_known_format(format: &str) -> bool {
    validate_format(&Value::String(String::new()), format).is_some()
}

/// Is every string valid for `sub_format` also valid for `sup_format`?
///
/// Only identity and the fixed superset table answer `Some(true)`; every
/// other pair (including the reverse direction of the table) is `None`.
#[must_use]
pub fn is_format_subset(sub_format: &str, sup_format: &str) -> Option<bool> {
    if sub_format == sup_format
        || FORMAT_SUPERSETS
            .iter()
            .any(|(sub, sup)| *sub == sub_format && *sup == sup_format)
    {
        return Some(true);
    }
    None
}

fn is_date_time(s: &str) -> bool {
    matches_static(&DATE_TIME_RE, s) && DateTime::parse_from_rfc3339(s).is_ok()
}

fn is_date(s: &str) -> bool {
    if !matches_static(&DATE_RE, s) {
        return false;
    }
    // Round trip rejects dates chrono would otherwise normalize.
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .is_ok_and(|date| date.format("%Y-%m-%d").to_string() == s)
}

fn is_time(s: &str) -> bool {
    let Some(caps) = TIME_RE.as_ref().and_then(|re| re.captures(s)) else {
        return false;
    };
    let field = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };
    // Leap second allowed.
    field(1) < 24 && field(2) < 60 && field(3) <= 60 && field(6) < 24 && field(7) < 60
}

fn is_email(s: &str) -> bool {
    matches_static(&EMAIL_RE, s)
}

fn is_idn_email(s: &str) -> bool {
    matches_static(&IDN_EMAIL_RE, s)
}

fn hostname_with(s: &str, label_char: fn(char) -> bool) -> bool {
    if s.is_empty() || s.chars().count() > 253 {
        return false;
    }
    s.split('.').all(|label| {
        let len = label.chars().count();
        (1..=63).contains(&len)
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c == '-' || label_char(c))
    })
}

fn is_hostname(s: &str) -> bool {
    hostname_with(s, |c| c.is_ascii_alphanumeric())
}

fn is_idn_hostname(s: &str) -> bool {
    hostname_with(s, char::is_alphanumeric)
}

fn is_ipv4(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

fn is_ipv6(s: &str) -> bool {
    s.parse::<Ipv6Addr>().is_ok()
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36 && Uuid::try_parse(s).is_ok()
}

fn is_regex(s: &str) -> bool {
    Regex::new(s).is_ok()
}

fn has_whitespace(s: &str) -> bool {
    s.chars().any(char::is_whitespace)
}

fn parses_as_reference(s: &str) -> bool {
    Url::parse(s).is_ok()
        || Url::parse("http://reference.invalid/")
            .and_then(|base| base.join(s))
            .is_ok()
}

fn is_uri(s: &str) -> bool {
    s.is_ascii() && !has_whitespace(s) && Url::parse(s).is_ok()
}

fn is_uri_reference(s: &str) -> bool {
    s.is_ascii() && !has_whitespace(s) && parses_as_reference(s)
}

fn is_iri(s: &str) -> bool {
    !has_whitespace(s) && Url::parse(s).is_ok()
}

fn is_iri_reference(s: &str) -> bool {
    !has_whitespace(s) && parses_as_reference(s)
}

fn is_uri_template(s: &str) -> bool {
    let mut open = false;
    for c in s.chars() {
        match c {
            '{' if open => return false,
            '{' => open = true,
            '}' if !open => return false,
            '}' => open = false,
            _ => {}
        }
    }
    !open
}

fn is_json_pointer(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if !s.starts_with('/') {
        return false;
    }
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0' | '1')) {
            return false;
        }
    }
    true
}

fn is_relative_json_pointer(s: &str) -> bool {
    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || (digits > 1 && s.starts_with('0')) {
        return false;
    }
    let rest = &s[digits..];
    rest.is_empty() || rest == "#" || (rest.starts_with('/') && is_json_pointer(rest))
}
