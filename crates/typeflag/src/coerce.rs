//! String to typed value conversion, one rule per [`FlagType`].
//!
//! Coercion is pure except for [`FlagType::FilePath`] and
//! [`FlagType::DirPath`], which resolve the path against the working
//! directory and `stat` it.

use std::fs;
use std::net::IpAddr;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use url::Url;
use uuid::Uuid;

use crate::error::CoerceError;
use crate::value::{FlagType, MacAddr, Value};

/// Layout accepted by [`FlagType::Timestamp`] flags, e.g. `2022-01-01T00:00 UTC`.
pub const TIMESTAMP_LAYOUT: &str = "YYYY-MM-DDTHH:MM ZONE";

/// How an explicitly supplied empty value is read for a bool flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyBool {
    /// `--verbose=` means `true`.
    #[default]
    True,
    /// `--verbose=` is an invalid bool.
    Reject,
}

/// Convert `raw` into a value of the given kind using the default options.
pub fn coerce(kind: FlagType, raw: &str) -> Result<Value, CoerceError> {
    coerce_with(kind, raw, EmptyBool::default())
}

pub fn coerce_with(kind: FlagType, raw: &str, empty_bool: EmptyBool) -> Result<Value, CoerceError> {
    let fail = |detail: String| CoerceError {
        kind,
        raw: raw.to_string(),
        detail,
    };

    match kind {
        FlagType::String => Ok(Value::String(raw.to_string())),
        FlagType::Int => raw
            .parse::<i32>()
            .map(Value::Int)
            .map_err(|e| fail(e.to_string())),
        FlagType::Int64 => raw
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| fail(e.to_string())),
        FlagType::Float32 => parse_float::<f32>(raw).map(Value::Float32).map_err(fail),
        FlagType::Float64 => parse_float::<f64>(raw).map(Value::Float64).map_err(fail),
        FlagType::Bool => parse_bool(raw, empty_bool).map(Value::Bool).map_err(fail),
        FlagType::Rune => parse_rune(raw).map(Value::Rune).map_err(fail),
        FlagType::Duration => parse_duration(raw).map(Value::Duration).map_err(fail),
        FlagType::StringList => Ok(Value::StringList(split_list(raw).map(str::to_string).collect())),
        FlagType::IntList => split_list(raw)
            .enumerate()
            .map(|(i, item)| {
                item.parse::<i32>()
                    .map_err(|e| format!("element {i} ({item:?}): {e}"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::IntList)
            .map_err(fail),
        FlagType::Timestamp => parse_timestamp(raw).map(Value::Timestamp).map_err(fail),
        FlagType::IpAddress => raw
            .parse::<IpAddr>()
            .map(Value::IpAddress)
            .map_err(|_| fail(format!("{raw} is not a valid IP address"))),
        FlagType::MacAddress => raw.parse::<MacAddr>().map(Value::MacAddress).map_err(fail),
        FlagType::Url => parse_url(raw).map(Value::Url).map_err(fail),
        FlagType::Uuid => parse_uuid(raw).map(Value::Uuid).map_err(fail),
        FlagType::HostPortPair => check_host_port(raw)
            .map(|()| Value::String(raw.to_string()))
            .map_err(fail),
        FlagType::Email => parse_email(raw).map(Value::String).map_err(fail),
        FlagType::FilePath => resolve_path(raw, false).map(Value::Path).map_err(fail),
        FlagType::DirPath => resolve_path(raw, true).map(Value::Path).map_err(fail),
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim)
}

trait Float: std::str::FromStr<Err = std::num::ParseFloatError> {
    fn is_infinite(&self) -> bool;
}

impl Float for f32 {
    fn is_infinite(&self) -> bool {
        f32::is_infinite(*self)
    }
}

impl Float for f64 {
    fn is_infinite(&self) -> bool {
        f64::is_infinite(*self)
    }
}

fn parse_float<F: Float>(raw: &str) -> Result<F, String> {
    let value = raw.parse::<F>().map_err(|e| e.to_string())?;
    let spelled = raw.trim_start_matches(['+', '-']).to_ascii_lowercase();
    if value.is_infinite() && spelled != "inf" && spelled != "infinity" {
        return Err("value out of range".to_string());
    }
    Ok(value)
}

fn parse_bool(raw: &str, empty: EmptyBool) -> Result<bool, String> {
    if raw.is_empty() {
        return match empty {
            EmptyBool::True => Ok(true),
            EmptyBool::Reject => Err("empty value is not a bool".to_string()),
        };
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err("expected one of true, false, t, f, 1, 0".to_string()),
    }
}

fn parse_rune(raw: &str) -> Result<char, String> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err("expected exactly one character".to_string()),
    }
}

/// Parse a sequence of `<number><unit>` pairs such as `1h30m` or `1.5s`.
fn parse_duration(raw: &str) -> Result<Duration, String> {
    const UNITS: [(&str, u128); 8] = [
        ("ns", 1),
        ("us", 1_000),
        ("µs", 1_000),
        ("μs", 1_000),
        ("ms", 1_000_000),
        ("s", 1_000_000_000),
        ("m", 60_000_000_000),
        ("h", 3_600_000_000_000),
    ];

    let mut rest = match raw.strip_prefix('+') {
        Some(r) => r,
        None if raw.starts_with('-') => return Err("negative durations are not supported".into()),
        None => raw,
    };
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err("empty duration".into());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (whole, after) = rest.split_at(int_len);
        let (frac, after) = match after.strip_prefix('.') {
            Some(tail) => tail.split_at(tail.bytes().take_while(u8::is_ascii_digit).count()),
            None => ("", after),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(format!("expected a number at {rest:?}"));
        }

        let unit_len = after
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);
        let scale = match UNITS.iter().find(|(name, _)| *name == unit) {
            Some((_, scale)) => *scale,
            None if unit.is_empty() => return Err(format!("missing unit in {raw:?}")),
            None => return Err(format!("unknown unit {unit:?}")),
        };

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| "duration out of range".to_string())?
        };
        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| "duration out of range".to_string())?;
        if !frac.is_empty() {
            // Beyond 18 digits the fraction is below nanosecond precision.
            let digits = &frac[..frac.len().min(18)];
            let numer: u128 = digits.parse().map_err(|_| "invalid fraction".to_string())?;
            nanos += numer * scale / 10u128.pow(digits.len() as u32);
        }
        total = total
            .checked_add(nanos)
            .filter(|t| *t <= u128::from(u64::MAX))
            .ok_or_else(|| "duration out of range".to_string())?;
        rest = after;
    }

    Ok(Duration::from_nanos(total as u64))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    let hint = || format!("expected layout {TIMESTAMP_LAYOUT}");
    let (stamp, zone) = raw.split_once(' ').ok_or_else(hint)?;
    if !is_padded_stamp(stamp) {
        return Err(hint());
    }
    let naive = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M")
        .map_err(|e| format!("{e}; {}", hint()))?;
    let offset = zone_offset(zone).ok_or_else(|| format!("unknown time zone {zone:?}; {}", hint()))?;
    naive
        .and_local_timezone(offset)
        .single()
        .ok_or_else(hint)
}

/// `YYYY-MM-DDTHH:MM` with every field zero padded.
fn is_padded_stamp(stamp: &str) -> bool {
    const SHAPE: &[u8; 16] = b"0000-00-00T00:00";
    stamp.len() == SHAPE.len()
        && stamp.bytes().zip(SHAPE).all(|(b, &want)| match want {
            b'0' => b.is_ascii_digit(),
            _ => b == want,
        })
}

/// Offset for a zone abbreviation: three uppercase letters, or four or five
/// ending in `T`. Well-formed but unknown abbreviations are taken as UTC.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    let well_formed = zone.bytes().all(|b| b.is_ascii_uppercase())
        && match zone.len() {
            3 => true,
            4 | 5 => zone.ends_with('T'),
            _ => false,
        };
    if !well_formed {
        return None;
    }
    let minutes = match zone {
        "EDT" => -4 * 60,
        "EST" | "CDT" => -5 * 60,
        "CST" | "MDT" => -6 * 60,
        "MST" | "PDT" => -7 * 60,
        "PST" => -8 * 60,
        "WAT" | "CET" | "BST" => 60,
        "EET" | "CEST" | "CAT" => 2 * 60,
        "EAT" | "EEST" | "MSK" => 3 * 60,
        "IST" => 5 * 60 + 30,
        "JST" | "KST" => 9 * 60,
        "AEST" => 10 * 60,
        _ => 0,
    };
    FixedOffset::east_opt(minutes * 60)
}

fn parse_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err("URL has no host".to_string()),
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, String> {
    if raw.len() != 36 {
        return Err(format!(
            "expected the 36 character hyphenated form, got {} characters",
            raw.len()
        ));
    }
    Uuid::parse_str(raw).map_err(|e| e.to_string())
}

/// The host part is not checked, so bracketed IPv6 hosts are not supported.
fn check_host_port(raw: &str) -> Result<(), String> {
    let (_host, port) = raw
        .split_once(':')
        .ok_or_else(|| "invalid host:port pair".to_string())?;
    let port: i64 = port
        .parse()
        .map_err(|_| format!("{port} is not a valid port"))?;
    if !(0..=i64::from(u16::MAX)).contains(&port) {
        return Err(format!("port {port} is out of range"));
    }
    Ok(())
}

/// Parse a single mailbox (`addr@host` or `Name <addr@host>`) and return
/// the bare address.
fn parse_email(raw: &str) -> Result<String, String> {
    let input = raw.trim();
    let address = match input.strip_suffix('>') {
        Some(head) => {
            let (name, address) = head
                .rsplit_once('<')
                .ok_or_else(|| "unbalanced '>' in address".to_string())?;
            if !is_display_name(name.trim()) {
                return Err(format!("invalid display name {:?}", name.trim()));
            }
            address
        }
        None => input,
    };

    let (local, domain) = address
        .rsplit_once('@')
        .ok_or_else(|| "missing @ in address".to_string())?;
    let local_ok = is_quoted(local) || is_dot_atom(local);
    let domain_ok =
        (domain.starts_with('[') && domain.ends_with(']') && domain.len() > 2) || is_dot_atom(domain);
    if !local_ok {
        return Err(format!("invalid local part {local:?}"));
    }
    if !domain_ok {
        return Err(format!("invalid domain {domain:?}"));
    }
    Ok(address.to_string())
}

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c) || !c.is_ascii()
}

fn is_dot_atom(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(|atom| !atom.is_empty() && atom.chars().all(is_atext))
}

fn is_quoted(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"') && !s[1..s.len() - 1].contains('"')
}

fn is_display_name(s: &str) -> bool {
    s.is_empty() || is_quoted(s) || s.chars().all(|c| is_atext(c) || c == ' ' || c == '.')
}

fn resolve_path(raw: &str, want_dir: bool) -> Result<PathBuf, String> {
    let path = std::path::absolute(raw)
        .map(|p| clean(&p))
        .map_err(|e| format!("unable to find absolute path to {raw}: {e}"))?;
    let meta = fs::metadata(&path).map_err(|e| format!("can not stat {}: {e}", path.display()))?;
    match (want_dir, meta.is_dir()) {
        (false, true) => Err(format!("{raw} is not a regular file")),
        (true, false) => Err(format!("{raw} is not a directory")),
        _ => Ok(path),
    }
}

/// Lexically drop `.` and resolve `..` components.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
