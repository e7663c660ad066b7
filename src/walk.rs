//! Walk dump parser and writer.
//!
//! A walk is a line-oriented text dump of an SNMP agent, one record per
//! OID: `<oid> = <TYPE>: <value>`. Hex payloads may continue over
//! indented lines until the next OID record. The parser is deliberately
//! permissive: operators' dumps are irregular, so a record that cannot be
//! parsed is logged and skipped rather than failing the whole file, and
//! duplicate OIDs keep the last occurrence.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use bytes::Bytes;
use tracing::warn;

use crate::error::{Error, Result, WalkErrorKind};
use crate::oid::Oid;
use crate::value::{Value, is_printable, spaced_hex};

/// Ordered OID-to-value map produced by parsing a walk.
pub type WalkBindings = BTreeMap<Oid, Value>;

/// Read and parse a walk file.
///
/// A missing or unreadable file is an error (the agent backed by this walk
/// cannot start); individual malformed records are logged and skipped.
pub fn read_walk(path: &Path) -> Result<WalkBindings> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
    Ok(parse_walk(&text))
}

/// Parse walk text into an ordered map of bindings.
pub fn parse_walk(text: &str) -> WalkBindings {
    let mut bindings = WalkBindings::new();

    let mut record: Option<(usize, String)> = None;
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if is_record_start(line) {
            if let Some((start, body)) = record.take() {
                parse_record(&body, start, &mut bindings);
            }
            record = Some((idx + 1, line.to_string()));
        } else if let Some((_, body)) = record.as_mut() {
            // Continuation of a multi-line hex payload.
            body.push(' ');
            body.push_str(line.trim());
        } else {
            warn!(line = idx + 1, "walk continuation line before any record");
        }
    }
    if let Some((start, body)) = record.take() {
        parse_record(&body, start, &mut bindings);
    }

    bindings
}

/// Render bindings in the canonical record form accepted by [`parse_walk`].
pub fn write_walk(bindings: &WalkBindings) -> String {
    let mut out = String::new();
    for (oid, value) in bindings {
        let _ = writeln!(out, "{}", format_record(oid, value));
    }
    out
}

/// A record starts with a dotted OID; continuation lines do not.
fn is_record_start(line: &str) -> bool {
    let first = match line.chars().next() {
        Some(c) => c,
        None => return false,
    };
    (first == '.' || first.is_ascii_digit()) && line.contains(" = ")
}

fn parse_record(body: &str, line: usize, bindings: &mut WalkBindings) {
    match parse_line(body, line) {
        Ok(Some((oid, value))) => {
            // Later occurrences of the same OID win.
            bindings.insert(oid, value);
        }
        Ok(None) => {}
        Err(err) => warn!(%err, "skipping walk record"),
    }
}

/// Parse one (already joined) record. `Ok(None)` means the record carried an
/// unknown type token and was deliberately dropped.
fn parse_line(body: &str, line: usize) -> Result<Option<(Oid, Value)>> {
    let (oid_part, rest) = body.split_once(" = ").ok_or(Error::WalkParse {
        line,
        kind: WalkErrorKind::MissingSeparator,
    })?;

    let oid: Oid = oid_part.trim().parse().map_err(|_| Error::WalkParse {
        line,
        kind: WalkErrorKind::InvalidOid,
    })?;

    let rest = rest.trim();

    // `<oid> = ""` renders an empty octet string without a type token.
    if rest == "\"\"" {
        return Ok(Some((oid, Value::OctetString(Bytes::new()))));
    }

    let (type_token, payload) = match rest.split_once(':') {
        Some((token, payload)) => (token.trim(), payload.trim()),
        None => {
            if rest == "NULL" {
                return Ok(Some((oid, Value::Null)));
            }
            return Err(Error::WalkParse {
                line,
                kind: WalkErrorKind::MissingValue,
            });
        }
    };

    let invalid = || Error::WalkParse {
        line,
        kind: WalkErrorKind::InvalidValue {
            type_token: type_token.to_string(),
        },
    };

    let value = match type_token {
        "INTEGER" => Value::Integer(parse_enumerated(payload).ok_or_else(invalid)?),
        "Gauge32" | "Unsigned32" => Value::Gauge32(payload.parse().map_err(|_| invalid())?),
        "Counter32" => Value::Counter32(payload.parse().map_err(|_| invalid())?),
        "Counter64" => Value::Counter64(payload.parse().map_err(|_| invalid())?),
        "Timeticks" => Value::TimeTicks(parse_timeticks(payload).ok_or_else(invalid)?),
        "STRING" => Value::OctetString(parse_string(payload)),
        "OID" => Value::ObjectIdentifier(payload.parse().map_err(|_| invalid())?),
        "IpAddress" => Value::IpAddress(parse_ip(payload).ok_or_else(invalid)?),
        "Network Address" => Value::IpAddress(parse_network_address(payload).ok_or_else(invalid)?),
        "Hex-STRING" => Value::OctetString(parse_hex(payload, false).ok_or_else(invalid)?),
        "BITS" => Value::BitString(parse_hex(payload, true).ok_or_else(invalid)?),
        "Opaque" => Value::Opaque(parse_hex(payload, false).ok_or_else(invalid)?),
        "NULL" => Value::Null,
        other => {
            warn!(line, type_token = other, "unknown walk value type");
            return Ok(None);
        }
    };

    Ok(Some((oid, value)))
}

/// INTEGER payloads are either bare numbers or labeled enumerations such as
/// `up(1)`.
fn parse_enumerated(payload: &str) -> Option<i32> {
    if let Some(open) = payload.find('(') {
        let close = payload.rfind(')')?;
        return payload.get(open + 1..close)?.trim().parse().ok();
    }
    payload.parse().ok()
}

/// Timeticks payloads are `(<ticks>) <humanized duration>` or bare ticks.
fn parse_timeticks(payload: &str) -> Option<u32> {
    if let Some(stripped) = payload.strip_prefix('(') {
        let close = stripped.find(')')?;
        return stripped[..close].trim().parse().ok();
    }
    payload.parse().ok()
}

fn parse_string(payload: &str) -> Bytes {
    let inner = payload
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(payload);
    Bytes::from(inner.as_bytes().to_vec())
}

fn parse_ip(payload: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = payload.split('.');
    for slot in &mut octets {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(octets)
}

/// `Network Address` renders as colon-separated hex octets (`C0:A8:01:01`).
fn parse_network_address(payload: &str) -> Option<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = payload.split(':');
    for slot in &mut octets {
        *slot = u8::from_str_radix(parts.next()?.trim(), 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(octets)
}

/// Parse whitespace-separated hex octets. BITS payloads may carry trailing
/// bit-name annotations (`80 40 linkUp(1)`), which `lenient` stops at.
fn parse_hex(payload: &str, lenient: bool) -> Option<Bytes> {
    let mut bytes = Vec::new();
    for token in payload.split_whitespace() {
        match (token.len() == 2).then(|| u8::from_str_radix(token, 16).ok()) {
            Some(Some(byte)) => bytes.push(byte),
            _ if lenient => break,
            _ => return None,
        }
    }
    Some(Bytes::from(bytes))
}

/// Canonical single-record rendering, inverse of [`parse_line`].
fn format_record(oid: &Oid, value: &Value) -> String {
    match value {
        Value::Integer(v) => format!("{} = INTEGER: {}", oid, v),
        Value::Gauge32(v) => format!("{} = Gauge32: {}", oid, v),
        Value::Counter32(v) => format!("{} = Counter32: {}", oid, v),
        Value::Counter64(v) => format!("{} = Counter64: {}", oid, v),
        Value::TimeTicks(v) => format!("{} = Timeticks: ({})", oid, v),
        Value::OctetString(bytes) if bytes.is_empty() => format!("{} = \"\"", oid),
        Value::OctetString(bytes) if is_printable(bytes) => {
            format!("{} = STRING: \"{}\"", oid, String::from_utf8_lossy(bytes))
        }
        Value::OctetString(bytes) => format!("{} = Hex-STRING: {}", oid, spaced_hex(bytes)),
        Value::ObjectIdentifier(target) => format!("{} = OID: .{}", oid, target),
        Value::IpAddress(o) => format!("{} = IpAddress: {}.{}.{}.{}", oid, o[0], o[1], o[2], o[3]),
        Value::BitString(bytes) => format!("{} = BITS: {}", oid, spaced_hex(bytes)),
        Value::Opaque(bytes) => format!("{} = Opaque: {}", oid, spaced_hex(bytes)),
        Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
            format!("{} = NULL", oid)
        }
    }
}
