//! SNMP value model.
//!
//! A [`Value`] is a tagged SNMP variable payload. Cloning is cheap
//! (`Bytes` payloads share their backing buffer) and deep in the sense that
//! matters here: values are immutable once stored, so a clone can never
//! observe later changes. Equality is tag plus payload.

use bytes::Bytes;

use crate::oid::Oid;

/// Syntax identity of a [`Value`], with the BER tag as discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Syntax {
    Integer = 0x02,
    BitString = 0x03,
    OctetString = 0x04,
    Null = 0x05,
    ObjectIdentifier = 0x06,
    IpAddress = 0x40,
    Counter32 = 0x41,
    Gauge32 = 0x42,
    TimeTicks = 0x43,
    Opaque = 0x44,
    Counter64 = 0x46,
    NoSuchObject = 0x80,
    NoSuchInstance = 0x81,
    EndOfMibView = 0x82,
}

impl Syntax {
    /// The raw BER tag for this syntax.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Syntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Integer => "INTEGER",
            Self::BitString => "BITS",
            Self::OctetString => "STRING",
            Self::Null => "NULL",
            Self::ObjectIdentifier => "OID",
            Self::IpAddress => "IpAddress",
            Self::Counter32 => "Counter32",
            Self::Gauge32 => "Gauge32",
            Self::TimeTicks => "Timeticks",
            Self::Opaque => "Opaque",
            Self::Counter64 => "Counter64",
            Self::NoSuchObject => "noSuchObject",
            Self::NoSuchInstance => "noSuchInstance",
            Self::EndOfMibView => "endOfMibView",
        };
        write!(f, "{}", name)
    }
}

/// A tagged SNMP value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Signed 32-bit integer (Integer32).
    Integer(i32),
    /// BITS pseudo-type, stored as its octet payload.
    BitString(Bytes),
    /// Octet string.
    OctetString(Bytes),
    /// ASN.1 NULL.
    Null,
    /// Object identifier.
    ObjectIdentifier(Oid),
    /// IPv4 address.
    IpAddress([u8; 4]),
    /// Monotonically wrapping 32-bit counter.
    Counter32(u32),
    /// Unsigned 32-bit gauge (also carries Unsigned32).
    Gauge32(u32),
    /// Time in centiseconds since an epoch.
    TimeTicks(u32),
    /// Opaque wrapped payload.
    Opaque(Bytes),
    /// Monotonically wrapping 64-bit counter.
    Counter64(u64),
    /// Exception: object type not implemented (v2c/v3 GET responses).
    NoSuchObject,
    /// Exception: instance does not exist (v2c/v3 GET responses).
    NoSuchInstance,
    /// Exception: walked past the last OID in view.
    EndOfMibView,
}

impl Value {
    /// The syntax tag of this value.
    pub fn syntax(&self) -> Syntax {
        match self {
            Self::Integer(_) => Syntax::Integer,
            Self::BitString(_) => Syntax::BitString,
            Self::OctetString(_) => Syntax::OctetString,
            Self::Null => Syntax::Null,
            Self::ObjectIdentifier(_) => Syntax::ObjectIdentifier,
            Self::IpAddress(_) => Syntax::IpAddress,
            Self::Counter32(_) => Syntax::Counter32,
            Self::Gauge32(_) => Syntax::Gauge32,
            Self::TimeTicks(_) => Syntax::TimeTicks,
            Self::Opaque(_) => Syntax::Opaque,
            Self::Counter64(_) => Syntax::Counter64,
            Self::NoSuchObject => Syntax::NoSuchObject,
            Self::NoSuchInstance => Syntax::NoSuchInstance,
            Self::EndOfMibView => Syntax::EndOfMibView,
        }
    }

    /// Whether this is one of the RFC 3416 exception values.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView
        )
    }

    /// Build an octet string value from UTF-8 text.
    pub fn text(s: impl Into<String>) -> Self {
        Self::OctetString(Bytes::from(s.into().into_bytes()))
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::BitString(bytes) | Self::Opaque(bytes) => write!(f, "{}", spaced_hex(bytes)),
            Self::OctetString(bytes) => {
                if is_printable(bytes) {
                    write!(f, "\"{}\"", String::from_utf8_lossy(bytes))
                } else {
                    write!(f, "{}", spaced_hex(bytes))
                }
            }
            Self::Null => write!(f, "NULL"),
            Self::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Self::IpAddress(octets) => write!(
                f,
                "{}.{}.{}.{}",
                octets[0], octets[1], octets[2], octets[3]
            ),
            Self::Counter32(v) | Self::Gauge32(v) => write!(f, "{}", v),
            Self::TimeTicks(v) => write!(f, "({})", v),
            Self::Counter64(v) => write!(f, "{}", v),
            Self::NoSuchObject => write!(f, "No Such Object available"),
            Self::NoSuchInstance => write!(f, "No Such Instance currently exists"),
            Self::EndOfMibView => write!(f, "No more variables left in this MIB View"),
        }
    }
}

/// Whether the bytes render as printable text.
pub(crate) fn is_printable(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return true;
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s
            .chars()
            .all(|c| c.is_ascii_graphic() || c == ' ' || c == '\t'),
        Err(_) => false,
    }
}

/// Format bytes as uppercase hex octets separated by spaces.
pub(crate) fn spaced_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
