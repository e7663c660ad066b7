//! SNMP v1/v2c message and PDU codec.

use bytes::Bytes;

use crate::engine::ber::{Decoder, EncodeBuf, TAG_SEQUENCE, decode_unsigned};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::value::Value;
use crate::varbind::VarBind;

/// SNMP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V1,
    V2c,
}

impl Version {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::V1 => 0,
            Self::V2c => 1,
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::V1),
            1 => Some(Self::V2c),
            _ => None,
        }
    }
}

/// PDU type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduType {
    GetRequest,
    GetNextRequest,
    Response,
    SetRequest,
    GetBulkRequest,
    InformRequest,
    Trap,
    Report,
}

impl PduType {
    pub fn tag(self) -> u8 {
        match self {
            Self::GetRequest => 0xA0,
            Self::GetNextRequest => 0xA1,
            Self::Response => 0xA2,
            Self::SetRequest => 0xA3,
            Self::GetBulkRequest => 0xA5,
            Self::InformRequest => 0xA6,
            Self::Trap => 0xA7,
            Self::Report => 0xA8,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0xA0 => Some(Self::GetRequest),
            0xA1 => Some(Self::GetNextRequest),
            0xA2 => Some(Self::Response),
            0xA3 => Some(Self::SetRequest),
            0xA5 => Some(Self::GetBulkRequest),
            0xA6 => Some(Self::InformRequest),
            0xA7 => Some(Self::Trap),
            0xA8 => Some(Self::Report),
            _ => None,
        }
    }
}

/// An SNMP PDU.
///
/// For GETBULK requests the two error fields carry non-repeaters and
/// max-repetitions instead; use the accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub pdu_type: PduType,
    pub request_id: i32,
    pub error_status: i32,
    pub error_index: i32,
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    /// Build a response echoing a request's ID.
    pub fn response(request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    /// Build an error response with the 1-based index of the failing
    /// varbind.
    pub fn error_response(
        request_id: i32,
        error_status: i32,
        error_index: i32,
        varbinds: Vec<VarBind>,
    ) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id,
            error_status,
            error_index,
            varbinds,
        }
    }

    /// GETBULK: number of leading varbinds that get a single GETNEXT.
    pub fn non_repeaters(&self) -> i32 {
        self.error_status.max(0)
    }

    /// GETBULK: repetition count for the remaining varbinds.
    pub fn max_repetitions(&self) -> i32 {
        self.error_index.max(0)
    }
}

/// A community-addressed SNMP message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub version: Version,
    pub community: Bytes,
    pub pdu: Pdu,
}

impl Message {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = EncodeBuf::new();
        buf.push_constructed(TAG_SEQUENCE, |msg| {
            msg.push_i32(0x02, self.version.as_i32());
            msg.push_octets(0x04, &self.community);
            msg.push_constructed(self.pdu.pdu_type.tag(), |pdu| {
                pdu.push_i32(0x02, self.pdu.request_id);
                pdu.push_i32(0x02, self.pdu.error_status);
                pdu.push_i32(0x02, self.pdu.error_index);
                pdu.push_constructed(TAG_SEQUENCE, |list| {
                    for vb in &self.pdu.varbinds {
                        list.push_constructed(TAG_SEQUENCE, |entry| {
                            entry.push_oid(&vb.oid);
                            encode_value(entry, &vb.value);
                        });
                    }
                });
            });
        });
        buf.into_bytes()
    }

    /// Decode from wire bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut msg = decoder.read_constructed(TAG_SEQUENCE)?;

        let raw_version = msg.read_i32()?;
        let version = Version::from_i32(raw_version)
            .ok_or_else(|| Error::decode(0, DecodeErrorKind::UnknownVersion(raw_version)))?;
        let community = Bytes::copy_from_slice(msg.read_octets(0x04)?);

        if msg.is_empty() {
            return Err(Error::decode(data.len(), DecodeErrorKind::MissingPdu));
        }
        let pdu_tag = msg.peek_tag()?;
        let pdu_type = PduType::from_tag(pdu_tag)
            .ok_or_else(|| Error::decode(0, DecodeErrorKind::UnknownPduType(pdu_tag)))?;
        let mut pdu = msg.read_constructed(pdu_tag)?;

        let request_id = pdu.read_i32()?;
        let error_status = pdu.read_i32()?;
        let error_index = pdu.read_i32()?;

        let mut list = pdu.read_constructed(TAG_SEQUENCE)?;
        let mut varbinds = Vec::new();
        while !list.is_empty() {
            let mut entry = list.read_constructed(TAG_SEQUENCE)?;
            let oid = entry.read_oid()?;
            let value = decode_value(&mut entry)?;
            varbinds.push(VarBind::new(oid, value));
        }

        Ok(Self {
            version,
            community,
            pdu: Pdu {
                pdu_type,
                request_id,
                error_status,
                error_index,
                varbinds,
            },
        })
    }
}

/// Encode one value with its syntax tag.
pub fn encode_value(buf: &mut EncodeBuf, value: &Value) {
    match value {
        Value::Integer(v) => buf.push_i32(0x02, *v),
        Value::BitString(bytes) => buf.push_octets(0x03, bytes),
        Value::OctetString(bytes) => buf.push_octets(0x04, bytes),
        Value::Null => buf.push_null(0x05),
        Value::ObjectIdentifier(oid) => buf.push_oid(oid),
        Value::IpAddress(octets) => buf.push_octets(0x40, octets),
        Value::Counter32(v) => buf.push_u32(0x41, *v),
        Value::Gauge32(v) => buf.push_u32(0x42, *v),
        Value::TimeTicks(v) => buf.push_u32(0x43, *v),
        Value::Opaque(bytes) => buf.push_octets(0x44, bytes),
        Value::Counter64(v) => buf.push_u64(0x46, *v),
        Value::NoSuchObject => buf.push_null(0x80),
        Value::NoSuchInstance => buf.push_null(0x81),
        Value::EndOfMibView => buf.push_null(0x82),
    }
}

/// Decode one tagged value.
pub fn decode_value(decoder: &mut Decoder<'_>) -> Result<Value> {
    let offset = decoder.offset();
    let (tag, content) = decoder.read_tlv()?;
    let value = match tag {
        0x02 => Value::Integer(decode_signed_i32(content, offset)?),
        0x03 => Value::BitString(Bytes::copy_from_slice(content)),
        0x04 => Value::OctetString(Bytes::copy_from_slice(content)),
        0x05 => {
            if !content.is_empty() {
                return Err(Error::decode(offset, DecodeErrorKind::InvalidNull));
            }
            Value::Null
        }
        0x06 => Value::ObjectIdentifier(crate::engine::ber::decode_oid(content, offset)?),
        0x40 => {
            let octets: [u8; 4] = content.try_into().map_err(|_| {
                Error::decode(
                    offset,
                    DecodeErrorKind::InvalidIpAddressLength {
                        length: content.len(),
                    },
                )
            })?;
            Value::IpAddress(octets)
        }
        0x41 => Value::Counter32(decode_unsigned_u32(content, offset)?),
        0x42 => Value::Gauge32(decode_unsigned_u32(content, offset)?),
        0x43 => Value::TimeTicks(decode_unsigned_u32(content, offset)?),
        0x44 => Value::Opaque(Bytes::copy_from_slice(content)),
        0x46 => Value::Counter64(decode_unsigned(content, offset)?),
        0x80 => Value::NoSuchObject,
        0x81 => Value::NoSuchInstance,
        0x82 => Value::EndOfMibView,
        other => {
            return Err(Error::decode(
                offset,
                DecodeErrorKind::UnknownValueTag(other),
            ));
        }
    };
    Ok(value)
}

fn decode_signed_i32(content: &[u8], offset: usize) -> Result<i32> {
    crate::engine::ber::decode_signed(content, offset)?
        .try_into()
        .map_err(|_| Error::decode(offset, DecodeErrorKind::IntegerOverflow))
}

fn decode_unsigned_u32(content: &[u8], offset: usize) -> Result<u32> {
    decode_unsigned(content, offset)?
        .try_into()
        .map_err(|_| Error::decode(offset, DecodeErrorKind::IntegerOverflow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn roundtrip(message: &Message) -> Message {
        Message::decode(&message.encode()).unwrap()
    }

    #[test]
    fn test_get_request_roundtrip() {
        let message = Message {
            version: Version::V2c,
            community: Bytes::from_static(b"public"),
            pdu: Pdu {
                pdu_type: PduType::GetRequest,
                request_id: 12345,
                error_status: 0,
                error_index: 0,
                varbinds: vec![VarBind::null(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0))],
            },
        };
        assert_eq!(roundtrip(&message), message);
    }

    #[test]
    fn test_response_with_all_value_types() {
        let message = Message {
            version: Version::V2c,
            community: Bytes::from_static(b"public"),
            pdu: Pdu::response(
                7,
                vec![
                    VarBind::new(oid!(1, 3, 1, 0), Value::Integer(-42)),
                    VarBind::new(oid!(1, 3, 2, 0), Value::text("router")),
                    VarBind::new(oid!(1, 3, 3, 0), Value::Counter32(100)),
                    VarBind::new(oid!(1, 3, 4, 0), Value::Gauge32(200)),
                    VarBind::new(oid!(1, 3, 5, 0), Value::TimeTicks(300)),
                    VarBind::new(oid!(1, 3, 6, 0), Value::Counter64(u64::MAX)),
                    VarBind::new(oid!(1, 3, 7, 0), Value::IpAddress([192, 0, 2, 1])),
                    VarBind::new(
                        oid!(1, 3, 8, 0),
                        Value::ObjectIdentifier(oid!(1, 3, 6, 1, 4, 1)),
                    ),
                    VarBind::new(oid!(1, 3, 9, 0), Value::Null),
                    VarBind::new(oid!(1, 3, 10, 0), Value::NoSuchObject),
                    VarBind::new(oid!(1, 3, 11, 0), Value::NoSuchInstance),
                    VarBind::new(oid!(1, 3, 12, 0), Value::EndOfMibView),
                    VarBind::new(
                        oid!(1, 3, 13, 0),
                        Value::Opaque(Bytes::from_static(&[0x9F, 0x78])),
                    ),
                    VarBind::new(
                        oid!(1, 3, 14, 0),
                        Value::BitString(Bytes::from_static(&[0x80])),
                    ),
                ],
            ),
        };
        assert_eq!(roundtrip(&message), message);
    }

    #[test]
    fn test_getbulk_fields() {
        let pdu = Pdu {
            pdu_type: PduType::GetBulkRequest,
            request_id: 1,
            error_status: 2,
            error_index: 10,
            varbinds: Vec::new(),
        };
        assert_eq!(pdu.non_repeaters(), 2);
        assert_eq!(pdu.max_repetitions(), 10);
    }

    #[test]
    fn test_v1_version_field() {
        let message = Message {
            version: Version::V1,
            community: Bytes::from_static(b"private"),
            pdu: Pdu::response(9, Vec::new()),
        };
        let decoded = roundtrip(&message);
        assert_eq!(decoded.version, Version::V1);
        assert_eq!(decoded.community, Bytes::from_static(b"private"));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut buf = EncodeBuf::new();
        buf.push_constructed(TAG_SEQUENCE, |msg| {
            msg.push_i32(0x02, 3);
            msg.push_octets(0x04, b"public");
            msg.push_constructed(0xA0, |pdu| {
                pdu.push_i32(0x02, 1);
                pdu.push_i32(0x02, 0);
                pdu.push_i32(0x02, 0);
                pdu.push_constructed(TAG_SEQUENCE, |_| {});
            });
        });
        let err = Message::decode(&buf.into_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::UnknownVersion(3),
                ..
            }
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Message::decode(&[0xFF, 0x00, 0x01]).is_err());
        assert!(Message::decode(&[]).is_err());
    }

    #[test]
    fn test_unknown_value_tag_reports_its_offset() {
        let mut buf = EncodeBuf::new();
        buf.push_constructed(TAG_SEQUENCE, |msg| {
            msg.push_i32(0x02, 1);
            msg.push_octets(0x04, b"public");
            msg.push_constructed(0xA2, |pdu| {
                pdu.push_i32(0x02, 1);
                pdu.push_i32(0x02, 0);
                pdu.push_i32(0x02, 0);
                pdu.push_constructed(TAG_SEQUENCE, |list| {
                    list.push_constructed(TAG_SEQUENCE, |entry| {
                        entry.push_oid(&oid!(1, 3, 6, 1));
                        // Application tag 5 is not an SNMP value syntax.
                        entry.push_octets(0x45, &[0x01]);
                    });
                });
            });
        });
        let bytes = buf.into_bytes();
        let bad_tag_at = bytes
            .iter()
            .position(|&b| b == 0x45)
            .expect("encoded tag present");

        match Message::decode(&bytes).unwrap_err() {
            Error::Decode { offset, kind } => {
                assert_eq!(kind, DecodeErrorKind::UnknownValueTag(0x45));
                assert_eq!(offset, bad_tag_at);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
