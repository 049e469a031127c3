//! PDU payload encode/decode and top-level framing (RFC 2741 §6).
//!
//! A byte stream may contain concatenated PDUs; [`decode_pdu`] decodes one
//! and reports how many bytes it consumed so the caller can iterate.

use bytes::Bytes;

use crate::error::{DecodeErrorKind, Error};
use crate::oid::Oid;
use crate::value::Value;
use crate::varbind::VarBind;

use super::header::{Flags, PduHeader, PduType, HEADER_LEN};
use super::oid_codec::{decode_oid, encode_oid};
use super::value_codec::{decode_varbind, encode_varbind};
use super::{Decoder, Encoder, Endian};

/// A `(start, end, include)` triple bounding a `Get`/`GetNext` walk.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRange {
    pub start: Oid,
    pub end: Oid,
    pub include: bool,
}

impl SearchRange {
    pub fn new(start: Oid, end: Oid, include: bool) -> Self {
        Self {
            start,
            end,
            include,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPayload {
    pub timeout: u8,
    pub id: Oid,
    pub description: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegisterPayload {
    pub timeout: u8,
    pub priority: u8,
    pub range_subid: u8,
    pub subtree: Oid,
    pub upper_bound: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnregisterPayload {
    pub priority: u8,
    pub range_subid: u8,
    pub subtree: Oid,
    pub upper_bound: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePayload {
    pub sys_up_time: u32,
    pub error: u16,
    pub error_index: u16,
    pub varbinds: Vec<VarBind>,
}

/// The type-specific body of a PDU, with the common header and optional
/// context factored out into [`Pdu`].
#[derive(Debug, Clone, PartialEq)]
pub enum PduBody {
    Open(OpenPayload),
    Close { reason: u8 },
    Register(RegisterPayload),
    Unregister(UnregisterPayload),
    Get { ranges: Vec<SearchRange> },
    GetNext { ranges: Vec<SearchRange> },
    GetBulk {
        non_repeaters: u16,
        max_repetitions: u16,
        ranges: Vec<SearchRange>,
    },
    TestSet { varbinds: Vec<VarBind> },
    CommitSet,
    UndoSet,
    CleanupSet,
    Notify { varbinds: Vec<VarBind> },
    Ping,
    IndexAllocate { varbinds: Vec<VarBind> },
    IndexDeallocate { varbinds: Vec<VarBind> },
    AddAgentCaps { id: Oid, description: Bytes },
    RemoveAgentCaps { id: Oid },
    Response(ResponsePayload),
}

impl PduBody {
    pub fn pdu_type(&self) -> PduType {
        match self {
            PduBody::Open(_) => PduType::Open,
            PduBody::Close { .. } => PduType::Close,
            PduBody::Register(_) => PduType::Register,
            PduBody::Unregister(_) => PduType::Unregister,
            PduBody::Get { .. } => PduType::Get,
            PduBody::GetNext { .. } => PduType::GetNext,
            PduBody::GetBulk { .. } => PduType::GetBulk,
            PduBody::TestSet { .. } => PduType::TestSet,
            PduBody::CommitSet => PduType::CommitSet,
            PduBody::UndoSet => PduType::UndoSet,
            PduBody::CleanupSet => PduType::CleanupSet,
            PduBody::Notify { .. } => PduType::Notify,
            PduBody::Ping => PduType::Ping,
            PduBody::IndexAllocate { .. } => PduType::IndexAllocate,
            PduBody::IndexDeallocate { .. } => PduType::IndexDeallocate,
            PduBody::AddAgentCaps { .. } => PduType::AddAgentCaps,
            PduBody::RemoveAgentCaps { .. } => PduType::RemoveAgentCaps,
            PduBody::Response(_) => PduType::Response,
        }
    }
}

/// A fully decoded (or to-be-encoded) AgentX message: header, optional
/// non-default context, and type-specific body.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub header: PduHeader,
    pub context: Option<Bytes>,
    pub body: PduBody,
}

fn encode_search_range(enc: &mut Encoder, sr: &SearchRange) {
    encode_oid(enc, &sr.start, sr.include);
    encode_oid(enc, &sr.end, false);
}

fn decode_search_range(dec: &mut Decoder) -> Result<SearchRange, Error> {
    let (start, include) = decode_oid(dec)?;
    let (end, _) = decode_oid(dec)?;
    Ok(SearchRange::new(start, end, include))
}

fn decode_search_ranges(dec: &mut Decoder) -> Result<Vec<SearchRange>, Error> {
    let mut ranges = Vec::new();
    while dec.remaining() > 0 {
        ranges.push(decode_search_range(dec)?);
    }
    Ok(ranges)
}

fn encode_varbind_list(enc: &mut Encoder, varbinds: &[VarBind]) {
    for vb in varbinds {
        encode_varbind(enc, &vb.oid, &vb.value);
    }
}

fn decode_varbind_list(dec: &mut Decoder) -> Result<Vec<VarBind>, Error> {
    let mut varbinds = Vec::new();
    while dec.remaining() > 0 {
        let (oid, value) = decode_varbind(dec)?;
        varbinds.push(VarBind::new(oid, value));
    }
    Ok(varbinds)
}

fn encode_body(enc: &mut Encoder, body: &PduBody) {
    match body {
        PduBody::Open(p) => {
            enc.put_u8(p.timeout);
            enc.put_u8(0);
            enc.put_u8(0);
            enc.put_u8(0);
            encode_oid(enc, &p.id, false);
            enc.put_octet_string(&p.description);
        }
        PduBody::Close { reason } => {
            enc.put_u8(*reason);
            enc.put_u8(0);
            enc.put_u8(0);
            enc.put_u8(0);
        }
        PduBody::Register(p) => {
            enc.put_u8(p.timeout);
            enc.put_u8(p.priority);
            enc.put_u8(p.range_subid);
            enc.put_u8(0);
            encode_oid(enc, &p.subtree, false);
            if let Some(bound) = p.upper_bound {
                enc.put_u32(bound);
            }
        }
        PduBody::Unregister(p) => {
            enc.put_u8(0);
            enc.put_u8(p.priority);
            enc.put_u8(p.range_subid);
            enc.put_u8(0);
            encode_oid(enc, &p.subtree, false);
            if let Some(bound) = p.upper_bound {
                enc.put_u32(bound);
            }
        }
        PduBody::Get { ranges } | PduBody::GetNext { ranges } => {
            for r in ranges {
                encode_search_range(enc, r);
            }
        }
        PduBody::GetBulk {
            non_repeaters,
            max_repetitions,
            ranges,
        } => {
            enc.put_u16(*non_repeaters);
            enc.put_u16(*max_repetitions);
            for r in ranges {
                encode_search_range(enc, r);
            }
        }
        PduBody::TestSet { varbinds } => encode_varbind_list(enc, varbinds),
        PduBody::CommitSet | PduBody::UndoSet | PduBody::CleanupSet | PduBody::Ping => {}
        PduBody::Notify { varbinds } => encode_varbind_list(enc, varbinds),
        PduBody::IndexAllocate { varbinds } => encode_varbind_list(enc, varbinds),
        PduBody::IndexDeallocate { varbinds } => encode_varbind_list(enc, varbinds),
        PduBody::AddAgentCaps { id, description } => {
            encode_oid(enc, id, false);
            enc.put_octet_string(description);
        }
        PduBody::RemoveAgentCaps { id } => encode_oid(enc, id, false),
        PduBody::Response(p) => {
            enc.put_u32(p.sys_up_time);
            enc.put_u16(p.error);
            enc.put_u16(p.error_index);
            encode_varbind_list(enc, &p.varbinds);
        }
    }
}

fn decode_body(dec: &mut Decoder, pdu_type: PduType) -> Result<PduBody, Error> {
    Ok(match pdu_type {
        PduType::Open => {
            let timeout = dec.get_u8()?;
            let _reserved = (dec.get_u8()?, dec.get_u8()?, dec.get_u8()?);
            let (id, _) = decode_oid(dec)?;
            let description = dec.get_octet_string()?;
            PduBody::Open(OpenPayload {
                timeout,
                id,
                description,
            })
        }
        PduType::Close => {
            let reason = dec.get_u8()?;
            let _reserved = (dec.get_u8()?, dec.get_u8()?, dec.get_u8()?);
            PduBody::Close { reason }
        }
        PduType::Register => {
            let timeout = dec.get_u8()?;
            let priority = dec.get_u8()?;
            let range_subid = dec.get_u8()?;
            let _reserved = dec.get_u8()?;
            let (subtree, _) = decode_oid(dec)?;
            let upper_bound = if range_subid != 0 {
                Some(dec.get_u32()?)
            } else {
                None
            };
            PduBody::Register(RegisterPayload {
                timeout,
                priority,
                range_subid,
                subtree,
                upper_bound,
            })
        }
        PduType::Unregister => {
            let _reserved = dec.get_u8()?;
            let priority = dec.get_u8()?;
            let range_subid = dec.get_u8()?;
            let _reserved2 = dec.get_u8()?;
            let (subtree, _) = decode_oid(dec)?;
            let upper_bound = if range_subid != 0 {
                Some(dec.get_u32()?)
            } else {
                None
            };
            PduBody::Unregister(UnregisterPayload {
                priority,
                range_subid,
                subtree,
                upper_bound,
            })
        }
        PduType::Get => PduBody::Get {
            ranges: decode_search_ranges(dec)?,
        },
        PduType::GetNext => PduBody::GetNext {
            ranges: decode_search_ranges(dec)?,
        },
        PduType::GetBulk => {
            let non_repeaters = dec.get_u16()?;
            let max_repetitions = dec.get_u16()?;
            PduBody::GetBulk {
                non_repeaters,
                max_repetitions,
                ranges: decode_search_ranges(dec)?,
            }
        }
        PduType::TestSet => PduBody::TestSet {
            varbinds: decode_varbind_list(dec)?,
        },
        PduType::CommitSet => PduBody::CommitSet,
        PduType::UndoSet => PduBody::UndoSet,
        PduType::CleanupSet => PduBody::CleanupSet,
        PduType::Notify => PduBody::Notify {
            varbinds: decode_varbind_list(dec)?,
        },
        PduType::Ping => PduBody::Ping,
        PduType::IndexAllocate => PduBody::IndexAllocate {
            varbinds: decode_varbind_list(dec)?,
        },
        PduType::IndexDeallocate => PduBody::IndexDeallocate {
            varbinds: decode_varbind_list(dec)?,
        },
        PduType::AddAgentCaps => {
            let (id, _) = decode_oid(dec)?;
            let description = dec.get_octet_string()?;
            PduBody::AddAgentCaps { id, description }
        }
        PduType::RemoveAgentCaps => {
            let (id, _) = decode_oid(dec)?;
            PduBody::RemoveAgentCaps { id }
        }
        PduType::Response => {
            let sys_up_time = dec.get_u32()?;
            let error = dec.get_u16()?;
            let error_index = dec.get_u16()?;
            PduBody::Response(ResponsePayload {
                sys_up_time,
                error,
                error_index,
                varbinds: decode_varbind_list(dec)?,
            })
        }
    })
}

/// Encode a complete PDU (header + optional context + body) to bytes.
/// `payload_length` in the returned header bytes is back-patched to the
/// true encoded size.
pub fn encode_pdu(
    mut flags: Flags,
    session_id: u32,
    transaction_id: u32,
    packet_id: u32,
    context: Option<&[u8]>,
    body: &PduBody,
) -> Bytes {
    flags.non_default_context = context.is_some();
    let endian = Endian::from_network_byte_order_flag(flags.network_byte_order);
    let mut enc = Encoder::new(endian);
    if let Some(ctx) = context {
        enc.put_octet_string(ctx);
    }
    encode_body(&mut enc, body);
    let payload = enc.buf.freeze();

    let header = PduHeader {
        version: super::header::AGENTX_VERSION,
        pdu_type: body.pdu_type(),
        flags,
        session_id,
        transaction_id,
        packet_id,
        payload_length: payload.len() as u32,
    };

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(&payload);
    Bytes::from(out)
}

/// Decode one PDU from the front of `buf`. Returns the decoded PDU and the
/// number of bytes consumed (`HEADER_LEN + payload_length`), so the caller
/// can advance past it to decode the next concatenated PDU.
pub fn decode_pdu(buf: &[u8]) -> Result<(Pdu, usize), Error> {
    let header = match PduHeader::decode(buf) {
        Ok(header) => header,
        // The frame isn't fully buffered yet: wait for more bytes rather
        // than reporting an unknown type the caller can't safely skip.
        Err(Error::Decode {
            kind: DecodeErrorKind::UnknownPduType { frame_len, .. },
            ..
        }) if buf.len() < frame_len => {
            return Err(Error::decode(HEADER_LEN, DecodeErrorKind::TruncatedData));
        }
        Err(err) => return Err(err),
    };
    let total = HEADER_LEN + header.payload_length as usize;
    if buf.len() < total {
        return Err(Error::decode(HEADER_LEN, DecodeErrorKind::TruncatedData));
    }
    let payload = Bytes::copy_from_slice(&buf[HEADER_LEN..total]);
    let endian = header.endian();
    let mut dec = Decoder::new(payload, endian);

    let context = if header.flags.non_default_context {
        Some(dec.get_octet_string()?)
    } else {
        None
    };
    let body = decode_body(&mut dec, header.pdu_type)?;

    Ok((
        Pdu {
            header,
            context,
            body,
        },
        total,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use bytes::Bytes as B;

    fn flags(endian: Endian) -> Flags {
        Flags {
            network_byte_order: matches!(endian, Endian::Big),
            ..Default::default()
        }
    }

    fn roundtrip(body: PduBody, context: Option<&[u8]>) {
        for endian in [Endian::Big, Endian::Little] {
            let encoded = encode_pdu(flags(endian), 1, 2, 3, context, &body);
            let (decoded, consumed) = decode_pdu(&encoded).unwrap();
            assert_eq!(consumed, encoded.len());
            assert_eq!(decoded.body, body);
            assert_eq!(decoded.context.as_deref(), context);
        }
    }

    #[test]
    fn open_roundtrip() {
        roundtrip(
            PduBody::Open(OpenPayload {
                timeout: 5,
                id: oid!(1, 3, 6, 1, 4, 1, 99999),
                description: B::from_static(b"test subagent"),
            }),
            None,
        );
    }

    #[test]
    fn close_roundtrip() {
        roundtrip(PduBody::Close { reason: 1 }, None);
    }

    #[test]
    fn register_roundtrip_with_and_without_upper_bound() {
        roundtrip(
            PduBody::Register(RegisterPayload {
                timeout: 0,
                priority: 127,
                range_subid: 0,
                subtree: oid!(1, 3, 6, 1, 2, 1, 2),
                upper_bound: None,
            }),
            None,
        );
        roundtrip(
            PduBody::Register(RegisterPayload {
                timeout: 0,
                priority: 127,
                range_subid: 11,
                subtree: oid!(1, 3, 6, 1, 2, 1, 2, 2, 1),
                upper_bound: Some(10),
            }),
            None,
        );
    }

    #[test]
    fn unregister_roundtrip() {
        roundtrip(
            PduBody::Unregister(UnregisterPayload {
                priority: 127,
                range_subid: 0,
                subtree: oid!(1, 3, 6, 1, 2, 1, 2),
                upper_bound: None,
            }),
            None,
        );
    }

    #[test]
    fn get_roundtrip_with_context() {
        roundtrip(
            PduBody::Get {
                ranges: vec![SearchRange::new(
                    oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
                    Oid::empty(),
                    false,
                )],
            },
            Some(b"vrf-red"),
        );
    }

    #[test]
    fn get_next_multiple_ranges() {
        roundtrip(
            PduBody::GetNext {
                ranges: vec![
                    SearchRange::new(oid!(1, 3, 6, 1, 2, 1, 1), oid!(1, 3, 6, 1, 2, 1, 2), false),
                    SearchRange::new(
                        oid!(1, 3, 6, 1, 2, 1, 2),
                        oid!(1, 3, 6, 1, 2, 1, 3),
                        true,
                    ),
                ],
            },
            None,
        );
    }

    #[test]
    fn get_bulk_roundtrip() {
        roundtrip(
            PduBody::GetBulk {
                non_repeaters: 0,
                max_repetitions: 1,
                ranges: vec![SearchRange::new(
                    oid!(1, 3, 6, 1, 2, 1, 2),
                    Oid::empty(),
                    false,
                )],
            },
            None,
        );
    }

    #[test]
    fn test_set_roundtrip() {
        roundtrip(
            PduBody::TestSet {
                varbinds: vec![VarBind::new(
                    oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0),
                    Value::Integer(7),
                )],
            },
            None,
        );
    }

    #[test]
    fn bodyless_set_phases_roundtrip() {
        roundtrip(PduBody::CommitSet, None);
        roundtrip(PduBody::UndoSet, None);
        roundtrip(PduBody::CleanupSet, None);
        roundtrip(PduBody::Ping, None);
    }

    #[test]
    fn response_roundtrip() {
        roundtrip(
            PduBody::Response(ResponsePayload {
                sys_up_time: 12345,
                error: 0,
                error_index: 0,
                varbinds: vec![VarBind::new(
                    oid!(1, 3, 6, 1, 2, 1, 1, 3, 0),
                    Value::TimeTicks(12345),
                )],
            }),
            None,
        );
    }

    #[test]
    fn add_remove_agent_caps_roundtrip() {
        roundtrip(
            PduBody::AddAgentCaps {
                id: oid!(1, 3, 6, 1, 4, 1, 99999, 1),
                description: B::from_static(b"cap"),
            },
            None,
        );
        roundtrip(
            PduBody::RemoveAgentCaps {
                id: oid!(1, 3, 6, 1, 4, 1, 99999, 1),
            },
            None,
        );
    }

    #[test]
    fn concatenated_pdus_decode_independently() {
        let a = encode_pdu(flags(Endian::Big), 1, 1, 1, None, &PduBody::Ping);
        let b = encode_pdu(
            flags(Endian::Little),
            1,
            1,
            2,
            None,
            &PduBody::Close { reason: 1 },
        );
        let mut stream = Vec::new();
        stream.extend_from_slice(&a);
        stream.extend_from_slice(&b);

        let (first, n1) = decode_pdu(&stream).unwrap();
        assert_eq!(first.body, PduBody::Ping);
        let (second, n2) = decode_pdu(&stream[n1..]).unwrap();
        assert_eq!(second.body, PduBody::Close { reason: 1 });
        assert_eq!(n1 + n2, stream.len());
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let full = encode_pdu(flags(Endian::Big), 1, 1, 1, None, &PduBody::Ping);
        assert!(decode_pdu(&full[..full.len() - 1]).is_err());
    }

    #[test]
    fn unknown_pdu_type_is_an_error() {
        let mut bytes = encode_pdu(flags(Endian::Big), 1, 1, 1, None, &PduBody::Ping).to_vec();
        bytes[1] = 200;
        assert!(matches!(
            decode_pdu(&bytes),
            Err(Error::Decode {
                kind: DecodeErrorKind::UnknownPduType { pdu_type: 200, .. },
                ..
            })
        ));
    }

    #[test]
    fn unknown_pdu_type_error_carries_skippable_frame_length() {
        let ping = encode_pdu(flags(Endian::Big), 1, 1, 1, None, &PduBody::Ping).to_vec();
        let mut bytes = ping.clone();
        bytes[1] = 200;

        match decode_pdu(&bytes) {
            Err(Error::Decode {
                kind: DecodeErrorKind::UnknownPduType { frame_len, .. },
                ..
            }) => assert_eq!(frame_len, ping.len()),
            other => panic!("expected UnknownPduType, got {other:?}"),
        }
    }

    #[test]
    fn unknown_pdu_type_with_incomplete_frame_is_truncated_not_unknown() {
        let ping = encode_pdu(flags(Endian::Big), 1, 1, 1, None, &PduBody::Ping).to_vec();
        let mut bytes = ping.clone();
        bytes[1] = 200;
        // Only the header has arrived so far; the framing layer must wait
        // for the rest of the frame rather than trying to skip it blind.
        let header_only = &bytes[..HEADER_LEN];

        assert!(matches!(
            decode_pdu(header_only),
            Err(Error::Decode {
                kind: DecodeErrorKind::TruncatedData,
                ..
            })
        ));
    }

    #[test]
    fn concatenated_unknown_then_known_pdu_skips_the_unknown_one() {
        let mut unknown = encode_pdu(flags(Endian::Big), 1, 1, 1, None, &PduBody::Ping).to_vec();
        unknown[1] = 200;
        let known = encode_pdu(flags(Endian::Big), 1, 1, 2, None, &PduBody::Ping);

        let mut stream = unknown.clone();
        stream.extend_from_slice(&known);

        let (_, consumed) = match decode_pdu(&stream) {
            Err(Error::Decode {
                kind: DecodeErrorKind::UnknownPduType { frame_len, .. },
                ..
            }) => (frame_len, frame_len),
            other => panic!("expected UnknownPduType, got {other:?}"),
        };
        assert_eq!(consumed, unknown.len());
        let (pdu, _) = decode_pdu(&stream[consumed..]).unwrap();
        assert_eq!(pdu.body, PduBody::Ping);
    }
}
