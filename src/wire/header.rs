//! The 20-byte AgentX PDU header (RFC 2741 §6.1).

use bytes::{Buf, Bytes};

use crate::error::{DecodeErrorKind, Error};

use super::Endian;

/// Fixed header length in bytes.
pub const HEADER_LEN: usize = 20;

/// The only AgentX version this crate speaks.
pub const AGENTX_VERSION: u8 = 1;

/// AgentX PDU type byte (RFC 2741 §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PduType {
    Open = 1,
    Close = 2,
    Register = 3,
    Unregister = 4,
    Get = 5,
    GetNext = 6,
    GetBulk = 7,
    TestSet = 8,
    CommitSet = 9,
    UndoSet = 10,
    CleanupSet = 11,
    Notify = 12,
    Ping = 13,
    IndexAllocate = 14,
    IndexDeallocate = 15,
    AddAgentCaps = 16,
    RemoveAgentCaps = 17,
    Response = 18,
}

impl PduType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            1 => Self::Open,
            2 => Self::Close,
            3 => Self::Register,
            4 => Self::Unregister,
            5 => Self::Get,
            6 => Self::GetNext,
            7 => Self::GetBulk,
            8 => Self::TestSet,
            9 => Self::CommitSet,
            10 => Self::UndoSet,
            11 => Self::CleanupSet,
            12 => Self::Notify,
            13 => Self::Ping,
            14 => Self::IndexAllocate,
            15 => Self::IndexDeallocate,
            16 => Self::AddAgentCaps,
            17 => Self::RemoveAgentCaps,
            18 => Self::Response,
            _ => return None,
        })
    }
}

/// Header flag bits (RFC 2741 §6.1).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub instance_registration: bool,
    pub new_index: bool,
    pub any_index: bool,
    pub non_default_context: bool,
    pub network_byte_order: bool,
}

impl Flags {
    const INSTANCE_REGISTRATION: u8 = 0x01;
    const NEW_INDEX: u8 = 0x02;
    const ANY_INDEX: u8 = 0x04;
    const NON_DEFAULT_CONTEXT: u8 = 0x08;
    const NETWORK_BYTE_ORDER: u8 = 0x10;

    pub fn from_byte(b: u8) -> Self {
        Self {
            instance_registration: b & Self::INSTANCE_REGISTRATION != 0,
            new_index: b & Self::NEW_INDEX != 0,
            any_index: b & Self::ANY_INDEX != 0,
            non_default_context: b & Self::NON_DEFAULT_CONTEXT != 0,
            network_byte_order: b & Self::NETWORK_BYTE_ORDER != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut b = 0;
        if self.instance_registration {
            b |= Self::INSTANCE_REGISTRATION;
        }
        if self.new_index {
            b |= Self::NEW_INDEX;
        }
        if self.any_index {
            b |= Self::ANY_INDEX;
        }
        if self.non_default_context {
            b |= Self::NON_DEFAULT_CONTEXT;
        }
        if self.network_byte_order {
            b |= Self::NETWORK_BYTE_ORDER;
        }
        b
    }
}

/// The fixed 20-byte header preceding every AgentX PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduHeader {
    pub version: u8,
    pub pdu_type: PduType,
    pub flags: Flags,
    pub session_id: u32,
    pub transaction_id: u32,
    pub packet_id: u32,
    pub payload_length: u32,
}

impl PduHeader {
    /// Endianness this header (and therefore its payload) is encoded in.
    pub fn endian(&self) -> Endian {
        Endian::from_network_byte_order_flag(self.flags.network_byte_order)
    }

    /// Decode a header from the first 20 bytes of `buf`. Does not consume
    /// `buf`; the caller advances past `HEADER_LEN` itself.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < HEADER_LEN {
            return Err(Error::decode(0, DecodeErrorKind::TruncatedData));
        }
        let version = buf[0];
        if version != AGENTX_VERSION {
            return Err(Error::decode(
                0,
                DecodeErrorKind::UnknownVersion(version),
            ));
        }
        let pdu_type_byte = buf[1];
        let flags = Flags::from_byte(buf[2]);
        if buf[3] != 0 {
            return Err(Error::decode(3, DecodeErrorKind::NonZeroReserved));
        }
        let endian = Endian::from_network_byte_order_flag(flags.network_byte_order);
        let mut rest = Bytes::copy_from_slice(&buf[4..HEADER_LEN]);
        let read_u32 = |b: &mut Bytes| -> u32 {
            match endian {
                Endian::Big => b.get_u32(),
                Endian::Little => b.get_u32_le(),
            }
        };
        let session_id = read_u32(&mut rest);
        let transaction_id = read_u32(&mut rest);
        let packet_id = read_u32(&mut rest);
        let payload_length = read_u32(&mut rest);
        if !payload_length.is_multiple_of(4) {
            return Err(Error::decode(
                16,
                DecodeErrorKind::UnalignedPayloadLength(payload_length),
            ));
        }
        // Validated last: an unrecognized type still needs payload_length
        // (and the rest of the fixed fields) read first, so the error can
        // carry the full frame length and the framing layer can skip past
        // this one PDU instead of losing sync with the stream.
        let pdu_type = PduType::from_u8(pdu_type_byte).ok_or_else(|| {
            Error::decode(
                1,
                DecodeErrorKind::UnknownPduType {
                    pdu_type: pdu_type_byte,
                    frame_len: HEADER_LEN + payload_length as usize,
                },
            )
        })?;
        Ok(PduHeader {
            version,
            pdu_type,
            flags,
            session_id,
            transaction_id,
            packet_id,
            payload_length,
        })
    }

    /// Encode the header into a fixed 20-byte array.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0] = self.version;
        out[1] = self.pdu_type as u8;
        out[2] = self.flags.to_byte();
        out[3] = 0;
        let endian = self.endian();
        let put_u32 = |dst: &mut [u8], v: u32| match endian {
            Endian::Big => dst.copy_from_slice(&v.to_be_bytes()),
            Endian::Little => dst.copy_from_slice(&v.to_le_bytes()),
        };
        put_u32(&mut out[4..8], self.session_id);
        put_u32(&mut out[8..12], self.transaction_id);
        put_u32(&mut out[12..16], self.packet_id);
        put_u32(&mut out[16..20], self.payload_length);
        out
    }
}
