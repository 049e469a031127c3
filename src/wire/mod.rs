//! AgentX (RFC 2741) wire codec.
//!
//! Encoding and decoding are bit-exact: every PDU subtype round-trips
//! through [`encode_pdu`]/[`decode_pdu`] unchanged. Endianness is carried
//! per-PDU in the header's `NETWORK_BYTE_ORDER` flag rather than assumed
//! globally - some masters negotiate little-endian on-host.

mod header;
mod oid_codec;
mod pdu;
mod value_codec;

pub use header::{Flags, PduHeader, PduType, AGENTX_VERSION, HEADER_LEN};
pub use pdu::{
    decode_pdu, encode_pdu, OpenPayload, Pdu, PduBody, RegisterPayload, ResponsePayload,
    SearchRange, UnregisterPayload,
};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{DecodeErrorKind, Error};

/// Byte order a PDU was (or will be) encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    fn from_network_byte_order_flag(set: bool) -> Self {
        if set { Endian::Big } else { Endian::Little }
    }

    fn network_byte_order_flag(self) -> bool {
        matches!(self, Endian::Big)
    }
}

/// A growable output buffer for one PDU's payload, endianness-aware.
pub(crate) struct Encoder {
    pub buf: BytesMut,
    endian: Endian,
}

impl Encoder {
    pub fn new(endian: Endian) -> Self {
        Self {
            buf: BytesMut::new(),
            endian,
        }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        match self.endian {
            Endian::Big => self.buf.put_u16(v),
            Endian::Little => self.buf.put_u16_le(v),
        }
    }

    pub fn put_u32(&mut self, v: u32) {
        match self.endian {
            Endian::Big => self.buf.put_u32(v),
            Endian::Little => self.buf.put_u32_le(v),
        }
    }

    pub fn put_u64(&mut self, v: u64) {
        match self.endian {
            Endian::Big => self.buf.put_u64(v),
            Endian::Little => self.buf.put_u64_le(v),
        }
    }

    pub fn put_i32(&mut self, v: i32) {
        self.put_u32(v as u32);
    }

    /// Octet string: 4-byte length, data, zero padding to a 4-byte boundary.
    pub fn put_octet_string(&mut self, data: &[u8]) {
        self.put_u32(data.len() as u32);
        self.buf.put_slice(data);
        let pad = crate::util::pad4(data.len()) - data.len();
        for _ in 0..pad {
            self.buf.put_u8(0);
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

/// A cursor over one PDU's payload bytes, endianness-aware, tracking the
/// byte offset consumed so far for error reporting.
pub(crate) struct Decoder {
    buf: Bytes,
    offset: usize,
    endian: Endian,
}

impl Decoder {
    pub fn new(buf: Bytes, endian: Endian) -> Self {
        Self {
            buf,
            offset: 0,
            endian,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, n: usize) -> Result<(), Error> {
        if self.buf.remaining() < n {
            Err(Error::decode(self.offset, DecodeErrorKind::TruncatedData))
        } else {
            Ok(())
        }
    }

    pub fn get_u8(&mut self) -> Result<u8, Error> {
        self.need(1)?;
        self.offset += 1;
        Ok(self.buf.get_u8())
    }

    pub fn get_u16(&mut self) -> Result<u16, Error> {
        self.need(2)?;
        self.offset += 2;
        Ok(match self.endian {
            Endian::Big => self.buf.get_u16(),
            Endian::Little => self.buf.get_u16_le(),
        })
    }

    pub fn get_u32(&mut self) -> Result<u32, Error> {
        self.need(4)?;
        self.offset += 4;
        Ok(match self.endian {
            Endian::Big => self.buf.get_u32(),
            Endian::Little => self.buf.get_u32_le(),
        })
    }

    pub fn get_u64(&mut self) -> Result<u64, Error> {
        self.need(8)?;
        self.offset += 8;
        Ok(match self.endian {
            Endian::Big => self.buf.get_u64(),
            Endian::Little => self.buf.get_u64_le(),
        })
    }

    pub fn get_i32(&mut self) -> Result<i32, Error> {
        Ok(self.get_u32()? as i32)
    }

    pub fn get_octet_string(&mut self) -> Result<Bytes, Error> {
        let len = self.get_u32()? as usize;
        let padded = crate::util::pad4(len);
        self.need(padded)?;
        let data = self.buf.copy_to_bytes(len);
        let pad = padded - len;
        if pad > 0 {
            if self.buf.remaining() < pad {
                return Err(Error::decode(self.offset, DecodeErrorKind::InvalidPadding));
            }
            self.buf.advance(pad);
        }
        self.offset += padded;
        Ok(data)
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}
