//! OID wire encoding (RFC 2741 §5.1): a 4-byte header
//! `(n_subid, prefix, include, reserved=0)` followed by `n_subid` 32-bit
//! sub-identifiers. OIDs beginning with the `1.3.6.1.x` internet prefix
//! (x fitting in a byte) are compressed: `prefix = x`, and only the
//! remaining sub-identifiers are emitted.

use crate::error::{DecodeErrorKind, Error};
use crate::oid::Oid;

use super::{Decoder, Encoder};

pub fn encode_oid(enc: &mut Encoder, oid: &Oid, include: bool) {
    let arcs = oid.arcs();
    let (prefix, tail): (u8, &[u32]) = if oid.internet_compressible() {
        (arcs[4] as u8, &arcs[5..])
    } else {
        (0, arcs)
    };
    enc.put_u8(tail.len() as u8);
    enc.put_u8(prefix);
    enc.put_u8(include as u8);
    enc.put_u8(0);
    for &arc in tail {
        enc.put_u32(arc);
    }
}

/// Decode an OID, returning it along with its `include` flag.
pub fn decode_oid(dec: &mut Decoder) -> Result<(Oid, bool), Error> {
    let n_subid = dec.get_u8()? as usize;
    let prefix = dec.get_u8()?;
    let include = dec.get_u8()? != 0;
    let reserved = dec.get_u8()?;
    if reserved != 0 {
        return Err(Error::decode(
            dec.offset(),
            DecodeErrorKind::NonZeroReserved,
        ));
    }
    if n_subid > crate::oid::MAX_SUBIDS {
        return Err(Error::decode(
            dec.offset(),
            DecodeErrorKind::InvalidOidEncoding,
        ));
    }
    let mut arcs = Vec::with_capacity(n_subid + if prefix != 0 { 5 } else { 0 });
    if prefix != 0 {
        arcs.extend_from_slice(&[1, 3, 6, 1, prefix as u32]);
    } else if n_subid == 0 {
        // The null OID: prefix 0, no sub-identifiers. Legal (e.g. an
        // unqualified sysOID in an Open PDU).
    }
    for _ in 0..n_subid {
        arcs.push(dec.get_u32()?);
    }
    Ok((Oid::new(&arcs), include))
}
