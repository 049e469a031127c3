//! Encoding of a [`Value`]'s payload (the part of a VarBind after its type
//! tag and OID name), per the table in RFC 2741 §5.4.

use crate::error::{DecodeErrorKind, Error};
use crate::oid::Oid;
use crate::value::{Value, ValueType};

use super::oid_codec::{decode_oid, encode_oid};
use super::{Decoder, Encoder};

pub fn encode_value_payload(enc: &mut Encoder, value: &Value) {
    match value {
        Value::Integer(v) => enc.put_i32(*v),
        Value::OctetString(data) | Value::Opaque(data) => enc.put_octet_string(data),
        Value::Null => {}
        Value::ObjectIdentifier(oid) => encode_oid(enc, oid, false),
        Value::IpAddress(bytes) => enc.put_octet_string(bytes),
        Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => enc.put_u32(*v),
        Value::Counter64(v) => enc.put_u64(*v),
        Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {}
    }
}

pub fn decode_value_payload(dec: &mut Decoder, value_type: ValueType) -> Result<Value, Error> {
    Ok(match value_type {
        ValueType::Integer => Value::Integer(dec.get_i32()?),
        ValueType::OctetString => Value::OctetString(dec.get_octet_string()?),
        ValueType::Null => Value::Null,
        ValueType::ObjectIdentifier => {
            let (oid, _include) = decode_oid(dec)?;
            Value::ObjectIdentifier(oid)
        }
        ValueType::IpAddress => {
            let data = dec.get_octet_string()?;
            if data.len() != 4 {
                return Err(Error::decode(dec.offset(), DecodeErrorKind::InvalidPadding));
            }
            let mut addr = [0u8; 4];
            addr.copy_from_slice(&data);
            Value::IpAddress(addr)
        }
        ValueType::Counter32 => Value::Counter32(dec.get_u32()?),
        ValueType::Gauge32 => Value::Gauge32(dec.get_u32()?),
        ValueType::TimeTicks => Value::TimeTicks(dec.get_u32()?),
        ValueType::Opaque => Value::Opaque(dec.get_octet_string()?),
        ValueType::Counter64 => Value::Counter64(dec.get_u64()?),
        ValueType::NoSuchObject => Value::NoSuchObject,
        ValueType::NoSuchInstance => Value::NoSuchInstance,
        ValueType::EndOfMibView => Value::EndOfMibView,
    })
}

/// Encode a full VarBind: 2-byte type, 2-byte reserved, OID name, payload.
pub fn encode_varbind(enc: &mut Encoder, oid: &Oid, value: &Value) {
    enc.put_u16(value.value_type() as u16);
    enc.put_u16(0);
    encode_oid(enc, oid, false);
    encode_value_payload(enc, value);
}

/// Decode a full VarBind, returning its OID and value.
pub fn decode_varbind(dec: &mut Decoder) -> Result<(Oid, Value), Error> {
    let type_tag = dec.get_u16()?;
    let value_type = ValueType::from_u16(type_tag)
        .ok_or_else(|| Error::decode(dec.offset(), DecodeErrorKind::UnknownValueType(type_tag)))?;
    let _reserved = dec.get_u16()?;
    let (oid, _include) = decode_oid(dec)?;
    let value = decode_value_payload(dec, value_type)?;
    Ok((oid, value))
}
