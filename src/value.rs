//! The AgentX VarBind value type (RFC 2741 §5.4).

use bytes::Bytes;

use crate::oid::Oid;

/// A typed value carried by a VarBind.
///
/// The three exception variants (`NoSuchObject`, `NoSuchInstance`,
/// `EndOfMibView`) never appear in a `Get`/`GetNext` request; they are only
/// legal in a response, standing in for a missing value at that OID.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed 32-bit integer.
    Integer(i32),
    /// Arbitrary-length byte string, 4-byte aligned on the wire.
    OctetString(Bytes),
    /// The ASN.1 NULL value.
    Null,
    /// A nested Object Identifier value.
    ObjectIdentifier(Oid),
    /// A 4-octet IPv4 address, wire-encoded like an octet string.
    IpAddress([u8; 4]),
    /// Monotonically increasing 32-bit counter, wraps on overflow.
    Counter32(u32),
    /// Non-negative integer that may increase or decrease.
    Gauge32(u32),
    /// Hundredths of a second since some epoch.
    TimeTicks(u32),
    /// Uninterpreted byte string (historically double BER-encoded; we treat
    /// it as an opaque octet string).
    Opaque(Bytes),
    /// 64-bit counter (SNMPv2 high-capacity counter).
    Counter64(u64),
    /// The requested object type is not implemented by this agent.
    NoSuchObject,
    /// The object type is implemented, but this instance does not exist.
    NoSuchInstance,
    /// There is no next object in the requested direction.
    EndOfMibView,
}

impl Value {
    /// True for the three wire-level exception values.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// The AgentX wire type tag for this value (RFC 2741 §5.4).
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::OctetString(_) => ValueType::OctetString,
            Value::Null => ValueType::Null,
            Value::ObjectIdentifier(_) => ValueType::ObjectIdentifier,
            Value::IpAddress(_) => ValueType::IpAddress,
            Value::Counter32(_) => ValueType::Counter32,
            Value::Gauge32(_) => ValueType::Gauge32,
            Value::TimeTicks(_) => ValueType::TimeTicks,
            Value::Opaque(_) => ValueType::Opaque,
            Value::Counter64(_) => ValueType::Counter64,
            Value::NoSuchObject => ValueType::NoSuchObject,
            Value::NoSuchInstance => ValueType::NoSuchInstance,
            Value::EndOfMibView => ValueType::EndOfMibView,
        }
    }

    /// Build a [`Value::Counter32`] by masking a wider counter to its low
    /// 32 bits, per the DB adapter's counter-width contract (§9 "Counter
    /// widths"): the backing store returns arbitrary-width unsigned
    /// decimals; 32-bit entries mask at encode time rather than truncating
    /// on parse.
    pub fn counter32_masked(wide: u64) -> Value {
        Value::Counter32((wide & 0xFFFF_FFFF) as u32)
    }
}

/// AgentX VarBind type tags (RFC 2741 §5.4), mirroring the SNMP SMI types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ValueType {
    Integer = 2,
    OctetString = 4,
    Null = 5,
    ObjectIdentifier = 6,
    IpAddress = 64,
    Counter32 = 65,
    Gauge32 = 66,
    TimeTicks = 67,
    Opaque = 68,
    Counter64 = 70,
    NoSuchObject = 128,
    NoSuchInstance = 129,
    EndOfMibView = 130,
}

impl ValueType {
    /// Decode a wire type tag, or `None` if it doesn't match any known type.
    pub fn from_u16(tag: u16) -> Option<Self> {
        Some(match tag {
            2 => Self::Integer,
            4 => Self::OctetString,
            5 => Self::Null,
            6 => Self::ObjectIdentifier,
            64 => Self::IpAddress,
            65 => Self::Counter32,
            66 => Self::Gauge32,
            67 => Self::TimeTicks,
            68 => Self::Opaque,
            70 => Self::Counter64,
            128 => Self::NoSuchObject,
            129 => Self::NoSuchInstance,
            130 => Self::EndOfMibView,
            _ => return None,
        })
    }
}
