//! Error types for the subagent.
//!
//! All errors are `#[non_exhaustive]` to allow adding new variants without breaking changes.

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// AgentX wire-decode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Data truncated unexpectedly (not enough bytes for a complete field).
    TruncatedData,
    /// Header claims a version this crate does not speak (always 1).
    UnknownVersion(u8),
    /// PDU type byte doesn't match any known `PduType`. Carries the frame's
    /// total length (header + payload) so the framing layer can skip
    /// exactly this one PDU and keep reading instead of tearing down the
    /// session.
    UnknownPduType { pdu_type: u8, frame_len: usize },
    /// VarBind value-type field doesn't match any known `ValueType`.
    UnknownValueType(u16),
    /// `payload_length` is not a multiple of 4, which RFC 2741 requires.
    UnalignedPayloadLength(u32),
    /// An octet string's declared length does not leave room for its padding.
    InvalidPadding,
    /// OID `n_subid == 0` but `prefix != 0` (or vice versa in a way the encoding forbids).
    InvalidOidEncoding,
    /// Reserved header byte was non-zero where RFC 2741 requires zero.
    NonZeroReserved,
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TruncatedData => write!(f, "unexpected end of data"),
            Self::UnknownVersion(v) => write!(f, "unsupported AgentX version: {}", v),
            Self::UnknownPduType { pdu_type, frame_len } => {
                write!(f, "unknown PDU type: {} ({} byte frame)", pdu_type, frame_len)
            }
            Self::UnknownValueType(t) => write!(f, "unknown VarBind value type: {}", t),
            Self::UnalignedPayloadLength(n) => {
                write!(f, "payload length {} is not a multiple of 4", n)
            }
            Self::InvalidPadding => write!(f, "octet string padding does not fit declared length"),
            Self::InvalidOidEncoding => write!(f, "inconsistent OID prefix/subid encoding"),
            Self::NonZeroReserved => write!(f, "reserved header byte must be zero"),
        }
    }
}

/// AgentX wire-encode error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeErrorKind {
    /// A payload exceeds the 32-bit length field AgentX PDUs use.
    PayloadTooLarge { size: usize, max: u32 },
    /// Too many sub-identifiers for the wire's `u8` subid count.
    OidTooLong { len: usize, max: usize },
}

impl std::fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PayloadTooLarge { size, max } => {
                write!(f, "payload of {} bytes exceeds maximum of {}", size, max)
            }
            Self::OidTooLong { len, max } => {
                write!(f, "OID has {} sub-identifiers, exceeds maximum {}", len, max)
            }
        }
    }
}

/// OID validation error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OidErrorKind {
    /// Empty input string.
    Empty,
    /// A dotted component did not parse as a `u32`.
    InvalidArc,
    /// Too many sub-identifiers.
    TooManyArcs { count: usize, max: usize },
}

impl std::fmt::Display for OidErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty OID"),
            Self::InvalidArc => write!(f, "invalid arc value"),
            Self::TooManyArcs { count, max } => {
                write!(f, "OID has {} arcs, exceeds maximum {}", count, max)
            }
        }
    }
}

/// MIB registry composition error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MibErrorKind {
    /// Two entries registered the identical exact OID.
    DuplicateScalar { oid: crate::oid::Oid },
    /// Two subtree entries registered the identical prefix OID.
    DuplicateSubtree { oid: crate::oid::Oid },
}

impl std::fmt::Display for MibErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateScalar { oid } => write!(f, "duplicate scalar registration at {}", oid),
            Self::DuplicateSubtree { oid } => {
                write!(f, "duplicate subtree registration at {}", oid)
            }
        }
    }
}

/// External key-value database adapter error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbErrorKind {
    /// The adapter could not reach the backing store at all.
    Unavailable,
    /// A reply from the backing store did not have the expected shape.
    MalformedReply,
}

impl std::fmt::Display for DbErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "database backend unavailable"),
            Self::MalformedReply => write!(f, "malformed reply from database backend"),
        }
    }
}

/// SNMP error-status codes (RFC 3416), reused by AgentX Set processing (RFC 2741 §7.2.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    NoError,
    TooBig,
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
    /// Unknown/future error status code.
    Unknown(i32),
}

impl ErrorStatus {
    /// Create from a raw status code.
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::TooBig,
            2 => Self::NoSuchName,
            3 => Self::BadValue,
            4 => Self::ReadOnly,
            5 => Self::GenErr,
            6 => Self::NoAccess,
            7 => Self::WrongType,
            8 => Self::WrongLength,
            9 => Self::WrongEncoding,
            10 => Self::WrongValue,
            11 => Self::NoCreation,
            12 => Self::InconsistentValue,
            13 => Self::ResourceUnavailable,
            14 => Self::CommitFailed,
            15 => Self::UndoFailed,
            16 => Self::AuthorizationError,
            17 => Self::NotWritable,
            18 => Self::InconsistentName,
            other => Self::Unknown(other),
        }
    }

    /// Convert to a raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::TooBig => 1,
            Self::NoSuchName => 2,
            Self::BadValue => 3,
            Self::ReadOnly => 4,
            Self::GenErr => 5,
            Self::NoAccess => 6,
            Self::WrongType => 7,
            Self::WrongLength => 8,
            Self::WrongEncoding => 9,
            Self::WrongValue => 10,
            Self::NoCreation => 11,
            Self::InconsistentValue => 12,
            Self::ResourceUnavailable => 13,
            Self::CommitFailed => 14,
            Self::UndoFailed => 15,
            Self::AuthorizationError => 16,
            Self::NotWritable => 17,
            Self::InconsistentName => 18,
            Self::Unknown(code) => *code,
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoError => write!(f, "noError"),
            Self::TooBig => write!(f, "tooBig"),
            Self::NoSuchName => write!(f, "noSuchName"),
            Self::BadValue => write!(f, "badValue"),
            Self::ReadOnly => write!(f, "readOnly"),
            Self::GenErr => write!(f, "genErr"),
            Self::NoAccess => write!(f, "noAccess"),
            Self::WrongType => write!(f, "wrongType"),
            Self::WrongLength => write!(f, "wrongLength"),
            Self::WrongEncoding => write!(f, "wrongEncoding"),
            Self::WrongValue => write!(f, "wrongValue"),
            Self::NoCreation => write!(f, "noCreation"),
            Self::InconsistentValue => write!(f, "inconsistentValue"),
            Self::ResourceUnavailable => write!(f, "resourceUnavailable"),
            Self::CommitFailed => write!(f, "commitFailed"),
            Self::UndoFailed => write!(f, "undoFailed"),
            Self::AuthorizationError => write!(f, "authorizationError"),
            Self::NotWritable => write!(f, "notWritable"),
            Self::InconsistentName => write!(f, "inconsistentName"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

/// Crate error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error on the AgentX transport or the database adapter's connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// AgentX PDU decoding error.
    #[error("decode error at offset {offset}: {kind}")]
    Decode { offset: usize, kind: DecodeErrorKind },

    /// AgentX PDU encoding error.
    #[error("encode error: {kind}")]
    Encode { kind: EncodeErrorKind },

    /// Invalid OID text.
    #[error("invalid OID: {kind}")]
    InvalidOid {
        kind: OidErrorKind,
        input: Option<Box<str>>,
    },

    /// MIB registry composition error (duplicate registration).
    #[error("MIB registration error: {kind}")]
    Mib { kind: MibErrorKind },

    /// Database adapter error.
    #[error("database error: {kind}")]
    Db { kind: DbErrorKind },

    /// The master agent closed the session, returning this AgentX error code.
    #[error("master agent closed session: agentx error code {code}")]
    MasterClosed { code: u16 },

    /// The master agent rejected registration of a subtree.
    #[error("master agent rejected registration of {oid}: agentx error code {code}")]
    RegistrationFailed { oid: crate::oid::Oid, code: u16 },
}

impl Error {
    /// Create a decode error.
    pub fn decode(offset: usize, kind: DecodeErrorKind) -> Self {
        Self::Decode { offset, kind }
    }

    /// Create an encode error.
    pub fn encode(kind: EncodeErrorKind) -> Self {
        Self::Encode { kind }
    }

    /// Create an invalid OID error without the input string.
    pub fn invalid_oid(kind: OidErrorKind) -> Self {
        Self::InvalidOid { kind, input: None }
    }

    /// Create an invalid OID error with the input string that failed to parse.
    pub fn invalid_oid_with_input(kind: OidErrorKind, input: impl Into<Box<str>>) -> Self {
        Self::InvalidOid {
            kind,
            input: Some(input.into()),
        }
    }

    /// Create a MIB registration error.
    pub fn mib(kind: MibErrorKind) -> Self {
        Self::Mib { kind }
    }

    /// Create a database adapter error.
    pub fn db(kind: DbErrorKind) -> Self {
        Self::Db { kind }
    }
}
