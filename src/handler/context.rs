//! Request context for MIB producers.

use bytes::Bytes;

/// Context passed to a [`MibProducer`](super::MibProducer) alongside each
/// request.
///
/// AgentX has no security model of its own - access control, if any, is the
/// master agent's problem (RFC 2741 §1). What a request does carry is the
/// session/transaction/packet identifiers needed to correlate a multi-PDU
/// Set sequence, and an optional named context (RFC 2741's
/// `NON_DEFAULT_CONTEXT`), even though this subagent only ever registers in
/// the default context.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Session this request belongs to (assigned by the master at Open).
    pub session_id: u32,
    /// Transaction this request belongs to.
    pub transaction_id: u32,
    /// Packet ID of the request being answered.
    pub packet_id: u32,
    /// Named context, if the request set `NON_DEFAULT_CONTEXT`.
    pub context: Option<Bytes>,
}

impl RequestContext {
    /// Construct a context for the default (unnamed) AgentX context.
    pub fn new(session_id: u32, transaction_id: u32, packet_id: u32) -> Self {
        Self {
            session_id,
            transaction_id,
            packet_id,
            context: None,
        }
    }

    /// True if this request targets the default context.
    pub fn is_default_context(&self) -> bool {
        self.context.is_none()
    }
}
