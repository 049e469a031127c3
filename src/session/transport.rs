//! Buffered PDU framing over an arbitrary byte stream.
//!
//! AgentX PDUs are concatenated back-to-back on the wire with no delimiter
//! beyond each header's own `payload_length` - the same shape a TCP stream
//! would have, except here it's a Unix-domain `SOCK_STREAM`. [`PduReader`]
//! accumulates bytes from the stream until [`crate::wire::decode_pdu`] can
//! consume a whole PDU, and retains whatever's left over (a partial PDU, or
//! the start of the next one) for the following call.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{DecodeErrorKind, Error, Result};
use crate::wire::{decode_pdu, Pdu};

/// Read buffer grown on demand; same role as the teacher's stream-oriented
/// transport read loop, specialized to AgentX's self-delimiting framing.
pub struct PduReader<S> {
    stream: S,
    buf: Vec<u8>,
}

impl<S: AsyncRead + Unpin> PduReader<S> {
    pub fn new(stream: S) -> Self {
        Self { stream, buf: Vec::new() }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Decode and return the next complete PDU, reading more bytes from the
    /// stream as needed. Returns `Err(Error::Io(..))` with
    /// `ErrorKind::UnexpectedEof` if the peer closes mid-PDU.
    pub async fn next_pdu(&mut self) -> Result<Pdu> {
        loop {
            match decode_pdu(&self.buf) {
                Ok((pdu, consumed)) => {
                    self.buf.drain(..consumed);
                    return Ok(pdu);
                }
                Err(Error::Decode { kind: DecodeErrorKind::TruncatedData, .. }) => {
                    let mut chunk = [0u8; 4096];
                    let n = self.stream.read(&mut chunk).await?;
                    if n == 0 {
                        return Err(Error::Io(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "master agent closed the connection",
                        )));
                    }
                    self.buf.extend_from_slice(&chunk[..n]);
                }
                Err(Error::Decode {
                    kind: DecodeErrorKind::UnknownPduType { pdu_type, frame_len },
                    ..
                }) => {
                    // Reported distinctly from a malformed PDU: the frame is
                    // well-formed enough to skip exactly, so drop it and
                    // keep serving the rest of the stream instead of
                    // tearing down the session.
                    tracing::warn!(pdu_type, frame_len, "dropping PDU of unrecognized type");
                    self.buf.drain(..frame_len);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{encode_pdu, Flags, PduBody};

    #[tokio::test]
    async fn reads_one_pdu_delivered_in_one_chunk() {
        let encoded = encode_pdu(Flags::default(), 1, 0, 1, None, &PduBody::Ping);
        let mut reader = PduReader::new(&encoded[..]);
        let pdu = reader.next_pdu().await.unwrap();
        assert_eq!(pdu.body, PduBody::Ping);
    }

    #[tokio::test]
    async fn reads_two_pdus_concatenated_in_one_chunk() {
        let a = encode_pdu(Flags::default(), 1, 0, 1, None, &PduBody::Ping);
        let b = encode_pdu(Flags::default(), 1, 0, 2, None, &PduBody::Close { reason: 1 });
        let mut combined = Vec::new();
        combined.extend_from_slice(&a);
        combined.extend_from_slice(&b);

        let mut reader = PduReader::new(&combined[..]);
        assert_eq!(reader.next_pdu().await.unwrap().body, PduBody::Ping);
        assert_eq!(reader.next_pdu().await.unwrap().body, PduBody::Close { reason: 1 });
    }

    #[tokio::test]
    async fn unrecognized_pdu_type_is_skipped_not_fatal() {
        let mut unknown = encode_pdu(Flags::default(), 1, 0, 1, None, &PduBody::Ping).to_vec();
        unknown[1] = 200;
        let known = encode_pdu(Flags::default(), 1, 0, 2, None, &PduBody::Close { reason: 1 });

        let mut combined = unknown;
        combined.extend_from_slice(&known);

        let mut reader = PduReader::new(&combined[..]);
        let pdu = reader.next_pdu().await.unwrap();
        assert_eq!(pdu.body, PduBody::Close { reason: 1 });
    }

    #[tokio::test]
    async fn eof_mid_pdu_is_an_io_error() {
        let encoded = encode_pdu(Flags::default(), 1, 0, 1, None, &PduBody::Ping);
        let mut reader = PduReader::new(&encoded[..encoded.len() - 1]);
        let err = reader.next_pdu().await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
