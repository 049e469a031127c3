//! Whole-PDU wire round-trips across both byte orders and a concatenated
//! stream, exercised from outside the crate the way a real transport would.

use bytes::Bytes;

use agentx_subagent::oid;
use agentx_subagent::varbind::VarBind;
use agentx_subagent::value::Value;
use agentx_subagent::wire::{
    decode_pdu, encode_pdu, Flags, OpenPayload, PduBody, RegisterPayload, ResponsePayload,
    SearchRange,
};
use agentx_subagent::Oid;

fn flags(network_byte_order: bool) -> Flags {
    Flags {
        network_byte_order,
        ..Default::default()
    }
}

fn assert_roundtrip(network_byte_order: bool, body: PduBody) {
    let session_id = 7;
    let transaction_id = 42;
    let packet_id = 99;
    let encoded = encode_pdu(
        flags(network_byte_order),
        session_id,
        transaction_id,
        packet_id,
        None,
        &body,
    );

    let (pdu, consumed) = decode_pdu(&encoded).unwrap();
    assert_eq!(consumed, encoded.len());
    assert_eq!(pdu.header.session_id, session_id);
    assert_eq!(pdu.header.transaction_id, transaction_id);
    assert_eq!(pdu.header.packet_id, packet_id);
    assert_eq!(pdu.header.flags.network_byte_order, network_byte_order);
    assert_eq!(pdu.body, body);
    assert!(pdu.context.is_none());
}

#[test]
fn open_roundtrips_in_both_byte_orders() {
    let body = PduBody::Open(OpenPayload {
        timeout: 30,
        id: oid!(1, 3, 6, 1, 4, 1, 99999, 1),
        description: Bytes::from_static(b"agentx-subagent test"),
    });
    assert_roundtrip(true, body.clone());
    assert_roundtrip(false, body);
}

#[test]
fn register_with_compressible_and_noncompressible_oid_roundtrips() {
    let compressible = PduBody::Register(RegisterPayload {
        timeout: 0,
        priority: 127,
        range_subid: 0,
        subtree: oid!(1, 3, 6, 1, 2, 1, 2, 2, 1),
        upper_bound: None,
    });
    let noncompressible = PduBody::Register(RegisterPayload {
        timeout: 0,
        priority: 1,
        range_subid: 4,
        subtree: oid!(1, 3, 6, 1, 4, 1, 9, 9, 491, 1, 3, 1),
        upper_bound: Some(16),
    });
    assert_roundtrip(true, compressible);
    assert_roundtrip(false, noncompressible);
}

#[test]
fn get_with_multiple_search_ranges_roundtrips() {
    let body = PduBody::Get {
        ranges: vec![
            SearchRange::new(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Oid::empty(), true),
            SearchRange::new(
                oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 1),
                oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 11),
                false,
            ),
        ],
    };
    assert_roundtrip(true, body);
}

#[test]
fn response_with_mixed_value_types_roundtrips() {
    let body = PduBody::Response(ResponsePayload {
        sys_up_time: 123_456,
        error: 0,
        error_index: 0,
        varbinds: vec![
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(123_456)),
            VarBind::new(
                oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 1),
                Value::Counter32(u32::MAX),
            ),
            VarBind::new(
                oid!(1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 6, 1),
                Value::Counter64(u64::MAX),
            ),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 4, 22, 1, 2, 1), Value::NoSuchInstance),
        ],
    });
    assert_roundtrip(true, body.clone());
    assert_roundtrip(false, body);
}

#[test]
fn concatenated_pdus_decode_one_at_a_time() {
    let first = encode_pdu(flags(true), 1, 0, 1, None, &PduBody::Ping);
    let second = encode_pdu(
        flags(true),
        1,
        0,
        2,
        None,
        &PduBody::Close { reason: 1 },
    );

    let mut stream = Vec::new();
    stream.extend_from_slice(&first);
    stream.extend_from_slice(&second);

    let (pdu1, consumed1) = decode_pdu(&stream).unwrap();
    assert_eq!(pdu1.body, PduBody::Ping);
    assert_eq!(consumed1, first.len());

    let (pdu2, consumed2) = decode_pdu(&stream[consumed1..]).unwrap();
    assert_eq!(pdu2.body, PduBody::Close { reason: 1 });
    assert_eq!(consumed2, second.len());
    assert_eq!(consumed1 + consumed2, stream.len());
}

#[test]
fn truncated_pdu_is_an_error_not_a_panic() {
    let encoded = encode_pdu(flags(true), 1, 0, 1, None, &PduBody::CommitSet);
    for cut in 0..encoded.len() {
        assert!(decode_pdu(&encoded[..cut]).is_err());
    }
}
