#![no_main]

use agentx_subagent::wire::decode_pdu;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // A malformed or short buffer must return an error, never panic; a
    // concatenated stream must decode one PDU at a time without reading
    // past the bytes it consumed.
    let mut remaining = data;
    loop {
        match decode_pdu(remaining) {
            Ok((_, consumed)) => {
                if consumed == 0 || consumed > remaining.len() {
                    break;
                }
                remaining = &remaining[consumed..];
            }
            Err(_) => break,
        }
    }
});
