#![no_main]

use agentx_subagent::wire::PduHeader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Must never panic on fewer than 20 bytes, an unknown version, or an
    // unaligned payload length.
    let _ = PduHeader::decode(data);
});
