#![no_main]

use agentx_subagent::Oid;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(oid) = Oid::parse(s) {
            // Anything that parses must also re-parse its own `Display`
            // output back to an identical value.
            let roundtrip = Oid::parse(&oid.to_string()).expect("displayed OID must reparse");
            assert_eq!(oid, roundtrip);
        }
    }
});
