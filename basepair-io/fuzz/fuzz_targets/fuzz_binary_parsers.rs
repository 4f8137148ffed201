#![no_main]
use basepair_core::RecordParser;
use basepair_io::blowq::decode_read;
use basepair_io::{BlowqParser, DdidxParser};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decode_read(data);
    let mut blowq = BlowqParser::new(data);
    while let Ok(Some(_)) = blowq.next_record() {}
    let mut ddidx = DdidxParser::new(data);
    while let Ok(Some(_)) = ddidx.next_record() {}
});
