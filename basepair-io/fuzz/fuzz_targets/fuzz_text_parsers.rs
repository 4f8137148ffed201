#![no_main]
use basepair_core::RecordParser;
use basepair_io::{
    FastaParser, FastqParser, GenbankParser, ParserOptions, PileupParser, SamParser, Slow5Parser, UniProtParser,
};
use libfuzzer_sys::fuzz_target;

fn drain<P: RecordParser>(mut parser: P) {
    let _ = parser.header();
    while let Ok(Some(_)) = parser.next_record() {}
    // Errors latch to end of input.
    assert!(matches!(parser.next_record(), Ok(None)));
}

fuzz_target!(|data: &[u8]| {
    let options = ParserOptions::new(4096);
    drain(FastaParser::with_options(data, options));
    drain(FastqParser::with_options(data, options));
    drain(GenbankParser::with_options(data, options));
    drain(SamParser::with_options(data, options));
    drain(Slow5Parser::with_options(data, options));
    drain(PileupParser::with_options(data, options));
    drain(UniProtParser::new(data));
});
