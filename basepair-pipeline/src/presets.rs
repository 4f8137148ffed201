//! Ready-made stages for Nanopore read processing.
//!
//! Annotating stages never modify the reads they receive: each emits a copy
//! carrying one extra optional, which the FASTQ writer puts on the `@` line.

use std::io::Write;

use crossbeam_channel::{Receiver, Sender};

use basepair_core::compress::{Algorithm, CompressedWriter};
use basepair_core::{Result, WriteTo};
use basepair_io::FastqRead;
use basepair_seq::megamash::matches_to_json;
use basepair_seq::{dual_barcode, DualBarcodePrimerSet, Match, MegamashMap};

use crate::context::Context;
use crate::kernel::{map, recv};

/// Optional key written by [`megamash_fastq`].
pub const MEGAMASH_KEY: &str = "megamash";
/// Optional key written by [`dual_barcode_fastq`].
pub const DUAL_BARCODE_KEY: &str = "dual_barcode";

/// Scoring of a read channel against a [`MegamashMap`].
pub trait FastqMatchChannel {
    /// Send the matches of every read in `input` to `output`, in order.
    fn fastq_match_channel(&self, ctx: &Context, input: &Receiver<FastqRead>, output: Sender<Vec<Match>>)
        -> Result<()>;
}

impl FastqMatchChannel for MegamashMap {
    fn fastq_match_channel(
        &self,
        ctx: &Context,
        input: &Receiver<FastqRead>,
        output: Sender<Vec<Match>>,
    ) -> Result<()> {
        map(ctx, input, output, |read| Ok(self.match_sequence(&read.sequence))).map(|_| ())
    }
}

/// Annotate each read with its Megamash matches as JSON under `megamash`.
pub fn megamash_fastq(
    ctx: &Context,
    megamash: &MegamashMap,
    input: &Receiver<FastqRead>,
    output: Sender<FastqRead>,
) -> Result<()> {
    let annotated = map(ctx, input, output, |read| {
        let json = matches_to_json(&megamash.match_sequence(&read.sequence))?;
        Ok(read.with_optional(MEGAMASH_KEY, json))
    })?;
    log::debug!("megamash annotated {annotated} reads");
    Ok(())
}

/// Annotate each read with its well under `dual_barcode`. Reads without a
/// call get an empty value.
pub fn dual_barcode_fastq(
    ctx: &Context,
    primers: &DualBarcodePrimerSet,
    input: &Receiver<FastqRead>,
    output: Sender<FastqRead>,
) -> Result<()> {
    let annotated = map(ctx, input, output, |read| {
        let well = dual_barcode(&read.sequence, primers).unwrap_or_default();
        Ok(read.with_optional(DUAL_BARCODE_KEY, well))
    })?;
    log::debug!("dual barcoding annotated {annotated} reads");
    Ok(())
}

/// Write every read of `input` as FASTQ through an optional compressor.
///
/// Returns the uncompressed byte count. The compressed stream is finished
/// before returning, so the sink holds a complete gzip or zstd file.
pub fn write_compressed_fastq<W: Write>(
    ctx: &Context,
    input: &Receiver<FastqRead>,
    sink: W,
    algorithm: Option<Algorithm>,
    level: i32,
) -> Result<usize> {
    let mut writer = CompressedWriter::new(sink, algorithm, level)?;
    let mut written = 0;
    while let Some(read) = recv(ctx, input)? {
        ctx.check()?;
        written += read.write_to(&mut writer)?;
    }
    writer.finish()?;
    log::debug!("wrote {written} bytes of FASTQ");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use basepair_core::compress::decompressing_reader;
    use basepair_core::RecordParser;
    use basepair_io::FastqParser;
    use basepair_seq::barcoding::DualBarcode;
    use basepair_seq::megamash::json_to_matches;
    use basepair_seq::{reverse_complement, MegamashOptions};
    use crossbeam_channel::unbounded;

    fn megamash() -> MegamashMap {
        let options = MegamashOptions {
            kmer_size: 8,
            minimal_kmer_count: 2,
            threshold: 0.5,
        };
        MegamashMap::new([("left", "ATGCGTACGTTAGCAT"), ("right", "GGCCTTAAGGCATCGA")], options).unwrap()
    }

    fn feed(reads: Vec<FastqRead>) -> Receiver<FastqRead> {
        let (tx, rx) = unbounded();
        for read in reads {
            tx.send(read).unwrap();
        }
        rx
    }

    #[test]
    fn megamash_annotates_copies() {
        let original = FastqRead::new("r1", "GGCCTTAAGGCATCGA", "IIIIIIIIIIIIIIII");
        let input = feed(vec![original.clone()]);
        let (tx, rx) = unbounded();
        megamash_fastq(&Context::new(), &megamash(), &input, tx).unwrap();

        let annotated: Vec<FastqRead> = rx.iter().collect();
        assert_eq!(annotated.len(), 1);
        let matches = json_to_matches(annotated[0].optional(MEGAMASH_KEY).unwrap()).unwrap();
        assert_eq!(matches[0].identifier, "right");
        assert!(original.optionals.is_empty());
        assert_eq!(annotated[0].sequence, original.sequence);
    }

    #[test]
    fn match_channel_keeps_read_order() {
        let input = feed(vec![
            FastqRead::new("a", "ATGCGTACGTTAGCAT", "IIIIIIIIIIIIIIII"),
            FastqRead::new("b", "AAAAAAAAAAAAAAAA", "IIIIIIIIIIIIIIII"),
            FastqRead::new("c", "GGCCTTAAGGCATCGA", "IIIIIIIIIIIIIIII"),
        ]);
        let (tx, rx) = unbounded();
        megamash().fastq_match_channel(&Context::new(), &input, tx).unwrap();
        let results: Vec<Vec<Match>> = rx.iter().collect();
        assert_eq!(results[0][0].identifier, "left");
        assert!(results[1].is_empty());
        assert_eq!(results[2][0].identifier, "right");
    }

    #[test]
    fn dual_barcode_annotates_wells() {
        let plate = DualBarcodePrimerSet::new([DualBarcode {
            name: "A1".into(),
            forward: "GAAGCTCAAGCGTAAGCGGA".into(),
            reverse: "GAACCACAACCTTAACCTGA".into(),
        }]);
        let sequence = format!(
            "GAAGCTCAAGCGTAAGCGGA{}{}",
            "T".repeat(300),
            reverse_complement("GAACCACAACCTTAACCTGA")
        );
        let quality = "I".repeat(sequence.len());
        let input = feed(vec![
            FastqRead::new("called", sequence, quality),
            FastqRead::new("short", "ACGT", "IIII"),
        ]);
        let (tx, rx) = unbounded();
        dual_barcode_fastq(&Context::new(), &plate, &input, tx).unwrap();

        let wells: Vec<String> = rx
            .iter()
            .map(|r| r.optional(DUAL_BARCODE_KEY).unwrap_or("missing").to_string())
            .collect();
        assert_eq!(wells, vec!["A1", ""]);
    }

    #[test]
    fn compressed_fastq_round_trip() {
        for algorithm in [None, Some(Algorithm::Gzip), Some(Algorithm::Zstd)] {
            let reads = vec![
                FastqRead::new("r1", "ACGT", "IIII").with_optional("barcode", "barcode06"),
                FastqRead::new("r2", "GGCC", "!!!!"),
            ];
            let input = feed(reads.clone());
            let mut out = Vec::new();
            let written = write_compressed_fastq(&Context::new(), &input, &mut out, algorithm, 3).unwrap();
            assert_eq!(written, "@r1 barcode=barcode06\nACGT\n+\nIIII\n@r2\nGGCC\n+\n!!!!\n".len());

            let parsed = FastqParser::new(decompressing_reader(out.as_slice()).unwrap())
                .parse_all()
                .unwrap();
            assert_eq!(parsed, reads);
        }
    }

    #[test]
    fn presets_compose_across_threads() {
        let text: String = (0..40)
            .map(|i| format!("@r{i}\nGGCCTTAAGGCATCGA\n+\nIIIIIIIIIIIIIIII\n"))
            .collect();
        let ctx = Context::new();
        let (raw_tx, raw_rx) = crossbeam_channel::bounded(4);
        let (tagged_tx, tagged_rx) = crossbeam_channel::bounded(4);
        let index = megamash();

        let mut out = Vec::new();
        thread::scope(|scope| {
            scope.spawn(|| {
                let mut parser = FastqParser::new(text.as_bytes());
                crate::kernel::parse_to_channel(&ctx, &mut parser, raw_tx).unwrap();
            });
            scope.spawn(|| megamash_fastq(&ctx, &index, &raw_rx, tagged_tx).unwrap());
            write_compressed_fastq(&ctx, &tagged_rx, &mut out, Some(Algorithm::Gzip), 6).unwrap();
        });

        let parsed = FastqParser::new(decompressing_reader(out.as_slice()).unwrap())
            .parse_all()
            .unwrap();
        assert_eq!(parsed.len(), 40);
        assert!(parsed.iter().all(|r| r.optional(MEGAMASH_KEY).is_some()));
    }
}
