//! samtools mpileup text parser, writer and mutation caller.
//!
//! Each line is six tab-separated columns:
//! `RNAME  POS(1-based)  REF_BASE  DEPTH  READ_RESULTS  QUALS`
//!
//! Read results are split into one token per read:
//! - `.` / `,` match on forward / reverse strand
//! - `ACGTN` / `acgtn` mismatch on forward / reverse strand
//! - `*` deletion placeholder
//! - `^Q<base>` start of a read with mapping quality `Q`
//! - a trailing `$` marks the end of a read and stays on its token
//! - `+k<seq>` / `-k<seq>` insertion / deletion of `k` bases

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, Write};
use std::path::Path;

use basepair_core::compress::decompressing_reader;
use basepair_core::{BasepairError, EofLatch, RecordParser, Result, WriteTo};

use crate::line_reader::{LineReader, ParserOptions};

/// One pileup column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PileupLine {
    pub sequence: String,
    pub position: u64,
    pub reference_base: String,
    pub read_count: u64,
    pub read_results: Vec<String>,
    pub quality: String,
}

impl WriteTo for PileupLine {
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize> {
        let line = format!(
            "{}\t{}\t{}\t{}\t{}\t{}\n",
            self.sequence,
            self.position,
            self.reference_base,
            self.read_count,
            self.read_results.concat(),
            self.quality
        );
        w.write_all(line.as_bytes())?;
        Ok(line.len())
    }
}

fn is_base(c: char) -> bool {
    matches!(c, 'A' | 'C' | 'G' | 'T' | 'N' | 'a' | 'c' | 'g' | 't' | 'n')
}

fn is_single(c: char) -> bool {
    matches!(c, '.' | ',' | '*') || is_base(c)
}

/// Split a read-results column into per-read tokens.
pub(crate) fn parse_read_results(field: &str, line: usize) -> Result<Vec<String>> {
    let chars: Vec<char> = field.chars().collect();
    let unexpected = |c: char| BasepairError::parse(line, format!("unexpected character '{c}' in read results"));
    let mut tokens: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' => i += 1,
            '^' => {
                let (Some(_quality), Some(&base)) = (chars.get(i + 1), chars.get(i + 2)) else {
                    return Err(BasepairError::parse(line, "read start '^' is truncated"));
                };
                if !is_single(base) {
                    return Err(unexpected(base));
                }
                tokens.push(chars[i..i + 3].iter().collect());
                i += 3;
            }
            '$' => {
                let Some(last) = tokens.last_mut() else {
                    return Err(BasepairError::parse(line, "read end '$' has no preceding base"));
                };
                last.push('$');
                i += 1;
            }
            '+' | '-' => {
                let digits = chars[i + 1..].iter().take_while(|d| d.is_ascii_digit()).count();
                if digits == 0 {
                    return Err(BasepairError::parse(line, format!("indel '{c}' has no length")));
                }
                let length_text: String = chars[i + 1..i + 1 + digits].iter().collect();
                let length: usize = length_text
                    .parse()
                    .map_err(|_| BasepairError::parse(line, format!("invalid indel length {length_text}")))?;
                let start = i + 1 + digits;
                let Some(end) = start.checked_add(length).filter(|&end| end <= chars.len()) else {
                    return Err(BasepairError::parse(line, format!("indel '{c}{length}' is truncated")));
                };
                if let Some(&bad) = chars[start..end].iter().find(|b| !is_base(**b)) {
                    return Err(unexpected(bad));
                }
                tokens.push(chars[i..end].iter().collect());
                i = end;
            }
            c if is_single(c) => {
                tokens.push(c.to_string());
                i += 1;
            }
            other => return Err(unexpected(other)),
        }
    }
    Ok(tokens)
}

/// Streaming pileup parser.
#[derive(Debug)]
pub struct PileupParser<R> {
    lines: LineReader<R>,
    latch: EofLatch,
}

impl<R: BufRead> PileupParser<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ParserOptions::pileup())
    }

    pub fn with_options(reader: R, options: ParserOptions) -> Self {
        Self {
            lines: LineReader::new(reader, options.max_line_size),
            latch: EofLatch::default(),
        }
    }

    fn read_line(&mut self) -> Result<Option<PileupLine>> {
        let text = loop {
            match self.lines.read_line()? {
                None => return Ok(None),
                Some(text) if text.trim().is_empty() => continue,
                Some(text) => break text,
            }
        };
        let line = self.lines.line_number();
        let fields: Vec<&str> = text.split('\t').collect();
        if fields.len() != 6 {
            return Err(self.lines.error(format!("expected 6 tab-delimited fields, found {}", fields.len())));
        }
        let position = fields[1]
            .trim()
            .parse()
            .map_err(|_| self.lines.error(format!("invalid position {:?}", fields[1])))?;
        let read_count = fields[3]
            .trim()
            .parse()
            .map_err(|_| self.lines.error(format!("invalid read count {:?}", fields[3])))?;

        Ok(Some(PileupLine {
            sequence: fields[0].to_string(),
            position,
            reference_base: fields[2].to_string(),
            read_count,
            read_results: parse_read_results(fields[4], line)?,
            quality: fields[5].to_string(),
        }))
    }
}

impl PileupParser<Box<dyn BufRead>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(decompressing_reader(file)?))
    }
}

impl<R: BufRead> RecordParser for PileupParser<R> {
    type Record = PileupLine;
    type Header = ();

    fn header(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_record(&mut self) -> Result<Option<PileupLine>> {
        if self.latch.is_done() {
            return Ok(None);
        }
        let result = self.read_line();
        if !matches!(result, Ok(Some(_))) {
            self.latch.finish();
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Mutation calling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MutationKind {
    NoMutation,
    Point,
    /// A `*` placeholder dominates: the base is deleted by an upstream indel.
    PointIndel,
    Indel,
    Insertion,
    /// No single change passes the ratio, but mismatches together do.
    Noisy,
}

/// The call for one pileup column.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mutation {
    pub kind: MutationKind,
    pub from: String,
    /// Called base, `*`, the indel token, `?` for noise or `.` for no change.
    pub to: String,
    /// Indel length in bases; zero for other kinds.
    pub length: usize,
    pub total_correct: usize,
    pub total_mutated: usize,
    pub total_aligned: usize,
}

/// The counting key of one read token: its base, or the full indel token.
fn read_key(token: &str) -> &str {
    let token = token.trim_end_matches('$');
    if token.starts_with('^') {
        return token.get(token.len().saturating_sub(1)..).unwrap_or(token);
    }
    token
}

/// Call the dominant change at one column.
///
/// Point mismatches are checked first (A, T, G, C, then `*`), then indels in
/// key order, then overall noise. A change is called when its share of
/// `read_results` is at least `minimal_ratio`.
pub fn call_mutations(read_results: &[String], reference_base: &str, minimal_ratio: f64) -> Mutation {
    let mut reads: BTreeMap<&str, usize> = BTreeMap::new();
    for token in read_results {
        *reads.entry(read_key(token)).or_default() += 1;
    }
    let count = |key: &str| reads.get(key).copied().unwrap_or(0);
    let total = read_results.len();
    let passes = |n: usize| total > 0 && n as f64 / total as f64 >= minimal_ratio;
    let correct = count(".") + count(",");

    let call = |kind, from: &str, to: &str, length, mutated| Mutation {
        kind,
        from: from.to_string(),
        to: to.to_string(),
        length,
        total_correct: correct,
        total_mutated: mutated,
        total_aligned: total,
    };

    for base in ["A", "T", "G", "C"] {
        let mutated = count(base) + count(&base.to_ascii_lowercase());
        if passes(mutated) {
            return call(MutationKind::Point, reference_base, base, 0, mutated);
        }
    }
    if passes(count("*")) {
        return call(MutationKind::PointIndel, reference_base, "*", 0, count("*"));
    }

    for (&key, &n) in &reads {
        let kind = match key.as_bytes().first() {
            Some(b'-') if key.len() > 1 => MutationKind::Indel,
            Some(b'+') if key.len() > 1 => MutationKind::Insertion,
            _ => continue,
        };
        if passes(n) {
            let length = key[1..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
                .parse()
                .unwrap_or(0);
            return call(kind, "", key, length, n);
        }
    }

    let noisy: usize = reads
        .iter()
        .filter(|(key, _)| !matches!(**key, "." | ","))
        .map(|(_, n)| n)
        .sum();
    if passes(noisy) {
        return call(MutationKind::Noisy, "", "?", 0, noisy);
    }
    call(MutationKind::NoMutation, "", ".", 0, noisy)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIKIPEDIA: &str = "\
seq1\t272\tT\t24\t,.$.....,,.,.,...,,,.,..^+.\t<<<+;<<<<<<<<<<<=<;<;7<&
seq1\t273\tT\t23\t,.....,,.,.,...,,,.,..A\t<<<;<<<<<<<<<3<=<<<;<<+
seq1\t274\tT\t23\t,.$....,,.,.,...,,,.,...\t7<7;<;<<<<<<<<<=<;<;<<6
seq1\t275\tA\t23\t,$....,,.,.,...,,,.,...^l.\t<+;9*<<<<<<<<<=<<:;<<<<
seq1\t276\tG\t22\t...T,,.,.,...,,,.,....\t33;+<<7=7<<7<&<<1;<<6<
seq1\t277\tT\t22\t....,,.,.,.C.,,,.,..G.\t+7<;<<<<<<<&<=<<:;<<&<
seq1\t278\tG\t23\t....,,.,.,...,,,.,....^k.\t%38*<<;<7<<7<=<<<;<<<<<
seq1\t279\tC\t23\tA..T,,.,.,...,,,.,.....\t75&<<<<<<<<<=<<<9<<:<<<
";

    fn tokens(field: &str) -> Vec<String> {
        parse_read_results(field, 1).unwrap()
    }

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parses_wikipedia_example() {
        let lines = PileupParser::new(WIKIPEDIA.as_bytes()).parse_all().unwrap();
        assert_eq!(lines.len(), 8);
        let first = &lines[0];
        assert_eq!(first.sequence, "seq1");
        assert_eq!(first.position, 272);
        assert_eq!(first.reference_base, "T");
        assert_eq!(first.read_count, 24);
        assert_eq!(first.read_results.len(), 24);
        assert_eq!(first.read_results[1], ".$");
        assert_eq!(first.read_results[23], "^+.");
        assert_eq!(lines[1].read_results.last().map(String::as_str), Some("A"));
    }

    #[test]
    fn scanner_tokens() {
        assert_eq!(tokens(".,*ACGTNacgtn").len(), 13);
        assert_eq!(tokens("^].$"), owned(&["^].$"]));
        assert_eq!(tokens(".+2AG,-12ACGTACGTACGT."), owned(&[".", "+2AG", ",", "-12ACGTACGTACGT", "."]));
        assert_eq!(tokens(". ,"), owned(&[".", ","]));
    }

    #[test]
    fn scanner_errors_name_the_character() {
        match parse_read_results("..X", 7) {
            Err(BasepairError::Parse { line, message }) => {
                assert_eq!(line, 7);
                assert!(message.contains("'X'"), "{message}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(parse_read_results("$", 1).is_err());
        assert!(parse_read_results("+3AC", 1).is_err());
        assert!(parse_read_results("+A", 1).is_err());
        assert!(parse_read_results("+2A!", 1).is_err());
        assert!(parse_read_results("^", 1).is_err());
    }

    #[test]
    fn oversized_indel_length_is_a_parse_error() {
        assert!(parse_read_results("+99999999999999999999A", 1).is_err());
        let mut parser = PileupParser::new("chr1\t1\tA\t1\t.+18446744073709551615A\tI\n".as_bytes());
        assert!(matches!(parser.parse_all(), Err(BasepairError::Parse { line: 1, .. })));
    }

    #[test]
    fn wrong_field_count_is_an_error() {
        let err = PileupParser::new("seq1\t1\tA\t1\t.\n".as_bytes()).next_record().unwrap_err();
        assert!(matches!(err, BasepairError::Parse { line: 1, .. }));
    }

    #[test]
    fn write_round_trips() {
        let lines = PileupParser::new(WIKIPEDIA.as_bytes()).parse_all().unwrap();
        let mut out = Vec::new();
        for line in &lines {
            line.write_to(&mut out).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), WIKIPEDIA);
    }

    #[test]
    fn calls_no_mutation() {
        let results = owned(&[".", ",", ".$", "^!.", "A"]);
        let call = call_mutations(&results, "T", 0.5);
        assert_eq!(call.kind, MutationKind::NoMutation);
        assert_eq!(call.to, ".");
        assert_eq!(call.total_correct, 4);
        assert_eq!(call.total_mutated, 1);
        assert_eq!(call.total_aligned, 5);
    }

    #[test]
    fn calls_point_mutation() {
        let results = owned(&["g", "G", "G$", "^!g", "."]);
        let call = call_mutations(&results, "A", 0.5);
        assert_eq!(call.kind, MutationKind::Point);
        assert_eq!((call.from.as_str(), call.to.as_str()), ("A", "G"));
        assert_eq!(call.total_mutated, 4);
    }

    #[test]
    fn calls_point_indel() {
        let call = call_mutations(&owned(&["*", "*", "."]), "C", 0.6);
        assert_eq!(call.kind, MutationKind::PointIndel);
        assert_eq!(call.to, "*");
    }

    #[test]
    fn calls_indels_with_positive_length() {
        let deletion = call_mutations(&owned(&["-2TC", "-2TC", "."]), "G", 0.5);
        assert_eq!(deletion.kind, MutationKind::Indel);
        assert_eq!(deletion.to, "-2TC");
        assert_eq!(deletion.length, 2);

        let insertion = call_mutations(&owned(&["+1G", "+1G", "+1G", "."]), "G", 0.5);
        assert_eq!(insertion.kind, MutationKind::Insertion);
        assert_eq!(insertion.length, 1);
    }

    #[test]
    fn calls_noise() {
        let call = call_mutations(&owned(&["A", "C", "G", "T", "."]), "T", 0.5);
        assert_eq!(call.kind, MutationKind::Noisy);
        assert_eq!(call.to, "?");
        assert_eq!(call.total_mutated, 4);
    }

    #[test]
    fn empty_column_is_no_mutation() {
        let call = call_mutations(&[], "A", 0.0);
        assert_eq!(call.kind, MutationKind::NoMutation);
        assert_eq!(call.total_aligned, 0);
    }
}
