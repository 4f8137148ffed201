//! SAM (Sequence Alignment/Map) text parser and writer.
//!
//! The header (`@HD`, `@SQ`, `@RG`, `@PG`, `@CO` lines) is read lazily on the
//! first call to [`RecordParser::header`] or [`RecordParser::next_record`].
//! Alignment lines carry the 11 mandatory fields followed by any number of
//! `TAG:TYPE:DATA` optionals. BAM is not handled here.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use basepair_core::compress::decompressing_reader;
use basepair_core::{BasepairError, EofLatch, RecordParser, Result, WriteTo};

use crate::line_reader::{LineReader, ParserOptions};

/// Flag bit: read is unmapped.
pub const FLAG_UNMAPPED: u16 = 0x4;
/// Flag bit: SEQ is reverse complemented.
pub const FLAG_REVERSE: u16 = 0x10;
/// Flag bit: secondary alignment.
pub const FLAG_SECONDARY: u16 = 0x100;
/// Flag bit: supplementary alignment.
pub const FLAG_SUPPLEMENTARY: u16 = 0x800;

const HD_ORDER: &[&str] = &["VN", "SO", "GO", "SS"];
const SQ_ORDER: &[&str] = &["SN", "LN", "AH", "AN", "AS", "DS", "M5", "SP", "TP", "UR"];
const RG_ORDER: &[&str] = &[
    "ID", "BC", "CN", "DS", "DT", "FO", "KS", "LB", "PG", "PI", "PL", "PM", "PU", "SM",
];
const PG_ORDER: &[&str] = &["ID", "PN", "VN", "CL", "PP", "DS"];

const SORT_ORDERS: &[&str] = &["unknown", "unsorted", "queryname", "coordinate"];
const GROUPINGS: &[&str] = &["none", "query", "reference"];
const TOPOLOGIES: &[&str] = &["linear", "circular"];
const PLATFORMS: &[&str] = &[
    "CAPILLARY",
    "DNBSEQ",
    "ELEMENT",
    "HELICOS",
    "ILLUMINA",
    "IONTORRENT",
    "LS454",
    "ONT",
    "PACBIO",
    "SOLID",
    "ULTIMA",
];

/// Character class of reference names.
const RNAME_CLASS: &str = r"[0-9A-Za-z!#$%&+./:;?@^_|~-]";

type PatternCell = OnceLock<std::result::Result<Regex, regex::Error>>;

fn compiled(cell: &'static PatternCell, pattern: impl FnOnce() -> String) -> Result<&'static Regex> {
    cell.get_or_init(|| Regex::new(&pattern()))
        .as_ref()
        .map_err(|e| BasepairError::Invariant(format!("built-in pattern failed to compile: {e}")))
}

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> Result<&'static Regex> {
            static CELL: PatternCell = OnceLock::new();
            compiled(&CELL, || $pattern)
        }
    };
}

static_regex!(qname_re, r"^[!-?A-~]{1,254}$".to_string());
static_regex!(rname_re, format!(r"^(\*|{RNAME_CLASS}+)$"));
static_regex!(rnext_re, format!(r"^(\*|=|{RNAME_CLASS}+)$"));
static_regex!(cigar_re, r"^(\*|([0-9]+[MIDNSHPX=])+)$".to_string());
static_regex!(seq_re, r"^(\*|[A-Za-z=.]+)$".to_string());
static_regex!(qual_re, r"^[!-~]+$".to_string());
static_regex!(version_re, r"^[0-9]+\.[0-9]+$".to_string());
static_regex!(subsort_re, r"^(coordinate|queryname|unsorted)(:[A-Za-z0-9_-]+)+$".to_string());
static_regex!(flow_order_re, r"^(\*|[ACMGRSVTWYHKDBN]+)$".to_string());

fn invalid(field: &str, message: impl Into<String>) -> BasepairError {
    BasepairError::validation(field, message)
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// `TAG:VALUE` pairs of one header line, in encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagMap(pub Vec<(String, String)>);

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == tag).map(|(_, v)| v.as_str())
    }

    /// Set `tag`, replacing an existing value in place.
    pub fn insert(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        let tag = tag.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == tag) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((tag, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn write_line(&self, out: &mut String, record_type: &str, order: &[&str]) {
        out.push_str(record_type);
        for tag in order {
            if let Some(value) = self.get(tag) {
                out.push_str(&format!("\t{tag}:{value}"));
            }
        }
        for (tag, value) in self.iter() {
            if !order.contains(&tag) {
                out.push_str(&format!("\t{tag}:{value}"));
            }
        }
        out.push('\n');
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// SAM file header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    /// File-level metadata (`@HD`). Empty when the file has no header.
    pub hd: TagMap,
    /// Reference sequence dictionary, in file order.
    pub sq: Vec<TagMap>,
    pub rg: Vec<TagMap>,
    pub pg: Vec<TagMap>,
    /// `@CO` comment text, without the `@CO\t` prefix.
    pub co: Vec<String>,
}

impl Header {
    /// Check header values against the SAM v1 constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(vn) = self.hd.get("VN") {
            if !version_re()?.is_match(vn) {
                return Err(invalid("@HD VN", format!("invalid format, expected MAJOR.MINOR: {vn}")));
            }
        }
        if let Some(so) = self.hd.get("SO") {
            if !SORT_ORDERS.contains(&so) {
                return Err(invalid("@HD SO", format!("invalid value {so}, expected one of {SORT_ORDERS:?}")));
            }
        }
        if let Some(go) = self.hd.get("GO") {
            if !GROUPINGS.contains(&go) {
                return Err(invalid("@HD GO", format!("invalid value {go}, expected one of {GROUPINGS:?}")));
            }
        }
        if let Some(ss) = self.hd.get("SS") {
            if !subsort_re()?.is_match(ss) {
                return Err(invalid("@HD SS", format!("invalid sub-sorting {ss}")));
            }
        }

        let mut names = HashSet::new();
        for sq in &self.sq {
            if let Some(sn) = sq.get("SN") {
                if !rname_re()?.is_match(sn) || sn == "*" {
                    return Err(invalid("@SQ SN", format!("invalid reference name {sn}")));
                }
                if !names.insert(sn) {
                    return Err(invalid("@SQ SN", format!("non-unique reference name {sn}")));
                }
            }
            if let Some(ln) = sq.get("LN") {
                match ln.parse::<i64>() {
                    Ok(n) if (1..=i64::from(i32::MAX)).contains(&n) => {}
                    _ => return Err(invalid("@SQ LN", format!("{ln} is outside [1, 2147483647]"))),
                }
            }
            if let Some(tp) = sq.get("TP") {
                if !TOPOLOGIES.contains(&tp) {
                    return Err(invalid("@SQ TP", format!("invalid value {tp}, expected linear or circular")));
                }
            }
        }

        let mut read_groups = HashSet::new();
        for rg in &self.rg {
            if let Some(id) = rg.get("ID") {
                if !read_groups.insert(id) {
                    return Err(invalid("@RG ID", format!("non-unique read group {id}")));
                }
            }
            if let Some(fo) = rg.get("FO") {
                if !flow_order_re()?.is_match(fo) {
                    return Err(invalid("@RG FO", format!("invalid flow order {fo}")));
                }
            }
            if let Some(pl) = rg.get("PL") {
                if !PLATFORMS.contains(&pl) {
                    return Err(invalid("@RG PL", format!("invalid platform {pl}, expected one of {PLATFORMS:?}")));
                }
            }
        }

        let mut programs = HashSet::new();
        for pg in &self.pg {
            if let Some(id) = pg.get("ID") {
                if !programs.insert(id) {
                    return Err(invalid("@PG ID", format!("non-unique program {id}")));
                }
            }
        }
        for pg in &self.pg {
            if let Some(pp) = pg.get("PP") {
                if !programs.contains(pp) {
                    return Err(invalid("@PG PP", format!("previous program {pp} has no @PG line")));
                }
            }
        }
        Ok(())
    }
}

impl WriteTo for Header {
    /// Write the header. Known tags come first in the SAM-recommended order,
    /// then any others in the order they were seen.
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize> {
        let mut out = String::new();
        if !self.hd.is_empty() {
            self.hd.write_line(&mut out, "@HD", HD_ORDER);
        }
        for sq in &self.sq {
            sq.write_line(&mut out, "@SQ", SQ_ORDER);
        }
        for rg in &self.rg {
            rg.write_line(&mut out, "@RG", RG_ORDER);
        }
        for pg in &self.pg {
            pg.write_line(&mut out, "@PG", PG_ORDER);
        }
        for comment in &self.co {
            out.push_str("@CO\t");
            out.push_str(comment);
            out.push('\n');
        }
        w.write_all(out.as_bytes())?;
        Ok(out.len())
    }
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

/// An optional `TAG:TYPE:DATA` field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Optional {
    pub tag: String,
    /// One of `A` (char), `B` (array), `f` (float), `H` (hex), `i` (int), `Z` (string).
    pub type_code: char,
    pub data: String,
}

/// One SAM alignment line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alignment {
    pub qname: String,
    pub flag: u16,
    pub rname: String,
    /// 1-based leftmost mapping position, 0 when unmapped.
    pub pos: i32,
    pub mapq: u8,
    pub cigar: String,
    pub rnext: String,
    pub pnext: i32,
    pub tlen: i32,
    pub seq: String,
    pub qual: String,
    pub optionals: Vec<Optional>,
}

impl Alignment {
    pub fn is_mapped(&self) -> bool {
        self.flag & FLAG_UNMAPPED == 0
    }

    pub fn is_reverse(&self) -> bool {
        self.flag & FLAG_REVERSE != 0
    }

    /// Neither secondary nor supplementary.
    pub fn is_primary(&self) -> bool {
        self.flag & (FLAG_SECONDARY | FLAG_SUPPLEMENTARY) == 0
    }

    pub fn optional(&self, tag: &str) -> Option<&Optional> {
        self.optionals.iter().find(|o| o.tag == tag)
    }

    /// Check every mandatory field against the SAM v1 constraints.
    pub fn validate(&self) -> Result<()> {
        if !qname_re()?.is_match(&self.qname) {
            return Err(invalid("QNAME", format!("Invalid QNAME {:?}", self.qname)));
        }
        if !rname_re()?.is_match(&self.rname) {
            return Err(invalid("RNAME", format!("Invalid RNAME {:?}", self.rname)));
        }
        if self.pos < 0 {
            return Err(invalid("POS", format!("Invalid POS {}, must be in [0, 2147483647]", self.pos)));
        }
        if !cigar_re()?.is_match(&self.cigar) {
            return Err(invalid("CIGAR", format!("Invalid CIGAR {:?}", self.cigar)));
        }
        if !rnext_re()?.is_match(&self.rnext) {
            return Err(invalid("RNEXT", format!("Invalid RNEXT {:?}", self.rnext)));
        }
        if self.pnext < 0 {
            return Err(invalid("PNEXT", format!("Invalid PNEXT {}, must be in [0, 2147483647]", self.pnext)));
        }
        if self.tlen == i32::MIN {
            return Err(invalid("TLEN", format!("Invalid TLEN {}", self.tlen)));
        }
        if !seq_re()?.is_match(&self.seq) {
            return Err(invalid("SEQ", format!("Invalid SEQ {:?}", self.seq)));
        }
        if !qual_re()?.is_match(&self.qual) {
            return Err(invalid("QUAL", format!("Invalid QUAL {:?}", self.qual)));
        }
        Ok(())
    }
}

impl WriteTo for Alignment {
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize> {
        let mut out = format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.qname,
            self.flag,
            self.rname,
            self.pos,
            self.mapq,
            self.cigar,
            self.rnext,
            self.pnext,
            self.tlen,
            self.seq,
            self.qual
        );
        for optional in &self.optionals {
            out.push_str(&format!("\t{}:{}:{}", optional.tag, optional.type_code, optional.data));
        }
        out.push('\n');
        w.write_all(out.as_bytes())?;
        Ok(out.len())
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Streaming SAM parser.
#[derive(Debug)]
pub struct SamParser<R> {
    lines: LineReader<R>,
    header: Option<Header>,
    /// First alignment line, read while looking for the end of the header.
    pending: Option<String>,
    latch: EofLatch,
}

impl<R: BufRead> SamParser<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ParserOptions::sam())
    }

    pub fn with_options(reader: R, options: ParserOptions) -> Self {
        Self {
            lines: LineReader::new(reader, options.max_line_size),
            header: None,
            pending: None,
            latch: EofLatch::default(),
        }
    }

    fn ensure_header(&mut self) -> Result<&Header> {
        if self.header.is_none() {
            match self.read_header() {
                Ok(header) => self.header = Some(header),
                Err(e) => {
                    self.header = Some(Header::default());
                    self.latch.finish();
                    return Err(e);
                }
            }
        }
        Ok(self.header.get_or_insert_with(Header::default))
    }

    fn read_header(&mut self) -> Result<Header> {
        let mut header = Header::default();
        let mut first = true;
        while let Some(line) = self.lines.read_line()? {
            if line.is_empty() {
                return Err(self.lines.error("empty line in header"));
            }
            if !line.starts_with('@') {
                self.pending = Some(line);
                break;
            }
            let (record_type, rest) = line.split_once('\t').unwrap_or((line.as_str(), ""));
            if first && record_type != "@HD" {
                return Err(self.lines.error(format!("header must start with @HD, found {record_type}")));
            }
            first = false;

            match record_type {
                "@CO" => header.co.push(rest.to_string()),
                "@HD" if header.hd.is_empty() => header.hd = self.parse_tags(rest)?,
                "@SQ" => header.sq.push(self.parse_tags(rest)?),
                "@RG" => header.rg.push(self.parse_tags(rest)?),
                "@PG" => header.pg.push(self.parse_tags(rest)?),
                other => return Err(self.lines.error(format!("unexpected header record {other}"))),
            }
        }
        Ok(header)
    }

    fn parse_tags(&self, fields: &str) -> Result<TagMap> {
        let mut tags = TagMap::new();
        for field in fields.split('\t').filter(|f| !f.is_empty()) {
            let Some((tag, value)) = field.split_once(':') else {
                return Err(self.lines.error(format!("header field {field:?} is not TAG:VALUE")));
            };
            tags.insert(tag, value);
        }
        Ok(tags)
    }

    fn read_alignment(&mut self) -> Result<Option<Alignment>> {
        let line = match self.pending.take() {
            Some(line) => line,
            None => loop {
                match self.lines.read_line()? {
                    None => return Ok(None),
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => break line,
                }
            },
        };
        self.parse_alignment(&line).map(Some)
    }

    fn parse_alignment(&self, line: &str) -> Result<Alignment> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 11 {
            return Err(self.lines.error(format!(
                "expected at least 11 tab-delimited fields, found {}",
                fields.len()
            )));
        }
        let number = |name: &str, value: &str| self.lines.error(format!("invalid {name} {value:?}"));

        let optionals = fields[11..]
            .iter()
            .map(|field| {
                let mut parts = field.splitn(3, ':');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(tag), Some(type_code), Some(data)) if type_code.chars().count() == 1 => Ok(Optional {
                        tag: tag.to_string(),
                        type_code: type_code.chars().next().unwrap_or('Z'),
                        data: data.to_string(),
                    }),
                    _ => Err(self.lines.error(format!("optional field {field:?} is not TAG:TYPE:DATA"))),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Alignment {
            qname: fields[0].to_string(),
            flag: fields[1].parse().map_err(|_| number("FLAG", fields[1]))?,
            rname: fields[2].to_string(),
            pos: fields[3].parse().map_err(|_| number("POS", fields[3]))?,
            mapq: fields[4].parse().map_err(|_| number("MAPQ", fields[4]))?,
            cigar: fields[5].to_string(),
            rnext: fields[6].to_string(),
            pnext: fields[7].parse().map_err(|_| number("PNEXT", fields[7]))?,
            tlen: fields[8].parse().map_err(|_| number("TLEN", fields[8]))?,
            seq: fields[9].to_string(),
            qual: fields[10].to_string(),
            optionals,
        })
    }
}

impl SamParser<Box<dyn BufRead>> {
    /// Open a SAM file, transparently decoding gzip or zstd.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(decompressing_reader(file)?))
    }
}

impl<R: BufRead> RecordParser for SamParser<R> {
    type Record = Alignment;
    type Header = Header;

    fn header(&mut self) -> Result<Header> {
        self.ensure_header().cloned()
    }

    fn next_record(&mut self) -> Result<Option<Alignment>> {
        if self.latch.is_done() {
            return Ok(None);
        }
        self.ensure_header()?;
        let result = self.read_alignment();
        if !matches!(result, Ok(Some(_))) {
            self.latch.finish();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALN: &str = include_str!("../tests/data/aln.sam");

    fn valid_alignment() -> Alignment {
        Alignment {
            qname: "ValidName".into(),
            flag: 255,
            rname: "*".into(),
            pos: 123_456,
            mapq: 50,
            cigar: "10M1I4M".into(),
            rnext: "*".into(),
            pnext: 234_567,
            tlen: 1000,
            seq: "ACTGACTGAC".into(),
            qual: "~~~~~~~~~~".into(),
            optionals: Vec::new(),
        }
    }

    fn tags(pairs: &[(&str, &str)]) -> TagMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn parses_header_and_alignment() {
        let mut parser = SamParser::new(ALN.as_bytes());
        let header = parser.header().unwrap();
        assert_eq!(header.hd.len(), 3);
        assert_eq!(header.hd.get("GO"), Some("query"));
        assert_eq!(header.sq[0].get("LN"), Some("2482"));
        assert_eq!(
            header.pg[0].get("CL"),
            Some("minimap2 -acLx map-ont - APX814_pass_barcode17_e229f2c8_109f9b91_0.fastq.gz")
        );

        let alignment = parser.next_record().unwrap().unwrap();
        assert_eq!(alignment.qname, "ae9a66f5-bf71-4572-8106-f6f8dbd3b799");
        assert_eq!(alignment.flag, 16);
        assert!(alignment.is_reverse());
        assert!(alignment.is_mapped());
        assert_eq!(alignment.cigar, "8S54M1D3M1D108M1D1M1D62M226S");
        assert_eq!(alignment.optionals.len(), 11);
        let sa = alignment.optional("SA").unwrap();
        assert_eq!(sa.type_code, 'Z');
        assert_eq!(sa.data, "pOpen_V3_amplified,2348,-,236S134M1D92S,60,1;");
        assert!(alignment.validate().is_ok());

        assert!(parser.next_record().unwrap().is_none());
        assert!(parser.next_record().unwrap().is_none());
    }

    #[test]
    fn header_is_idempotent_between_records() {
        let mut parser = SamParser::new(ALN.as_bytes());
        assert!(parser.next_record().unwrap().is_some());
        assert_eq!(parser.header().unwrap().sq.len(), 1);
        assert_eq!(parser.header().unwrap(), parser.header().unwrap());
    }

    #[test]
    fn write_round_trips_byte_for_byte() {
        let mut parser = SamParser::new(ALN.as_bytes());
        let header = parser.header().unwrap();
        let alignment = parser.next_record().unwrap().unwrap();

        let mut out = Vec::new();
        let n = header.write_to(&mut out).unwrap() + alignment.write_to(&mut out).unwrap();
        assert_eq!(n, out.len());
        assert_eq!(String::from_utf8(out).unwrap(), ALN);
    }

    #[test]
    fn header_keys_follow_canonical_then_encounter_order() {
        let header = Header {
            sq: vec![tags(&[("zz", "1"), ("LN", "10"), ("SN", "chr1"), ("aa", "2")])],
            co: vec!["free text".into()],
            ..Header::default()
        };
        let mut out = Vec::new();
        header.write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "@SQ\tSN:chr1\tLN:10\tzz:1\taa:2\n@CO\tfree text\n"
        );
    }

    #[test]
    fn headerless_file_is_accepted() {
        let line = ALN.lines().last().unwrap();
        let mut parser = SamParser::new(line.as_bytes());
        assert_eq!(parser.header().unwrap(), Header::default());
        assert!(parser.next_record().unwrap().is_some());
    }

    #[test]
    fn header_must_start_with_hd() {
        let mut parser = SamParser::new("@SQ\tSN:chr1\tLN:10\n".as_bytes());
        assert!(matches!(parser.header(), Err(BasepairError::Parse { line: 1, .. })));
        assert!(parser.next_record().unwrap().is_none());
    }

    #[test]
    fn empty_header_line_is_an_error() {
        let mut parser = SamParser::new("@HD\tVN:1.6\n\n@SQ\tSN:a\tLN:1\n".as_bytes());
        assert!(matches!(parser.next_record(), Err(BasepairError::Parse { line: 2, .. })));
    }

    #[test]
    fn short_and_malformed_lines_are_errors() {
        let mut parser = SamParser::new("@HD\tVN:1.6\nq\t0\t*\n".as_bytes());
        assert!(matches!(parser.next_record(), Err(BasepairError::Parse { line: 2, .. })));

        let bad_flag = "q\t70000\t*\t0\t0\t*\t*\t0\t0\t*\t*\n";
        assert!(SamParser::new(bad_flag.as_bytes()).next_record().is_err());

        let bad_optional = "q\t0\t*\t0\t0\t*\t*\t0\t0\t*\t*\tNM\n";
        assert!(SamParser::new(bad_optional.as_bytes()).next_record().is_err());
    }

    #[test]
    fn alignment_validation() {
        assert!(valid_alignment().validate().is_ok());

        let cases: Vec<(&str, Box<dyn Fn(&mut Alignment)>)> = vec![
            ("QNAME", Box::new(|a| a.qname = "Invalid QNAME with spaces".into())),
            ("RNAME", Box::new(|a| a.rname = "Invalid RNAME".into())),
            ("POS", Box::new(|a| a.pos = -1)),
            ("CIGAR", Box::new(|a| a.cigar = "X".into())),
            ("RNEXT", Box::new(|a| a.rnext = "Invalid RNEXT".into())),
            ("PNEXT", Box::new(|a| a.pnext = -1)),
            ("SEQ", Box::new(|a| a.seq = "ACTG123".into())),
            ("QUAL", Box::new(|a| a.qual = "qual string with spaces".into())),
        ];
        for (field, modify) in cases {
            let mut alignment = valid_alignment();
            modify(&mut alignment);
            match alignment.validate() {
                Err(BasepairError::Validation { field: got, message }) => {
                    assert_eq!(got, field);
                    assert!(message.contains(&format!("Invalid {field}")), "{message}");
                }
                other => panic!("{field}: expected validation error, got {other:?}"),
            }
        }

        let mut alignment = valid_alignment();
        alignment.rnext = "=".into();
        alignment.rname = "chr1".into();
        assert!(alignment.validate().is_ok());
    }

    #[test]
    fn header_validation() {
        let complete = Header {
            hd: tags(&[("VN", "1.0"), ("SO", "unsorted"), ("GO", "none"), ("SS", "coordinate:example")]),
            sq: vec![tags(&[("SN", "chr1"), ("LN", "1000"), ("TP", "linear")])],
            rg: vec![tags(&[("ID", "rg1"), ("PL", "ILLUMINA"), ("FO", "*"), ("DT", "2023-01-01")])],
            pg: vec![tags(&[("ID", "pg1")]), tags(&[("ID", "pg2"), ("PP", "pg1")])],
            co: vec!["This is a comment.".into()],
        };
        assert!(complete.validate().is_ok());

        let failures = [
            ("@HD VN", Header { hd: tags(&[("VN", "abc")]), ..Header::default() }),
            ("@HD SO", Header { hd: tags(&[("VN", "1.0"), ("SO", "invalid_so")]), ..Header::default() }),
            ("@HD GO", Header { hd: tags(&[("GO", "invalid_go")]), ..Header::default() }),
            ("@HD SS", Header { hd: tags(&[("SS", "invalid_ss")]), ..Header::default() }),
            ("@SQ LN", Header { sq: vec![tags(&[("SN", "chr1"), ("LN", "2147483648")])], ..Header::default() }),
            ("@SQ LN", Header { sq: vec![tags(&[("SN", "chr1"), ("LN", "0")])], ..Header::default() }),
            ("@SQ TP", Header { sq: vec![tags(&[("SN", "chr1"), ("TP", "invalid_tp")])], ..Header::default() }),
            ("@SQ SN", Header { sq: vec![tags(&[("SN", "a")]), tags(&[("SN", "a")])], ..Header::default() }),
            ("@RG ID", Header { rg: vec![tags(&[("ID", "rg1")]), tags(&[("ID", "rg1")])], ..Header::default() }),
            ("@RG FO", Header { rg: vec![tags(&[("ID", "rg1"), ("FO", "invalid_fo")])], ..Header::default() }),
            ("@RG PL", Header { rg: vec![tags(&[("ID", "rg1"), ("PL", "invalid_pl")])], ..Header::default() }),
            ("@PG ID", Header { pg: vec![tags(&[("ID", "pg1")]), tags(&[("ID", "pg1")])], ..Header::default() }),
            ("@PG PP", Header { pg: vec![tags(&[("ID", "pg1"), ("PP", "missing")])], ..Header::default() }),
        ];
        for (field, header) in failures {
            match header.validate() {
                Err(BasepairError::Validation { field: got, .. }) => assert_eq!(got, field),
                other => panic!("{field}: expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn primary_flags() {
        for (flag, primary) in [(0x0, true), (0x100, false), (0x800, false), (0x900, false), (0x400, true), (0x10, true)] {
            let alignment = Alignment { flag, ..Alignment::default() };
            assert_eq!(alignment.is_primary(), primary, "{flag:#x}");
        }
    }
}
