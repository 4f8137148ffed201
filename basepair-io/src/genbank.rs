//! GenBank flat file parser and writer.
//!
//! Records are separated by `//`. The header is a sequence of keyword
//! blocks (`LOCUS`, `DEFINITION`, `REFERENCE`, ...) with 12-column
//! indentation for continuations, followed by the FEATURES table and the
//! ORIGIN sequence block.
//!
//! Feature locations are parsed into a [`Location`] tree so that a feature's
//! sequence can be materialized with [`Feature::sequence`].

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::str::FromStr;

use basepair_core::{BasepairError, EofLatch, RecordParser, Result, WriteTo};
use basepair_seq::reverse_complement;

use crate::line_reader::{LineReader, ParserOptions};

/// Width of header values before wrapping onto a continuation line.
const HEADER_WIDTH: usize = 68;
/// Width of feature locations and qualifiers.
const FEATURE_WIDTH: usize = 58;
const HEADER_INDENT: &str = "            ";
const QUALIFIER_INDENT: &str = "                     ";

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// A parsed GenBank record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenbankRecord {
    pub meta: Meta,
    pub features: Vec<Feature>,
    /// Uppercased sequence from the ORIGIN block.
    pub sequence: String,
}

/// Everything above the FEATURES table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Meta {
    pub locus: Locus,
    pub definition: String,
    pub accession: String,
    pub version: String,
    pub keywords: String,
    pub source: String,
    pub organism: String,
    pub taxonomy: Vec<String>,
    pub references: Vec<Reference>,
    /// Keyword blocks without a dedicated field (DBLINK, COMMENT, ...), in
    /// file order. Continuation lines are joined with `\n`.
    pub other: Vec<(String, String)>,
}

/// The LOCUS line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Locus {
    pub name: String,
    pub sequence_length: usize,
    pub molecule_type: String,
    pub circular: bool,
    pub genbank_division: String,
    pub modification_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reference {
    /// Text after the REFERENCE keyword, e.g. `1  (bases 1 to 2686)`.
    pub range: String,
    pub authors: String,
    pub consortium: String,
    pub title: String,
    pub journal: String,
    pub pubmed: String,
    pub remark: String,
}

/// One entry of the FEATURES table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Feature {
    pub feature_type: String,
    pub location: Location,
    /// `/key=value` qualifiers in file order. Repeated keys are kept; flag
    /// qualifiers such as `/pseudo` have an empty value.
    pub qualifiers: Vec<(String, String)>,
}

impl Feature {
    /// First value of qualifier `key`.
    pub fn qualifier(&self, key: &str) -> Option<&str> {
        self.qualifiers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of qualifier `key`.
    pub fn qualifiers_named<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.qualifiers
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The feature's sequence, sliced from `record` per its location.
    pub fn sequence(&self, record: &GenbankRecord) -> Result<String> {
        self.location.extract(&record.sequence)
    }
}

/// A feature location.
///
/// Coordinates are 0-based and half-open; the text form uses GenBank's
/// 1-based inclusive coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Location {
    Range {
        start: usize,
        end: usize,
        /// `<` on the start: the feature begins before `start`.
        partial_start: bool,
        /// `>` on the end: the feature continues past `end`.
        partial_end: bool,
    },
    /// A site between two bases (`a^b`), before 0-based `position`.
    Between { position: usize },
    Complement(Box<Location>),
    Join(Vec<Location>),
    Order(Vec<Location>),
}

impl Location {
    pub fn range(start: usize, end: usize) -> Self {
        Self::Range {
            start,
            end,
            partial_start: false,
            partial_end: false,
        }
    }

    /// Materialize this location against `sequence`.
    ///
    /// Complemented parts are reverse-complemented; joined and ordered parts
    /// are concatenated in order.
    pub fn extract(&self, sequence: &str) -> Result<String> {
        match self {
            Self::Range { start, end, .. } => sequence
                .get(*start..*end)
                .map(str::to_string)
                .ok_or_else(|| {
                    BasepairError::InvalidInput(format!(
                        "location {self} lies outside a sequence of length {}",
                        sequence.len()
                    ))
                }),
            Self::Between { position } => {
                if *position > sequence.len() {
                    return Err(BasepairError::InvalidInput(format!(
                        "location {self} lies outside a sequence of length {}",
                        sequence.len()
                    )));
                }
                Ok(String::new())
            }
            Self::Complement(inner) => Ok(reverse_complement(&inner.extract(sequence)?)),
            Self::Join(parts) | Self::Order(parts) => parts.iter().map(|part| part.extract(sequence)).collect(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range {
                start,
                end,
                partial_start,
                partial_end,
            } => {
                if end - start == 1 && !partial_start && !partial_end {
                    return write!(f, "{end}");
                }
                let lt = if *partial_start { "<" } else { "" };
                let gt = if *partial_end { ">" } else { "" };
                write!(f, "{lt}{}..{gt}{end}", start + 1)
            }
            Self::Between { position } => write!(f, "{position}^{}", position + 1),
            Self::Complement(inner) => write!(f, "complement({inner})"),
            Self::Join(parts) => write_operands(f, "join", parts),
            Self::Order(parts) => write_operands(f, "order", parts),
        }
    }
}

fn write_operands(f: &mut fmt::Formatter<'_>, operator: &str, parts: &[Location]) -> fmt::Result {
    write!(f, "{operator}(")?;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{part}")?;
    }
    f.write_str(")")
}

impl FromStr for Location {
    type Err = BasepairError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(inner) = enclosed(s, "complement") {
            return Ok(Self::Complement(Box::new(inner.parse()?)));
        }
        if let Some(inner) = enclosed(s, "join") {
            return Ok(Self::Join(parse_operands(inner)?));
        }
        if let Some(inner) = enclosed(s, "order") {
            return Ok(Self::Order(parse_operands(inner)?));
        }
        parse_span(s)
    }
}

fn invalid_location(s: &str) -> BasepairError {
    BasepairError::InvalidInput(format!("invalid location '{s}'"))
}

fn enclosed<'a>(s: &'a str, operator: &str) -> Option<&'a str> {
    s.strip_prefix(operator)?.strip_prefix('(')?.strip_suffix(')')
}

/// Split on top-level commas and parse each operand.
fn parse_operands(inner: &str) -> Result<Vec<Location>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1).ok_or_else(|| invalid_location(inner))?,
            ',' if depth == 0 => {
                parts.push(inner[start..i].parse()?);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(invalid_location(inner));
    }
    parts.push(inner[start..].parse()?);
    Ok(parts)
}

fn parse_position(s: &str, whole: &str) -> Result<usize> {
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(invalid_location(whole)),
    }
}

fn parse_span(s: &str) -> Result<Location> {
    if let Some((left, right)) = s.split_once('^') {
        let position = parse_position(left, s)?;
        parse_position(right, s)?;
        return Ok(Location::Between { position });
    }

    let (left, right) = s.split_once("..").unwrap_or((s, s));
    let partial_start = left.starts_with(['<', '>']);
    let partial_end = s.contains("..") && right.starts_with(['<', '>']);
    let start = parse_position(left.trim_start_matches(['<', '>']), s)?;
    let end = parse_position(right.trim_start_matches(['<', '>']), s)?;
    if end < start {
        return Err(invalid_location(s));
    }
    Ok(Location::Range {
        start: start - 1,
        end,
        partial_start,
        partial_end,
    })
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Streaming GenBank parser. Multi-record files are read one record at a
/// time; a final record without a trailing `//` is still returned.
#[derive(Debug)]
pub struct GenbankParser<R> {
    lines: LineReader<R>,
    latch: EofLatch,
}

impl<R: BufRead> GenbankParser<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ParserOptions::genbank())
    }

    pub fn with_options(reader: R, options: ParserOptions) -> Self {
        Self {
            lines: LineReader::new(reader, options.max_line_size),
            latch: EofLatch::default(),
        }
    }

    fn read_record(&mut self) -> Result<Option<GenbankRecord>> {
        let mut builder = RecordBuilder::default();
        while let Some(line) = self.lines.read_line()? {
            let line_number = self.lines.line_number();
            if line.starts_with("//") {
                if builder.has_data() {
                    return builder.build().map(Some);
                }
                continue;
            }
            builder.push_line(&line, line_number)?;
        }
        if builder.has_data() {
            builder.build().map(Some)
        } else {
            Ok(None)
        }
    }
}

impl GenbankParser<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> RecordParser for GenbankParser<R> {
    type Record = GenbankRecord;
    type Header = ();

    fn header(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_record(&mut self) -> Result<Option<GenbankRecord>> {
        if self.latch.is_done() {
            return Ok(None);
        }
        let result = self.read_record();
        if !matches!(result, Ok(Some(_))) {
            self.latch.finish();
        }
        result
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Section {
    #[default]
    Header,
    Features,
    Origin,
}

/// Where a 12-space continuation line belongs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Field {
    #[default]
    None,
    Definition,
    Accession,
    Keywords,
    Source,
    Taxonomy,
    Reference(ReferenceField),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferenceField {
    Range,
    Authors,
    Consortium,
    Title,
    Journal,
    Pubmed,
    Remark,
}

impl ReferenceField {
    fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "AUTHORS" => Self::Authors,
            "CONSRTM" => Self::Consortium,
            "TITLE" => Self::Title,
            "JOURNAL" => Self::Journal,
            "PUBMED" => Self::Pubmed,
            "REMARK" => Self::Remark,
            _ => return None,
        })
    }

    fn of(self, reference: &mut Reference) -> &mut String {
        match self {
            Self::Range => &mut reference.range,
            Self::Authors => &mut reference.authors,
            Self::Consortium => &mut reference.consortium,
            Self::Title => &mut reference.title,
            Self::Journal => &mut reference.journal,
            Self::Pubmed => &mut reference.pubmed,
            Self::Remark => &mut reference.remark,
        }
    }
}

fn append_words(target: &mut String, value: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(value);
}

#[derive(Debug, Default)]
struct RecordBuilder {
    meta: Meta,
    taxonomy: String,
    features: Vec<Feature>,
    sequence: String,
    section: Section,
    field: Field,
    feature: Option<FeatureBuilder>,
    seen_locus: bool,
}

impl RecordBuilder {
    fn has_data(&self) -> bool {
        self.seen_locus || !self.sequence.is_empty() || !self.features.is_empty() || self.feature.is_some()
    }

    fn push_line(&mut self, line: &str, line_number: usize) -> Result<()> {
        match self.section {
            Section::Origin => {
                for token in line.split_whitespace() {
                    if token.bytes().all(|b| b.is_ascii_digit()) {
                        continue;
                    }
                    self.sequence.extend(
                        token
                            .chars()
                            .filter(char::is_ascii_alphabetic)
                            .map(|c| c.to_ascii_uppercase()),
                    );
                }
                Ok(())
            }
            Section::Features if line.starts_with(' ') => self.push_feature_line(line, line_number),
            _ => self.push_header_line(line, line_number),
        }
    }

    fn push_header_line(&mut self, line: &str, line_number: usize) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        let keyword = line.get(..12).unwrap_or(line).trim();
        let value = line.get(12..).unwrap_or("").trim();

        if keyword.is_empty() {
            self.continue_field(value);
            return Ok(());
        }
        self.finish_feature()?;

        self.field = match keyword {
            "LOCUS" => {
                self.meta.locus = parse_locus(value, line_number)?;
                self.seen_locus = true;
                Field::None
            }
            "DEFINITION" => {
                self.meta.definition = value.to_string();
                Field::Definition
            }
            "ACCESSION" => {
                self.meta.accession = value.to_string();
                Field::Accession
            }
            "VERSION" => {
                self.meta.version = value.to_string();
                Field::None
            }
            "KEYWORDS" => {
                self.meta.keywords = value.to_string();
                Field::Keywords
            }
            "SOURCE" => {
                self.meta.source = value.to_string();
                Field::Source
            }
            "ORGANISM" => {
                self.meta.organism = value.to_string();
                Field::Taxonomy
            }
            "REFERENCE" => {
                self.meta.references.push(Reference {
                    range: value.to_string(),
                    ..Reference::default()
                });
                Field::Reference(ReferenceField::Range)
            }
            "FEATURES" => {
                self.section = Section::Features;
                Field::None
            }
            "ORIGIN" => {
                self.section = Section::Origin;
                Field::None
            }
            other => match (ReferenceField::from_keyword(other), self.meta.references.last_mut()) {
                (Some(field), Some(reference)) => {
                    *field.of(reference) = value.to_string();
                    Field::Reference(field)
                }
                _ => {
                    self.meta.other.push((other.to_string(), value.to_string()));
                    Field::Other
                }
            },
        };
        Ok(())
    }

    fn continue_field(&mut self, value: &str) {
        match self.field {
            Field::None => {}
            Field::Definition => append_words(&mut self.meta.definition, value),
            Field::Accession => append_words(&mut self.meta.accession, value),
            Field::Keywords => append_words(&mut self.meta.keywords, value),
            Field::Source => append_words(&mut self.meta.source, value),
            Field::Taxonomy => append_words(&mut self.taxonomy, value),
            Field::Reference(field) => {
                if let Some(reference) = self.meta.references.last_mut() {
                    append_words(field.of(reference), value);
                }
            }
            Field::Other => {
                if let Some((_, text)) = self.meta.other.last_mut() {
                    text.push('\n');
                    text.push_str(value);
                }
            }
        }
    }

    fn push_feature_line(&mut self, line: &str, line_number: usize) -> Result<()> {
        let indent = line.len() - line.trim_start().len();
        let content = line.trim();
        if content.is_empty() {
            return Ok(());
        }
        if indent < QUALIFIER_INDENT.len() {
            self.finish_feature()?;
            let mut parts = content.splitn(2, char::is_whitespace);
            let feature_type = parts.next().unwrap_or_default().to_string();
            let location = parts.next().unwrap_or("").trim().to_string();
            self.feature = Some(FeatureBuilder {
                feature_type,
                location,
                line: line_number,
                qualifiers: Vec::new(),
                open: None,
            });
            return Ok(());
        }
        match self.feature.as_mut() {
            Some(feature) => {
                feature.push(content);
                Ok(())
            }
            None => Err(BasepairError::parse(line_number, "qualifier outside of a feature")),
        }
    }

    fn finish_feature(&mut self) -> Result<()> {
        if let Some(builder) = self.feature.take() {
            self.features.push(builder.build()?);
        }
        Ok(())
    }

    fn build(mut self) -> Result<GenbankRecord> {
        self.finish_feature()?;
        self.meta.taxonomy = self
            .taxonomy
            .split(';')
            .map(|taxon| taxon.trim().trim_end_matches('.').trim())
            .filter(|taxon| !taxon.is_empty())
            .map(str::to_string)
            .collect();
        Ok(GenbankRecord {
            meta: self.meta,
            features: self.features,
            sequence: self.sequence,
        })
    }
}

fn parse_locus(value: &str, line_number: usize) -> Result<Locus> {
    let mut tokens = value.split_whitespace();
    let mut locus = Locus {
        name: tokens.next().unwrap_or_default().to_string(),
        ..Locus::default()
    };
    let rest: Vec<&str> = tokens.collect();

    let mut attributes = &rest[..];
    if let Some(units) = rest.iter().position(|t| *t == "bp" || *t == "aa") {
        if units > 0 {
            locus.sequence_length = rest[units - 1].parse().map_err(|_| {
                BasepairError::parse(line_number, format!("invalid sequence length '{}'", rest[units - 1]))
            })?;
        }
        attributes = &rest[units + 1..];
    }

    for &token in attributes {
        match token {
            "linear" => locus.circular = false,
            "circular" => locus.circular = true,
            t if is_date(t) => locus.modification_date = t.to_string(),
            t if locus.molecule_type.is_empty() => locus.molecule_type = t.to_string(),
            t => locus.genbank_division = t.to_string(),
        }
    }
    Ok(locus)
}

fn is_date(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 11 && bytes[2] == b'-' && bytes[6] == b'-'
}

/// Whether a quoted qualifier value has seen its closing quote. Inner quotes
/// are escaped by doubling, so the value is closed when it ends in an odd
/// run of quotes.
fn is_closed(value: &str) -> bool {
    match value.strip_prefix('"') {
        Some(body) => body.bytes().rev().take_while(|&b| b == b'"').count() % 2 == 1,
        None => true,
    }
}

#[derive(Debug)]
struct FeatureBuilder {
    feature_type: String,
    location: String,
    line: usize,
    qualifiers: Vec<(String, String)>,
    open: Option<(String, String)>,
}

impl FeatureBuilder {
    fn push(&mut self, content: &str) {
        if let Some((key, value)) = self.open.as_mut() {
            // Translations wrap mid-sequence; everything else wraps at spaces.
            if key != "translation" {
                value.push(' ');
            }
            value.push_str(content);
            if is_closed(value) {
                self.finish_qualifier();
            }
            return;
        }
        if let Some(qualifier) = content.strip_prefix('/') {
            match qualifier.split_once('=') {
                Some((key, value)) => {
                    self.open = Some((key.to_string(), value.to_string()));
                    if is_closed(value) {
                        self.finish_qualifier();
                    }
                }
                None => self.qualifiers.push((qualifier.to_string(), String::new())),
            }
        } else if self.qualifiers.is_empty() {
            self.location.push_str(content);
        }
    }

    fn finish_qualifier(&mut self) {
        if let Some((key, value)) = self.open.take() {
            let value = match value.strip_prefix('"') {
                Some(body) => body.strip_suffix('"').unwrap_or(body).replace("\"\"", "\""),
                None => value,
            };
            self.qualifiers.push((key, value));
        }
    }

    fn build(mut self) -> Result<Feature> {
        self.finish_qualifier();
        let location = self.location.parse::<Location>().map_err(|e| {
            BasepairError::parse(self.line, format!("{} feature: {e}", self.feature_type))
        })?;
        Ok(Feature {
            feature_type: self.feature_type,
            location,
            qualifiers: self.qualifiers,
        })
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Greedy word wrap. Words longer than `width` get a line of their own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split `text` into pieces of at most `width` bytes on character boundaries.
fn chunk(text: &str, width: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + width).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            end = text[start..].chars().next().map_or(text.len(), |c| start + c.len_utf8());
        }
        pieces.push(&text[start..end]);
        start = end;
    }
    if pieces.is_empty() {
        pieces.push("");
    }
    pieces
}

fn write_field(out: &mut String, keyword: &str, value: &str) {
    for (i, line) in wrap(value, HEADER_WIDTH).iter().enumerate() {
        if i == 0 {
            out.push_str(&format!("{keyword:<12}{line}"));
        } else {
            out.push_str(HEADER_INDENT);
            out.push_str(line);
        }
        out.push('\n');
    }
}

fn write_locus(out: &mut String, locus: &Locus) {
    let topology = if locus.circular { "circular" } else { "linear" };
    let line = format!(
        "LOCUS       {:<16} {:>11} bp    {:<7} {:<8} {} {}",
        locus.name, locus.sequence_length, locus.molecule_type, topology, locus.genbank_division, locus.modification_date
    );
    out.push_str(line.trim_end());
    out.push('\n');
}

fn qualifier_text(key: &str, value: &str) -> String {
    if value.is_empty() {
        format!("/{key}")
    } else if value.bytes().all(|b| b.is_ascii_digit()) {
        format!("/{key}={value}")
    } else {
        format!("/{key}=\"{}\"", value.replace('"', "\"\""))
    }
}

fn write_feature(out: &mut String, feature: &Feature) {
    let location = feature.location.to_string();
    for (i, piece) in chunk(&location, FEATURE_WIDTH).iter().enumerate() {
        if i == 0 {
            out.push_str(&format!("     {:<16}{piece}\n", feature.feature_type));
        } else {
            out.push_str(QUALIFIER_INDENT);
            out.push_str(piece);
            out.push('\n');
        }
    }
    for (key, value) in &feature.qualifiers {
        let text = qualifier_text(key, value);
        let lines: Vec<String> = if key == "translation" {
            chunk(&text, FEATURE_WIDTH).into_iter().map(str::to_string).collect()
        } else {
            wrap(&text, FEATURE_WIDTH)
        };
        for line in lines {
            out.push_str(QUALIFIER_INDENT);
            out.push_str(&line);
            out.push('\n');
        }
    }
}

fn write_origin(out: &mut String, sequence: &str) {
    out.push_str("ORIGIN\n");
    if sequence.is_empty() {
        return;
    }
    let lower = sequence.to_ascii_lowercase();
    for (i, line) in chunk(&lower, 60).into_iter().enumerate() {
        out.push_str(&format!("{:>9}", i * 60 + 1));
        for group in chunk(line, 10) {
            out.push(' ');
            out.push_str(group);
        }
        out.push('\n');
    }
}

impl WriteTo for GenbankRecord {
    /// Write the record in GenBank flat file layout, ending with `//`.
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize> {
        let meta = &self.meta;
        let mut out = String::new();

        write_locus(&mut out, &meta.locus);
        for (keyword, value) in [
            ("DEFINITION", &meta.definition),
            ("ACCESSION", &meta.accession),
            ("VERSION", &meta.version),
            ("KEYWORDS", &meta.keywords),
            ("SOURCE", &meta.source),
        ] {
            if !value.is_empty() {
                write_field(&mut out, keyword, value);
            }
        }
        if !meta.organism.is_empty() || !meta.taxonomy.is_empty() {
            out.push_str(&format!("  ORGANISM  {}\n", meta.organism));
            if !meta.taxonomy.is_empty() {
                let lineage = format!("{}.", meta.taxonomy.join("; "));
                for line in wrap(&lineage, HEADER_WIDTH) {
                    out.push_str(HEADER_INDENT);
                    out.push_str(&line);
                    out.push('\n');
                }
            }
        }
        for reference in &meta.references {
            out.push_str(&format!("REFERENCE   {}\n", reference.range));
            for (keyword, value) in [
                ("  AUTHORS", &reference.authors),
                ("  CONSRTM", &reference.consortium),
                ("  TITLE", &reference.title),
                ("  JOURNAL", &reference.journal),
                ("   PUBMED", &reference.pubmed),
                ("  REMARK", &reference.remark),
            ] {
                if !value.is_empty() {
                    write_field(&mut out, keyword, value);
                }
            }
        }
        for (keyword, value) in &meta.other {
            for (i, line) in value.split('\n').enumerate() {
                if i == 0 {
                    out.push_str(&format!("{keyword:<12}{line}\n"));
                } else {
                    out.push_str(&format!("{HEADER_INDENT}{line}\n"));
                }
            }
        }

        out.push_str("FEATURES             Location/Qualifiers\n");
        for feature in &self.features {
            write_feature(&mut out, feature);
        }
        write_origin(&mut out, &self.sequence);
        out.push_str("//\n");

        w.write_all(out.as_bytes())?;
        Ok(out.len())
    }
}
