//! SLOW5 raw nanopore signal parser and writer (text form).
//!
//! A SLOW5 file opens with `#`/`@` header lines: the format version, the
//! number of read groups, one `@attribute` line per run attribute (one value
//! per read group), a `#` line of column types and the `#read_id ...` column
//! names. Every following line is one read, tab-separated, with its raw
//! signal as comma-separated `int16` samples.
//!
//! Binary BLOW5 and its stream-vbyte signal compression are not handled.

use std::fs::File;
use std::io::{BufRead, Write};
use std::path::Path;

use basepair_core::compress::decompressing_reader;
use basepair_core::{BasepairError, EofLatch, RecordParser, Result, WriteTo};

use crate::line_reader::{LineReader, ParserOptions};

/// Columns every read line starts with, in order.
pub const PRIMARY_COLUMNS: [&str; 8] = [
    "read_id",
    "read_group",
    "digitisation",
    "offset",
    "range",
    "sampling_rate",
    "len_raw_signal",
    "raw_signal",
];

/// SLOW5 header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slow5Header {
    pub version: String,
    pub num_read_groups: usize,
    /// `@name` attributes with one value per read group.
    pub attributes: Vec<(String, Vec<String>)>,
    /// Column C types, e.g. `char*`, `uint32_t`, `enum{...}`.
    pub column_types: Vec<String>,
    /// Column names, starting with [`PRIMARY_COLUMNS`].
    pub columns: Vec<String>,
}

impl Slow5Header {
    /// Value of attribute `name` for read group `group`.
    pub fn attribute(&self, name: &str, group: usize) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, values)| values.get(group))
            .map(String::as_str)
    }

    /// Labels of an `enum{a,b,c}` column, indexed by stored value.
    pub fn enum_labels(&self, column: &str) -> Option<Vec<&str>> {
        let index = self.columns.iter().position(|c| c == column)?;
        let labels = self.column_types.get(index)?.strip_prefix("enum{")?.strip_suffix('}')?;
        Some(labels.split(',').collect())
    }
}

impl WriteTo for Slow5Header {
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize> {
        let mut out = format!(
            "#slow5_version\t{}\n#num_read_groups\t{}\n",
            self.version, self.num_read_groups
        );
        for (name, values) in &self.attributes {
            out.push('@');
            out.push_str(name);
            for value in values {
                out.push('\t');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('#');
        out.push_str(&self.column_types.join("\t"));
        out.push_str("\n#");
        out.push_str(&self.columns.join("\t"));
        out.push('\n');
        w.write_all(out.as_bytes())?;
        Ok(out.len())
    }
}

/// One read: primary columns plus any auxiliary columns.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawRead {
    pub read_id: String,
    pub read_group: u32,
    pub digitisation: f64,
    pub offset: f64,
    pub range: f64,
    pub sampling_rate: f64,
    /// Declared sample count. Not checked against `raw_signal`, since
    /// excerpts often truncate the signal.
    pub len_raw_signal: u64,
    pub raw_signal: Vec<i16>,
    /// Auxiliary `(column, value)` pairs in column order.
    pub auxiliary: Vec<(String, String)>,
}

impl RawRead {
    pub fn auxiliary(&self, column: &str) -> Option<&str> {
        self.auxiliary
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Raw signal converted to picoamperes.
    pub fn signal_pa(&self) -> Vec<f64> {
        let scale = if self.digitisation == 0.0 {
            0.0
        } else {
            self.range / self.digitisation
        };
        self.raw_signal
            .iter()
            .map(|&raw| (f64::from(raw) + self.offset) * scale)
            .collect()
    }
}

impl WriteTo for RawRead {
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize> {
        let signal: Vec<String> = self.raw_signal.iter().map(i16::to_string).collect();
        let mut out = format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.read_id,
            self.read_group,
            self.digitisation,
            self.offset,
            self.range,
            self.sampling_rate,
            self.len_raw_signal,
            signal.join(",")
        );
        for (_, value) in &self.auxiliary {
            out.push('\t');
            out.push_str(value);
        }
        out.push('\n');
        w.write_all(out.as_bytes())?;
        Ok(out.len())
    }
}

/// Streaming SLOW5 parser.
#[derive(Debug)]
pub struct Slow5Parser<R> {
    lines: LineReader<R>,
    header: Option<Slow5Header>,
    pending: Option<String>,
    latch: EofLatch,
}

impl<R: BufRead> Slow5Parser<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ParserOptions::slow5())
    }

    pub fn with_options(reader: R, options: ParserOptions) -> Self {
        Self {
            lines: LineReader::new(reader, options.max_line_size),
            header: None,
            pending: None,
            latch: EofLatch::default(),
        }
    }

    fn ensure_header(&mut self) -> Result<&Slow5Header> {
        if self.header.is_none() {
            match self.read_header() {
                Ok(header) => self.header = Some(header),
                Err(e) => {
                    self.header = Some(Slow5Header::default());
                    self.latch.finish();
                    return Err(e);
                }
            }
        }
        Ok(self.header.get_or_insert_with(Slow5Header::default))
    }

    fn read_header(&mut self) -> Result<Slow5Header> {
        let mut header = Slow5Header::default();
        while let Some(line) = self.lines.read_line()? {
            if let Some(attribute) = line.strip_prefix('@') {
                let mut values = attribute.split('\t');
                let name = values.next().unwrap_or_default().to_string();
                header.attributes.push((name, values.map(str::to_string).collect()));
                continue;
            }
            if !line.starts_with('#') {
                self.pending = Some(line);
                break;
            }
            let body = &line[1..];
            let fields: Vec<&str> = body.split('\t').collect();
            match fields[0] {
                "slow5_version" => header.version = fields.get(1).copied().unwrap_or_default().to_string(),
                "num_read_groups" => {
                    let value = fields.get(1).copied().unwrap_or_default();
                    header.num_read_groups = value
                        .parse()
                        .map_err(|_| self.lines.error(format!("invalid num_read_groups {value:?}")))?;
                }
                "read_id" => header.columns = fields.iter().map(|f| (*f).to_string()).collect(),
                _ if header.column_types.is_empty() => {
                    header.column_types = fields.iter().map(|f| (*f).to_string()).collect();
                }
                _ => return Err(self.lines.error(format!("unexpected header line {line:?}"))),
            }
        }

        if header.version.is_empty() {
            return Err(self.lines.error("missing #slow5_version header"));
        }
        if header.columns.len() < PRIMARY_COLUMNS.len()
            || header.columns.iter().zip(PRIMARY_COLUMNS).any(|(c, p)| c != p)
        {
            return Err(self.lines.error(format!(
                "column header must start with {}",
                PRIMARY_COLUMNS.join(", ")
            )));
        }
        if header.column_types.len() != header.columns.len() {
            return Err(self.lines.error(format!(
                "{} column types for {} columns",
                header.column_types.len(),
                header.columns.len()
            )));
        }
        Ok(header)
    }

    fn read_read(&mut self) -> Result<Option<RawRead>> {
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
        let header = self.header.as_ref().ok_or_else(|| self.lines.error("header not read"))?;
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != header.columns.len() {
            return Err(self.lines.error(format!(
                "expected {} columns, found {}",
                header.columns.len(),
                fields.len()
            )));
        }

        let lines = &self.lines;
        let field_error = |name: &str, value: &str| lines.error(format!("invalid {name} {value:?}"));
        let number = |i: usize| -> Result<f64> { fields[i].parse().map_err(|_| field_error(PRIMARY_COLUMNS[i], fields[i])) };

        let read_group: u32 = fields[1].parse().map_err(|_| field_error("read_group", fields[1]))?;
        if read_group as usize >= header.num_read_groups.max(1) {
            return Err(lines.error(format!(
                "read group {read_group} exceeds num_read_groups {}",
                header.num_read_groups
            )));
        }
        let raw_signal = if fields[7].is_empty() {
            Vec::new()
        } else {
            fields[7]
                .split(',')
                .map(|sample| sample.trim().parse::<i16>().map_err(|_| field_error("raw_signal sample", sample)))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Some(RawRead {
            read_id: fields[0].to_string(),
            read_group,
            digitisation: number(2)?,
            offset: number(3)?,
            range: number(4)?,
            sampling_rate: number(5)?,
            len_raw_signal: fields[6].parse().map_err(|_| field_error("len_raw_signal", fields[6]))?,
            raw_signal,
            auxiliary: header.columns[PRIMARY_COLUMNS.len()..]
                .iter()
                .zip(&fields[PRIMARY_COLUMNS.len()..])
                .map(|(column, value)| (column.clone(), (*value).to_string()))
                .collect(),
        }))
    }
}

impl Slow5Parser<Box<dyn BufRead>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(decompressing_reader(file)?))
    }
}

impl<R: BufRead> RecordParser for Slow5Parser<R> {
    type Record = RawRead;
    type Header = Slow5Header;

    fn header(&mut self) -> Result<Slow5Header> {
        self.ensure_header().cloned()
    }

    fn next_record(&mut self) -> Result<Option<RawRead>> {
        if self.latch.is_done() {
            return Ok(None);
        }
        self.ensure_header()?;
        let result = self.read_read();
        if !matches!(result, Ok(Some(_))) {
            self.latch.finish();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "#slow5_version\t0.2.0
#num_read_groups\t1
@asic_id\t4175987214
#char*\tuint32_t\tdouble\tdouble\tdouble\tdouble\tuint64_t\tint16_t*\tuint64_t\tint32_t\tuint8_t\tdouble\tenum{unknown,partial,mux_change,unblock_mux_change,data_service_unblock_mux_change,signal_positive,signal_negative}\tchar*
#read_id\tread_group\tdigitisation\toffset\trange\tsampling_rate\tlen_raw_signal\traw_signal\tstart_time\tread_number\tstart_mux\tmedian_before\tend_reason\tchannel_number
0026631e-33a3-49ab-aa22-3ab157d71f8b\t0\t8192\t16\t1489.52832\t4000\t5347\t430,472,463\t8318394\t5383\t1\t219.133423\t5\t10
";

    #[test]
    fn parses_header_and_reads() {
        let mut parser = Slow5Parser::new(EXAMPLE.as_bytes());
        let (header, reads) = parser.parse_with_header().unwrap();
        assert_eq!(header.version, "0.2.0");
        assert_eq!(header.num_read_groups, 1);
        assert_eq!(header.attribute("asic_id", 0), Some("4175987214"));
        assert_eq!(header.columns.len(), 14);
        assert_eq!(header.enum_labels("end_reason").map(|l| l[5]), Some("signal_positive"));

        assert_eq!(reads.len(), 1);
        let read = &reads[0];
        assert_eq!(read.read_id, "0026631e-33a3-49ab-aa22-3ab157d71f8b");
        assert_eq!(read.raw_signal, vec![430, 472, 463]);
        assert_eq!(read.len_raw_signal, 5347);
        assert!((read.range - 1489.528_32).abs() < 1e-9);
        assert_eq!(read.auxiliary("channel_number"), Some("10"));
        assert_eq!(read.auxiliary("end_reason"), Some("5"));
    }

    #[test]
    fn write_round_trips() {
        let mut parser = Slow5Parser::new(EXAMPLE.as_bytes());
        let (header, reads) = parser.parse_with_header().unwrap();
        let mut out = Vec::new();
        let mut n = header.write_to(&mut out).unwrap();
        for read in &reads {
            n += read.write_to(&mut out).unwrap();
        }
        assert_eq!(n, out.len());
        assert_eq!(String::from_utf8(out).unwrap(), EXAMPLE);
    }

    #[test]
    fn converts_signal_to_picoamperes() {
        let read = RawRead {
            digitisation: 8192.0,
            offset: 16.0,
            range: 1489.52832,
            raw_signal: vec![430],
            ..RawRead::default()
        };
        let pa = read.signal_pa();
        assert!((pa[0] - (446.0 * 1489.52832 / 8192.0)).abs() < 1e-9);
    }

    #[test]
    fn wrong_column_count_is_an_error() {
        let text = EXAMPLE.replace("\t10\n", "\n");
        let err = Slow5Parser::new(text.as_bytes()).next_record().unwrap_err();
        assert!(matches!(err, BasepairError::Parse { line: 6, .. }));
    }

    #[test]
    fn bad_signal_sample_is_an_error() {
        let text = EXAMPLE.replace("430,472,463", "430,x,463");
        assert!(Slow5Parser::new(text.as_bytes()).next_record().is_err());
    }

    #[test]
    fn header_without_primary_columns_is_an_error() {
        let text = "#slow5_version\t0.2.0\n#num_read_groups\t1\n#char*\n#read_id\n";
        let mut parser = Slow5Parser::new(text.as_bytes());
        assert!(parser.header().is_err());
        assert!(parser.next_record().unwrap().is_none());
    }
}
