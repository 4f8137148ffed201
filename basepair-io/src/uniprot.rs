//! UniProt XML entries.
//!
//! UniProt ships as one very large XML document (`uniprot_sprot.xml.gz`), so
//! the parser never builds the whole tree. A small pull tokenizer walks the
//! byte stream and only `<entry>` elements are materialized, one per
//! [`RecordParser::next_record`] call. Everything between entries (the root
//! element, the trailing `<copyright>`, comments) is skipped.
//!
//! Element names are matched by local name, so namespace prefixes are
//! ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use basepair_core::compress::decompressing_reader;
use basepair_core::{BasepairError, EofLatch, RecordParser, Result, WriteTo};

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// An XML element with its attributes, child elements and text content.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct Element {
    /// Local name, without namespace prefix.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
    /// Concatenated character data, trimmed.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// One UniProt `<entry>`.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
#[serde(transparent)]
pub struct Entry {
    pub root: Element,
}

impl Entry {
    /// `Swiss-Prot` or `TrEMBL`.
    pub fn dataset(&self) -> Option<&str> {
        self.root.attribute("dataset")
    }

    /// Accessions in file order; the first is the primary accession.
    pub fn accessions(&self) -> Vec<&str> {
        self.root
            .children_named("accession")
            .map(|e| e.text.as_str())
            .collect()
    }

    /// Entry names such as `GFP_AEQVI`.
    pub fn names(&self) -> Vec<&str> {
        self.root.children_named("name").map(|e| e.text.as_str()).collect()
    }

    /// Recommended full protein name.
    pub fn protein_name(&self) -> Option<&str> {
        self.root
            .child("protein")?
            .child("recommendedName")?
            .child("fullName")
            .map(|e| e.text.as_str())
    }

    /// Scientific name of the source organism.
    pub fn organism(&self) -> Option<&str> {
        self.root
            .child("organism")?
            .children_named("name")
            .find(|n| n.attribute("type") == Some("scientific"))
            .map(|n| n.text.as_str())
    }

    /// Amino acid sequence with any embedded whitespace removed.
    pub fn sequence(&self) -> Option<String> {
        self.root
            .child("sequence")
            .map(|s| s.text.chars().filter(|c| !c.is_whitespace()).collect())
    }
}

impl WriteTo for Entry {
    /// Write the entry as a single JSON object.
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize> {
        let json = serde_json::to_vec(self)
            .map_err(|e| BasepairError::InvalidInput(format!("cannot encode entry as JSON: {e}")))?;
        w.write_all(&json)?;
        Ok(json.len())
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Event {
    Start {
        name: String,
        attributes: Vec<(String, String)>,
        empty: bool,
    },
    End(String),
    Text(String),
    Eof,
}

/// Pull tokenizer over a buffered byte stream. Comments, processing
/// instructions and the doctype are consumed silently.
#[derive(Debug)]
struct XmlReader<R> {
    inner: R,
    line: usize,
    buf: Vec<u8>,
    pending_text: bool,
}

impl<R: BufRead> XmlReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            line: 1,
            buf: Vec::new(),
            pending_text: false,
        }
    }

    fn error(&self, message: impl Into<String>) -> BasepairError {
        BasepairError::parse(self.line, message)
    }

    /// Append bytes up to and including `delim` to `buf`. Returns false at
    /// end of input.
    fn read_until(&mut self, delim: u8, buf: &mut Vec<u8>) -> Result<bool> {
        let start = buf.len();
        let n = self.inner.read_until(delim, buf)?;
        self.line += buf[start..].iter().filter(|&&b| b == b'\n').count();
        Ok(n > 0 && buf.last() == Some(&delim))
    }

    fn next_event(&mut self) -> Result<Event> {
        // Character data first. A '<' that ended the previous text belongs to
        // the markup that follows.
        if !self.pending_text {
            let mut text = Vec::new();
            let found = self.read_until(b'<', &mut text)?;
            if found {
                text.pop();
                self.pending_text = true;
            }
            if !text.is_empty() {
                let text = String::from_utf8(text).map_err(|_| self.error("invalid UTF-8 in character data"))?;
                return Ok(Event::Text(decode_entities(&text)));
            }
            if !found {
                return Ok(Event::Eof);
            }
        }
        self.pending_text = false;

        let mut markup = Vec::new();
        if !self.read_until(b'>', &mut markup)? {
            return Err(self.error("unexpected end of input inside markup"));
        }
        markup.pop();

        if markup.starts_with(b"!--") {
            while !markup.ends_with(b"--") {
                markup.push(b'>');
                if !self.read_until(b'>', &mut markup)? {
                    return Err(self.error("unterminated comment"));
                }
                markup.pop();
            }
            return self.next_event();
        }
        if markup.starts_with(b"![CDATA[") {
            while !markup.ends_with(b"]]") {
                markup.push(b'>');
                if !self.read_until(b'>', &mut markup)? {
                    return Err(self.error("unterminated CDATA section"));
                }
                markup.pop();
            }
            let body = &markup[8..markup.len() - 2];
            let text = String::from_utf8(body.to_vec()).map_err(|_| self.error("invalid UTF-8 in CDATA"))?;
            return Ok(Event::Text(text));
        }
        if markup.starts_with(b"?") {
            return self.next_event();
        }
        if markup.starts_with(b"!") {
            // Doctype, possibly with an internal subset holding '>'.
            let depth = |m: &[u8]| {
                m.iter().filter(|&&b| b == b'[').count() as i64 - m.iter().filter(|&&b| b == b']').count() as i64
            };
            while depth(&markup) > 0 {
                markup.push(b'>');
                if !self.read_until(b'>', &mut markup)? {
                    return Err(self.error("unterminated doctype"));
                }
                markup.pop();
            }
            return self.next_event();
        }

        // Attribute values may legally contain '>'.
        while open_quote(&markup) {
            markup.push(b'>');
            if !self.read_until(b'>', &mut markup)? {
                return Err(self.error("unterminated attribute value"));
            }
            markup.pop();
        }
        let markup = String::from_utf8(markup).map_err(|_| self.error("invalid UTF-8 in tag"))?;

        if let Some(name) = markup.strip_prefix('/') {
            return Ok(Event::End(local_name(name.trim()).to_string()));
        }
        let (body, empty) = match markup.strip_suffix('/') {
            Some(body) => (body, true),
            None => (markup.as_str(), false),
        };
        let (name, attributes) = self.parse_tag(body)?;
        Ok(Event::Start { name, attributes, empty })
    }

    fn parse_tag(&self, body: &str) -> Result<(String, Vec<(String, String)>)> {
        let body = body.trim();
        let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
        let name = &body[..name_end];
        if name.is_empty() {
            return Err(self.error("element without a name"));
        }
        let mut attributes = Vec::new();
        let mut rest = body[name_end..].trim_start();
        while !rest.is_empty() {
            let Some(eq) = rest.find('=') else {
                return Err(self.error(format!("attribute without value in <{name}>")));
            };
            let key = rest[..eq].trim();
            let after = rest[eq + 1..].trim_start();
            let Some(quote) = after.chars().next().filter(|c| *c == '"' || *c == '\'') else {
                return Err(self.error(format!("unquoted attribute value in <{name}>")));
            };
            let Some(close) = after[1..].find(quote) else {
                return Err(self.error(format!("unterminated attribute value in <{name}>")));
            };
            let value = decode_entities(&after[1..=close]);
            if !key.starts_with("xmlns") {
                attributes.push((local_name(key).to_string(), value));
            }
            rest = after[close + 2..].trim_start();
        }
        Ok((local_name(name).to_string(), attributes))
    }
}

fn open_quote(markup: &[u8]) -> bool {
    let mut quote = None;
    for &b in markup {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None => {}
        }
    }
    quote.is_some()
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Replace the predefined and numeric character references. Unknown
/// references are left as written.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                .and_then(std::result::Result::ok)
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Streaming parser yielding one [`Entry`] per `<entry>` element.
#[derive(Debug)]
pub struct UniProtParser<R> {
    xml: XmlReader<R>,
    latch: EofLatch,
}

impl<R: BufRead> UniProtParser<R> {
    /// Parse plain XML.
    pub fn new(reader: R) -> Self {
        Self {
            xml: XmlReader::new(reader),
            latch: EofLatch::default(),
        }
    }

    fn read_entry(&mut self) -> Result<Option<Entry>> {
        loop {
            match self.xml.next_event()? {
                Event::Eof => return Ok(None),
                Event::Start { name, attributes, empty } if name == "entry" => {
                    let mut root = Element {
                        name,
                        attributes,
                        ..Element::default()
                    };
                    if !empty {
                        self.read_children(&mut root)?;
                    }
                    return Ok(Some(Entry { root }));
                }
                _ => {}
            }
        }
    }

    fn read_children(&mut self, parent: &mut Element) -> Result<()> {
        let mut text = String::new();
        loop {
            match self.xml.next_event()? {
                Event::Eof => {
                    return Err(self.xml.error(format!("unexpected end of input inside <{}>", parent.name)));
                }
                Event::Text(t) => text.push_str(&t),
                Event::Start { name, attributes, empty } => {
                    let mut child = Element {
                        name,
                        attributes,
                        ..Element::default()
                    };
                    if !empty {
                        self.read_children(&mut child)?;
                    }
                    parent.children.push(child);
                }
                Event::End(name) => {
                    if name != parent.name {
                        return Err(self.xml.error(format!(
                            "mismatched closing tag </{name}>, expected </{}>",
                            parent.name
                        )));
                    }
                    parent.text = text.trim().to_string();
                    return Ok(());
                }
            }
        }
    }
}

impl<R: Read> UniProtParser<BufReader<MultiGzDecoder<R>>> {
    /// Parse a gzip-wrapped stream, the form UniProt distributes.
    pub fn gzipped(reader: R) -> Self {
        Self::new(BufReader::new(MultiGzDecoder::new(reader)))
    }
}

impl UniProtParser<Box<dyn BufRead>> {
    /// Open a UniProt XML file, transparently decoding gzip or zstd.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(decompressing_reader(file)?))
    }
}

impl<R: BufRead> RecordParser for UniProtParser<R> {
    type Record = Entry;
    type Header = ();

    fn header(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_record(&mut self) -> Result<Option<Entry>> {
        if self.latch.is_done() {
            return Ok(None);
        }
        let result = self.read_entry();
        if !matches!(result, Ok(Some(_))) {
            self.latch.finish();
        }
        result
    }
}
