//! Headerless, ragged CSV input shared by the table loaders.

use std::io::Read;

use basepair_core::BasepairError;

pub(crate) fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

pub(crate) fn line_of(record: &csv::StringRecord) -> usize {
    record.position().map_or(0, |p| p.line() as usize)
}

pub(crate) fn error(e: csv::Error) -> BasepairError {
    let line = e.position().map_or(0, |p| p.line() as usize);
    if e.is_io_error() {
        if let csv::ErrorKind::Io(io) = e.into_kind() {
            return BasepairError::Io(io);
        }
        return BasepairError::parse(line, "csv read failed");
    }
    BasepairError::parse(line, e.to_string())
}
