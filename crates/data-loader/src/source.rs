//! Ordered record source over delimited text.
//!
//! Rows are read lazily, one at a time, so a multi-million row ratings file
//! is never held in memory. The source is finite and cannot be restarted.

use crate::error::{DataLoadError, Result};
use crate::types::RawRow;
use csv::StringRecord;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// Streams `RawRow`s out of a headed, comma-delimited CSV input
pub struct CsvRecordSource<R> {
    reader: csv::Reader<R>,
    headers: StringRecord,
}

impl CsvRecordSource<File> {
    /// Open a CSV file.
    ///
    /// Returns `DataLoadError::MissingSource` if the file does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => DataLoadError::MissingSource {
                path: path.display().to_string(),
            },
            _ => DataLoadError::Io(err),
        })?;
        let source = Self::from_reader(file)?;
        debug!(
            "Reading {} (columns: {})",
            path.display(),
            source.headers().collect::<Vec<_>>().join(",")
        );
        Ok(source)
    }
}

impl<R: Read> CsvRecordSource<R> {
    /// Build a source over any reader; the first line must be the header row
    pub fn from_reader(reader: R) -> Result<Self> {
        // flexible: short rows surface as absent fields, not reader errors
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b',')
            .flexible(true)
            .from_reader(reader);
        let headers = reader.headers()?.clone();

        Ok(Self { reader, headers })
    }

    /// Column names from the header row
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }
}

impl<R: Read> Iterator for CsvRecordSource<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(true) => {
                let line = record
                    .position()
                    .map(|pos| pos.line() as usize)
                    .unwrap_or_default();
                let row = RawRow::new(line, self.headers.iter().zip(record.iter()));
                Some(Ok(row))
            }
            Ok(false) => None,
            Err(err) => Some(Err(err.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_rows_in_order() {
        let data = "movieId,title,year,genres\n1,Toy Story,1995,Animation\n2,Jumanji,,Adventure\n";
        let source = CsvRecordSource::from_reader(data.as_bytes()).unwrap();
        let rows: Vec<RawRow> = source.collect::<Result<_>>().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("title"), Some("Toy Story"));
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].get("year"), Some(""));
        assert_eq!(rows[1].non_blank("year"), None);
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn test_quoted_fields_keep_commas() {
        let data = "movieId,title\n11,\"American President, The\"\n";
        let mut source = CsvRecordSource::from_reader(data.as_bytes()).unwrap();
        let row = source.next().unwrap().unwrap();

        assert_eq!(row.get("title"), Some("American President, The"));
    }

    #[test]
    fn test_short_rows_have_absent_fields() {
        let data = "userId,name,country\n5\n";
        let mut source = CsvRecordSource::from_reader(data.as_bytes()).unwrap();
        let row = source.next().unwrap().unwrap();

        assert_eq!(row.get("userId"), Some("5"));
        assert_eq!(row.get("country"), None);
    }

    #[test]
    fn test_missing_file_is_missing_source() {
        let err = CsvRecordSource::open(Path::new("definitely/not/here.csv")).err().unwrap();
        assert!(err.is_missing_source());
    }
}
