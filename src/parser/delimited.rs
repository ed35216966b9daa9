// Delimited-text (CSV) reader
//
// First record is the header row. Records may be shorter or longer than the
// header: extra cells are dropped, missing cells are simply absent.

use crate::error::{Error, Result};
use crate::parser::entry::{ContentEntry, Row};
use std::io::Read;
use std::path::Path;

const BOM: char = '\u{feff}';

/// Parser for comma separated files
pub struct DelimitedParser;

impl DelimitedParser {
    /// Parse the file at `path`
    pub fn parse_file(&self, path: &Path, content_type: &str) -> Result<ContentEntry> {
        let file = std::fs::File::open(path).map_err(|e| Error::SourceRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.parse_reader(file, path, content_type)
    }

    /// Parse delimited text from any reader; `path` names the source in the entry
    pub fn parse_reader<R: Read>(
        &self,
        reader: R,
        path: &Path,
        content_type: &str,
    ) -> Result<ContentEntry> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = reader.records();

        let headers: Vec<String> = match records.next() {
            None => return Err(Error::EmptyInput(path.to_path_buf())),
            Some(record) => record
                .map_err(|e| Error::malformed(path, e.to_string()))?
                .iter()
                .map(str::to_string)
                .collect(),
        };
        let headers = strip_bom(headers);

        let mut rows = Vec::new();
        for record in records {
            let record = record.map_err(|e| Error::malformed(path, e.to_string()))?;
            let row: Row = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.clone(), value.to_string()))
                .collect();
            rows.push(row);
        }

        Ok(ContentEntry::new(
            path.to_path_buf(),
            content_type,
            headers,
            rows,
        ))
    }
}

fn strip_bom(mut headers: Vec<String>) -> Vec<String> {
    if let Some(first) = headers.first_mut() {
        if first.starts_with(BOM) {
            *first = first.trim_start_matches(BOM).to_string();
        }
    }
    headers
}
