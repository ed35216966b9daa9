// Parser module: turns source data files into ContentEntry values

mod delimited;
pub mod entry;
mod structured;

pub use delimited::DelimitedParser;
pub use entry::*;
pub use structured::{text_of, StructuredParser, ITEMS_KEY};

use crate::error::{Error, Result};
use std::path::Path;

/// Source formats the ingestion layer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Comma separated text, `.csv`
    Delimited,
    /// JSON object trees, `.json`
    Structured,
}

impl SourceFormat {
    /// Every recognized format
    pub const ALL: [SourceFormat; 2] = [SourceFormat::Delimited, SourceFormat::Structured];

    /// Resolve a format from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|format| format.extension() == ext)
    }

    /// File extension without the dot
    pub fn extension(self) -> &'static str {
        match self {
            SourceFormat::Delimited => "csv",
            SourceFormat::Structured => "json",
        }
    }
}

/// Parse a source file into a ContentEntry, dispatching on its extension
pub fn parse(path: &Path, content_type: &str) -> Result<ContentEntry> {
    let format =
        SourceFormat::from_path(path).ok_or_else(|| Error::UnsupportedFormat(path.to_path_buf()))?;

    match format {
        SourceFormat::Delimited => DelimitedParser.parse_file(path, content_type),
        SourceFormat::Structured => StructuredParser.parse_file(path, content_type),
    }
}
