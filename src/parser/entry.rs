// Content model shared by every source format
//
// One ContentEntry per source file. Values are text only: templates render
// strings, so numeric and boolean sources are flattened on the way in.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One row of content, column name -> text value
pub type Row = BTreeMap<String, String>;

/// Content type tag of the synthetic index entity
pub const INDEX_CONTENT_TYPE: &str = "index";

/// Identifier of the synthetic index entity
pub const INDEX_ID: &str = "index";

/// Normalized representation of one source data file
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContentEntry {
    source_path: PathBuf,
    content_type: String,
    id: String,
    headers: Vec<String>,
    rows: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<serde_json::Value>,
}

impl ContentEntry {
    /// Create an entry; the identifier is derived from the file stem
    pub fn new(
        source_path: PathBuf,
        content_type: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Row>,
    ) -> Self {
        let id = content_id(&source_path);
        Self {
            source_path,
            content_type: content_type.into(),
            id,
            headers,
            rows,
            raw: None,
        }
    }

    /// Attach the parsed source tree
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// The synthetic entity rendered into the index page
    pub fn index() -> Self {
        Self {
            source_path: PathBuf::from(INDEX_ID),
            content_type: INDEX_CONTENT_TYPE.to_string(),
            id: INDEX_ID.to_string(),
            headers: Vec::new(),
            rows: Vec::new(),
            raw: None,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// URL slug of the page built from this entry
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Column names in display order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn raw(&self) -> Option<&serde_json::Value> {
        self.raw.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Derive the content identifier from a source path: the file name without
/// its last extension.
pub fn content_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
