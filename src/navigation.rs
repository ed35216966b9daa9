//! Source tree scanning and the navigation index.
//!
//! The data directory has one level of content-type directories, each holding
//! source files:
//!
//! ```text
//! data/
//! ├── grammar/
//! │   └── g1.json
//! └── vocabulary/
//!     ├── n1.csv
//!     └── n2.csv
//! ```
//!
//! Listing order is always lexicographic so that builds are reproducible no
//! matter what order the filesystem returns entries in.

use crate::error::{Error, Result};
use crate::parser::{content_id, SourceFormat};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A recognized source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub id: String,
    pub format: SourceFormat,
}

/// All recognized source files of one content type, sorted by file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceGroup {
    pub content_type: String,
    pub files: Vec<SourceFile>,
}

/// The scanned data directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTree {
    groups: Vec<SourceGroup>,
}

impl SourceTree {
    /// Scan `root`. Failing to list the root or any content-type directory is fatal.
    pub fn scan(root: &Path) -> Result<Self> {
        let mut groups = Vec::new();

        for dir in sorted_entries(root)? {
            if !dir.is_dir() {
                continue;
            }
            let Some(content_type) = visible_name(&dir) else {
                continue;
            };

            let mut files = Vec::new();
            for path in sorted_entries(&dir)? {
                if !path.is_file() || visible_name(&path).is_none() {
                    continue;
                }
                if let Some(format) = SourceFormat::from_path(&path) {
                    files.push(SourceFile {
                        id: content_id(&path),
                        path,
                        format,
                    });
                }
            }

            groups.push(SourceGroup {
                content_type,
                files,
            });
        }

        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[SourceGroup] {
        &self.groups
    }

    /// Total number of recognized files
    pub fn file_count(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }

    /// Derive the navigation index. Duplicate identifiers within a content type
    /// (`a.csv` next to `a.json`) are listed once.
    pub fn navigation(&self) -> NavigationIndex {
        let mut entries = BTreeMap::new();
        for group in &self.groups {
            let mut ids: Vec<String> = Vec::with_capacity(group.files.len());
            for file in &group.files {
                if !ids.contains(&file.id) {
                    ids.push(file.id.clone());
                }
            }
            ids.sort();
            entries.insert(group.content_type.clone(), ids);
        }
        NavigationIndex { entries }
    }
}

/// Content type -> ordered content identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NavigationIndex {
    entries: BTreeMap<String, Vec<String>>,
}

impl NavigationIndex {
    /// Scan the data directory and build the index
    pub fn scan(root: &Path) -> Result<Self> {
        Ok(SourceTree::scan(root)?.navigation())
    }

    /// Identifiers listed for a content type
    pub fn ids(&self, content_type: &str) -> Option<&[String]> {
        self.entries.get(content_type).map(Vec::as_slice)
    }

    /// Content types in lexicographic order
    pub fn content_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, content_type: &str, id: &str) -> bool {
        self.ids(content_type)
            .is_some_and(|ids| ids.iter().any(|candidate| candidate == id))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.entries
    }
}

impl FromIterator<(String, Vec<String>)> for NavigationIndex {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let read = std::fs::read_dir(dir).map_err(|e| Error::directory_access(dir, e))?;

    let mut paths = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| Error::directory_access(dir, e))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn visible_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x\n").unwrap();
    }

    #[test]
    fn test_scan_lists_types_and_ids_in_order() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "vocabulary/n2.csv");
        touch(dir.path(), "vocabulary/n1.csv");
        touch(dir.path(), "grammar/g1.json");

        let nav = NavigationIndex::scan(dir.path()).unwrap();

        let expected: NavigationIndex = [
            ("grammar".to_string(), vec!["g1".to_string()]),
            (
                "vocabulary".to_string(),
                vec!["n1".to_string(), "n2".to_string()],
            ),
        ]
        .into_iter()
        .collect();
        assert_eq!(nav, expected);
        assert_eq!(
            nav.content_types().collect::<Vec<_>>(),
            ["grammar", "vocabulary"]
        );
    }

    #[test]
    fn test_scan_skips_unrecognized_hidden_and_nested() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "vocabulary/n1.csv");
        touch(dir.path(), "vocabulary/notes.txt");
        touch(dir.path(), "vocabulary/.n0.csv");
        touch(dir.path(), "vocabulary/deeper/n9.csv");
        touch(dir.path(), ".git/config.json");
        touch(dir.path(), "README.csv");

        let tree = SourceTree::scan(dir.path()).unwrap();
        assert_eq!(tree.groups().len(), 1);
        assert_eq!(tree.file_count(), 1);
        assert_eq!(tree.groups()[0].files[0].id, "n1");
        assert_eq!(tree.groups()[0].files[0].format, SourceFormat::Delimited);
    }

    #[test]
    fn test_empty_type_directory_is_listed() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("grammar")).unwrap();

        let nav = NavigationIndex::scan(dir.path()).unwrap();
        assert_eq!(nav.ids("grammar"), Some(&[][..]));
    }

    #[test]
    fn test_duplicate_ids_listed_once() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "vocabulary/a.csv");
        touch(dir.path(), "vocabulary/a.json");
        touch(dir.path(), "vocabulary/b.json");

        let tree = SourceTree::scan(dir.path()).unwrap();
        assert_eq!(tree.file_count(), 3);

        let nav = tree.navigation();
        assert_eq!(nav.ids("vocabulary").unwrap(), ["a", "b"]);
        assert!(nav.contains("vocabulary", "b"));
        assert!(!nav.contains("grammar", "b"));
    }

    #[test]
    fn test_missing_root_is_directory_access_error() {
        let result = NavigationIndex::scan(Path::new("/nonexistent/data"));
        assert!(matches!(result, Err(Error::DirectoryAccess { .. })));
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let nav: NavigationIndex = [("grammar".to_string(), vec!["g1".to_string()])]
            .into_iter()
            .collect();
        let value = serde_json::to_value(&nav).unwrap();
        assert_eq!(value, serde_json::json!({"grammar": ["g1"]}));
    }
}
