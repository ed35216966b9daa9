//! Studysite - Generate a static study site from data files
//!
//! Reads vocabulary tables (CSV) and grammar quizzes (JSON) from a data
//! directory, renders one page per file through Tera templates, and writes
//! a static HTML site with a preview server for local browsing.

pub mod cli;
pub mod config;
pub mod error;
pub mod navigation;
pub mod output;
pub mod parser;
pub mod serve;

// Re-export main types
pub use config::Config;
pub use error::{Error, Result};
pub use navigation::NavigationIndex;
pub use output::{GenerationReport, HtmlGenerator};
pub use parser::ContentEntry;
pub use serve::PreviewServer;
