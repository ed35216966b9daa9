use std::path::PathBuf;
use thiserror::Error;

/// Studysite error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    #[error("Cannot read directory {path}: {source}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Empty input file: {0}")]
    EmptyInput(PathBuf),

    #[error("Malformed input in {path}: {message}")]
    MalformedInput { path: PathBuf, message: String },

    #[error("Cannot read source file {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template not found: {0}")]
    TemplateResolution(String),

    #[error("Failed to render template {template}: {message}")]
    TemplateExecution { template: String, message: String },

    #[error("Failed to write {path}: {source}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for studysite operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    /// Create a malformed input error
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::MalformedInput {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a template resolution error
    pub fn template_resolution(msg: impl Into<String>) -> Self {
        Error::TemplateResolution(msg.into())
    }

    /// Wrap a Tera failure, keeping the whole cause chain in the message.
    ///
    /// Tera's top-level message is usually just "Failed to render 'x'", the
    /// useful part (unknown variable, bad filter argument) lives in `source()`.
    pub fn template_execution(template: impl Into<String>, err: &tera::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Error::TemplateExecution {
            template: template.into(),
            message,
        }
    }

    /// Create a write error for `path`
    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a directory access error for `path`
    pub fn directory_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::DirectoryAccess {
            path: path.into(),
            source,
        }
    }

    /// Create a server error
    pub fn server(msg: impl Into<String>) -> Self {
        Error::Server(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Errors confined to a single source file.
    ///
    /// The build skips the file and keeps going; everything else aborts the run.
    pub fn is_file_scoped(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat(_)
                | Error::EmptyInput(_)
                | Error::MalformedInput { .. }
                | Error::SourceRead { .. }
                | Error::TemplateResolution(_)
                | Error::TemplateExecution { .. }
        )
    }
}
