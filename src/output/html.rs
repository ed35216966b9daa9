// HTML site generator
//
// Drives a full build: output directory, static assets, the source scan,
// one page per source file and finally the index page.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::navigation::{NavigationIndex, SourceFile, SourceTree};
use crate::output::functions::FunctionLibrary;
use crate::output::templates::{timestamp_now, RenderContext, TemplateEngine};
use crate::parser::{self, ContentEntry};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory under the template root copied verbatim into the output
pub const STATIC_DIR: &str = "static";

/// Site generator
pub struct HtmlGenerator {
    config: Config,
    engine: TemplateEngine,
    verbose: bool,
    timestamp: Option<String>,
}

impl HtmlGenerator {
    /// Create a generator using the standard template function library
    pub fn new(config: Config) -> Self {
        Self::with_library(config, FunctionLibrary::standard())
    }

    /// Create a generator with a custom function library
    pub fn with_library(config: Config, library: FunctionLibrary) -> Self {
        let engine = TemplateEngine::new(config.template_dir.clone(), library);
        Self {
            config,
            engine,
            verbose: false,
            timestamp: None,
        }
    }

    /// Show a progress bar while pages render
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Stamp every page with a fixed timestamp instead of the current time
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the output directory
    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Output path of a content page
    pub fn page_path(&self, content_type: &str, id: &str) -> PathBuf {
        self.config
            .output_dir
            .join(content_type)
            .join(format!("{}.html", id))
    }

    /// Run the complete build
    pub fn generate(&self) -> Result<GenerationReport> {
        let mut report = GenerationReport::default();

        tracing::info!(output = %self.output_dir().display(), "preparing output directory");
        self.create_directories()?;

        report.assets_copied = self.copy_static_assets()?;

        tracing::info!(data = %self.config.data_dir.display(), "scanning source files");
        let tree = SourceTree::scan(&self.config.data_dir)?;
        let navigation = tree.navigation();
        tracing::info!(
            content_types = tree.groups().len(),
            files = tree.file_count(),
            "source scan complete"
        );

        self.generate_pages(&tree, &navigation, &mut report)?;

        tracing::info!("generating index page");
        self.generate_index(&navigation)?;
        report.index_generated = true;
        report.pages_generated += 1;

        Ok(report)
    }

    /// Create the output directory structure
    fn create_directories(&self) -> Result<()> {
        let dir = &self.config.output_dir;
        fs::create_dir_all(dir).map_err(|e| Error::io_write(dir, e))
    }

    /// Copy `{template_dir}/static` into `{output_dir}/static`.
    /// Returns the number of files copied.
    pub fn copy_static_assets(&self) -> Result<usize> {
        let source = self.config.template_dir.join(STATIC_DIR);
        if !source.is_dir() {
            tracing::debug!(dir = %source.display(), "no static assets to copy");
            return Ok(0);
        }
        let target = self.config.output_dir.join(STATIC_DIR);

        let mut copied = 0;
        for entry in WalkDir::new(&source).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&source)
                .map_err(|e| Error::other(e.to_string()))?;
            let dest = target.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io_write(parent, e))?;
            }
            fs::copy(entry.path(), &dest).map_err(|e| Error::io_write(&dest, e))?;
            tracing::debug!(from = %entry.path().display(), to = %dest.display(), "copied static file");
            copied += 1;
        }

        tracing::info!(files = copied, "static assets copied");
        Ok(copied)
    }

    fn generate_pages(
        &self,
        tree: &SourceTree,
        navigation: &NavigationIndex,
        report: &mut GenerationReport,
    ) -> Result<()> {
        let progress = if self.verbose {
            let pb = ProgressBar::new(tree.file_count() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .map_err(|e| Error::other(e.to_string()))?
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        for group in tree.groups() {
            let mut seen = HashSet::new();

            for file in &group.files {
                if let Some(ref pb) = progress {
                    pb.set_message(file.id.clone());
                    pb.inc(1);
                }

                if !seen.insert(file.id.as_str()) {
                    let reason = format!(
                        "duplicate content id '{}' in {}",
                        file.id, group.content_type
                    );
                    tracing::warn!(file = %file.path.display(), "skipping: {}", reason);
                    report.skipped.push(SkippedFile {
                        path: file.path.clone(),
                        reason,
                    });
                    continue;
                }

                match self.generate_page(&group.content_type, file, navigation) {
                    Ok(output) => {
                        tracing::info!(page = %output.display(), "rendered");
                        report.pages_generated += 1;
                    }
                    Err(e) if e.is_file_scoped() => {
                        tracing::warn!(file = %file.path.display(), "skipping: {}", e);
                        report.skipped.push(SkippedFile {
                            path: file.path.clone(),
                            reason: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        Ok(())
    }

    /// Parse one source file and render its page
    fn generate_page(
        &self,
        content_type: &str,
        file: &SourceFile,
        navigation: &NavigationIndex,
    ) -> Result<PathBuf> {
        tracing::debug!(file = %file.path.display(), format = ?file.format, "parsing");
        let entry = parser::parse(&file.path, content_type)?;

        let output = self.page_path(content_type, entry.id());
        let context = RenderContext::page(&self.config, &entry, navigation, self.timestamp());
        self.engine.render(&context, &output)?;
        Ok(output)
    }

    /// Generate the main index page
    fn generate_index(&self, navigation: &NavigationIndex) -> Result<()> {
        let index = ContentEntry::index();
        let context = RenderContext::index(&self.config, &index, navigation, self.timestamp());
        let path = self.config.output_dir.join("index.html");
        self.engine.render_index(&context, &path)
    }

    fn timestamp(&self) -> String {
        self.timestamp.clone().unwrap_or_else(timestamp_now)
    }
}

/// Remove the output directory. A missing directory is fine.
pub fn clean(output_dir: &Path) -> Result<bool> {
    match fs::remove_dir_all(output_dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io_write(output_dir, e)),
    }
}

/// A source file left out of the build
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Report of what was generated
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Pages written, index included
    pub pages_generated: usize,
    /// Static files copied
    pub assets_copied: usize,
    pub index_generated: bool,
    pub skipped: Vec<SkippedFile>,
}

impl GenerationReport {
    pub fn summary(&self) -> String {
        format!(
            "Generated {} pages, static files: {}, skipped: {}, index: {}",
            self.pages_generated,
            self.assets_copied,
            self.skipped.len(),
            if self.index_generated { "yes" } else { "no" }
        )
    }
}
