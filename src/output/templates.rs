// Template engine for generating HTML output
//
// Every page is rendered from two templates: the shared `layout.html` and a
// content template picked per content type. The layout pulls the content
// template in with `{% include "content.html" %}`; both see the same context.

use crate::config::{Config, ContentTypeConfig, MenuItem};
use crate::error::{Error, Result};
use crate::navigation::NavigationIndex;
use crate::output::functions::FunctionLibrary;
use crate::parser::ContentEntry;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

/// Shared page shell
pub const LAYOUT_TEMPLATE: &str = "layout.html";
/// Index page content template
pub const INDEX_TEMPLATE: &str = "index.html";
/// Fallback content template
pub const DEFAULT_TEMPLATE: &str = "default.html";
/// Name the resolved content template is registered under
pub const CONTENT_SLOT: &str = "content.html";

const PLAIN_EXT: &str = "html";
const RICH_EXT: &str = "tera";

/// Timestamp layout shown on generated pages
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything a template can see while one page renders
#[derive(Debug, Serialize)]
pub struct RenderContext<'a> {
    pub config: &'a Config,
    pub content: &'a ContentEntry,
    pub navigation: &'a NavigationIndex,
    pub menu: &'a [MenuItem],
    /// Settings of the page's content type, when configured
    pub settings: Option<&'a ContentTypeConfig>,
    pub title: String,
    pub timestamp: String,
}

impl<'a> RenderContext<'a> {
    /// Context for a content page, titled "{site} - {id}"
    pub fn page(
        config: &'a Config,
        content: &'a ContentEntry,
        navigation: &'a NavigationIndex,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            config,
            content,
            navigation,
            menu: &config.menu,
            settings: config.content_type(content.content_type()),
            title: format!("{} - {}", config.name, content.id()),
            timestamp: timestamp.into(),
        }
    }

    /// Context for the index page, titled with the bare site name
    pub fn index(
        config: &'a Config,
        index: &'a ContentEntry,
        navigation: &'a NavigationIndex,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            config,
            content: index,
            navigation,
            menu: &config.menu,
            settings: None,
            title: config.name.clone(),
            timestamp: timestamp.into(),
        }
    }

    fn to_tera(&self) -> Result<Context> {
        Context::from_serialize(self).map_err(|e| Error::template_execution(LAYOUT_TEMPLATE, &e))
    }
}

/// Current local time in the page timestamp layout
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Template engine resolving and composing templates from a directory
pub struct TemplateEngine {
    template_dir: PathBuf,
    library: FunctionLibrary,
}

impl TemplateEngine {
    /// Create an engine reading templates from `template_dir`
    pub fn new(template_dir: impl Into<PathBuf>, library: FunctionLibrary) -> Self {
        Self {
            template_dir: template_dir.into(),
            library,
        }
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Path of the shared layout; missing layout is a resolution error
    pub fn layout_path(&self) -> Result<PathBuf> {
        let path = self.template_dir.join(LAYOUT_TEMPLATE);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::template_resolution(format!(
                "layout template {} is missing",
                path.display()
            )))
        }
    }

    /// Resolve the content template for `name`: `{name}.tera`, then
    /// `{name}.html`, then `default.html`.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let rich = self.template_dir.join(format!("{}.{}", name, RICH_EXT));
        if rich.is_file() {
            return Ok(rich);
        }

        let plain = self.template_dir.join(format!("{}.{}", name, PLAIN_EXT));
        if plain.is_file() {
            return Ok(plain);
        }

        let fallback = self.template_dir.join(DEFAULT_TEMPLATE);
        if fallback.is_file() {
            tracing::debug!(
                template = %plain.display(),
                "template not found, falling back to {}",
                DEFAULT_TEMPLATE
            );
            return Ok(fallback);
        }

        Err(Error::template_resolution(format!(
            "no template for '{}' in {} and {} is missing",
            name,
            self.template_dir.display(),
            DEFAULT_TEMPLATE
        )))
    }

    /// Content template for a page, honouring the content type's template override
    pub fn resolve_for(&self, context: &RenderContext<'_>) -> Result<PathBuf> {
        let name = context
            .settings
            .and_then(|s| s.template.as_deref())
            .unwrap_or(context.content.content_type());
        self.resolve(name)
    }

    /// Path of the index content template; no fallback applies
    pub fn index_path(&self) -> Result<PathBuf> {
        let path = self.template_dir.join(INDEX_TEMPLATE);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::template_resolution(format!(
                "index template {} is missing",
                path.display()
            )))
        }
    }

    /// Render a content page to a string
    pub fn render_to_string(&self, context: &RenderContext<'_>) -> Result<String> {
        let layout = self.layout_path()?;
        let content = self.resolve_for(context)?;
        tracing::debug!(
            layout = %layout.display(),
            content = %content.display(),
            "using templates"
        );
        self.compose(&layout, &content, context)
    }

    /// Render the index page to a string
    pub fn render_index_to_string(&self, context: &RenderContext<'_>) -> Result<String> {
        let layout = self.layout_path()?;
        let index = self.index_path()?;
        self.compose(&layout, &index, context)
    }

    /// Render a content page into `output_path`
    pub fn render(&self, context: &RenderContext<'_>, output_path: &Path) -> Result<()> {
        let html = self.render_to_string(context)?;
        write_atomic(output_path, html.as_bytes())
    }

    /// Render the index page into `output_path`
    pub fn render_index(&self, context: &RenderContext<'_>, output_path: &Path) -> Result<()> {
        let html = self.render_index_to_string(context)?;
        write_atomic(output_path, html.as_bytes())
    }

    fn compose(&self, layout: &Path, content: &Path, context: &RenderContext<'_>) -> Result<String> {
        let layout_src = read_template(layout)?;
        let content_src = read_template(content)?;
        let content_name = display_name(content);

        let mut tera = Tera::default();
        self.library.install(&mut tera);
        tera.add_raw_templates(vec![
            (LAYOUT_TEMPLATE, layout_src.as_str()),
            (CONTENT_SLOT, content_src.as_str()),
        ])
        .map_err(|e| Error::template_execution(&content_name, &e))?;

        let ctx = context.to_tera()?;
        tera.render(LAYOUT_TEMPLATE, &ctx)
            .map_err(|e| Error::template_execution(&content_name, &e))
    }
}

fn read_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::template_resolution(format!("cannot read {}: {}", path.display(), e))
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Mode of written pages; temp files start out owner-only
#[cfg(unix)]
const PAGE_MODE: u32 = 0o644;

/// Write `bytes` to `path` through a temporary file in the same directory,
/// so readers never observe a partially written page.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| Error::io_write(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io_write(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(PAGE_MODE))
            .map_err(|e| Error::io_write(path, e))?;
    }
    tmp.write_all(bytes).map_err(|e| Error::io_write(path, e))?;
    tmp.persist(path).map_err(|e| Error::io_write(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Row;
    use tempfile::TempDir;

    const LAYOUT: &str =
        "<html><head><title>{{ title }}</title></head><body>{% include \"content.html\" %}<footer>{{ timestamp }}</footer></body></html>";

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    fn engine(dir: &TempDir) -> TemplateEngine {
        TemplateEngine::new(dir.path(), FunctionLibrary::standard())
    }

    fn sample_entry() -> ContentEntry {
        let mut row = Row::new();
        row.insert("word".to_string(), "猫".to_string());
        row.insert("meaning".to_string(), "cat & kitten".to_string());
        ContentEntry::new(
            PathBuf::from("data/vocabulary/n1.csv"),
            "vocabulary",
            vec!["word".to_string(), "meaning".to_string()],
            vec![row],
        )
    }

    fn sample_nav() -> NavigationIndex {
        [(
            "vocabulary".to_string(),
            vec!["n1".to_string(), "n2".to_string()],
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_resolution_prefers_rich_then_plain_then_default() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);

        let err = engine.resolve("grammar").unwrap_err();
        assert!(matches!(err, Error::TemplateResolution(_)));

        write(dir.path(), "default.html", "default");
        assert_eq!(engine.resolve("grammar").unwrap(), dir.path().join("default.html"));

        write(dir.path(), "grammar.html", "plain");
        assert_eq!(engine.resolve("grammar").unwrap(), dir.path().join("grammar.html"));

        write(dir.path(), "grammar.tera", "rich");
        assert_eq!(engine.resolve("grammar").unwrap(), dir.path().join("grammar.tera"));
    }

    #[test]
    fn test_missing_layout_is_resolution_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "vocabulary.html", "x");

        let config = Config::default();
        let entry = sample_entry();
        let nav = sample_nav();
        let ctx = RenderContext::page(&config, &entry, &nav, "2024-01-01 00:00:00");

        let err = engine(&dir).render_to_string(&ctx).unwrap_err();
        assert!(matches!(err, Error::TemplateResolution(_)));
    }

    #[test]
    fn test_page_render_composes_layout_and_content() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "layout.html", LAYOUT);
        write(
            dir.path(),
            "vocabulary.html",
            "<h1>{{ settings.title }}</h1>{% for row in content.rows %}<p>{{ row.word }}: {{ row.meaning }}</p>{% endfor %}<nav>{{ navigation.vocabulary | join(sep=\",\") }}</nav>",
        );

        let config = Config::default();
        let entry = sample_entry();
        let nav = sample_nav();
        let ctx = RenderContext::page(&config, &entry, &nav, "2024-01-01 00:00:00");

        let html = engine(&dir).render_to_string(&ctx).unwrap();
        assert!(html.contains("<title>Study Materials - n1</title>"));
        assert!(html.contains("<h1>Vocabulary</h1>"));
        assert!(html.contains("<p>猫: cat &amp; kitten</p>"));
        assert!(html.contains("<nav>n1,n2</nav>"));
        assert!(html.contains("<footer>2024-01-01 00:00:00</footer>"));
    }

    #[test]
    fn test_render_is_deterministic_with_fixed_timestamp() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "layout.html", LAYOUT);
        write(
            dir.path(),
            "default.html",
            "{{ content | json_encode() }}{{ config | json_encode() }}{{ navigation | json_encode() }}",
        );

        let config = Config::default();
        let entry = sample_entry();
        let nav = sample_nav();
        let engine = engine(&dir);

        let first = engine
            .render_to_string(&RenderContext::page(&config, &entry, &nav, "2024-01-01 00:00:00"))
            .unwrap();
        let second = engine
            .render_to_string(&RenderContext::page(&config, &entry, &nav, "2024-01-01 00:00:00"))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_template_override_from_settings() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "layout.html", "{% include \"content.html\" %}");
        write(dir.path(), "vocabulary.html", "plain");
        write(dir.path(), "cards.tera", "cards");

        let mut config = Config::default();
        config
            .content_types
            .get_mut("vocabulary")
            .unwrap()
            .template = Some("cards".to_string());
        let entry = sample_entry();
        let nav = sample_nav();
        let ctx = RenderContext::page(&config, &entry, &nav, "t");

        assert_eq!(engine(&dir).render_to_string(&ctx).unwrap(), "cards");
    }

    #[test]
    fn test_execution_error_names_template() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "layout.html", "{% include \"content.html\" %}");
        write(dir.path(), "vocabulary.html", "{{ content.nope.deeper }}");

        let config = Config::default();
        let entry = sample_entry();
        let nav = sample_nav();
        let ctx = RenderContext::page(&config, &entry, &nav, "t");

        let err = engine(&dir).render_to_string(&ctx).unwrap_err();
        match err {
            Error::TemplateExecution { template, .. } => assert_eq!(template, "vocabulary.html"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failed_render_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "layout.html", "{% include \"content.html\" %}");
        write(dir.path(), "vocabulary.html", "{{ undefined_value }}");

        let config = Config::default();
        let entry = sample_entry();
        let nav = sample_nav();
        let ctx = RenderContext::page(&config, &entry, &nav, "t");

        let out = dir.path().join("out/vocabulary/n1.html");
        assert!(engine(&dir).render(&ctx, &out).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_index_render_uses_site_name() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "layout.html", LAYOUT);
        write(
            dir.path(),
            "index.html",
            "{% for kind, ids in navigation %}<h2>{{ kind }}</h2>{% for id in ids %}<a href=\"/{{ kind }}/{{ id }}.html\">{{ id }}</a>{% endfor %}{% endfor %}",
        );

        let config = Config::default();
        let index = ContentEntry::index();
        let nav = sample_nav();
        let ctx = RenderContext::index(&config, &index, &nav, "t");

        let out = dir.path().join("out/index.html");
        engine(&dir).render_index(&ctx, &out).unwrap();

        let html = std::fs::read_to_string(out).unwrap();
        assert!(html.contains("<title>Study Materials</title>"));
        assert!(html.contains("<a href=\"/vocabulary/n2.html\">n2</a>"));
    }

    #[test]
    fn test_index_without_template_is_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "layout.html", LAYOUT);
        write(dir.path(), "default.html", "x");

        let config = Config::default();
        let index = ContentEntry::index();
        let nav = sample_nav();
        let ctx = RenderContext::index(&config, &index, &nav, "t");

        let err = engine(&dir).render_index_to_string(&ctx).unwrap_err();
        assert!(matches!(err, Error::TemplateResolution(_)));
    }

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/page.html");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");

        let leftovers = std::fs::read_dir(dir.path().join("a/b")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_pages_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        write_atomic(&path, b"<p>hi</p>").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644, "page mode is {:o}", mode);
    }

    #[test]
    fn test_timestamp_layout() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[13..14], ":");
    }
}
