use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_TEMPLATE_DIR: &str = "templates";
const DEFAULT_OUTPUT_DIR: &str = "output";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Site name, used in page titles
    pub name: String,
    /// Base URL for deployments under a sub-path (empty for local use)
    pub base_url: String,
    pub theme: ThemeConfig,
    pub menu: Vec<MenuItem>,
    /// Per content type settings, keyed by content type tag
    pub content_types: BTreeMap<String, ContentTypeConfig>,
    pub data_dir: PathBuf,
    pub template_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Theme color and font tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    pub primary_color: String,
    pub secondary_color: String,
    pub text_color: String,
    pub text_muted: String,
    pub background_color: String,
    pub background_alt: String,
    pub border_color: String,
    pub success_color: String,
    pub error_color: String,
    pub warn_color: String,
    pub info_color: String,
    pub font: String,
}

/// Navigation menu entry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MenuItem {
    pub label: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Content type this entry belongs to, used to highlight the active section
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
}

/// Settings for one content type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentTypeConfig {
    pub title: String,
    /// Template base name to use instead of the content type tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub show_search: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_layout: Option<String>,
    pub show_result_immediately: bool,
    pub highlight_correct: bool,
    /// Fields in display order
    pub fields: Vec<FieldConfig>,
}

/// Display settings for one column
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldConfig {
    pub name: String,
    pub label: String,
    pub display: bool,
}

impl FieldConfig {
    fn new(name: &str, label: &str, display: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            display,
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            primary_color: "#2563eb".to_string(),
            secondary_color: "#4b5563".to_string(),
            text_color: "#111827".to_string(),
            text_muted: "#6b7280".to_string(),
            background_color: "#ffffff".to_string(),
            background_alt: "#f9fafb".to_string(),
            border_color: "#e5e7eb".to_string(),
            success_color: "#10b981".to_string(),
            error_color: "#ef4444".to_string(),
            warn_color: "#f59e0b".to_string(),
            info_color: "#3b82f6".to_string(),
            font: "system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif"
                .to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut content_types = BTreeMap::new();

        content_types.insert(
            "vocabulary".to_string(),
            ContentTypeConfig {
                title: "Vocabulary".to_string(),
                template: None,
                show_search: true,
                card_layout: Some("flip".to_string()),
                show_result_immediately: false,
                highlight_correct: false,
                fields: vec![
                    FieldConfig::new("japanese", "Kanji", true),
                    FieldConfig::new("reading", "Reading", true),
                    FieldConfig::new("meaning", "Meaning", true),
                    FieldConfig::new("sino_vietnamese", "Sino-Vietnamese", true),
                ],
            },
        );

        content_types.insert(
            "grammar".to_string(),
            ContentTypeConfig {
                title: "Grammar".to_string(),
                template: None,
                show_search: false,
                card_layout: None,
                show_result_immediately: false,
                highlight_correct: true,
                fields: vec![
                    FieldConfig::new("number", "Question Number", true),
                    FieldConfig::new("question", "Question", true),
                    FieldConfig::new("answer", "Correct Answer", false),
                    FieldConfig::new("options", "Options", true),
                ],
            },
        );

        Self {
            name: "Study Materials".to_string(),
            base_url: String::new(),
            theme: ThemeConfig::default(),
            menu: vec![
                MenuItem {
                    label: "Vocabulary".to_string(),
                    url: "/index.html#vocabulary".to_string(),
                    icon: Some("book".to_string()),
                    content_type: Some("vocabulary".to_string()),
                    children: Vec::new(),
                },
                MenuItem {
                    label: "Grammar".to_string(),
                    url: "/index.html#grammar".to_string(),
                    icon: Some("pencil".to_string()),
                    content_type: Some("grammar".to_string()),
                    children: Vec::new(),
                },
            ],
            content_types,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.fill_empty_dirs();
        config.validate()?;
        Ok(config)
    }

    /// Load config from `path`, writing the defaults there first if the file is missing
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        let config = Config::default();
        config.save(path)?;
        tracing::info!(path = %path.display(), "wrote default configuration");
        Ok(config)
    }

    /// Persist config as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io_write(parent, e))?;
        }
        std::fs::write(path, contents).map_err(|e| Error::io_write(path, e))?;
        Ok(())
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(
        &mut self,
        data_dir: Option<PathBuf>,
        template_dir: Option<PathBuf>,
        output_dir: Option<PathBuf>,
    ) {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(dir) = template_dir {
            self.template_dir = dir;
        }
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
    }

    /// Settings for a content type, if configured
    pub fn content_type(&self, tag: &str) -> Option<&ContentTypeConfig> {
        self.content_types.get(tag)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config_validation("site name must not be empty"));
        }

        if self.output_dir == self.data_dir || self.output_dir == self.template_dir {
            return Err(Error::config_validation(
                "output_dir must differ from data_dir and template_dir",
            ));
        }

        for (tag, settings) in &self.content_types {
            if let Some(template) = &settings.template {
                if template.trim().is_empty() || template.contains(['/', '\\']) {
                    return Err(Error::config_validation(format!(
                        "content type '{}' has an invalid template name '{}'",
                        tag, template
                    )));
                }
            }
        }

        Ok(())
    }

    fn fill_empty_dirs(&mut self) {
        if self.data_dir.as_os_str().is_empty() {
            self.data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        }
        if self.template_dir.as_os_str().is_empty() {
            self.template_dir = PathBuf::from(DEFAULT_TEMPLATE_DIR);
        }
        if self.output_dir.as_os_str().is_empty() {
            self.output_dir = PathBuf::from(DEFAULT_OUTPUT_DIR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.name, "Study Materials");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.template_dir, PathBuf::from("templates"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.menu.len(), 2);
        assert!(config.content_type("vocabulary").unwrap().show_search);
        assert!(config.content_type("grammar").unwrap().highlight_correct);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_menu_links_into_index() {
        // Only the index page is guaranteed to exist after a build
        let config = Config::default();
        for item in &config.menu {
            let tag = item.content_type.as_deref().unwrap();
            assert_eq!(item.url, format!("/index.html#{}", tag));
        }
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r##"
name = "N3 Review"
base_url = "/n3"
output_dir = "public"

[theme]
primary_color = "#000000"

[[menu]]
label = "Words"
url = "/vocabulary/n1.html"
content_type = "vocabulary"

[[menu.children]]
label = "Lesson 1"
url = "/vocabulary/n1.html"

[content_types.vocabulary]
title = "Words"
template = "cards"
show_search = true

[[content_types.vocabulary.fields]]
name = "word"
label = "Word"
display = true
"##
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.name, "N3 Review");
        assert_eq!(config.base_url, "/n3");
        assert_eq!(config.output_dir, PathBuf::from("public"));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.theme.primary_color, "#000000");
        // unspecified theme tokens keep their defaults
        assert_eq!(config.theme.text_color, "#111827");
        assert_eq!(config.menu.len(), 1);
        assert_eq!(config.menu[0].children.len(), 1);
        assert!(config.menu[0].icon.is_none());

        let vocab = config.content_type("vocabulary").unwrap();
        assert_eq!(vocab.template.as_deref(), Some("cards"));
        assert_eq!(vocab.fields[0].label, "Word");
        assert!(config.content_type("grammar").is_none());
    }

    #[test]
    fn test_empty_dirs_fall_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "data_dir = \"\"\ntemplate_dir = \"\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.template_dir, PathBuf::from("templates"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "name = [unterminated").unwrap();

        let result = Config::load(file.path());
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_load_or_init_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_or_init(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_validation_empty_name() {
        let mut config = Config::default();
        config.name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_output_overlaps_data() {
        let mut config = Config::default();
        config.output_dir = config.data_dir.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_template_override_with_path() {
        let mut config = Config::default();
        config
            .content_types
            .get_mut("grammar")
            .unwrap()
            .template = Some("../escape".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_cli_dirs() {
        let mut config = Config::default();
        config.merge_cli(None, Some(PathBuf::from("theme")), Some(PathBuf::from("site")));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.template_dir, PathBuf::from("theme"));
        assert_eq!(config.output_dir, PathBuf::from("site"));
    }
}
