//! Configuration management for mermark.
//!
//! Parses `mermark.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! `diagrams.kroki_url` supports environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override preview theme.
    pub theme: Option<String>,
    /// Override Kroki URL for diagram rendering.
    pub kroki_url: Option<String>,
}

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "mermark.toml";

/// Kroki server used when the config does not name one.
pub const DEFAULT_KROKI_URL: &str = "https://kroki.io";

/// Upper bound for `preview.settle_ms`.
const MAX_SETTLE_MS: u64 = 10_000;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preview configuration.
    pub preview: PreviewConfig,
    /// Diagram configuration as written in TOML.
    diagrams: DiagramsConfigRaw,
    /// Export page configuration.
    pub export: ExportConfig,
    /// Element name to CSS class overrides.
    pub styles: BTreeMap<String, String>,

    /// Resolved diagrams configuration (set after loading).
    #[serde(skip)]
    pub diagrams_resolved: DiagramsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Preview configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Initial theme (`light` or `dark`).
    pub theme: String,
    /// Quiet period after an edit before diagram renders start.
    pub settle_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            theme: "light".to_owned(),
            settle_ms: 120,
        }
    }
}

/// Raw diagrams configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DiagramsConfigRaw {
    kroki_url: Option<String>,
    fence_tags: Option<Vec<String>>,
    timeout_secs: Option<u64>,
}

/// Resolved diagram rendering configuration.
#[derive(Debug, PartialEq, Eq)]
pub struct DiagramsConfig {
    /// Kroki server URL for diagram rendering.
    pub kroki_url: String,
    /// Code fence language tags treated as diagrams.
    pub fence_tags: Vec<String>,
    /// HTTP timeout for a single render request.
    pub timeout_secs: u64,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            kroki_url: DEFAULT_KROKI_URL.to_owned(),
            fence_tags: vec!["mermaid".to_owned(), "diagram".to_owned()],
            timeout_secs: 30,
        }
    }
}

/// Export page configuration, in millimeters.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub margin_mm: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 10.0,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`diagrams.kroki_url`").
        field: String,
        /// Error message (e.g., "${`KROKI_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mermark.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, then the result is validated.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or a value is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(theme) = &settings.theme {
            self.preview.theme.clone_from(theme);
        }
        if let Some(kroki_url) = &settings.kroki_url {
            self.diagrams_resolved.kroki_url.clone_from(kroki_url);
        }
    }

    /// Search for the config file in `start` and its parents.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.resolve();
        config.config_path = Some(path.to_path_buf());
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_preview()?;
        self.validate_diagrams()?;
        self.validate_export()?;
        Ok(())
    }

    fn validate_preview(&self) -> Result<(), ConfigError> {
        let theme = self.preview.theme.to_ascii_lowercase();
        if theme != "light" && theme != "dark" {
            return Err(ConfigError::Validation(format!(
                "preview.theme must be \"light\" or \"dark\", got \"{}\"",
                self.preview.theme
            )));
        }
        if self.preview.settle_ms > MAX_SETTLE_MS {
            return Err(ConfigError::Validation(format!(
                "preview.settle_ms cannot exceed {MAX_SETTLE_MS}"
            )));
        }
        Ok(())
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        let diagrams = &self.diagrams_resolved;
        require_non_empty(&diagrams.kroki_url, "diagrams.kroki_url")?;
        require_http_url(&diagrams.kroki_url, "diagrams.kroki_url")?;

        if diagrams.fence_tags.is_empty() {
            return Err(ConfigError::Validation(
                "diagrams.fence_tags must name at least one tag".to_owned(),
            ));
        }
        for tag in &diagrams.fence_tags {
            if tag.trim().is_empty() || tag.contains(char::is_whitespace) {
                return Err(ConfigError::Validation(format!(
                    "diagrams.fence_tags contains invalid tag \"{tag}\""
                )));
            }
        }

        if diagrams.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "diagrams.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_export(&self) -> Result<(), ConfigError> {
        let export = &self.export;
        if !export.margin_mm.is_finite() || export.margin_mm < 0.0 {
            return Err(ConfigError::Validation(
                "export.margin_mm must be non-negative".to_owned(),
            ));
        }
        let content_width = export.page_width_mm - 2.0 * export.margin_mm;
        let content_height = export.page_height_mm - 2.0 * export.margin_mm;
        if !is_positive(content_width) || !is_positive(content_height) {
            return Err(ConfigError::Validation(format!(
                "export.margin_mm of {}mm leaves no content area on a {}mm x {}mm page",
                export.margin_mm, export.page_width_mm, export.page_height_mm
            )));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.diagrams.kroki_url {
            self.diagrams.kroki_url = Some(expand::expand_env(url, "diagrams.kroki_url")?);
        }
        Ok(())
    }

    /// Fill resolved sections from the raw TOML values and defaults.
    fn resolve(&mut self) {
        let defaults = DiagramsConfig::default();
        let raw = &self.diagrams;
        self.diagrams_resolved = DiagramsConfig {
            kroki_url: raw
                .kroki_url
                .as_deref()
                .map_or(defaults.kroki_url, |url| url.trim_end_matches('/').to_owned()),
            fence_tags: raw.fence_tags.clone().unwrap_or(defaults.fence_tags),
            timeout_secs: raw.timeout_secs.unwrap_or(defaults.timeout_secs),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(toml: &str) -> Config {
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve();
        config
    }

    fn write_config(dir: &Path, toml: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILENAME);
        std::fs::write(&path, toml).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.preview.theme, "light");
        assert_eq!(config.preview.settle_ms, 120);
        assert_eq!(config.diagrams_resolved.kroki_url, "https://kroki.io");
        assert_eq!(config.diagrams_resolved.fence_tags, vec!["mermaid", "diagram"]);
        assert_eq!(config.diagrams_resolved.timeout_secs, 30);
        assert_eq!(config.export, ExportConfig::default());
        assert!(config.styles.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = parse("");
        assert_eq!(config.preview.theme, "light");
        assert_eq!(config.diagrams_resolved, DiagramsConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(
            r#"
[preview]
theme = "dark"
settle_ms = 250

[diagrams]
kroki_url = "http://localhost:8000/"
fence_tags = ["mermaid"]
timeout_secs = 5

[export]
page_width_mm = 216.0
page_height_mm = 279.0
margin_mm = 12.5

[styles]
h1 = "title"
table = "grid"
"#,
        );

        assert_eq!(config.preview.theme, "dark");
        assert_eq!(config.preview.settle_ms, 250);
        assert_eq!(
            config.diagrams_resolved,
            DiagramsConfig {
                kroki_url: "http://localhost:8000".to_owned(),
                fence_tags: vec!["mermaid".to_owned()],
                timeout_secs: 5,
            }
        );
        assert_eq!(
            config.export,
            ExportConfig {
                page_width_mm: 216.0,
                page_height_mm: 279.0,
                margin_mm: 12.5,
            }
        );
        assert_eq!(config.styles.get("h1").map(String::as_str), Some("title"));
        assert_eq!(config.styles.len(), 2);
    }

    #[test]
    fn test_unknown_field_type_is_parse_error() {
        let result: Result<Config, _> = toml::from_str("[preview]\nsettle_ms = \"soon\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[preview]\ntheme = \"dark\"\n");

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.preview.theme, "dark");
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[diagrams]\nkroki_url = \"ftp://kroki\"\n");

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("diagrams.kroki_url"));
    }

    #[test]
    fn test_load_expands_kroki_url() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("MERMARK_TEST_CONFIG_KROKI", "http://kroki.local");
        }
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[diagrams]\nkroki_url = \"${MERMARK_TEST_CONFIG_KROKI}\"\n",
        );

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.diagrams_resolved.kroki_url, "http://kroki.local");
        unsafe {
            std::env::remove_var("MERMARK_TEST_CONFIG_KROKI");
        }
    }

    #[test]
    fn test_load_missing_env_var() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::remove_var("MERMARK_TEST_CONFIG_MISSING");
        }
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[diagrams]\nkroki_url = \"${MERMARK_TEST_CONFIG_MISSING}\"\n",
        );

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { ref field, .. } if field == "diagrams.kroki_url"));
    }

    #[test]
    fn test_discover_in_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "");
        let nested = dir.path().join("docs").join("notes");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(Config::discover_from(&nested), Some(path));
    }

    #[test]
    fn test_discover_prefers_nearest() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "");
        let nested = dir.path().join("docs");
        std::fs::create_dir_all(&nested).unwrap();
        let nearest = write_config(&nested, "");

        assert_eq!(Config::discover_from(&nested), Some(nearest));
    }

    #[test]
    fn test_cli_settings_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[preview]\ntheme = \"light\"\n\n[diagrams]\nkroki_url = \"https://kroki.io\"\n",
        );
        let settings = CliSettings {
            theme: Some("dark".to_owned()),
            kroki_url: Some("http://localhost:8000".to_owned()),
        };

        let config = Config::load(Some(&path), Some(&settings)).unwrap();
        assert_eq!(config.preview.theme, "dark");
        assert_eq!(config.diagrams_resolved.kroki_url, "http://localhost:8000");
    }

    #[test]
    fn test_cli_settings_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "");
        let settings = CliSettings {
            theme: Some("sepia".to_owned()),
            ..Default::default()
        };

        let err = Config::load(Some(&path), Some(&settings)).unwrap_err();
        assert!(err.to_string().contains("preview.theme"));
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.preview.theme, "light");
        assert_eq!(config.diagrams_resolved.kroki_url, DEFAULT_KROKI_URL);
    }

    #[test]
    fn test_validate_theme_case_insensitive() {
        let config = parse("[preview]\ntheme = \"Dark\"\n");
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_settle_too_long() {
        let config = parse("[preview]\nsettle_ms = 60000\n");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("preview.settle_ms"));
    }

    #[test]
    fn test_validate_empty_fence_tags() {
        let config = parse("[diagrams]\nfence_tags = []\n");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("diagrams.fence_tags"));
    }

    #[test]
    fn test_validate_fence_tag_with_space() {
        let config = parse("[diagrams]\nfence_tags = [\"mer maid\"]\n");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config = parse("[diagrams]\ntimeout_secs = 0\n");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("diagrams.timeout_secs"));
    }

    #[test]
    fn test_validate_empty_kroki_url() {
        let mut config = Config::default();
        config.diagrams_resolved.kroki_url = String::new();
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: diagrams.kroki_url cannot be empty"
        );
    }

    #[test]
    fn test_validate_margins_consume_page() {
        let config = parse("[export]\nmargin_mm = 105.0\n");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("export.margin_mm"));
    }

    #[test]
    fn test_validate_negative_margin() {
        let config = parse("[export]\nmargin_mm = -1.0\n");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_custom_page_size() {
        let config = parse("[export]\npage_width_mm = 100.0\npage_height_mm = 50.0\nmargin_mm = 0.0\n");
        config.validate().unwrap();
    }
}
