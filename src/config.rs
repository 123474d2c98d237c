//! Configuration for searches and index builds.
//!
//! Settings are layered:
//! - Default values
//! - TOML configuration file (`.dvg/settings.toml`, searched upwards from the
//!   current directory, or an explicit file)
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! Every layer ends up in one validated, immutable [`SearchConfig`] that the
//! search and index code read from.
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DVG_` and use double
//! underscores to separate nested levels:
//! - `DVG_SEARCH__TOP_K=50` sets `search.top_k`
//! - `DVG_WORKERS__COUNT=4` sets `workers.count`
//! - `DVG_MODEL__DIR=/opt/models` sets `model.dir`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DvgError, DvgResult};
use crate::search::TextFilter;

/// Name of the per-project directory holding settings and index files.
pub const DVG_DIR: &str = ".dvg";

/// File name of the settings file inside [`DVG_DIR`].
pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding index files
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Search defaults
    #[serde(default)]
    pub search: SearchSettings,

    /// Model lookup
    #[serde(default)]
    pub model: ModelSettings,

    /// Worker pool sizing
    #[serde(default)]
    pub workers: WorkerSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchSettings {
    /// Number of results to show
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Lines per paragraph window
    #[serde(default = "default_window")]
    pub window: usize,

    /// Paragraphs shorter than this many characters are penalized
    #[serde(default = "default_min_length")]
    pub min_length: usize,

    /// Character budget of a result excerpt
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,

    /// Report several paragraphs per document instead of the best one
    #[serde(default)]
    pub paragraph_search: bool,

    /// Index pruning ratio; larger values are faster and less accurate
    #[serde(default = "default_over_pruning")]
    pub over_pruning: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    /// Directory searched for `<name>.model.toml` files
    #[serde(default = "default_model_dir")]
    pub dir: PathBuf,

    /// Model used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Number of worker threads
    #[serde(default = "default_worker_count")]
    pub count: usize,

    /// Size of the first dispatched chunk
    #[serde(default = "default_initial_chunk")]
    pub initial_chunk: usize,

    /// Upper bound for chunk sizes
    #[serde(default = "default_max_chunk")]
    pub max_chunk: usize,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_dir() -> PathBuf {
    PathBuf::from(DVG_DIR)
}
fn default_top_k() -> usize {
    20
}
fn default_window() -> usize {
    20
}
fn default_min_length() -> usize {
    80
}
fn default_excerpt_length() -> usize {
    80
}
fn default_over_pruning() -> f32 {
    0.5
}
fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("dvg").join("models"))
        .unwrap_or_else(|| PathBuf::from(DVG_DIR).join("models"))
}
fn default_worker_count() -> usize {
    num_cpus::get()
}
fn default_initial_chunk() -> usize {
    8
}
fn default_max_chunk() -> usize {
    10_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_dir: default_index_dir(),
            search: SearchSettings::default(),
            model: ModelSettings::default(),
            workers: WorkerSettings::default(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            window: default_window(),
            min_length: default_min_length(),
            excerpt_length: default_excerpt_length(),
            paragraph_search: false,
            over_pruning: default_over_pruning(),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            dir: default_model_dir(),
            name: None,
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            initial_chunk: default_initial_chunk(),
            max_chunk: default_max_chunk(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path =
            Self::find_workspace_config().unwrap_or_else(|| Path::new(DVG_DIR).join(SETTINGS_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring `DVG_` variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels
            .merge(Env::prefixed("DVG_").ignore(&["LOG"]).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.dvg/settings.toml` from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(DVG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(SETTINGS_FILE));
            }
        }

        None
    }

    /// Render the effective settings as TOML
    pub fn to_toml(&self) -> DvgResult<String> {
        toml::to_string_pretty(self).map_err(|e| DvgError::Config {
            reason: format!("cannot serialize settings: {e}"),
        })
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> DvgResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| DvgError::FileWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, self.to_toml()?).map_err(|source| DvgError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Command-line values that override [`Settings`]. `None` keeps the setting.
#[derive(Debug, Clone, Default)]
pub struct SearchOverrides {
    pub top_k: Option<usize>,
    pub window: Option<usize>,
    pub min_length: Option<usize>,
    pub excerpt_length: Option<usize>,
    pub paragraph_search: bool,
    pub over_pruning: Option<f32>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub workers: Option<usize>,
}

/// Validated options of one search or index run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchConfig {
    top_k: usize,
    window: usize,
    min_length: usize,
    excerpt_length: usize,
    paragraph_search: bool,
    over_pruning: f32,
    filter: TextFilter,
    workers: usize,
    initial_chunk: usize,
    max_chunk: usize,
}

impl SearchConfig {
    /// Folds CLI overrides into the settings and validates the result.
    pub fn new(settings: &Settings, overrides: SearchOverrides) -> DvgResult<Self> {
        let search = &settings.search;
        let config = Self {
            top_k: overrides.top_k.unwrap_or(search.top_k),
            window: overrides.window.unwrap_or(search.window),
            min_length: overrides.min_length.unwrap_or(search.min_length),
            excerpt_length: overrides.excerpt_length.unwrap_or(search.excerpt_length),
            paragraph_search: overrides.paragraph_search || search.paragraph_search,
            over_pruning: overrides.over_pruning.unwrap_or(search.over_pruning),
            filter: TextFilter::new(overrides.includes, overrides.excludes),
            workers: overrides.workers.unwrap_or(settings.workers.count),
            initial_chunk: settings.workers.initial_chunk,
            max_chunk: settings.workers.max_chunk,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> DvgResult<()> {
        let fail = |reason: String| Err(DvgError::Config { reason });
        if self.top_k == 0 {
            return fail("top_k must be at least 1".to_string());
        }
        if self.window == 0 {
            return fail("window must be at least 1 line".to_string());
        }
        if !self.over_pruning.is_finite() || self.over_pruning < 0.0 {
            return fail(format!(
                "over_pruning must be a non-negative number, got {}",
                self.over_pruning
            ));
        }
        if self.workers == 0 {
            return fail("workers must be at least 1".to_string());
        }
        if self.initial_chunk == 0 || self.initial_chunk > self.max_chunk {
            return fail(format!(
                "chunk sizes must satisfy 1 <= initial_chunk ({}) <= max_chunk ({})",
                self.initial_chunk, self.max_chunk
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    #[must_use]
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    #[must_use]
    pub fn excerpt_length(&self) -> usize {
        self.excerpt_length
    }

    #[must_use]
    pub fn paragraph_search(&self) -> bool {
        self.paragraph_search
    }

    #[must_use]
    pub fn over_pruning(&self) -> f32 {
        self.over_pruning
    }

    #[must_use]
    pub fn filter(&self) -> &TextFilter {
        &self.filter
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub fn initial_chunk(&self) -> usize {
        self.initial_chunk
    }

    #[must_use]
    pub fn max_chunk(&self) -> usize {
        self.max_chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.index_dir, PathBuf::from(".dvg"));
        assert_eq!(settings.search.top_k, 20);
        assert_eq!(settings.search.window, 20);
        assert_eq!(settings.search.min_length, 80);
        assert_eq!(settings.search.excerpt_length, 80);
        assert_eq!(settings.search.over_pruning, 0.5);
        assert!(settings.workers.count > 0);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
index_dir = "idx"

[search]
top_k = 5
paragraph_search = true

[workers]
count = 3
"#;
        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.index_dir, PathBuf::from("idx"));
        assert_eq!(settings.search.top_k, 5);
        assert!(settings.search.paragraph_search);
        assert_eq!(settings.workers.count, 3);
        // untouched values keep their defaults
        assert_eq!(settings.search.window, 20);
        assert_eq!(settings.workers.max_chunk, 10_000);
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.search.window = 7;
        settings.model.name = Some("toy".to_string());
        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.search.window, 7);
        assert_eq!(loaded.model.name.as_deref(), Some("toy"));
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[search]\nexcerpt_length = 40\n").unwrap();

        unsafe {
            std::env::set_var("DVG_SEARCH__EXCERPT_LENGTH", "120");
        }
        let settings = Settings::load_from(&config_path).unwrap();
        unsafe {
            std::env::remove_var("DVG_SEARCH__EXCERPT_LENGTH");
        }
        assert_eq!(settings.search.excerpt_length, 120);
    }

    #[test]
    fn test_overrides_and_validation() {
        let settings = Settings::default();
        let config = SearchConfig::new(
            &settings,
            SearchOverrides {
                top_k: Some(3),
                includes: vec!["needle".to_string()],
                workers: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.top_k(), 3);
        assert_eq!(config.window(), 20);
        assert_eq!(config.workers(), 2);
        assert!(!config.filter().is_empty());

        for overrides in [
            SearchOverrides {
                top_k: Some(0),
                ..Default::default()
            },
            SearchOverrides {
                window: Some(0),
                ..Default::default()
            },
            SearchOverrides {
                over_pruning: Some(f32::NAN),
                ..Default::default()
            },
            SearchOverrides {
                over_pruning: Some(-0.1),
                ..Default::default()
            },
            SearchOverrides {
                workers: Some(0),
                ..Default::default()
            },
        ] {
            let err = SearchConfig::new(&settings, overrides).unwrap_err();
            assert_eq!(err.status_code(), "CONFIG_ERROR");
        }
    }

    #[test]
    fn test_invalid_chunk_settings() {
        let mut settings = Settings::default();
        settings.workers.initial_chunk = 100;
        settings.workers.max_chunk = 10;
        assert!(SearchConfig::new(&settings, SearchOverrides::default()).is_err());
    }
}
