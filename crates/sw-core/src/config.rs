//! Build manifest and precache configuration.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("build version must not be empty")]
    EmptyVersion,

    #[error("invalid exclude pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("external asset is not an absolute URL: {url}")]
    InvalidAsset { url: String },
}

/// Asset lists and version handed over by the build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Opaque identifier unique per build.
    pub version: String,
    /// Files generated by the bundler.
    #[serde(default)]
    pub build: Vec<String>,
    /// Files in the static directory.
    #[serde(default)]
    pub files: Vec<String>,
}

impl BuildManifest {
    /// Create a manifest for a version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            build: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Set generated build artifact paths.
    pub fn with_build<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Set static file paths.
    pub fn with_files<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = paths.into_iter().map(Into::into).collect();
        self
    }
}

/// Assets precached in addition to the build output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecacheConfig {
    /// App routes to cache up front.
    #[serde(default = "default_routes")]
    pub routes: Vec<String>,
    /// Absolute cross-origin URLs needed for page load.
    #[serde(default = "default_external_assets")]
    pub external_assets: Vec<String>,
    /// Static files matching this pattern are never precached.
    #[serde(default = "default_exclude_pattern")]
    pub exclude_pattern: String,
}

fn default_routes() -> Vec<String> {
    vec!["/".to_string(), "/settings".to_string()]
}

fn default_external_assets() -> Vec<String> {
    vec![
        "https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700;800&display=swap"
            .to_string(),
        "https://unpkg.com/ress/dist/ress.min.css".to_string(),
        "https://fonts.gstatic.com/s/inter/v11/UcC73FwrK3iLTeHuS_fvQtMwCp50KnMa1ZL7W0Q5nw.woff2"
            .to_string(),
    ]
}

// iOS icons are large and rarely requested.
fn default_exclude_pattern() -> String {
    r"/icons/(apple.*?|original\.png)".to_string()
}

impl Default for PrecacheConfig {
    fn default() -> Self {
        Self {
            routes: default_routes(),
            external_assets: default_external_assets(),
            exclude_pattern: default_exclude_pattern(),
        }
    }
}

impl PrecacheConfig {
    /// Replace the route list.
    pub fn with_routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.routes = routes.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the external asset list.
    pub fn with_external_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external_assets = assets.into_iter().map(Into::into).collect();
        self
    }

    /// Compile the exclusion pattern.
    pub fn exclude_regex(&self) -> Result<Regex, ConfigError> {
        Ok(Regex::new(&self.exclude_pattern)?)
    }

    /// Parse the external assets as absolute URLs.
    pub fn external_urls(&self) -> Result<Vec<Url>, ConfigError> {
        self.external_assets
            .iter()
            .map(|asset| {
                Url::parse(asset).map_err(|_| ConfigError::InvalidAsset { url: asset.clone() })
            })
            .collect()
    }
}

/// Full worker configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Build output and version.
    pub build: BuildManifest,
    /// Hard-coded precache additions.
    #[serde(default)]
    pub precache: PrecacheConfig,
}

impl WorkerConfig {
    /// Create a config with default precache settings.
    pub fn new(build: BuildManifest) -> Self {
        Self {
            build,
            precache: PrecacheConfig::default(),
        }
    }

    /// Set precache settings.
    pub fn with_precache(mut self, precache: PrecacheConfig) -> Self {
        self.precache = precache;
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file; `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.version.trim().is_empty() {
            return Err(ConfigError::EmptyVersion);
        }
        self.precache.exclude_regex()?;
        self.precache.external_urls()?;
        Ok(())
    }
}
