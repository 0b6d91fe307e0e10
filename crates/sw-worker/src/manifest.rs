//! Precache manifest construction.

use std::collections::BTreeSet;

use regex::Regex;
use sw_core::{RequestKey, WorkerConfig};
use url::Url;

use crate::error::WorkerError;

/// Deduplicated set of absolute URLs to precache.
///
/// Built once per worker version; the same set answers "is this a static
/// asset" for the interceptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeSet<Url>,
    keys: BTreeSet<RequestKey>,
}

impl Manifest {
    /// Build the manifest for a worker served from `location`.
    ///
    /// Static files matching the exclusion pattern are dropped. Static
    /// files, build artifacts and routes are resolved against the worker
    /// origin; external assets are taken as-is.
    pub fn build(config: &WorkerConfig, location: &Url) -> Result<Self, WorkerError> {
        let exclude = config.precache.exclude_regex()?;
        let external = config.precache.external_urls()?;
        let origin = location.origin().ascii_serialization();

        let mut manifest = Self::default();
        let static_files = config
            .build
            .files
            .iter()
            .filter(|path| !is_excluded(&exclude, path));
        let local = static_files
            .chain(config.build.build.iter())
            .chain(config.precache.routes.iter());
        for path in local {
            manifest.insert(resolve(&origin, path)?);
        }
        for url in external {
            manifest.insert(url);
        }

        tracing::debug!(
            origin = %origin,
            entries = manifest.len(),
            "built precache manifest"
        );
        Ok(manifest)
    }

    fn insert(&mut self, url: Url) {
        self.keys.insert(RequestKey::from_url(&url));
        self.entries.insert(url);
    }

    /// Whether a URL is one of the precached entries (fragment ignored).
    pub fn contains(&self, url: &Url) -> bool {
        self.keys.contains(&RequestKey::from_url(url))
    }

    /// Entries in a stable order.
    pub fn urls(&self) -> Vec<Url> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_excluded(pattern: &Regex, path: &str) -> bool {
    let excluded = pattern.is_match(path);
    if excluded {
        tracing::trace!(path, "excluding static file from precache");
    }
    excluded
}

fn resolve(origin: &str, path: &str) -> Result<Url, WorkerError> {
    if origin == "null" {
        return Err(WorkerError::Manifest {
            entry: path.to_string(),
            message: "worker location has an opaque origin".to_string(),
        });
    }
    Url::parse(&format!("{origin}{path}")).map_err(|e| WorkerError::Manifest {
        entry: path.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_core::{BuildManifest, PrecacheConfig};

    fn location() -> Url {
        Url::parse("https://app.example.com/service-worker.js").unwrap()
    }

    fn local_only(build: BuildManifest) -> WorkerConfig {
        WorkerConfig::new(build)
            .with_precache(PrecacheConfig::default().with_external_assets(Vec::<String>::new()))
    }

    #[test]
    fn test_builds_absolute_urls() {
        let config = local_only(BuildManifest::new("V1").with_build(["/app.js"]));
        let manifest = Manifest::build(&config, &location()).unwrap();

        let urls: Vec<String> = manifest.iter().map(Url::to_string).collect();
        assert_eq!(
            urls,
            vec![
                "https://app.example.com/",
                "https://app.example.com/app.js",
                "https://app.example.com/settings",
            ]
        );
    }

    #[test]
    fn test_excludes_ios_icons_from_static_files() {
        let config = local_only(BuildManifest::new("V1").with_files([
            "/icons/apple-touch-icon.png",
            "/icons/original.png",
            "/icons/icon-192.png",
            "/favicon.ico",
        ]));
        let manifest = Manifest::build(&config, &location()).unwrap();

        let icon = Url::parse("https://app.example.com/icons/icon-192.png").unwrap();
        let apple = Url::parse("https://app.example.com/icons/apple-touch-icon.png").unwrap();
        let original = Url::parse("https://app.example.com/icons/original.png").unwrap();
        assert!(manifest.contains(&icon));
        assert!(!manifest.contains(&apple));
        assert!(!manifest.contains(&original));
        assert_eq!(manifest.len(), 4);
    }

    #[test]
    fn test_exclusion_applies_only_to_static_files() {
        let config = local_only(BuildManifest::new("V1").with_build(["/icons/apple-generated.png"]));
        let manifest = Manifest::build(&config, &location()).unwrap();
        let url = Url::parse("https://app.example.com/icons/apple-generated.png").unwrap();
        assert!(manifest.contains(&url));
    }

    #[test]
    fn test_duplicates_collapse() {
        let config = local_only(
            BuildManifest::new("V1")
                .with_build(["/app.js", "/settings"])
                .with_files(["/app.js"]),
        );
        let manifest = Manifest::build(&config, &location()).unwrap();
        assert_eq!(manifest.len(), 3);
    }

    #[test]
    fn test_external_assets_are_kept_verbatim() {
        let config = WorkerConfig::new(BuildManifest::new("V1"));
        let manifest = Manifest::build(&config, &location()).unwrap();
        let reset = Url::parse("https://unpkg.com/ress/dist/ress.min.css").unwrap();
        assert_eq!(manifest.len(), 5);
        assert!(manifest
            .iter()
            .any(|url| url.host_str() == Some("fonts.googleapis.com")));
        assert!(manifest.contains(&reset));
    }

    #[test]
    fn test_contains_ignores_fragment() {
        let config = local_only(BuildManifest::new("V1"));
        let manifest = Manifest::build(&config, &location()).unwrap();
        let url = Url::parse("https://app.example.com/settings#theme").unwrap();
        assert!(manifest.contains(&url));
    }

    #[test]
    fn test_origin_keeps_non_default_port() {
        let config = local_only(BuildManifest::new("V1"));
        let location = Url::parse("http://localhost:4173/service-worker.js").unwrap();
        let manifest = Manifest::build(&config, &location).unwrap();
        let root = Url::parse("http://localhost:4173/").unwrap();
        assert!(manifest.contains(&root));
    }

    #[test]
    fn test_opaque_origin_is_rejected() {
        let config = local_only(BuildManifest::new("V1"));
        let location = Url::parse("data:text/javascript,worker").unwrap();
        let result = Manifest::build(&config, &location);
        assert!(matches!(result, Err(WorkerError::Manifest { .. })));
    }
}
