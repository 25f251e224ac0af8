use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{CollisionPolicy, ContentId};
use crate::error::MetaError;
use crate::pokeapi::{DEFAULT_BASE_URL, HttpOptions};

pub const CONFIG_FILE: &str = "pokemeta.json";
pub const DEFAULT_CID: &str = "bafybeif5inisqdaiu7kbv7gnwe6zbwpvr4kr5wuiebfb6cidaq6ipxwbua";

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_source_images")]
    pub source_images: Utf8PathBuf,
    #[serde(default = "default_numbered_images")]
    pub numbered_images: Utf8PathBuf,
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: Utf8PathBuf,
    #[serde(default = "default_max_items")]
    pub max_items: Option<usize>,
    #[serde(default = "default_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: usize,
    #[serde(default = "default_cid")]
    pub cid: String,
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
    #[serde(default)]
    pub on_collision: CollisionPolicy,
    #[serde(default = "default_cache")]
    pub cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_images: default_source_images(),
            numbered_images: default_numbered_images(),
            metadata_dir: default_metadata_dir(),
            max_items: default_max_items(),
            api_base_url: default_base_url(),
            language: default_language(),
            request_interval_ms: default_request_interval_ms(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            cid: default_cid(),
            image_extension: default_image_extension(),
            on_collision: CollisionPolicy::default(),
            cache: default_cache(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub source_images: Utf8PathBuf,
    pub numbered_images: Utf8PathBuf,
    pub metadata_dir: Utf8PathBuf,
    pub max_items: Option<usize>,
    pub language: String,
    pub http: HttpOptions,
    pub cid: ContentId,
    pub image_extension: String,
    pub on_collision: CollisionPolicy,
    pub cache: bool,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `pokemeta.json` when present, or the built-in
    /// defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, MetaError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            tracing::debug!("no {CONFIG_FILE} found, using defaults");
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| MetaError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| MetaError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, MetaError> {
        let cid = config.cid.parse()?;
        let image_extension = normalize_extension(&config.image_extension)?;

        Ok(ResolvedConfig {
            source_images: config.source_images,
            numbered_images: config.numbered_images,
            metadata_dir: config.metadata_dir,
            max_items: config.max_items,
            language: config.language,
            http: HttpOptions {
                base_url: config.api_base_url,
                timeout: Duration::from_secs(config.timeout_secs),
                request_interval: Duration::from_millis(config.request_interval_ms),
                max_retries: config.max_retries,
            },
            cid,
            image_extension,
            on_collision: config.on_collision,
            cache: config.cache,
        })
    }
}

/// Strips a leading dot; an empty extension is rejected.
pub fn normalize_extension(value: &str) -> Result<String, MetaError> {
    let extension = value.trim().trim_start_matches('.');
    if extension.is_empty() {
        return Err(MetaError::ConfigParse(
            "image_extension must not be empty".to_string(),
        ));
    }
    Ok(extension.to_string())
}

fn default_source_images() -> Utf8PathBuf {
    Utf8PathBuf::from("data/pokemon_images/byName")
}

fn default_numbered_images() -> Utf8PathBuf {
    Utf8PathBuf::from("data/pokemon_images/byNumber")
}

fn default_metadata_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("data/pokemon_metadata")
}

fn default_max_items() -> Option<usize> {
    Some(100)
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_request_interval_ms() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_cid() -> String {
    DEFAULT_CID.to_string()
}

fn default_image_extension() -> String {
    "png".to_string()
}

fn default_cache() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.max_items, Some(100));
        assert_eq!(resolved.cid.as_str(), DEFAULT_CID);
        assert_eq!(resolved.http.request_interval, Duration::from_millis(300));
        assert_eq!(resolved.on_collision, CollisionPolicy::Skip);
        assert!(resolved.cache);
    }
}
