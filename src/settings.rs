// src/settings.rs
// =============================================================================
// Loads the settings file once, before any worker starts.
//
// The file is JSON:
//
//   {
//     "base_url": "https://www.stockfreeimages.com/",
//     "item": "nature",
//     "out_dir": "images",
//     "total_pages": 10
//   }
//
// Optional keys: image_host, probe_page_count, request_timeout_secs.
//
// The result is a plain immutable struct. The supervisor and each worker get
// their own copy of what they need; there is no global config.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_IMAGE_HOST: &str = "images.stockfreeimages.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Site root; page N lives at `{base_url}p{N}/{item}.html`
    pub base_url: Url,
    /// Gallery name used in every page path
    pub item: String,
    /// Where downloaded images are written
    pub out_dir: PathBuf,
    /// How many pages to fetch (may be lowered by the page-count probe)
    pub total_pages: u32,
    /// Only <img> sources containing this string are downloaded
    #[serde(default = "default_image_host")]
    pub image_host: String,
    /// Ask page 1 how many pages the site has and cap total_pages at it
    #[serde(default = "default_probe")]
    pub probe_page_count: bool,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_image_host() -> String {
    DEFAULT_IMAGE_HOST.to_string()
}

fn default_probe() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Settings {
    /// Read and validate a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("in settings file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(raw)?;
        settings.validate()
    }

    fn validate(mut self) -> Result<Self> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "base_url must be http or https, got '{}'",
                self.base_url
            ));
        }
        if self.item.trim().is_empty() {
            return Err(anyhow!("item must not be empty"));
        }

        // Without the trailing slash, Url::join would replace the last
        // path segment instead of appending to it.
        if !self.base_url.path().ends_with('/') {
            let path = format!("{}/", self.base_url.path());
            self.base_url.set_path(&path);
        }

        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
