//! Catalog document loading: remote feeds, local files and placeholders

use crate::constants::*;
use crate::errors::{Error, Result};
use crate::settings::Settings;
use crate::types::{CatalogDocument, ContentType, RawCatalog};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Source of remote catalog bytes
pub trait CatalogFetcher: Send + Sync {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher used in populate-via-web mode
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("{}/{}", APP_NAME, APP_VERSION))
            .build()?;
        Ok(Self { client })
    }
}

impl CatalogFetcher for HttpFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(Error::Http(format!("{} returned {}", url, response.status())));
        }
        Ok(response.bytes()?.to_vec())
    }
}

pub fn parse_catalog(bytes: &[u8]) -> Result<RawCatalog> {
    let doc: CatalogDocument = serde_json::from_slice(bytes)?;
    Ok(doc.into())
}

/// Single-entry document written in place of a missing catalog file
pub fn placeholder_document(content: ContentType) -> Result<CatalogDocument> {
    let value = match content {
        ContentType::Homebrew => json!({
            "DATA": {
                HOMEBREW_PLACEHOLDER_KEY: {
                    "title_id": "FPKGI13337",
                    "region": "ALL",
                    "name": "F[PKGi]",
                    "version": APP_VERSION,
                    "release": "12-25-2024",
                    "size": "75000000",
                    "min_fw": "4.50",
                    "cover_url": HOMEBREW_PLACEHOLDER_COVER
                }
            }
        }),
        _ => json!({
            "DATA": {
                DEMO_PLACEHOLDER_KEY: {
                    "title_id": "CUSA00000",
                    "region": "ALL",
                    "name": "Demo",
                    "version": "1.00",
                    "release": "01-01-9999",
                    "size": 13333333337u64,
                    "min_fw": "12.00",
                    "cover_url": null
                }
            }
        }),
    };
    Ok(serde_json::from_value(value)?)
}

pub struct CatalogLoader {
    data_dir: PathBuf,
    fetcher: Box<dyn CatalogFetcher>,
}

impl CatalogLoader {
    pub fn new(data_dir: &Path, fetcher: impl CatalogFetcher + 'static) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            fetcher: Box::new(fetcher),
        }
    }

    pub fn catalog_path(&self, content: ContentType) -> PathBuf {
        self.data_dir.join(CATALOG_DIR).join(content.file_name())
    }

    /// Load the catalog for `content`. Never fails: a feed failure falls
    /// back to the local file, and an unreadable local file yields an empty
    /// catalog.
    pub fn load(&self, content: ContentType, settings: &Settings) -> RawCatalog {
        if settings.populate_via_web {
            match self.load_remote(content, settings) {
                Ok(raw) => {
                    info!(content = %content, entries = raw.len(), "Catalog loaded from web");
                    return raw;
                }
                Err(e) => {
                    error!(content = %content, error = %e, "Web-based loading failed");
                    warn!("Falling back to local file loading");
                }
            }
        }

        match self.load_local(content) {
            Ok(raw) => raw,
            Err(e) => {
                error!(content = %content, error = %e, "Failed to read or parse catalog file");
                RawCatalog::default()
            }
        }
    }

    fn load_remote(&self, content: ContentType, settings: &Settings) -> Result<RawCatalog> {
        let url = settings
            .content_urls
            .get(content)
            .ok_or(Error::MissingSourceUrl(content))?;
        debug!(url = %url, "Fetching catalog");
        let bytes = self.fetcher.fetch_bytes(url)?;
        parse_catalog(&bytes)
    }

    fn load_local(&self, content: ContentType) -> Result<RawCatalog> {
        let path = self.catalog_path(content);
        if !path.exists() {
            warn!(path = %path.display(), "Catalog file missing, writing placeholder");
            self.write_placeholder(content, &path)?;
        }
        let bytes = std::fs::read(&path)?;
        let raw = parse_catalog(&bytes)?;
        debug!(path = %path.display(), entries = raw.len(), "Catalog file read");
        Ok(raw)
    }

    fn write_placeholder(&self, content: ContentType, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let doc = placeholder_document(content)?;
        std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;
        Ok(())
    }

    /// Raw entry count across every content type, used for the summary line
    pub fn count_all(&self, settings: &Settings) -> usize {
        ContentType::ALL
            .into_iter()
            .map(|content| self.load(content, settings).len())
            .sum()
    }
}
