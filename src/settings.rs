//! User settings stored as config.json in the app data directory

use crate::constants::{CONFIG_FILE, DEFAULT_DOWNLOAD_PATH};
use crate::errors::Result;
use crate::types::{ContentType, Region, SortCriterion};
use crate::utils::normalize_download_path;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Per-content-type catalog feed URLs used in populate-via-web mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentUrls {
    pub games: Option<String>,
    pub apps: Option<String>,
    pub updates: Option<String>,
    #[serde(rename = "DLC", alias = "dlc")]
    pub dlc: Option<String>,
    pub demos: Option<String>,
    pub homebrew: Option<String>,
}

impl ContentUrls {
    pub fn get(&self, content: ContentType) -> Option<&str> {
        self.slot(content).as_deref().filter(|url| !url.is_empty())
    }

    pub fn set(&mut self, content: ContentType, url: Option<String>) {
        *self.slot_mut(content) = url.filter(|u| !u.trim().is_empty());
    }

    fn slot(&self, content: ContentType) -> &Option<String> {
        match content {
            ContentType::Games => &self.games,
            ContentType::Apps => &self.apps,
            ContentType::Updates => &self.updates,
            ContentType::Dlc => &self.dlc,
            ContentType::Demos => &self.demos,
            ContentType::Homebrew => &self.homebrew,
        }
    }

    fn slot_mut(&mut self, content: ContentType) -> &mut Option<String> {
        match content {
            ContentType::Games => &mut self.games,
            ContentType::Apps => &mut self.apps,
            ContentType::Updates => &mut self.updates,
            ContentType::Dlc => &mut self.dlc,
            ContentType::Demos => &mut self.demos,
            ContentType::Homebrew => &mut self.homebrew,
        }
    }

    /// Fill every URL missing here from `prior`
    fn or(mut self, prior: &ContentUrls) -> Self {
        for content in ContentType::ALL {
            if self.get(content).is_none() {
                let url = prior.get(content).map(str::to_string);
                self.set(content, url);
            }
        }
        self
    }

    /// Empty strings are written as `null`
    fn elide_empty(&self) -> Self {
        let mut out = ContentUrls::default();
        for content in ContentType::ALL {
            out.set(content, self.get(content).map(str::to_string));
        }
        out
    }
}

/// Process-wide preferences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    // Filtering
    pub content: ContentType,
    pub sort: SortCriterion,
    pub ascending: bool,
    pub regions: Vec<Region>,

    // Downloads
    pub direct_download: bool,
    pub download_path: String,
    pub install_after: bool,
    pub delete_after: bool,

    // Application
    pub background_uri: Option<String>,
    pub background_music: bool,
    pub populate_via_web: bool,

    pub content_urls: ContentUrls,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            content: ContentType::Games,
            sort: SortCriterion::Name,
            ascending: true,
            regions: vec![Region::Usa, Region::Eur, Region::Jap, Region::Asia],
            direct_download: true,
            download_path: DEFAULT_DOWNLOAD_PATH.to_string(),
            install_after: true,
            delete_after: false,
            background_uri: None,
            background_music: true,
            populate_via_web: false,
            content_urls: ContentUrls::default(),
        }
    }
}

// ============================================================================
// CONFIG DOCUMENT
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    #[serde(rename = "FILTERING")]
    pub filtering: FilteringSection,
    #[serde(rename = "PREFERENCES")]
    pub preferences: PreferencesSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilteringSection {
    #[serde(rename = "CONTENT")]
    pub content: Option<String>,
    #[serde(rename = "SORT")]
    pub sort: SortSection,
    #[serde(rename = "REGIONS")]
    pub regions: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSection {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub ascending: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesSection {
    #[serde(rename = "DOWNLOADS")]
    pub downloads: DownloadsSection,
    #[serde(rename = "APPLICATION")]
    pub application: ApplicationSection,
    #[serde(rename = "CONTENT_URLS")]
    pub content_urls: ContentUrls,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DownloadsSection {
    pub direct_download: Option<bool>,
    pub download_path: Option<String>,
    pub install_after: Option<bool>,
    pub delete_after: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSection {
    pub background_uri: Option<String>,
    #[serde(rename = "backgroundMusic")]
    pub background_music: Option<bool>,
    #[serde(rename = "populateViaWeb")]
    pub populate_via_web: Option<bool>,
}

fn dedup_regions(regions: impl IntoIterator<Item = Region>) -> Vec<Region> {
    let mut out: Vec<Region> = Vec::new();
    for region in regions {
        if !out.contains(&region) {
            out.push(region);
        }
    }
    out
}

impl Settings {
    /// Build the on-disk document. Regions are deduplicated and the
    /// download path normalized.
    pub fn to_document(&self) -> ConfigDocument {
        let regions = dedup_regions(self.regions.iter().copied())
            .into_iter()
            .filter_map(|r| r.config_name().map(str::to_string))
            .collect();

        ConfigDocument {
            filtering: FilteringSection {
                content: Some(self.content.as_str().to_string()),
                sort: SortSection {
                    kind: Some(self.sort.as_str().to_string()),
                    ascending: Some(self.ascending),
                },
                regions: Some(regions),
            },
            preferences: PreferencesSection {
                downloads: DownloadsSection {
                    direct_download: Some(self.direct_download),
                    download_path: Some(normalize_download_path(&self.download_path)),
                    install_after: Some(self.install_after),
                    delete_after: Some(self.delete_after),
                },
                application: ApplicationSection {
                    background_uri: self.background_uri.clone(),
                    background_music: Some(self.background_music),
                    populate_via_web: Some(self.populate_via_web),
                },
                content_urls: self.content_urls.elide_empty(),
            },
        }
    }

    /// Apply a loaded document on top of the current settings. Unknown
    /// content/sort names and absent fields leave the prior value in place.
    pub fn apply_document(&mut self, doc: ConfigDocument) {
        let filtering = doc.filtering;

        if let Some(content) = filtering.content.as_deref() {
            match ContentType::parse(content) {
                Some(c) => self.content = c,
                None => warn!(content = %content, "Unknown content type in config, keeping current"),
            }
        }
        if let Some(kind) = filtering.sort.kind.as_deref() {
            match SortCriterion::parse(kind) {
                Some(s) => self.sort = s,
                None => warn!(sort = %kind, "Unknown sort type in config, keeping current"),
            }
        }
        if let Some(ascending) = filtering.sort.ascending {
            self.ascending = ascending;
        }
        if let Some(names) = filtering.regions {
            self.regions = dedup_regions(names.iter().filter_map(|name| {
                let region = Region::from_config_name(name);
                if region.is_none() {
                    warn!(region = %name, "Unknown region in config, ignoring");
                }
                region
            }));
        }

        let downloads = doc.preferences.downloads;
        if let Some(v) = downloads.direct_download {
            self.direct_download = v;
        }
        if let Some(path) = downloads.download_path.filter(|p| !p.is_empty()) {
            self.download_path = path;
        }
        if let Some(v) = downloads.install_after {
            self.install_after = v;
        }
        if let Some(v) = downloads.delete_after {
            self.delete_after = v;
        }

        let application = doc.preferences.application;
        self.background_uri = application.background_uri.filter(|u| !u.is_empty());
        if let Some(v) = application.background_music {
            self.background_music = v;
        }
        if let Some(v) = application.populate_via_web {
            self.populate_via_web = v;
        }

        self.content_urls = doc.preferences.content_urls.or(&self.content_urls);
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: ConfigDocument = serde_json::from_str(json)?;
        let mut settings = Self::default();
        settings.apply_document(doc);
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// Load `config.json`, creating it with defaults when missing
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(s) => match Self::from_json(&s) {
                Ok(settings) => {
                    debug!(path = %path.display(), "Settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No settings file found, creating defaults");
                let settings = Self::default();
                settings.save(data_dir);
                settings
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to read settings, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) {
        if let Err(e) = self.try_save(data_dir) {
            warn!(error = %e, "Failed to save settings");
        }
    }

    fn try_save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        std::fs::write(data_dir.join(CONFIG_FILE), self.to_json()?)?;
        debug!("Settings saved");
        Ok(())
    }
}
