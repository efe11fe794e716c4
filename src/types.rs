//! Common types and data structures

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// The six catalog categories, one catalog document each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Games,
    Apps,
    Updates,
    Dlc,
    Demos,
    Homebrew,
}

impl ContentType {
    pub const ALL: [ContentType; 6] = [
        Self::Games,
        Self::Apps,
        Self::Updates,
        Self::Dlc,
        Self::Demos,
        Self::Homebrew,
    ];

    /// Name used in the config document
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Games => "games",
            Self::Apps => "apps",
            Self::Updates => "updates",
            Self::Dlc => "dlc",
            Self::Demos => "demos",
            Self::Homebrew => "homebrew",
        }
    }

    /// Human-facing label for menus
    pub const fn label(self) -> &'static str {
        match self {
            Self::Games => "Games",
            Self::Apps => "Apps",
            Self::Updates => "Updates",
            Self::Dlc => "DLC",
            Self::Demos => "Demos",
            Self::Homebrew => "Homebrew",
        }
    }

    /// Catalog document file name under the catalog directory
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Games => "GAMES.json",
            Self::Apps => "APPS.json",
            Self::Updates => "UPDATES.json",
            Self::Dlc => "DLC.json",
            Self::Demos => "DEMOS.json",
            Self::Homebrew => "HOMEBREW.json",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|&t| t == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalized origin region of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    All,
    Asia,
    Eur,
    Jap,
    Usa,
    Unknown,
}

impl Region {
    /// Regions the user can switch on and off, in allowlist check order
    pub const FILTERABLE: [Region; 4] = [Self::Asia, Self::Eur, Self::Jap, Self::Usa];

    /// Normalize a raw region field: anything outside the whitelist becomes `???`
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Unknown;
        };
        match raw.trim().to_lowercase().as_str() {
            "all" => Self::All,
            "asia" => Self::Asia,
            "eur" => Self::Eur,
            "jap" => Self::Jap,
            "usa" => Self::Usa,
            _ => Self::Unknown,
        }
    }

    /// Display code, also the value compared by the region filter
    pub const fn code(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Asia => "ASIA",
            Self::Eur => "EUR",
            Self::Jap => "JAP",
            Self::Usa => "USA",
            Self::Unknown => "???",
        }
    }

    /// Primary sort key
    pub const fn tier(self) -> u32 {
        match self {
            Self::All => 0,
            Self::Asia => 1,
            Self::Eur => 2,
            Self::Jap => 3,
            Self::Usa => 4,
            Self::Unknown => u32::MAX,
        }
    }

    /// Name used in the config document's region list
    pub const fn config_name(self) -> Option<&'static str> {
        match self {
            Self::Asia => Some("Asia"),
            Self::Eur => Some("Europe"),
            Self::Jap => Some("Japan"),
            Self::Usa => Some("USA"),
            Self::All | Self::Unknown => None,
        }
    }

    pub fn from_config_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::FILTERABLE
            .into_iter()
            .find(|r| r.config_name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Secondary sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortCriterion {
    Size,
    Region,
    Name,
    TitleId,
}

impl SortCriterion {
    pub const ALL: [SortCriterion; 4] = [Self::Size, Self::Region, Self::Name, Self::TitleId];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Region => "region",
            Self::Name => "name",
            Self::TitleId => "titleID",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Size => "Size",
            Self::Region => "Region",
            Self::Name => "Name",
            Self::TitleId => "Title ID",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|c| c.as_str().eq_ignore_ascii_case(s))
    }
}

/// One validated, normalized catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    /// Source identifier (download URL or path), unique within a catalog
    pub key: String,
    pub title_id: String,
    pub name: String,
    pub region: Region,
    pub version: String,
    /// Decimal byte count as found in the document; may fail to parse
    pub size: String,
    pub min_firmware: String,
    pub release_date: String,
    pub cover_url: Option<String>,
}

impl ContentRecord {
    /// A record is listable only with a key, a title ID, a name and a size
    pub fn is_valid(&self) -> bool {
        [&self.key, &self.title_id, &self.name, &self.size]
            .iter()
            .all(|field| !field.is_empty())
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size.trim().parse().ok()
    }

    /// Name handed to the transfer source, e.g. `Foo [CUSA00001]`
    pub fn display_name(&self) -> String {
        format!("{} [{}]", self.name, self.title_id)
    }

    /// File name the transfer source writes the package to
    pub fn package_file_name(&self) -> String {
        format!("{}.pkg", self.display_name())
    }
}

/// Catalog document as stored on disk or served by a feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(rename = "DATA")]
    pub data: serde_json::Map<String, Value>,
}

/// Unvalidated content object from a catalog document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawContent {
    #[serde(default)]
    pub title_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub size: Option<String>,
    #[serde(default)]
    pub min_fw: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

/// `size` shows up both as a JSON number and as a numeric string
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Parsed catalog entries in document order. `None` marks a null or
/// malformed content object; the validator drops those.
#[derive(Debug, Clone, Default)]
pub struct RawCatalog {
    pub entries: Vec<(String, Option<RawContent>)>,
}

impl RawCatalog {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<CatalogDocument> for RawCatalog {
    fn from(doc: CatalogDocument) -> Self {
        let entries = doc
            .data
            .into_iter()
            .map(|(key, value)| {
                let content = match value {
                    Value::Null => None,
                    other => serde_json::from_value::<RawContent>(other).ok(),
                };
                (key, content)
            })
            .collect();
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_normalization_uses_whitelist() {
        assert_eq!(Region::normalize(Some(" usa ")), Region::Usa);
        assert_eq!(Region::normalize(Some("Eur")), Region::Eur);
        assert_eq!(Region::normalize(Some("ALL")), Region::All);
        assert_eq!(Region::normalize(Some("europe")), Region::Unknown);
        assert_eq!(Region::normalize(Some("")), Region::Unknown);
        assert_eq!(Region::normalize(None), Region::Unknown);
    }

    #[test]
    fn region_tiers_order_all_first_unknown_last() {
        let mut regions = vec![Region::Unknown, Region::Usa, Region::All, Region::Jap, Region::Asia, Region::Eur];
        regions.sort_by_key(|r| r.tier());
        assert_eq!(
            regions,
            vec![Region::All, Region::Asia, Region::Eur, Region::Jap, Region::Usa, Region::Unknown]
        );
    }

    #[test]
    fn config_region_names_map_both_ways() {
        for region in Region::FILTERABLE {
            let name = region.config_name().unwrap();
            assert_eq!(Region::from_config_name(name), Some(region));
        }
        assert_eq!(Region::from_config_name("Mars"), None);
        assert_eq!(Region::All.config_name(), None);
    }

    #[test]
    fn content_type_cycles_with_wraparound() {
        assert_eq!(ContentType::Games.next(), ContentType::Apps);
        assert_eq!(ContentType::Homebrew.next(), ContentType::Games);
        assert_eq!(ContentType::Games.prev(), ContentType::Homebrew);
        assert_eq!(ContentType::parse("DLC"), Some(ContentType::Dlc));
        assert_eq!(ContentType::parse("themes"), None);
    }

    #[test]
    fn sort_criterion_parses_title_id_in_any_case() {
        assert_eq!(SortCriterion::parse("titleID"), Some(SortCriterion::TitleId));
        assert_eq!(SortCriterion::parse("titleid"), Some(SortCriterion::TitleId));
        assert_eq!(SortCriterion::parse("stars"), None);
    }

    #[test]
    fn document_accepts_numeric_and_string_sizes() {
        let json = r#"{"DATA": {
            "a": {"title_id": "CUSA1", "name": "A", "size": 1234},
            "b": {"title_id": "CUSA2", "name": "B", "size": "5678"},
            "c": null,
            "d": {"title_id": 7}
        }}"#;
        let doc: CatalogDocument = serde_json::from_str(json).unwrap();
        let raw = RawCatalog::from(doc);

        assert_eq!(raw.len(), 4);
        assert_eq!(raw.entries[0].0, "a");
        assert_eq!(raw.entries[0].1.as_ref().unwrap().size.as_deref(), Some("1234"));
        assert_eq!(raw.entries[1].1.as_ref().unwrap().size.as_deref(), Some("5678"));
        assert!(raw.entries[2].1.is_none());
        assert!(raw.entries[3].1.is_none());
    }
}
