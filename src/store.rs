//! Catalog store for the selected content type.
//! Validates and normalizes raw document entries before anything can see them.

use crate::types::{ContentRecord, ContentType, RawCatalog, RawContent, Region};
use std::collections::HashMap;
use tracing::debug;

const UNKNOWN_FIRMWARE: &str = "?.??";
const UNKNOWN_RELEASE: &str = "UNKNOWN";

/// Drop null, keyless and incomplete entries and normalize the rest.
///
/// A record is kept only when `title_id`, `name` and `size` are all
/// non-empty. A key seen twice keeps its first position and takes the later
/// content, the same as inserting into a map. Returns the cleaned records in
/// document order and how many entries were removed.
pub fn clean(raw: RawCatalog) -> (Vec<ContentRecord>, usize) {
    let mut records: Vec<ContentRecord> = Vec::with_capacity(raw.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut removed = 0;

    for (key, content) in raw.entries {
        let record = match content {
            Some(content) if !key.is_empty() => normalize(key, content),
            _ => None,
        };

        let Some(record) = record else {
            removed += 1;
            continue;
        };

        match positions.get(&record.key) {
            Some(&idx) => records[idx] = record,
            None => {
                positions.insert(record.key.clone(), records.len());
                records.push(record);
            }
        }
    }

    (records, removed)
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.is_empty())
}

fn normalize(key: String, content: RawContent) -> Option<ContentRecord> {
    let title_id = non_empty(content.title_id)?;
    let name = non_empty(content.name)?;
    let size = non_empty(content.size)?;

    Some(ContentRecord {
        key,
        title_id,
        name,
        region: Region::normalize(content.region.as_deref()),
        version: content.version.unwrap_or_default(),
        size,
        min_firmware: non_empty(content.min_fw).unwrap_or_else(|| UNKNOWN_FIRMWARE.to_string()),
        release_date: non_empty(content.release).unwrap_or_else(|| UNKNOWN_RELEASE.to_string()),
        cover_url: non_empty(content.cover_url),
    })
}

/// Validated records for one content type
#[derive(Debug, Default)]
pub struct CatalogStore {
    content_type: Option<ContentType>,
    records: Vec<ContentRecord>,
    removed_high_water: usize,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the store wholesale with a freshly loaded catalog.
    ///
    /// The removed-entry count kept by the store is the largest ever seen,
    /// so it survives reloads of cleaner documents.
    pub fn replace(&mut self, content_type: ContentType, raw: RawCatalog) -> usize {
        let total = raw.len();
        let (records, removed) = clean(raw);

        self.removed_high_water = self.removed_high_water.max(removed);
        self.content_type = Some(content_type);
        self.records = records;

        debug!(
            content = %content_type,
            total = total,
            kept = self.records.len(),
            removed = removed,
            "Catalog loaded"
        );
        removed
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.content_type
    }

    pub fn records(&self) -> &[ContentRecord] {
        &self.records
    }

    pub fn get(&self, key: &str) -> Option<&ContentRecord> {
        self.records.iter().find(|r| r.key == key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn removed_high_water(&self) -> usize {
        self.removed_high_water
    }
}
