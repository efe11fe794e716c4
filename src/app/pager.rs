//! Page slicing and display rows

use crate::types::ContentRecord;
use crate::utils::format_size;
use std::collections::HashSet;

/// Slice out one page. A page past the end is pulled back to the last valid
/// page; the page actually used is returned alongside the slice.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> (&[T], usize) {
    let page_size = page_size.max(1);
    let mut page = page;

    if page.saturating_mul(page_size) >= items.len() {
        page = items.len().saturating_sub(1) / page_size;
    }

    let start = (page * page_size).min(items.len());
    let end = (start + page_size).min(items.len());
    (&items[start..end], page)
}

pub fn page_count(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

/// One rendered catalog line, addressed by its slot on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub slot: usize,
    pub key: String,
    pub title_id: String,
    pub region: String,
    pub title: String,
    pub size: String,
    pub highlighted: bool,
}

/// Build display rows for a page. Names occurring more than once on the page
/// are shown as `name [vVERSION]` at every occurrence.
pub fn build_rows(page: &[&ContentRecord], highlighted_slot: Option<usize>) -> Vec<DisplayRow> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicates: HashSet<&str> = HashSet::new();
    for record in page {
        if !seen.insert(record.name.as_str()) {
            duplicates.insert(record.name.as_str());
        }
    }

    page.iter()
        .enumerate()
        .map(|(slot, record)| {
            let title = if duplicates.contains(record.name.as_str()) {
                format!("{} [v{}]", record.name, record.version)
            } else {
                record.name.clone()
            };
            DisplayRow {
                slot,
                key: record.key.clone(),
                title_id: record.title_id.clone(),
                region: record.region.code().to_string(),
                title,
                size: format_size(&record.size),
                highlighted: highlighted_slot == Some(slot),
            }
        })
        .collect()
}

/// Scrollbar position and thumb size for the catalog list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scrollbar {
    pub value: f32,
    pub size: f32,
    pub visible: bool,
}

impl Scrollbar {
    const MIN_SIZE: f32 = 0.1;
    const MAX_SIZE: f32 = 0.7;

    pub fn new(cursor: usize, filtered_count: usize, page_size: usize) -> Self {
        if filtered_count == 0 {
            return Self { value: 0.0, size: 1.0, visible: false };
        }

        let value = if filtered_count > 1 {
            cursor as f32 / (filtered_count - 1) as f32
        } else {
            0.0
        };
        let size = (page_size as f32 / filtered_count as f32).clamp(Self::MIN_SIZE, Self::MAX_SIZE);
        Self { value, size, visible: true }
    }
}
