//! Filtering and sorting logic

use crate::types::*;
use std::cmp::Ordering;

/// Apply the text search and the region allowlist.
///
/// A non-empty query keeps records whose name starts with it (ignoring
/// case); when no name matches, title IDs are tried instead. When neither
/// matches the result is empty and region filtering is skipped.
pub fn apply_filter<'a>(
    items: &[&'a ContentRecord],
    query: &str,
    allowlist: &[Region],
) -> Vec<&'a ContentRecord> {
    let query = query.trim().to_lowercase();

    let mut matched: Vec<&'a ContentRecord> = if query.is_empty() {
        items.to_vec()
    } else {
        let by_name: Vec<_> = items
            .iter()
            .copied()
            .filter(|r| r.name.to_lowercase().starts_with(&query))
            .collect();

        if !by_name.is_empty() {
            by_name
        } else {
            let by_title_id: Vec<_> = items
                .iter()
                .copied()
                .filter(|r| r.title_id.to_lowercase().starts_with(&query))
                .collect();

            if by_title_id.is_empty() {
                return Vec::new();
            }
            by_title_id
        }
    };

    // Only the four switchable regions ever remove anything
    for region in Region::FILTERABLE {
        if !allowlist.contains(&region) {
            matched.retain(|r| !r.region.code().eq_ignore_ascii_case(region.code()));
        }
    }

    matched
}

fn compare_secondary(a: &ContentRecord, b: &ContentRecord, criterion: SortCriterion) -> Ordering {
    match criterion {
        SortCriterion::Size => {
            let size = |r: &ContentRecord| r.size.trim().parse::<i64>().unwrap_or(i64::MAX);
            size(a).cmp(&size(b))
        }
        SortCriterion::Region => a.region.code().cmp(b.region.code()),
        SortCriterion::Name => a.name.cmp(&b.name),
        SortCriterion::TitleId => a.title_id.cmp(&b.title_id),
    }
}

/// Order by region tier, then by `criterion`. Descending reverses the whole
/// ordered list, tiers included.
pub fn sort_items<'a>(
    mut items: Vec<&'a ContentRecord>,
    criterion: SortCriterion,
    ascending: bool,
) -> Vec<&'a ContentRecord> {
    items.sort_by(|a, b| {
        a.region
            .tier()
            .cmp(&b.region.tier())
            .then_with(|| compare_secondary(a, b, criterion))
    });

    if !ascending {
        items.reverse();
    }
    items
}
