//! App module - catalog session state and the user actions that drive it

mod filters;
mod pager;

pub use filters::{apply_filter, sort_items};
pub use pager::{build_rows, page_count, paginate, DisplayRow, Scrollbar};

use crate::constants::ITEMS_PER_PAGE;
use crate::downloads::DownloadOptions;
use crate::loader::CatalogLoader;
use crate::settings::Settings;
use crate::store::CatalogStore;
use crate::types::*;
use crate::utils::normalize_download_path;
use std::path::PathBuf;
use tracing::{debug, info, warn};

// ============================================================================
// CATALOG SESSION
// ============================================================================

/// Search, filter, sort and cursor state for the catalog list
#[derive(Debug, Clone)]
pub struct CatalogSession {
    pub search_query: String,
    pub regions: Vec<Region>,
    pub sort: SortCriterion,
    pub ascending: bool,
    pub items_per_page: usize,
    pub current_page: usize,
    /// Index of the selected item in the filtered, sorted sequence
    pub content_scroll: usize,
    /// Size of the filtered sequence as of the last recompute
    pub filtered_count: usize,
}

impl CatalogSession {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            search_query: String::new(),
            regions: settings.regions.clone(),
            sort: settings.sort,
            ascending: settings.ascending,
            items_per_page: ITEMS_PER_PAGE,
            current_page: 0,
            content_scroll: 0,
            filtered_count: 0,
        }
    }

    fn sync(&mut self, settings: &Settings) {
        self.regions = settings.regions.clone();
        self.sort = settings.sort;
        self.ascending = settings.ascending;
    }

    pub fn next_item(&mut self) {
        if self.filtered_count == 0 {
            self.content_scroll = 0;
            return;
        }
        self.content_scroll = (self.content_scroll + 1) % self.filtered_count;
    }

    pub fn prev_item(&mut self) {
        if self.filtered_count == 0 {
            self.content_scroll = 0;
            return;
        }
        self.content_scroll = match self.content_scroll {
            0 => self.filtered_count - 1,
            n => (n - 1).min(self.filtered_count - 1),
        };
    }

    /// Jump one page forward; past the end wraps to the first item
    pub fn next_page(&mut self) {
        self.content_scroll += self.items_per_page;
        if self.content_scroll >= self.filtered_count {
            self.content_scroll = 0;
        }
    }

    /// Jump one page back; before the start lands on the first item of the
    /// last page
    pub fn prev_page(&mut self) {
        if self.content_scroll >= self.items_per_page {
            self.content_scroll -= self.items_per_page;
            return;
        }
        let per_page = self.items_per_page.max(1);
        self.content_scroll = match self.filtered_count % per_page {
            _ if self.filtered_count == 0 => 0,
            0 => self.filtered_count.saturating_sub(per_page),
            rem => self.filtered_count - rem,
        };
    }

    fn clamp_cursor(&mut self) {
        self.content_scroll = self.content_scroll.min(self.filtered_count.saturating_sub(1));
    }
}

// ============================================================================
// VIEW
// ============================================================================

/// One recomputed catalog screen
#[derive(Debug, Clone)]
pub struct CatalogView {
    pub rows: Vec<DisplayRow>,
    pub page: usize,
    pub page_count: usize,
    pub filtered_count: usize,
    pub cursor: usize,
    pub selected: Option<ContentRecord>,
    pub scrollbar: Scrollbar,
}

/// Filter, sort and page the catalog for the session's current cursor.
///
/// Updates the session's filtered count, clamps its cursor and stores the
/// corrected page.
pub fn build_view(records: &[ContentRecord], session: &mut CatalogSession) -> CatalogView {
    let valid: Vec<&ContentRecord> = records.iter().filter(|r| r.is_valid()).collect();
    let filtered = apply_filter(&valid, &session.search_query, &session.regions);
    session.filtered_count = filtered.len();

    let ordered = sort_items(filtered, session.sort, session.ascending);
    session.clamp_cursor();

    let per_page = session.items_per_page.max(1);
    let (page_items, page) = paginate(&ordered, session.content_scroll / per_page, per_page);
    session.current_page = page;

    let highlighted = (!ordered.is_empty()).then_some(session.content_scroll % per_page);
    let rows = build_rows(page_items, highlighted);

    CatalogView {
        rows,
        page,
        page_count: page_count(ordered.len(), per_page),
        filtered_count: ordered.len(),
        cursor: session.content_scroll,
        selected: ordered.get(session.content_scroll).map(|r| (*r).clone()),
        scrollbar: Scrollbar::new(session.content_scroll, ordered.len(), per_page),
    }
}

/// Counter lines shown above the catalog list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSummary {
    pub shown: usize,
    pub known: usize,
    pub cursor: usize,
}

impl CatalogSummary {
    pub fn count_text(&self) -> String {
        format!("Content: {} ({})", self.shown, self.known)
    }

    /// `current / shown`, or `None` when nothing is listed
    pub fn position_text(&self) -> Option<String> {
        if self.shown == 0 {
            return None;
        }
        Some(format!("{} / {}", (self.cursor + 1).min(self.shown), self.shown))
    }
}

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    pub(crate) settings: Settings,
    pub(crate) store: CatalogStore,
    pub(crate) session: CatalogSession,
    pub(crate) loader: CatalogLoader,
    pub(crate) data_dir: PathBuf,
    pub(crate) total_entries: usize,
}

impl App {
    pub fn new(settings: Settings, loader: CatalogLoader, data_dir: PathBuf) -> Self {
        let session = CatalogSession::from_settings(&settings);
        let mut app = Self {
            settings,
            store: CatalogStore::new(),
            session,
            loader,
            data_dir,
            total_entries: 0,
        };
        app.recount();
        app.reload();
        app
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn session(&self) -> &CatalogSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CatalogSession {
        &mut self.session
    }

    /// Replace the store with the configured content type's catalog
    pub fn reload(&mut self) {
        let content = self.settings.content;
        let raw = self.loader.load(content, &self.settings);
        self.store.replace(content, raw);
    }

    fn recount(&mut self) {
        self.total_entries = self.loader.count_all(&self.settings);
        debug!(total = self.total_entries, "Catalog entries counted");
    }

    pub fn view(&mut self) -> CatalogView {
        build_view(self.store.records(), &mut self.session)
    }

    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            shown: self.session.filtered_count,
            known: self.total_entries.saturating_sub(self.store.removed_high_water()),
            cursor: self.session.content_scroll,
        }
    }

    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions::from(&self.settings)
    }

    pub fn save_settings(&self) {
        self.settings.save(&self.data_dir);
    }

    pub fn shutdown(&self) {
        info!("Application shutting down");
        self.save_settings();
    }

    // ------------------------------------------------------------------------
    // Filtering actions
    // ------------------------------------------------------------------------

    pub fn set_search(&mut self, query: &str) {
        self.session.search_query = query.to_string();
    }

    /// Picking the active criterion flips the direction; a new criterion
    /// keeps it.
    pub fn select_sort(&mut self, criterion: SortCriterion) {
        if self.settings.sort == criterion {
            self.settings.ascending = !self.settings.ascending;
        } else {
            self.settings.sort = criterion;
        }
        debug!(sort = criterion.as_str(), ascending = self.settings.ascending, "Sort changed");
        self.session.sync(&self.settings);
        self.save_settings();
    }

    /// Toggle a region in the allowlist. Returns whether it is now allowed.
    pub fn toggle_region(&mut self, region: Region) -> bool {
        if region.config_name().is_none() {
            warn!(region = %region, "Region cannot be filtered");
            return false;
        }

        let enabled = match self.settings.regions.iter().position(|&r| r == region) {
            Some(idx) => {
                self.settings.regions.remove(idx);
                false
            }
            None => {
                self.settings.regions.push(region);
                true
            }
        };
        self.session.sync(&self.settings);
        self.save_settings();
        enabled
    }

    pub fn next_content_type(&mut self) {
        self.set_content_type(self.settings.content.next());
    }

    pub fn prev_content_type(&mut self) {
        self.set_content_type(self.settings.content.prev());
    }

    pub fn set_content_type(&mut self, content: ContentType) {
        info!(content = %content, "Content type selected");
        self.settings.content = content;
        self.reload();
        self.save_settings();
    }

    // ------------------------------------------------------------------------
    // Preference actions
    // ------------------------------------------------------------------------

    pub fn set_populate_via_web(&mut self, enabled: bool) {
        self.settings.populate_via_web = enabled;
        self.recount();
        self.reload();
        self.save_settings();
    }

    pub fn set_content_url(&mut self, content: ContentType, url: Option<String>) {
        self.settings.content_urls.set(content, url);
        if self.settings.populate_via_web && content == self.settings.content {
            self.reload();
        }
        self.save_settings();
    }

    pub fn set_direct_download(&mut self, enabled: bool) {
        self.settings.direct_download = enabled;
        self.save_settings();
    }

    pub fn set_install_after(&mut self, enabled: bool) {
        self.settings.install_after = enabled;
        self.save_settings();
    }

    pub fn set_delete_after(&mut self, enabled: bool) {
        self.settings.delete_after = enabled;
        self.save_settings();
    }

    pub fn set_background_music(&mut self, enabled: bool) {
        self.settings.background_music = enabled;
        self.save_settings();
    }

    pub fn set_background_uri(&mut self, uri: Option<String>) {
        self.settings.background_uri = uri.filter(|u| !u.trim().is_empty());
        self.save_settings();
    }

    pub fn set_download_path(&mut self, path: &str) {
        self.settings.download_path = normalize_download_path(path);
        self.save_settings();
    }
}
