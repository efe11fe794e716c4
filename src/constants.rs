//! Application constants and configuration

use std::time::Duration;

pub const APP_NAME: &str = "FPKGi";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory (under the data root) holding one catalog document per content type
pub const CATALOG_DIR: &str = "ContentJSONs";
pub const CONFIG_FILE: &str = "config.json";

/// Rows shown per catalog page
pub const ITEMS_PER_PAGE: usize = 25;

pub const DEFAULT_DOWNLOAD_PATH: &str = "/user/data/pkg/";

// Download polling
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
pub const SPEED_HISTORY: usize = 5;
pub const COMPLETION_PERCENT: f64 = 98.0;
pub const MAX_UNREADABLE_POLLS: u32 = 3;
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Time the transfer source gets to flush the package before installing it
pub const INSTALL_SETTLE_DELAY: Duration = Duration::from_secs(5);

// Placeholder catalog entries written when a catalog document is missing
pub const HOMEBREW_PLACEHOLDER_KEY: &str = "https://www.itsjokerzz.site/projects/FPKGi/download/?echo=1";
pub const HOMEBREW_PLACEHOLDER_COVER: &str = "https://www.itsjokerzz.site/projects/FPKGi/Icon.png";
pub const DEMO_PLACEHOLDER_KEY: &str = "https://www.web.site/content.pkg";
