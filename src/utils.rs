//! Utility functions

use crate::constants::APP_NAME;
use std::path::PathBuf;
use std::time::Duration;

/// Get the data directory holding config, catalogs and logs
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Format a catalog size field into binary units with two decimals.
/// Unparsable sizes render as `0 B`.
pub fn format_size(size: &str) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let Ok(bytes) = size.trim().parse::<i64>() else {
        return "0 B".to_string();
    };
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Format transfer amounts and rates in decimal units (B, KB, MB, GB)
pub fn format_bytes(bytes: f64) -> String {
    if bytes >= 1e9 {
        format!("{} GB", trim_decimals(bytes / 1e9))
    } else if bytes >= 1e6 {
        format!("{} MB", trim_decimals(bytes / 1e6))
    } else if bytes >= 1e3 {
        format!("{} KB", trim_decimals(bytes / 1e3))
    } else {
        format!("{} B", trim_decimals(bytes))
    }
}

/// At most two decimals, trailing zeros dropped
fn trim_decimals(value: f64) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

/// Render a duration as `Nd Nh Nm Ns`, skipping zero-valued units.
/// Seconds are always present.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{}d ", days));
    }
    if hours > 0 {
        out.push_str(&format!("{}h ", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m ", minutes));
    }
    out.push_str(&format!("{}s", seconds));
    out
}

/// Keep download paths inside the user-writable tree and directory-shaped:
/// `/data/...` becomes `/user/data/...` and a trailing `/` is enforced.
pub fn normalize_download_path(path: &str) -> String {
    let mut path = path.replace('\\', "/");
    if path.starts_with("/data/") {
        path = format!("/user/{}", path.trim_start_matches('/'));
    }
    if !path.ends_with('/') {
        path.push('/');
    }
    path
}
