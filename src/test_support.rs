use crate::types::{ContentRecord, Region};

pub(crate) fn record(key: &str, title_id: &str, name: &str, region: &str, size: &str) -> ContentRecord {
    ContentRecord {
        key: key.to_string(),
        title_id: title_id.to_string(),
        name: name.to_string(),
        region: Region::normalize(Some(region)),
        version: "1.00".to_string(),
        size: size.to_string(),
        min_firmware: "?.??".to_string(),
        release_date: "UNKNOWN".to_string(),
        cover_url: None,
    }
}
