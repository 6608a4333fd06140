//! Media variants and download naming.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One encoding of a video as listed in the site's media info.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoVariant {
    #[serde(default)]
    pub bitrate: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Parse a `variants` array, skipping entries that are not variant-shaped.
pub fn parse_variants(value: &Value) -> Vec<VideoVariant> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// URL of the highest-bitrate variant; later entries win ties and a missing
/// bitrate counts as zero.
pub fn best_variant(variants: &[VideoVariant]) -> Option<&str> {
    variants
        .iter()
        .max_by_key(|v| v.bitrate.unwrap_or(0))
        .and_then(|v| v.url.as_deref())
}

/// `@author-postId.mp4`
pub fn media_filename(author: &str, post_id: &str) -> String {
    format!("@{author}-{post_id}.mp4")
}
