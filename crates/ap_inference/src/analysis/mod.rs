//! Prompt building, model calls and fallback results for each kind of content.

use serde::{Deserialize, Serialize};
use ap_core::{Error, MediaPart, Result};
use ap_scrapers::PageStructure;

use crate::json::{lenient_string, lenient_u64, null_default};

pub mod conversation;
pub mod document;
pub mod image;
pub mod url;

pub use conversation::{ConversationAnalysis, ConversationRequest, Segment, Speaker};
pub use document::DocumentRequest;
pub use image::{ImageAnalysis, ImageRequest, People, TechnicalDetails};
pub use url::UrlRequest;

/// Build the inline media part, rejecting an empty payload with `missing_message`
pub(crate) fn media_part(
    data: Option<&str>,
    mime_type: Option<&str>,
    default_mime: &str,
    missing_message: &str,
) -> Result<MediaPart> {
    let data = data
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| Error::InvalidInput(missing_message.to_string()))?;
    let mime_type = mime_type
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(default_mime);
    Ok(MediaPart {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStructure {
    #[serde(deserialize_with = "lenient_u64")]
    pub sections: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub tables: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub images: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub links: u64,
}

impl From<PageStructure> for DocumentStructure {
    fn from(structure: PageStructure) -> Self {
        Self {
            sections: structure.sections as u64,
            tables: structure.tables as u64,
            images: structure.images as u64,
            links: structure.links as u64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub language: String,
    #[serde(deserialize_with = "lenient_string")]
    pub source: String,
}

/// Shared result shape of document and web page summaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentSummary {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(deserialize_with = "lenient_string")]
    pub detailed_summary: String,
    #[serde(deserialize_with = "null_default")]
    pub key_points: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub topics: Vec<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub word_count: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub reading_time: u64,
    #[serde(deserialize_with = "lenient_string")]
    pub sentiment: String,
    #[serde(deserialize_with = "lenient_string")]
    pub difficulty: String,
    #[serde(deserialize_with = "null_default")]
    pub structure: DocumentStructure,
    #[serde(deserialize_with = "null_default")]
    pub metadata: DocumentMetadata,
    #[serde(deserialize_with = "null_default")]
    pub quotes: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub action_items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
