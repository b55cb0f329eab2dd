use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Conversation,
    Image,
    Document,
    Url,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Conversation => "conversation",
            ContentType::Image => "image",
            ContentType::Document => "document",
            ContentType::Url => "url",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conversation" => Ok(ContentType::Conversation),
            "image" => Ok(ContentType::Image),
            "document" => Ok(ContentType::Document),
            "url" => Ok(ContentType::Url),
            other => Err(Error::InvalidInput(format!("Unknown content type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// What the user submitted, kept as a reference for the history view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
}

impl InputData {
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prompt.is_none() && self.url.is_none() && self.messages.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileInfo {
    /// `"name (type)"`, followed by `" - 1.50MB"` when the size is known and non-zero
    pub fn describe(&self) -> String {
        let mut result = format!("{} ({})", self.name, self.mime_type);
        if let Some(size) = self.size.filter(|&size| size > 0) {
            let megabytes = size as f64 / (1024.0 * 1024.0);
            result.push_str(&format!(" - {:.2}MB", megabytes));
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub user_id: String,
    pub content_type: ContentType,
    pub input_data: InputData,
    pub output_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(user_id: &str, record: NewHistoryRecord) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            content_type: record.content_type,
            input_data: record.input_data,
            output_data: record.output_data,
            file_info: record.file_info,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHistoryRecord {
    pub content_type: ContentType,
    pub input_data: InputData,
    pub output_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub data: Vec<HistoryRecord>,
    pub count: u64,
    pub has_more: bool,
}

impl HistoryPage {
    pub fn new(data: Vec<HistoryRecord>, count: u64, limit: usize) -> Self {
        Self {
            data,
            count,
            has_more: count > limit as u64,
        }
    }
}

/// Inline media handed to the model, base64 encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPart {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Media(MediaPart),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn media(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::Media(MediaPart {
            mime_type: mime_type.into(),
            data: data.into(),
        })
    }
}

/// Keep the first `max_chars` characters of `text`, marking the cut with "..."
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((idx, _)) => format!("{}...", &text[..idx]),
    }
}

/// Prefix of at most `max_chars` characters, without any marker
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        None => text,
        Some((idx, _)) => &text[..idx],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_parsing() {
        assert_eq!("image".parse::<ContentType>().unwrap(), ContentType::Image);
        assert_eq!(" URL ".parse::<ContentType>().unwrap(), ContentType::Url);
        assert!("video".parse::<ContentType>().is_err());
        assert_eq!(serde_json::to_string(&ContentType::Conversation).unwrap(), "\"conversation\"");
    }

    #[test]
    fn test_file_info_describe() {
        let info = FileInfo {
            name: "report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: Some(1572864),
        };
        assert_eq!(info.describe(), "report.pdf (application/pdf) - 1.50MB");

        let info = FileInfo { size: Some(0), ..info };
        assert_eq!(info.describe(), "report.pdf (application/pdf)");

        let info = FileInfo { size: None, ..info };
        assert_eq!(info.describe(), "report.pdf (application/pdf)");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 100), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("héllo wörld", 5), "héllo...");
        assert_eq!(take_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_history_page_has_more() {
        assert!(HistoryPage::new(vec![], 11, 10).has_more);
        assert!(!HistoryPage::new(vec![], 10, 10).has_more);
        let json = serde_json::to_value(HistoryPage::new(vec![], 3, 10)).unwrap();
        assert_eq!(json["hasMore"], serde_json::json!(false));
    }

    #[test]
    fn test_file_info_wire_name() {
        let info: FileInfo =
            serde_json::from_str(r#"{"name":"a.png","type":"image/png"}"#).unwrap();
        assert_eq!(info.mime_type, "image/png");
        assert_eq!(info.size, None);
    }
}
