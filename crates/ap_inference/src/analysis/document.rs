use base64::Engine;
use serde::Deserialize;
use ap_core::{take_chars, FileInfo, GenerativeModel, Part, Result};

use super::{media_part, strings, DocumentMetadata, DocumentStructure, DocumentSummary};
use crate::json::{parse_or_fallback, Parsed};

const DEFAULT_MIME: &str = "application/pdf";
const DEFAULT_TITLE: &str = "Document Analysis";
const FULL_TEXT_CHARS: usize = 2000;

const PROMPT: &str = r#"
Analyze this document and provide a comprehensive summary and analysis. Please return your response in the following JSON format:

{
  "title": "Extract or generate an appropriate title for the document",
  "summary": "A concise 2-3 sentence summary of the main content",
  "detailedSummary": "A more comprehensive summary (4-6 sentences) covering key themes and insights",
  "keyPoints": ["List of 5-8 most important points from the document"],
  "topics": ["List of 4-6 main topics or themes discussed"],
  "wordCount": "Estimated word count",
  "readingTime": "Estimated reading time in minutes",
  "sentiment": "Overall sentiment: Positive/Negative/Neutral/Mixed",
  "difficulty": "Reading difficulty: Beginner/Intermediate/Advanced/Expert",
  "structure": {
    "sections": "Number of main sections",
    "tables": "Number of tables/data structures",
    "images": "Number of images/figures",
    "links": "Number of references/links"
  },
  "metadata": {
    "author": "Author name if mentioned, otherwise null",
    "publishDate": "Publication date if mentioned, otherwise null",
    "language": "Primary language of the document",
    "source": "Document type (PDF/DOCX/etc.)"
  },
  "quotes": ["Array of 2-3 most important or memorable quotes from the text"],
  "actionItems": ["List of actionable items or recommendations if any are present"]
}

Instructions:
1. Read and analyze the entire document content
2. Generate an appropriate title if none is apparent
3. Provide both concise and detailed summaries
4. Extract the most important points and themes
5. Analyze the document structure (sections, tables, images, etc.)
6. Extract key quotes that represent important ideas
7. Extract any actionable items or recommendations
8. Estimate reading difficulty based on vocabulary and concepts
9. Determine sentiment and overall tone
10. Extract metadata where available
11. Handle PDFs, Word documents, and text files appropriately
12. If the document contains tables, charts, or images, describe their content

Please ensure the JSON is valid and properly formatted.
"#;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    #[serde(default)]
    pub document_data: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl DocumentRequest {
    /// File info for the history log; size is the decoded payload length
    pub fn file_info(&self) -> Option<FileInfo> {
        let name = self.file_name.clone().filter(|n| !n.trim().is_empty())?;
        let size = self.document_data.as_deref().and_then(|data| {
            base64::engine::general_purpose::STANDARD
                .decode(data.trim())
                .ok()
                .map(|bytes| bytes.len() as u64)
        });
        Some(FileInfo {
            name,
            mime_type: self
                .mime_type
                .clone()
                .unwrap_or_else(|| DEFAULT_MIME.to_string()),
            size,
        })
    }
}

/// File name without its last extension
fn file_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if !file_name[idx + 1..].contains('/') && idx + 1 < file_name.len() => {
            &file_name[..idx]
        }
        _ => file_name,
    }
}

pub fn fallback(text: &str, file_name: Option<&str>) -> DocumentSummary {
    let title = file_name
        .map(file_stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(DEFAULT_TITLE);

    DocumentSummary {
        title: title.to_string(),
        summary: "Document analysis completed. Please review the raw response for details.".to_string(),
        detailed_summary: "The AI has processed your document but the response couldn't be parsed into the expected format. The analysis was completed successfully.".to_string(),
        key_points: strings(&[
            "Document analysis completed",
            "Please review the content manually for detailed insights",
        ]),
        topics: strings(&["General content", "Document analysis"]),
        word_count: 0,
        reading_time: 1,
        sentiment: "Neutral".to_string(),
        difficulty: "Intermediate".to_string(),
        structure: DocumentStructure {
            sections: 1,
            ..Default::default()
        },
        metadata: DocumentMetadata {
            language: "English".to_string(),
            source: "Document".to_string(),
            ..Default::default()
        },
        quotes: vec![],
        action_items: vec![],
        full_text: Some(take_chars(text, FULL_TEXT_CHARS).to_string()),
    }
}

pub async fn analyze(model: &dyn GenerativeModel, request: &DocumentRequest) -> Result<Parsed<DocumentSummary>> {
    let document = media_part(
        request.document_data.as_deref(),
        request.mime_type.as_deref(),
        DEFAULT_MIME,
        "No document data provided",
    )?;

    let text = model.generate(&[Part::text(PROMPT), Part::Media(document)]).await?;
    Ok(parse_or_fallback(&text, || fallback(&text, request.file_name.as_deref())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CannedModel;

    fn request() -> DocumentRequest {
        DocumentRequest {
            // "hello world"
            document_data: Some("aGVsbG8gd29ybGQ=".to_string()),
            mime_type: Some("text/plain".to_string()),
            file_name: Some("notes.final.txt".to_string()),
        }
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("report.pdf"), "report");
        assert_eq!(file_stem("notes.final.txt"), "notes.final");
        assert_eq!(file_stem("README"), "README");
        assert_eq!(file_stem(".pdf"), "");
        assert_eq!(file_stem("trailing."), "trailing.");
    }

    #[test]
    fn test_file_info_uses_decoded_size() {
        let info = request().file_info().unwrap();
        assert_eq!(info.name, "notes.final.txt");
        assert_eq!(info.mime_type, "text/plain");
        assert_eq!(info.size, Some(11));

        let no_name = DocumentRequest {
            file_name: None,
            ..request()
        };
        assert!(no_name.file_info().is_none());
    }

    #[tokio::test]
    async fn test_parses_model_json() {
        let model = CannedModel::new(
            r#"Sure! {"title": "Quarterly notes", "keyPoints": ["a", "b"], "wordCount": 1200,
                "readingTime": "6", "metadata": {"author": "Ann", "language": "English", "source": "TXT"}}"#,
        );
        let parsed = analyze(&model, &request()).await.unwrap();
        assert!(!parsed.recovered);
        assert_eq!(parsed.value.title, "Quarterly notes");
        assert_eq!(parsed.value.word_count, 1200);
        assert_eq!(parsed.value.reading_time, 6);
        assert_eq!(parsed.value.metadata.author.as_deref(), Some("Ann"));
        assert_eq!(parsed.value.full_text, None);
    }

    #[tokio::test]
    async fn test_null_fields_keep_model_answer() {
        let model = CannedModel::new(
            r#"{"title": "Release notes", "actionItems": null, "quotes": null,
                "structure": null, "metadata": null, "wordCount": "1,200"}"#,
        );
        let parsed = analyze(&model, &request()).await.unwrap();
        assert!(!parsed.recovered);
        assert_eq!(parsed.value.title, "Release notes");
        assert!(parsed.value.action_items.is_empty());
        assert_eq!(parsed.value.structure, DocumentStructure::default());
        assert_eq!(parsed.value.word_count, 1200);
    }

    #[tokio::test]
    async fn test_fallback_uses_file_name() {
        let model = CannedModel::new("I could not produce JSON for this file.");
        let parsed = analyze(&model, &request()).await.unwrap();
        assert!(parsed.recovered);
        let summary = parsed.value;
        assert_eq!(summary.title, "notes.final");
        assert_eq!(summary.structure.sections, 1);
        assert_eq!(summary.metadata.source, "Document");
        assert_eq!(summary.full_text.as_deref(), Some("I could not produce JSON for this file."));
    }

    #[test]
    fn test_fallback_default_title_and_full_text_cap() {
        let text = "y".repeat(FULL_TEXT_CHARS + 10);
        let summary = fallback(&text, None);
        assert_eq!(summary.title, DEFAULT_TITLE);
        assert_eq!(summary.full_text.map(|t| t.len()), Some(FULL_TEXT_CHARS));
    }
}
