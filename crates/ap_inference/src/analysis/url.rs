use serde::Deserialize;
use ap_core::{take_chars, Error, GenerativeModel, Part, Result};
use ap_scrapers::{extract_page, Fetcher, ExtractedPage};

use super::{strings, DocumentMetadata, DocumentStructure, DocumentSummary};
use crate::json::{parse_or_fallback, Parsed};

const MAX_PROMPT_CHARS: usize = 50_000;
const FULL_TEXT_CHARS: usize = 2000;
const LIMITED_SOURCE: &str = "URL Analysis (Limited)";

pub const LIMITED_FAILURE_MESSAGE: &str =
    "Failed to analyze the webpage. The site may not be accessible or may block automated requests.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlRequest {
    #[serde(default)]
    pub url: Option<String>,
}

impl UrlRequest {
    pub fn url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::InvalidInput("No URL provided".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UrlAnalysis {
    pub summary: DocumentSummary,
    /// The model answer was unusable and a fallback object was returned
    pub recovered: bool,
    /// The page could not be fetched, only the URL itself was analyzed
    pub limited: bool,
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn json_string_or_null(value: &str) -> String {
    if value.is_empty() {
        "null".to_string()
    } else {
        json_string(value)
    }
}

fn page_prompt(page: &ExtractedPage) -> String {
    let content = take_chars(&page.content, MAX_PROMPT_CHARS);
    let truncated = if content.len() < page.content.len() {
        "...[content truncated for analysis]"
    } else {
        ""
    };

    format!(
        r#"
Analyze this webpage content and provide a comprehensive summary and analysis. Please return your response in the following JSON format:

{{
  "title": {title},
  "summary": "A concise 2-3 sentence summary of the main content",
  "detailedSummary": "A more comprehensive summary (4-6 sentences) covering key themes and insights",
  "keyPoints": ["List of 5-8 most important points from the content"],
  "topics": ["List of 4-6 main topics or themes discussed"],
  "wordCount": {word_count},
  "readingTime": {reading_time},
  "sentiment": "Overall sentiment: Positive/Negative/Neutral/Mixed",
  "difficulty": "Reading difficulty: Beginner/Intermediate/Advanced/Expert",
  "structure": {{
    "sections": {sections},
    "tables": {tables},
    "images": {images},
    "links": {links}
  }},
  "metadata": {{
    "author": {author},
    "publishDate": {publish_date},
    "language": "Primary language of the content",
    "source": "Web Article"
  }},
  "quotes": ["Array of 2-3 most important or memorable quotes from the text"],
  "actionItems": ["List of actionable items or recommendations if any are present"]
}}

Webpage Content:
{content} {truncated}

Instructions:
1. Use the provided title or improve it if needed
2. Provide both concise and detailed summaries
3. Extract the most important points and themes
4. Analyze the content structure and complexity
5. Identify key quotes that represent important ideas
6. Extract any actionable items or recommendations
7. Estimate reading difficulty based on vocabulary and concepts
8. Determine sentiment and overall tone
9. Use provided metadata where available
10. Ensure all arrays contain relevant, non-duplicate items

Please ensure the JSON is valid and properly formatted.
"#,
        title = json_string(&page.title),
        word_count = page.word_count(),
        reading_time = page.reading_time(),
        sections = page.structure.sections,
        tables = page.structure.tables,
        images = page.structure.images,
        links = page.structure.links,
        author = json_string_or_null(&page.author),
        publish_date = json_string_or_null(&page.publish_date),
        content = content,
        truncated = truncated,
    )
}

fn limited_prompt(url: &str) -> String {
    let available = format!(
        "Analysis of {url}: Unable to fully extract webpage content. This might be due to JavaScript-heavy content, access restrictions, or site blocking. The URL appears to be: {url}"
    );

    format!(
        r#"
Analyze this URL and provide a basic summary based on the URL structure and any available information. Please return your response in the following JSON format:

{{
  "title": {title},
  "summary": "Unable to extract full webpage content. This might be due to JavaScript-heavy content, access restrictions, or the site blocking automated requests.",
  "detailedSummary": "The analysis was limited due to content extraction issues. The URL suggests it may contain relevant information, but full content analysis was not possible.",
  "keyPoints": ["Content extraction was limited", "Site may use JavaScript rendering", "Manual review recommended"],
  "topics": ["Web analysis limitation", "Content accessibility"],
  "wordCount": 50,
  "readingTime": 1,
  "sentiment": "Neutral",
  "difficulty": "Unknown",
  "structure": {{
    "sections": 0,
    "tables": 0,
    "images": 0,
    "links": 0
  }},
  "metadata": {{
    "language": "Unknown",
    "source": "{source}"
  }},
  "quotes": [],
  "actionItems": ["Consider accessing the URL manually for full content", "Check if the site allows automated access"]
}}

URL to analyze: {url}
Available information: {available}

Please provide a helpful analysis acknowledging the limitations while still giving useful feedback to the user.
"#,
        title = json_string(&format!("Analysis of {}", url)),
        source = LIMITED_SOURCE,
        url = url,
        available = available,
    )
}

pub fn page_fallback(page: &ExtractedPage) -> DocumentSummary {
    let word_count = page.word_count() as u64;
    let non_empty = |s: &str| Some(s.to_string()).filter(|s| !s.is_empty());

    DocumentSummary {
        title: non_empty(&page.title).unwrap_or_else(|| "Web Page Analysis".to_string()),
        summary: format!("{}...", take_chars(&page.content, 300)),
        detailed_summary: format!("{}...", take_chars(&page.content, 800)),
        key_points: strings(&["Web content analysis completed", "Please review the content manually"]),
        topics: strings(&["Web content", "Online article"]),
        word_count,
        reading_time: page.reading_time() as u64,
        sentiment: "Neutral".to_string(),
        difficulty: "Intermediate".to_string(),
        structure: DocumentStructure::from(page.structure),
        metadata: DocumentMetadata {
            author: non_empty(&page.author),
            publish_date: non_empty(&page.publish_date),
            language: "English".to_string(),
            source: "Web Article".to_string(),
        },
        quotes: vec![],
        action_items: vec![],
        full_text: Some(take_chars(&page.content, FULL_TEXT_CHARS).to_string()),
    }
}

pub fn limited_fallback(url: &str) -> DocumentSummary {
    DocumentSummary {
        title: format!("Analysis of {}", url),
        summary: "Unable to extract webpage content due to technical limitations.".to_string(),
        detailed_summary: "The URL could not be fully analyzed due to content extraction issues. This is common with JavaScript-heavy sites or sites that block automated requests.".to_string(),
        key_points: strings(&[
            "Content extraction failed",
            "Site may use dynamic content loading",
            "Manual review recommended",
        ]),
        topics: strings(&["Web accessibility", "Content extraction limitations"]),
        word_count: 0,
        reading_time: 1,
        sentiment: "Neutral".to_string(),
        difficulty: "Unknown".to_string(),
        structure: DocumentStructure::default(),
        metadata: DocumentMetadata {
            language: "Unknown".to_string(),
            source: LIMITED_SOURCE.to_string(),
            ..Default::default()
        },
        quotes: vec![],
        action_items: strings(&[
            "Try accessing the URL manually",
            "Check if the site has an API or RSS feed",
        ]),
        full_text: None,
    }
}

async fn fetch_page(fetcher: &dyn Fetcher, url: &str) -> Result<ExtractedPage> {
    let html = fetcher.fetch_html(url).await?;
    extract_page(&html, url)
}

async fn analyze_limited(model: &dyn GenerativeModel, url: &str) -> Result<Parsed<DocumentSummary>> {
    match model.generate(&[Part::text(limited_prompt(url))]).await {
        Ok(text) => Ok(parse_or_fallback(&text, || limited_fallback(url))),
        Err(e) => {
            tracing::error!(url, error = %e, "Limited URL analysis failed");
            Err(Error::InvalidInput(LIMITED_FAILURE_MESSAGE.to_string()))
        }
    }
}

/// Summarize a web page. When the page cannot be fetched the model is
/// still asked about the URL alone and the result is flagged as limited.
pub async fn analyze(
    model: &dyn GenerativeModel,
    fetcher: &dyn Fetcher,
    request: &UrlRequest,
) -> Result<UrlAnalysis> {
    let url = request.url()?;

    let page = match fetch_page(fetcher, url).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!(url, error = %e, "URL fetching failed, analyzing the URL only");
            let parsed = analyze_limited(model, url).await?;
            return Ok(UrlAnalysis {
                summary: parsed.value,
                recovered: parsed.recovered,
                limited: true,
            });
        }
    };

    let text = model.generate(&[Part::text(page_prompt(&page))]).await?;
    let parsed = parse_or_fallback(&text, || page_fallback(&page));
    Ok(UrlAnalysis {
        summary: parsed.value,
        recovered: parsed.recovered,
        limited: false,
    })
}
