use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use ap_core::{
    ContentType, Error, GenerativeModel, HistoryStorage, InputData, NewHistoryRecord, Result,
};
use ap_scrapers::Fetcher;

use crate::analysis::{
    conversation, document, image, url, ConversationAnalysis, ConversationRequest,
    DocumentRequest, DocumentSummary, ImageAnalysis, ImageRequest, UrlRequest,
};

/// Runs the analyzers and records successful results in the caller's history.
///
/// The model is optional so the service can start without an API key; each
/// analysis then fails with a configuration error instead.
#[derive(Clone)]
pub struct AnalysisService {
    model: Option<Arc<dyn GenerativeModel>>,
    fetcher: Arc<dyn Fetcher>,
    history: Arc<dyn HistoryStorage>,
}

impl fmt::Debug for AnalysisService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisService")
            .field("model", &self.model_name())
            .finish()
    }
}

impl AnalysisService {
    pub fn new(
        model: Option<Arc<dyn GenerativeModel>>,
        fetcher: Arc<dyn Fetcher>,
        history: Arc<dyn HistoryStorage>,
    ) -> Self {
        Self {
            model,
            fetcher,
            history,
        }
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model.as_ref().map(|m| m.name())
    }

    pub fn history(&self) -> &Arc<dyn HistoryStorage> {
        &self.history
    }

    fn model(&self) -> Result<&dyn GenerativeModel> {
        self.model
            .as_deref()
            .ok_or_else(|| Error::Config("Gemini API key not configured".to_string()))
    }

    /// Saving is best effort: anonymous callers and storage errors never fail the analysis
    async fn record<T: Serialize>(
        &self,
        user_id: Option<&str>,
        content_type: ContentType,
        input_data: InputData,
        result: &T,
        file_info: Option<ap_core::FileInfo>,
    ) {
        let Some(user_id) = user_id else {
            tracing::debug!(%content_type, "anonymous analysis, not saved to history");
            return;
        };

        let output_data = match serde_json::to_string(result) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize analysis for history");
                return;
            }
        };

        let record = NewHistoryRecord {
            content_type,
            input_data,
            output_data,
            file_info,
        };
        match self.history.save(user_id, record).await {
            Ok(saved) => tracing::info!(id = %saved.id, %content_type, "💾 Saved to history"),
            Err(e) => tracing::error!(error = %e, "Failed to save to history"),
        }
    }

    pub async fn analyze_conversation(
        &self,
        user_id: Option<&str>,
        request: &ConversationRequest,
    ) -> Result<ConversationAnalysis> {
        if request.audio_data.as_deref().map_or(true, |d| d.trim().is_empty()) {
            return Err(Error::InvalidInput("No audio data provided".to_string()));
        }
        let parsed = conversation::analyze(self.model()?, request).await?;
        tracing::info!(recovered = parsed.recovered, "🎙️ Conversation analyzed");
        self.record(
            user_id,
            ContentType::Conversation,
            InputData::prompt("Conversation analysis"),
            &parsed.value,
            None,
        )
        .await;
        Ok(parsed.value)
    }

    pub async fn analyze_image(&self, user_id: Option<&str>, request: &ImageRequest) -> Result<ImageAnalysis> {
        if request.image_data.as_deref().map_or(true, |d| d.trim().is_empty()) {
            return Err(Error::InvalidInput("No image data provided".to_string()));
        }
        let parsed = image::analyze(self.model()?, request).await?;
        tracing::info!(recovered = parsed.recovered, "🖼️ Image analyzed");
        self.record(
            user_id,
            ContentType::Image,
            InputData::prompt("Image analysis"),
            &parsed.value,
            None,
        )
        .await;
        Ok(parsed.value)
    }

    pub async fn analyze_document(
        &self,
        user_id: Option<&str>,
        request: &DocumentRequest,
    ) -> Result<DocumentSummary> {
        if request.document_data.as_deref().map_or(true, |d| d.trim().is_empty()) {
            return Err(Error::InvalidInput("No document data provided".to_string()));
        }
        let parsed = document::analyze(self.model()?, request).await?;
        tracing::info!(recovered = parsed.recovered, "📄 Document analyzed");
        self.record(
            user_id,
            ContentType::Document,
            InputData::prompt("Document analysis"),
            &parsed.value,
            request.file_info(),
        )
        .await;
        Ok(parsed.value)
    }

    /// Limited analyses (page could not be fetched) are returned but not recorded
    pub async fn analyze_url(&self, user_id: Option<&str>, request: &UrlRequest) -> Result<DocumentSummary> {
        let target = request.url()?.to_string();
        let outcome = url::analyze(self.model()?, self.fetcher.as_ref(), request).await?;
        tracing::info!(
            url = %target,
            recovered = outcome.recovered,
            limited = outcome.limited,
            "🔗 URL analyzed"
        );
        if !outcome.limited {
            self.record(
                user_id,
                ContentType::Url,
                InputData::url(target),
                &outcome.summary,
                None,
            )
            .await;
        }
        Ok(outcome.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CannedModel;
    use ap_storage::MemoryStorage;
    use async_trait::async_trait;

    struct PageFetcher(String);

    #[async_trait]
    impl Fetcher for PageFetcher {
        async fn fetch_html(&self, _url: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct BlockedFetcher;

    #[async_trait]
    impl Fetcher for BlockedFetcher {
        async fn fetch_html(&self, _url: &str) -> Result<String> {
            Err(Error::Scraping("Failed to fetch URL: 403 Forbidden".to_string()))
        }
    }

    fn service(response: &str, fetcher: Arc<dyn Fetcher>) -> (AnalysisService, Arc<MemoryStorage>) {
        let history = Arc::new(MemoryStorage::new());
        let service = AnalysisService::new(
            Some(Arc::new(CannedModel::new(response))),
            fetcher,
            history.clone(),
        );
        (service, history)
    }

    fn image_request() -> ImageRequest {
        ImageRequest {
            image_data: Some("aGk=".to_string()),
            mime_type: Some("image/png".to_string()),
        }
    }

    #[tokio::test]
    async fn test_image_analysis_is_recorded_for_user() {
        let (service, history) = service(r#"{"description": "A dog"}"#, Arc::new(BlockedFetcher));
        let analysis = service.analyze_image(Some("user-1"), &image_request()).await.unwrap();
        assert_eq!(analysis.description, "A dog");

        let page = history.list("user-1", 10, None).await.unwrap();
        assert_eq!(page.count, 1);
        let record = &page.data[0];
        assert_eq!(record.content_type, ContentType::Image);
        assert_eq!(record.input_data.prompt.as_deref(), Some("Image analysis"));
        let stored: ImageAnalysis = serde_json::from_str(&record.output_data).unwrap();
        assert_eq!(stored, analysis);
    }

    #[tokio::test]
    async fn test_anonymous_analysis_is_not_recorded() {
        let (service, history) = service("{}", Arc::new(BlockedFetcher));
        service.analyze_image(None, &image_request()).await.unwrap();
        assert_eq!(history.list("user-1", 10, None).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_missing_model_is_config_error() {
        let service = AnalysisService::new(None, Arc::new(BlockedFetcher), Arc::new(MemoryStorage::new()));
        let err = service.analyze_image(None, &image_request()).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(service.model_name(), None);
    }

    #[tokio::test]
    async fn test_input_checked_before_model() {
        let service = AnalysisService::new(None, Arc::new(BlockedFetcher), Arc::new(MemoryStorage::new()));
        let err = service
            .analyze_url(None, &UrlRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m == "No URL provided"));

        let err = service
            .analyze_document(None, &DocumentRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m == "No document data provided"));
    }

    #[tokio::test]
    async fn test_url_analysis_records_url() {
        let html = format!(
            "<html><head><title>Page</title></head><body><main>{}</main></body></html>",
            "Enough readable text to count as the main content of this page. ".repeat(5)
        );
        let (service, history) = service(r#"{"title": "Page summary"}"#, Arc::new(PageFetcher(html)));
        let request = UrlRequest {
            url: Some("https://example.com/page".to_string()),
        };
        let summary = service.analyze_url(Some("user-1"), &request).await.unwrap();
        assert_eq!(summary.title, "Page summary");

        let page = history.list("user-1", 10, Some(ContentType::Url)).await.unwrap();
        assert_eq!(page.data[0].input_data.url.as_deref(), Some("https://example.com/page"));
    }

    #[tokio::test]
    async fn test_limited_url_analysis_is_not_recorded() {
        let (service, history) = service("{}", Arc::new(BlockedFetcher));
        let request = UrlRequest {
            url: Some("https://blocked.example".to_string()),
        };
        service.analyze_url(Some("user-1"), &request).await.unwrap();
        assert_eq!(history.list("user-1", 10, None).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_document_records_file_info() {
        let (service, history) = service("not json", Arc::new(BlockedFetcher));
        let request = DocumentRequest {
            document_data: Some("aGVsbG8=".to_string()),
            mime_type: Some("text/plain".to_string()),
            file_name: Some("hello.txt".to_string()),
        };
        let summary = service.analyze_document(Some("user-2"), &request).await.unwrap();
        assert_eq!(summary.title, "hello");

        let page = history.list("user-2", 10, Some(ContentType::Document)).await.unwrap();
        let info = page.data[0].file_info.clone().unwrap();
        assert_eq!(info.name, "hello.txt");
        assert_eq!(info.size, Some(5));
    }
}
