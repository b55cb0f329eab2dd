use serde::{Deserialize, Serialize};
use ap_core::{take_chars, GenerativeModel, Part, Result};

use super::{media_part, strings};
use crate::json::{lenient_string, lenient_u64, null_default, parse_or_fallback, Parsed};

const DEFAULT_MIME: &str = "image/jpeg";

const PROMPT: &str = r#"
Analyze this image in detail and provide a comprehensive analysis. Please return your response in the following JSON format:

{
  "description": "A clear, concise description of what you see in the image",
  "detailedDescription": "A more detailed and nuanced description of the image, including context, emotions, and artistic elements",
  "objects": ["object1", "object2", "object3"],
  "colors": ["color1", "color2", "color3"],
  "mood": "The overall mood or atmosphere of the image",
  "style": "The artistic style, photography style, or visual style",
  "people": {
    "count": 0,
    "details": ["Description of each person if any are present"]
  },
  "location": "Likely location or setting type",
  "timeOfDay": "Time of day if discernible",
  "textContent": "Any text visible in the image (OCR)",
  "technicalDetails": {
    "composition": "Description of the composition and framing",
    "lighting": "Description of lighting conditions and quality",
    "quality": "Assessment of image quality, resolution, clarity"
  },
  "tags": ["tag1", "tag2", "tag3", "tag4", "tag5"]
}

Instructions:
1. Provide a brief but informative description (1-2 sentences)
2. Give a detailed description that captures the essence, mood, and artistic qualities
3. List all significant objects you can identify in the image
4. Identify the main colors present in the image
5. Determine the overall mood/atmosphere (e.g., peaceful, energetic, melancholic, etc.)
6. Identify the style (e.g., portrait, landscape, street photography, digital art, etc.)
7. Count people and describe them if present
8. Identify the likely location or setting
9. Determine time of day if possible from lighting/context
10. Extract any visible text using OCR capabilities
11. Analyze technical aspects like composition, lighting, and quality
12. Provide 5-7 relevant tags for categorization

Please ensure the JSON is valid and properly formatted. Be descriptive but concise.
"#;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct People {
    #[serde(deserialize_with = "lenient_u64")]
    pub count: u64,
    #[serde(deserialize_with = "null_default")]
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalDetails {
    #[serde(deserialize_with = "lenient_string")]
    pub composition: String,
    #[serde(deserialize_with = "lenient_string")]
    pub lighting: String,
    #[serde(deserialize_with = "lenient_string")]
    pub quality: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageAnalysis {
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub detailed_description: String,
    #[serde(deserialize_with = "null_default")]
    pub objects: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub colors: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub mood: String,
    #[serde(deserialize_with = "lenient_string")]
    pub style: String,
    #[serde(deserialize_with = "null_default")]
    pub people: People,
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(deserialize_with = "lenient_string")]
    pub time_of_day: String,
    #[serde(deserialize_with = "lenient_string")]
    pub text_content: String,
    #[serde(deserialize_with = "null_default")]
    pub technical_details: TechnicalDetails,
    #[serde(deserialize_with = "null_default")]
    pub tags: Vec<String>,
}

impl ImageAnalysis {
    pub fn fallback(text: &str) -> Self {
        Self {
            description: format!("{}...", take_chars(text, 200)),
            detailed_description: text.to_string(),
            objects: strings(&["Unknown"]),
            colors: strings(&["Mixed"]),
            mood: "Neutral".to_string(),
            style: "Photography".to_string(),
            people: People::default(),
            location: "Unknown".to_string(),
            time_of_day: "Unknown".to_string(),
            text_content: String::new(),
            technical_details: TechnicalDetails {
                composition: "Standard composition".to_string(),
                lighting: "Natural lighting".to_string(),
                quality: "Good quality".to_string(),
            },
            tags: strings(&["general", "image", "analysis"]),
        }
    }
}

pub async fn analyze(model: &dyn GenerativeModel, request: &ImageRequest) -> Result<Parsed<ImageAnalysis>> {
    let image = media_part(
        request.image_data.as_deref(),
        request.mime_type.as_deref(),
        DEFAULT_MIME,
        "No image data provided",
    )?;

    let text = model.generate(&[Part::text(PROMPT), Part::Media(image)]).await?;
    Ok(parse_or_fallback(&text, || ImageAnalysis::fallback(&text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CannedModel;

    fn request() -> ImageRequest {
        ImageRequest {
            image_data: Some("iVBORw0KGgo=".to_string()),
            mime_type: None,
        }
    }

    #[tokio::test]
    async fn test_parses_model_json() {
        let model = CannedModel::new(
            r#"{"description": "A cat on a sofa", "objects": ["cat", "sofa"],
                "people": {"count": "0", "details": []}, "tags": ["cat"]}"#,
        );
        let parsed = analyze(&model, &request()).await.unwrap();
        assert!(!parsed.recovered);
        assert_eq!(parsed.value.description, "A cat on a sofa");
        assert_eq!(parsed.value.objects, vec!["cat", "sofa"]);
        assert_eq!(model.prompts()[0][1], Part::media("image/jpeg", "iVBORw0KGgo="));
    }

    #[tokio::test]
    async fn test_null_fields_keep_model_answer() {
        let model = CannedModel::new(
            r#"{"description": "An empty beach", "objects": null, "people": {"count": 0, "details": null},
                "technicalDetails": null, "tags": ["beach"]}"#,
        );
        let parsed = analyze(&model, &request()).await.unwrap();
        assert!(!parsed.recovered);
        assert_eq!(parsed.value.description, "An empty beach");
        assert!(parsed.value.objects.is_empty());
        assert!(parsed.value.people.details.is_empty());
        assert_eq!(parsed.value.technical_details, TechnicalDetails::default());
        assert_eq!(parsed.value.tags, vec!["beach"]);
    }

    #[tokio::test]
    async fn test_fallback_truncates_description() {
        let long = "x".repeat(250);
        let model = CannedModel::new(long.clone());
        let parsed = analyze(&model, &request()).await.unwrap();
        assert!(parsed.recovered);
        assert_eq!(parsed.value.description, format!("{}...", "x".repeat(200)));
        assert_eq!(parsed.value.detailed_description, long);
        assert_eq!(parsed.value.tags, vec!["general", "image", "analysis"]);
        assert_eq!(parsed.value.technical_details.lighting, "Natural lighting");
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(ImageAnalysis::fallback("t")).unwrap();
        assert_eq!(json["timeOfDay"], "Unknown");
        assert_eq!(json["technicalDetails"]["quality"], "Good quality");
        assert_eq!(json["people"]["count"], 0);
    }
}
