use serde::{Deserialize, Serialize};
use ap_core::{GenerativeModel, Part, Result};

use super::{media_part, strings};
use crate::json::{lenient_f64, lenient_string, lenient_u64, null_default, parse_or_fallback, Parsed};

const DEFAULT_MIME: &str = "audio/mpeg";

const PROMPT: &str = r#"
Analyze this audio file and provide a comprehensive conversation analysis. Please return your response in the following JSON format:

{
  "transcript": "Full transcript of the conversation",
  "speakers": [
    {
      "id": "speaker_1",
      "label": "Speaker 1",
      "segments": [
        {
          "text": "What the speaker said",
          "startTime": 0,
          "endTime": 5
        }
      ]
    }
  ],
  "summary": "Brief summary of the conversation",
  "keyTopics": ["topic1", "topic2", "topic3"],
  "sentiment": "Positive/Negative/Neutral",
  "duration": 120
}

Instructions:
1. Transcribe the entire audio accurately
2. Identify up to 2 speakers and separate their speech segments
3. Assign approximate timestamps for each segment (in seconds)
4. Provide a concise summary of the main discussion points
5. Extract 3-5 key topics discussed
6. Determine the overall sentiment of the conversation
7. Estimate the total duration of the audio

Please ensure the JSON is valid and properly formatted. If there's only one speaker, still format as an array with one speaker object.
"#;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    #[serde(default)]
    pub audio_data: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Segment {
    #[serde(deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub start_time: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub end_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Speaker {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(deserialize_with = "null_default")]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversationAnalysis {
    #[serde(deserialize_with = "lenient_string")]
    pub transcript: String,
    #[serde(deserialize_with = "null_default")]
    pub speakers: Vec<Speaker>,
    #[serde(deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(deserialize_with = "null_default")]
    pub key_topics: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sentiment: String,
    /// Seconds
    #[serde(deserialize_with = "lenient_u64")]
    pub duration: u64,
}

impl ConversationAnalysis {
    /// Whole raw answer as a one-speaker transcript
    pub fn fallback(text: &str) -> Self {
        Self {
            transcript: text.to_string(),
            speakers: vec![Speaker {
                id: "speaker_1".to_string(),
                label: "Speaker 1".to_string(),
                segments: vec![Segment {
                    text: text.to_string(),
                    start_time: 0.0,
                    end_time: 60.0,
                }],
            }],
            summary: "Audio analysis completed. Please check the transcript for details.".to_string(),
            key_topics: strings(&["General discussion"]),
            sentiment: "Neutral".to_string(),
            duration: 60,
        }
    }
}

pub async fn analyze(
    model: &dyn GenerativeModel,
    request: &ConversationRequest,
) -> Result<Parsed<ConversationAnalysis>> {
    let audio = media_part(
        request.audio_data.as_deref(),
        request.mime_type.as_deref(),
        DEFAULT_MIME,
        "No audio data provided",
    )?;

    let text = model.generate(&[Part::text(PROMPT), Part::Media(audio)]).await?;
    Ok(parse_or_fallback(&text, || ConversationAnalysis::fallback(&text)))
}
