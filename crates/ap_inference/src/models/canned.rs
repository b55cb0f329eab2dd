use std::fmt;
use std::sync::Mutex;

use ap_core::{GenerativeModel, Part, Result};

/// Answers every prompt with a fixed text. Used offline and in tests.
pub struct CannedModel {
    response: String,
    prompts: Mutex<Vec<Vec<Part>>>,
}

impl fmt::Debug for CannedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CannedModel")
            .field("response", &self.response)
            .finish()
    }
}

impl CannedModel {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt received so far, oldest first
    pub fn prompts(&self) -> Vec<Vec<Part>> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl GenerativeModel for CannedModel {
    fn name(&self) -> &str {
        "Canned"
    }

    async fn generate(&self, parts: &[Part]) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(parts.to_vec());
        }
        Ok(self.response.clone())
    }
}
