use async_trait::async_trait;
use crate::types::Part;
use crate::Result;

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Short name used in logs and the health endpoint
    fn name(&self) -> &str;

    /// Send the prompt parts to the model and return its text answer
    async fn generate(&self, parts: &[Part]) -> Result<String>;
}
