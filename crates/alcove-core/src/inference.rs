//! Inference seam.

use async_trait::async_trait;

use crate::config::GenerationSettings;
use crate::error::Result;

/// Produces assistant replies for user prompts.
///
/// The persistence layer never talks to a model directly; callers wire a
/// generator in and append both sides of the exchange to the history log.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generates a reply to `prompt` under the given sampling settings.
    async fn generate(&self, prompt: &str, settings: &GenerationSettings) -> Result<String>;
}
