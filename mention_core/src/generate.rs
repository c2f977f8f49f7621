// Collaborators at the end of the pipeline: something that turns text into token
// content, and something that replies to the mention with it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

const FALLBACK_DESCRIPTION_CHARS: usize = 280;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    pub ticker: String,
    pub name: String,
    pub description: String,
}

impl GeneratedContent {
    /// Used when the generator fails: a generic token described by the source text itself.
    pub fn fallback(source_text: &str) -> Self {
        Self {
            ticker: "MENTION".to_string(),
            name: "Mention Token".to_string(),
            description: source_text.chars().take(FALLBACK_DESCRIPTION_CHARS).collect(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplyPayload {
    pub mention_id: String,
    pub author_handle: String,
    pub source_text: String,
    pub content: GeneratedContent,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, text: &str) -> Result<GeneratedContent>;
}

#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, target_id: &str, payload: &ReplyPayload) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_truncates_description() {
        let text = "x".repeat(500);
        let content = GeneratedContent::fallback(&text);
        assert_eq!(content.ticker, "MENTION");
        assert_eq!(content.description.chars().count(), FALLBACK_DESCRIPTION_CHARS);
    }
}
