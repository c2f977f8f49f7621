use std::sync::Arc;

use crate::generate::{ContentGenerator, GeneratedContent, ReplyPayload, Responder};
use crate::model::Tweet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub used_fallback: bool,
    pub responded: bool,
}

/// Feeds a mention into content generation and replies with the result.
#[derive(Clone)]
pub struct GenerationTrigger {
    generator: Arc<dyn ContentGenerator>,
    responder: Arc<dyn Responder>,
}

impl GenerationTrigger {
    pub fn new(generator: Arc<dyn ContentGenerator>, responder: Arc<dyn Responder>) -> Self {
        Self { generator, responder }
    }

    /// A reply-mention comments on its parent, so the parent's text is what gets generated from.
    pub fn generation_input<'t>(mention: &'t Tweet, parent: Option<&'t Tweet>) -> &'t str {
        match parent {
            Some(parent) => &parent.text,
            None => &mention.text,
        }
    }

    /// Runs once per mention. Failures are logged, never propagated.
    pub async fn trigger(&self, mention: &Tweet, author_handle: &str, parent: Option<&Tweet>) -> TriggerOutcome {
        let input = Self::generation_input(mention, parent);
        let mut outcome = TriggerOutcome::default();

        let content = match self.generator.generate(input).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Error generating content for mention {}: {}", mention.id, e);
                outcome.used_fallback = true;
                GeneratedContent::fallback(input)
            }
        };
        tracing::info!(
            "Generated ${} ({}) for mention {}",
            content.ticker,
            content.name,
            mention.id
        );

        let payload = ReplyPayload {
            mention_id: mention.id.clone(),
            author_handle: author_handle.to_string(),
            source_text: input.to_string(),
            content,
        };
        match self.responder.respond(&mention.id, &payload).await {
            Ok(()) => outcome.responded = true,
            Err(e) => tracing::error!("Error replying to mention {}: {}", mention.id, e),
        }
        outcome
    }
}
