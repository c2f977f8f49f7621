use crate::model::Tweet;
use crate::retry::RateLimitExecutor;
use crate::source::{FetchedTweet, MentionSource};
use crate::state::AgentState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub parent: Option<Tweet>,
    pub parent_author_handle: String,
    /// Whether a remote fetch was issued, successful or not.
    pub fetched: bool,
}

impl Resolution {
    fn none(fetched: bool) -> Self {
        Self {
            parent: None,
            parent_author_handle: "unknown".to_string(),
            fetched,
        }
    }
}

/// Finds the tweet a mention replies to, preferring the local cache over a remote fetch.
pub struct ThreadResolver<'a> {
    source: &'a dyn MentionSource,
    executor: RateLimitExecutor,
}

impl<'a> ThreadResolver<'a> {
    pub fn new(source: &'a dyn MentionSource, executor: RateLimitExecutor) -> Self {
        Self { source, executor }
    }

    /// Resolve the parent of `mention`. A fetched parent and its author are added to the caches.
    /// Fetch failures are logged and resolve to no parent.
    pub async fn resolve(&self, mention: &Tweet, state: &mut AgentState) -> Resolution {
        let Some(parent_id) = mention.replied_to() else {
            tracing::info!("No parent tweet found - this is likely a direct mention, not a reply");
            return Resolution::none(false);
        };

        if let Some(parent) = state.tweets.get(parent_id).cloned() {
            let handle = state.handle_for(parent.author_id.as_deref());
            tracing::info!("Parent tweet found: @{}: {} ({})", handle, parent.text, parent.url(&handle));
            return Resolution {
                parent: Some(parent),
                parent_author_handle: handle,
                fetched: false,
            };
        }

        tracing::info!("Parent tweet {} referenced but not cached, fetching", parent_id);
        let fetched = self
            .executor
            .execute(|| self.source.fetch_tweet(parent_id))
            .await;

        match fetched {
            Ok(FetchedTweet { tweet, author }) => {
                state.tweets.insert(tweet.clone());
                let handle = match author {
                    Some(author) => {
                        let handle = author.username.clone();
                        state.users.insert(author);
                        handle
                    }
                    None => state.handle_for(tweet.author_id.as_deref()),
                };
                tracing::info!("Parent tweet fetched: @{}: {} ({})", handle, tweet.text, tweet.url(&handle));
                Resolution {
                    parent: Some(tweet),
                    parent_author_handle: handle,
                    fetched: true,
                }
            }
            Err(e) => {
                tracing::warn!("Error fetching parent tweet {}: {}", parent_id, e);
                Resolution::none(true)
            }
        }
    }
}
