use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Tweet, User};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionQuery {
    /// Handle without the leading `@`.
    pub handle: String,
    /// Only return mentions newer than this id.
    pub since_id: Option<String>,
    pub max_results: u32,
}

impl MentionQuery {
    pub fn search_text(&self) -> String {
        format!("@{}", self.handle)
    }
}

/// One page of mentions plus the users and tweets expanded alongside them.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Newest first.
    pub tweets: Vec<Tweet>,
    pub users: Vec<User>,
    pub included_tweets: Vec<Tweet>,
}

#[derive(Debug, Clone)]
pub struct FetchedTweet {
    pub tweet: Tweet,
    pub author: Option<User>,
}

/// Remote service that mentions are read from.
///
/// Implementations report throttling as [`Error::RateLimited`](crate::Error::RateLimited)
/// so the caller's executor can wait and retry.
#[async_trait]
pub trait MentionSource: Send + Sync {
    async fn search_mentions(&self, query: &MentionQuery) -> Result<SearchPage>;

    /// Fetch a single tweet with its author, projecting only the fields needed for context.
    async fn fetch_tweet(&self, tweet_id: &str) -> Result<FetchedTweet>;
}
