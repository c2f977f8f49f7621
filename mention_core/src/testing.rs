// In-memory collaborators with call recording, shared by the unit tests.

use async_trait::async_trait;
use tokio::time::{self, Duration};

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::generate::{ContentGenerator, GeneratedContent, ReplyPayload, Responder};
use crate::model::{Tweet, TweetReference, User, REPLIED_TO};
use crate::source::{FetchedTweet, MentionQuery, MentionSource, SearchPage};

pub fn tweet(id: &str, text: &str) -> Tweet {
    Tweet {
        id: id.to_string(),
        author_id: None,
        text: text.to_string(),
        referenced_tweets: Vec::new(),
    }
}

pub fn tweet_by(id: &str, author_id: &str, text: &str) -> Tweet {
    Tweet {
        author_id: Some(author_id.to_string()),
        ..tweet(id, text)
    }
}

pub fn reply(id: &str, author_id: &str, text: &str, parent_id: &str) -> Tweet {
    Tweet {
        referenced_tweets: vec![TweetReference {
            kind: REPLIED_TO.to_string(),
            id: parent_id.to_string(),
        }],
        ..tweet_by(id, author_id, text)
    }
}

pub fn user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        name: username.to_uppercase(),
    }
}

#[derive(Default)]
pub struct FakeSource {
    pages: Mutex<VecDeque<Result<SearchPage>>>,
    tweets: Mutex<HashMap<String, FetchedTweet>>,
    search_delay: Option<Duration>,
    pub queries: Mutex<Vec<MentionQuery>>,
    pub fetches: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every search takes `delay` of (paused) tokio time.
    pub fn with_search_delay(delay: Duration) -> Self {
        Self {
            search_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push_page(&self, page: SearchPage) {
        self.pages.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_error(&self, error: Error) {
        self.pages.lock().unwrap().push_back(Err(error));
    }

    pub fn add_tweet(&self, tweet: Tweet, author: Option<User>) {
        self.tweets
            .lock()
            .unwrap()
            .insert(tweet.id.clone(), FetchedTweet { tweet, author });
    }

    pub fn search_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl MentionSource for FakeSource {
    async fn search_mentions(&self, query: &MentionQuery) -> Result<SearchPage> {
        self.queries.lock().unwrap().push(query.clone());
        if let Some(delay) = self.search_delay {
            time::sleep(delay).await;
        }
        let next = self.pages.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(SearchPage::default()))
    }

    async fn fetch_tweet(&self, tweet_id: &str) -> Result<FetchedTweet> {
        self.fetches.lock().unwrap().push(tweet_id.to_string());
        self.tweets
            .lock()
            .unwrap()
            .get(tweet_id)
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("tweet {} not found", tweet_id)))
    }
}

#[derive(Default)]
pub struct FakeGenerator {
    pub fail: bool,
    pub inputs: Mutex<Vec<String>>,
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(&self, text: &str) -> Result<GeneratedContent> {
        self.inputs.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Generation("generator offline".to_string()));
        }
        Ok(GeneratedContent {
            ticker: "TEST".to_string(),
            name: "Test Token".to_string(),
            description: text.to_string(),
        })
    }
}

#[derive(Default)]
pub struct FakeResponder {
    pub fail: bool,
    pub replies: Mutex<Vec<(String, ReplyPayload)>>,
}

#[async_trait]
impl Responder for FakeResponder {
    async fn respond(&self, target_id: &str, payload: &ReplyPayload) -> Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((target_id.to_string(), payload.clone()));
        if self.fail {
            return Err(Error::Respond("responder offline".to_string()));
        }
        Ok(())
    }
}
