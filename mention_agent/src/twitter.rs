// Bridges the Twitter client to the agent's `MentionSource`. This is where
// HTTP failures are sorted into rate limits and everything else.

use async_trait::async_trait;

use mention_core::source::{FetchedTweet, MentionQuery, MentionSource, SearchPage};
use mention_core::{Error, Result, Tweet, TweetReference, User};
use twitter_client::TwitterClient;

#[derive(Debug, Clone)]
pub struct TwitterSource {
    client: TwitterClient,
}

impl TwitterSource {
    pub fn new(client: TwitterClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MentionSource for TwitterSource {
    async fn search_mentions(&self, query: &MentionQuery) -> Result<SearchPage> {
        let result = self
            .client
            .search_recent(&query.search_text(), query.since_id.as_deref(), query.max_results)
            .await
            .map_err(convert_error)?;
        Ok(SearchPage {
            tweets: result.tweets.into_iter().map(convert_tweet).collect(),
            users: result.users.into_iter().map(convert_user).collect(),
            included_tweets: result.included_tweets.into_iter().map(convert_tweet).collect(),
        })
    }

    async fn fetch_tweet(&self, tweet_id: &str) -> Result<FetchedTweet> {
        let result = self.client.tweet_by_id(tweet_id).await.map_err(convert_error)?;
        Ok(FetchedTweet {
            tweet: convert_tweet(result.tweet),
            author: result.author.map(convert_user),
        })
    }
}

// MARK: Conversions

fn convert_error(error: twitter_client::Error) -> Error {
    match error {
        twitter_client::Error::RateLimited { reset_at } => Error::RateLimited { reset_at },
        other => Error::Fetch(other.to_string()),
    }
}

fn convert_tweet(tweet: twitter_client::Tweet) -> Tweet {
    Tweet {
        id: tweet.id,
        author_id: tweet.author_id,
        text: tweet.text,
        referenced_tweets: tweet
            .referenced_tweets
            .into_iter()
            .map(|r| TweetReference { kind: r.kind, id: r.id })
            .collect(),
    }
}

fn convert_user(user: twitter_client::User) -> User {
    User {
        id: user.id,
        username: user.username,
        name: user.name,
    }
}
