use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::response::{self, SearchResponse, TweetResponse};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ReferencedTweet {
    pub kind: String,
    pub id: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Tweet {
    pub id: String,
    pub author_id: Option<String>,
    pub text: String,
    pub referenced_tweets: Vec<ReferencedTweet>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
}

/// One page of recent search. `tweets` are newest first, as returned by the API.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct SearchResult {
    pub tweets: Vec<Tweet>,
    pub users: Vec<User>,
    pub included_tweets: Vec<Tweet>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct TweetResult {
    pub tweet: Tweet,
    pub author: Option<User>,
}

// MARK: Conversions

impl From<response::ReferencedTweet> for ReferencedTweet {
    fn from(reference: response::ReferencedTweet) -> Self {
        ReferencedTweet {
            kind: reference.type_,
            id: reference.id,
        }
    }
}

impl From<response::Tweet> for Tweet {
    fn from(tweet: response::Tweet) -> Self {
        Tweet {
            id: tweet.id,
            author_id: tweet.author_id,
            text: tweet.text,
            referenced_tweets: tweet
                .referenced_tweets
                .unwrap_or_default()
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

impl From<response::User> for User {
    fn from(user: response::User) -> Self {
        User {
            id: user.id,
            username: user.username,
            name: user.name,
        }
    }
}

impl From<SearchResponse> for SearchResult {
    fn from(response: SearchResponse) -> Self {
        SearchResult {
            tweets: response.data.into_iter().map(Into::into).collect(),
            users: response.includes.users.into_iter().map(Into::into).collect(),
            included_tweets: response.includes.tweets.into_iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<TweetResponse> for TweetResult {
    type Error = Error;

    fn try_from(response: TweetResponse) -> Result<Self, Self::Error> {
        let Some(tweet) = response.data else {
            let message = response
                .errors
                .first()
                .map(|e| e.message())
                .unwrap_or_else(|| "tweet missing from response".to_string());
            return Err(Error::NotFound(message));
        };
        let tweet: Tweet = tweet.into();
        let mut users = response.includes.users.into_iter().map(User::from);
        let author = match tweet.author_id.as_deref() {
            Some(author_id) => users.find(|u| u.id == author_id),
            None => users.next(),
        };
        Ok(TweetResult { tweet, author })
    }
}
