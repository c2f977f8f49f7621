use serde::{Deserialize, Serialize};
use serde_with::{serde_as, VecSkipError};

// Tweet

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ReferencedTweet {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub author_id: Option<String>,
    pub referenced_tweets: Option<Vec<ReferencedTweet>>,
}

// User

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
}

// Envelope

#[serde_as]
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct Includes {
    #[serde(default)]
    #[serde_as(as = "VecSkipError<_>")]
    pub users: Vec<User>,
    #[serde(default)]
    #[serde_as(as = "VecSkipError<_>")]
    pub tweets: Vec<Tweet>,
}

/// Partial errors reported next to (or instead of) `data`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Problem {
    pub title: Option<String>,
    pub detail: Option<String>,
    pub resource_id: Option<String>,
}

impl Problem {
    pub fn message(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

#[serde_as]
#[derive(Deserialize, Serialize, Debug)]
pub struct SearchResponse {
    #[serde(default)]
    #[serde_as(as = "VecSkipError<_>")]
    pub data: Vec<Tweet>,
    #[serde(default)]
    pub includes: Includes,
    #[serde(default)]
    pub errors: Vec<Problem>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct TweetResponse {
    pub data: Option<Tweet>,
    #[serde(default)]
    pub includes: Includes,
    #[serde(default)]
    pub errors: Vec<Problem>,
}

/// Body of a non-2xx response.
#[derive(Deserialize, Serialize, Debug)]
pub struct ErrorResponse {
    pub title: Option<String>,
    pub detail: Option<String>,
    pub status: Option<u16>,
}

// Auth

#[derive(Deserialize, Serialize, Debug)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
}
