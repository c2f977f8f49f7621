use serde::{Deserialize, Serialize};

pub const REPLIED_TO: &str = "replied_to";

/// Anything kept in an [`EntityCache`](crate::state::EntityCache).
pub trait Identified {
    fn id(&self) -> &str;
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TweetReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Tweet {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_tweets: Vec<TweetReference>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: String,
}

impl Tweet {
    /// Id of the tweet this one replies to, if any.
    pub fn replied_to(&self) -> Option<&str> {
        self.referenced_tweets
            .iter()
            .find(|r| r.kind == REPLIED_TO)
            .map(|r| r.id.as_str())
    }

    pub fn url(&self, handle: &str) -> String {
        format!("https://twitter.com/{}/status/{}", handle, self.id)
    }
}

impl Identified for Tweet {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for User {
    fn id(&self) -> &str {
        &self.id
    }
}
