pub const API_BASE: &str = "https://api.twitter.com";
pub const OAUTH2_TOKEN_PATH: &str = "/oauth2/token";
pub const SEARCH_RECENT_PATH: &str = "/2/tweets/search/recent";
pub const TWEET_PATH: &str = "/2/tweets";
pub const USER_AGENT: &str = concat!("mention-agent/", env!("CARGO_PKG_VERSION"));

pub const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";

pub const SEARCH_API_MIN_COUNT: u32 = 10;
pub const SEARCH_API_MAX_COUNT: u32 = 100;

pub const SEARCH_TWEET_FIELDS: &[&str] = &[
    "created_at",
    "author_id",
    "text",
    "id",
    "conversation_id",
    "referenced_tweets",
    "in_reply_to_user_id",
];
pub const SEARCH_USER_FIELDS: &[&str] = &["username", "name"];
pub const SEARCH_EXPANSIONS: &[&str] = &[
    "author_id",
    "referenced_tweets.id",
    "referenced_tweets.id.author_id",
    "in_reply_to_user_id",
];

// Parent lookups only need enough to render and attribute the tweet.
pub const SINGLE_TWEET_FIELDS: &[&str] = &["author_id", "text", "id"];
pub const SINGLE_USER_FIELDS: &[&str] = &["username"];
pub const SINGLE_EXPANSIONS: &[&str] = &["author_id"];
