mod consts;
mod error;
mod response;
mod result;
mod util;

use reqwest::{header, Client, Response, StatusCode, Url};

use consts::*;
use response::{ErrorResponse, SearchResponse, TokenResponse, TweetResponse};
pub use result::*;

pub use crate::consts::{SEARCH_API_MAX_COUNT, SEARCH_API_MIN_COUNT};
pub use crate::error::{Error, Result};

/// Read-only client for Twitter API v2 using an app-only bearer token.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    client: reqwest::Client,
    base_url: Url,
}

impl TwitterClient {
    pub fn new(bearer_token: &str) -> Result<TwitterClient> {
        Self::with_base_url(bearer_token, API_BASE)
    }

    pub fn with_base_url(bearer_token: &str, base_url: &str) -> Result<TwitterClient> {
        let mut auth_value = header::HeaderValue::from_str(&format!("Bearer {}", bearer_token))
            .map_err(|_| Error::InvalidCredential("bearer token contains invalid characters".to_string()))?;
        auth_value.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth_value);

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(TwitterClient {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    /// Exchange an API key and secret for an app-only bearer token.
    pub async fn authenticate(api_key: &str, api_secret: &str) -> Result<String> {
        Self::authenticate_at(API_BASE, api_key, api_secret).await
    }

    pub async fn authenticate_at(base_url: &str, api_key: &str, api_secret: &str) -> Result<String> {
        let url = Url::parse(base_url)?.join(OAUTH2_TOKEN_PATH)?;
        let response = Client::builder()
            .user_agent(USER_AGENT)
            .build()?
            .post(url)
            .basic_auth(api_key, Some(api_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                reset_at: util::rate_limit_reset(response.headers()),
            });
        }
        let content = response.text().await?;
        if !status.is_success() {
            return Err(Error::InvalidCredential(format!("{} {}", status.as_u16(), content)));
        }

        let token: TokenResponse = serde_json::from_str(&content)?;
        if !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(Error::InvalidCredential(format!(
                "unexpected token type: {}",
                token.token_type
            )));
        }
        Ok(token.access_token)
    }

    /// Recent search, newest first. `since_id` restricts results to tweets newer than it.
    pub async fn search_recent(&self, query: &str, since_id: Option<&str>, max_results: u32) -> Result<SearchResult> {
        let max_results = max_results.clamp(SEARCH_API_MIN_COUNT, SEARCH_API_MAX_COUNT);
        let mut params = vec![
            ("query", query.to_string()),
            ("max_results", max_results.to_string()),
            ("tweet.fields", util::join_fields(SEARCH_TWEET_FIELDS)),
            ("user.fields", util::join_fields(SEARCH_USER_FIELDS)),
            ("expansions", util::join_fields(SEARCH_EXPANSIONS)),
        ];
        if let Some(since_id) = since_id {
            params.push(("since_id", since_id.to_string()));
        }
        let response: SearchResponse = self.api_get("search_recent", SEARCH_RECENT_PATH, &params).await?;
        for problem in &response.errors {
            tracing::warn!("Search reported a partial error: {}", problem.message());
        }
        Ok(response.into())
    }

    pub async fn tweet_by_id(&self, tweet_id: &str) -> Result<TweetResult> {
        if tweet_id.is_empty() || !tweet_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::NotFound(format!("invalid tweet id `{}`", tweet_id)));
        }
        let params = [
            ("tweet.fields", util::join_fields(SINGLE_TWEET_FIELDS)),
            ("user.fields", util::join_fields(SINGLE_USER_FIELDS)),
            ("expansions", util::join_fields(SINGLE_EXPANSIONS)),
        ];
        let path = format!("{}/{}", TWEET_PATH, tweet_id);
        let response: TweetResponse = self.api_get("tweet_by_id", &path, &params).await?;
        response.try_into()
    }
}

impl TwitterClient {
    async fn api_get<R>(&self, endpoint: &str, path: &str, params: &[(&str, String)]) -> Result<R>
    where
        R: serde::de::DeserializeOwned,
    {
        let base_url = self.base_url.join(path)?;
        let url = Url::parse_with_params(base_url.as_str(), params)?;
        let response: Response = self.client.get(url).send().await?;

        let status = response.status();
        let reset_at = util::rate_limit_reset(response.headers());
        let content = response.text().await?;
        if let Err(e) = log(endpoint, &content).await {
            tracing::warn!("Error writing {} response log: {}", endpoint, e);
        }

        if status.is_success() {
            return serde_json::from_str(&content).map_err(|e| e.into());
        }

        let body: Option<ErrorResponse> = serde_json::from_str(&content).ok();
        let body_status = body.as_ref().and_then(|b| b.status);
        if status == StatusCode::TOO_MANY_REQUESTS || body_status == Some(429) {
            return Err(Error::RateLimited { reset_at });
        }
        let message = body
            .and_then(|b| b.detail.or(b.title))
            .unwrap_or(content);
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }
}

async fn log(name: &str, content: &str) -> Result<()> {
    use std::path::PathBuf;
    use tokio::{fs::File, io::AsyncWriteExt};

    if let Ok(dir) = std::env::var("CLIENT_LOG_DIR") {
        let time = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let filepath = PathBuf::from(dir).join(format!("twitter_{}_{}.json", name, time));
        let mut file = File::create(filepath).await?;
        file.write_all(content.as_bytes()).await?;
    }
    Ok(())
}
