// One polling cycle: search for new mentions, merge what came back into the
// caches, resolve each mention's parent, trigger generation, then persist.

use serde::Serialize;

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::retry::RateLimitExecutor;
use crate::source::{MentionQuery, MentionSource, DEFAULT_PAGE_SIZE};
use crate::state::{AgentState, PollMode, StateStore, CACHE_LIMIT};
use crate::thread::ThreadResolver;
use crate::trigger::GenerationTrigger;

#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Tracked handle, without the leading `@`.
    pub handle: String,
    pub page_size: u32,
    pub cache_limit: usize,
}

impl PollConfig {
    pub fn new(handle: &str) -> Self {
        Self {
            handle: handle.trim_start_matches('@').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            cache_limit: CACHE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub fetched: usize,
    pub processed: usize,
    pub parents_fetched: usize,
    pub persisted: bool,
}

pub struct Poller {
    config: PollConfig,
    source: Arc<dyn MentionSource>,
    trigger: GenerationTrigger,
    executor: RateLimitExecutor,
    store: StateStore,
}

impl Poller {
    pub fn new(
        config: PollConfig,
        source: Arc<dyn MentionSource>,
        trigger: GenerationTrigger,
        executor: RateLimitExecutor,
        store: StateStore,
    ) -> Self {
        Self {
            config,
            source,
            trigger,
            executor,
            store,
        }
    }

    pub fn handle(&self) -> &str {
        &self.config.handle
    }

    pub fn query(&self, state: &AgentState) -> MentionQuery {
        let since_id = match state.mode {
            PollMode::FirstRun => None,
            PollMode::Incremental => state.cursor.last_seen_id.clone(),
        };
        MentionQuery {
            handle: self.config.handle.clone(),
            since_id,
            max_results: self.config.page_size,
        }
    }

    /// Run one cycle against `state`. Only a failed search is an error; everything after
    /// that is best effort and reported in the returned [`CycleReport`].
    pub async fn run_cycle(&self, state: &mut AgentState) -> Result<CycleReport> {
        let query = self.query(state);
        match &query.since_id {
            Some(since_id) => tracing::info!("Checking for mentions newer than id {}", since_id),
            None => tracing::info!("Checking for initial mentions of {}", query.search_text()),
        }

        let page = self
            .executor
            .execute(|| self.source.search_mentions(&query))
            .await?;

        let mut report = CycleReport {
            fetched: page.tweets.len(),
            ..Default::default()
        };

        if page.tweets.is_empty() {
            match state.mode {
                PollMode::FirstRun => {
                    tracing::info!("No existing mentions found");
                    state.mode = PollMode::Incremental;
                }
                PollMode::Incremental => tracing::info!("No new mentions since last check"),
            }
            return Ok(report);
        }
        tracing::info!("Found {} mentions", page.tweets.len());

        // Decide what was already processed before the expansions below touch the cache.
        let processed: HashSet<&str> = page
            .tweets
            .iter()
            .filter(|tweet| state.tweets.contains(&tweet.id))
            .map(|tweet| tweet.id.as_str())
            .collect();

        for user in &page.users {
            state.users.insert(user.clone());
        }
        for tweet in &page.included_tweets {
            state.tweets.insert(tweet.clone());
        }

        let resolver = ThreadResolver::new(self.source.as_ref(), self.executor);
        // The API answers newest first; handle them in the order they were posted.
        for mention in page.tweets.iter().rev() {
            if processed.contains(mention.id.as_str()) {
                tracing::debug!("Skipping already processed mention {}", mention.id);
                continue;
            }
            state.tweets.insert(mention.clone());

            let handle = state.handle_for(mention.author_id.as_deref());
            match state.mode {
                PollMode::FirstRun => tracing::info!("Existing mention found"),
                PollMode::Incremental => tracing::info!("New mention detected"),
            }
            tracing::info!("From @{}: {} ({})", handle, mention.text, mention.url(&handle));

            let resolution = resolver.resolve(mention, state).await;
            if resolution.fetched {
                report.parents_fetched += 1;
            }
            self.trigger
                .trigger(mention, &handle, resolution.parent.as_ref())
                .await;
            report.processed += 1;
        }

        if let Some(newest) = page.tweets.first() {
            if !state.cursor.advance(&newest.id) {
                tracing::warn!(
                    "Newest mention {} is older than cursor {:?}, keeping cursor",
                    newest.id,
                    state.cursor.last_seen_id
                );
            }
        }
        state.mode = PollMode::Incremental;

        state.trim(self.config.cache_limit);
        let snapshot = state.to_persisted();
        match self.store.save(&snapshot).await {
            Ok(()) => report.persisted = true,
            Err(e) => tracing::error!("Error saving state to {}: {}", self.store.path().display(), e),
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::source::SearchPage;
    use crate::state::Cursor;
    use crate::testing::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Harness {
        source: Arc<FakeSource>,
        generator: Arc<FakeGenerator>,
        responder: Arc<FakeResponder>,
        poller: Poller,
        _dir: TempDir,
    }

    fn harness() -> Harness {
        harness_with(PollConfig::new("@tracked"))
    }

    fn harness_with(config: PollConfig) -> Harness {
        harness_at(config, |dir| dir.join("data").join("tweets.json"))
    }

    fn harness_at(config: PollConfig, state_file: impl FnOnce(&Path) -> PathBuf) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let state_file = state_file(dir.path());
        let source = Arc::new(FakeSource::new());
        let generator = Arc::new(FakeGenerator::default());
        let responder = Arc::new(FakeResponder::default());
        let poller = Poller::new(
            config,
            source.clone(),
            GenerationTrigger::new(generator.clone(), responder.clone()),
            RateLimitExecutor::default(),
            StateStore::new(state_file),
        );
        Harness {
            source,
            generator,
            responder,
            poller,
            _dir: dir,
        }
    }

    fn incremental_state(cursor: &str) -> AgentState {
        let mut state = AgentState::default();
        state.cursor = Cursor {
            last_seen_id: Some(cursor.to_string()),
        };
        state.mode = PollMode::Incremental;
        state
    }

    #[tokio::test]
    async fn test_first_run_direct_mention() {
        let h = harness();
        h.source.push_page(SearchPage {
            tweets: vec![tweet_by("500", "20", "@tracked make a coin")],
            users: vec![user("20", "alice")],
            included_tweets: vec![],
        });
        let mut state = AgentState::default();

        let report = h.poller.run_cycle(&mut state).await.unwrap();

        assert_eq!(h.source.queries.lock().unwrap()[0].since_id, None);
        assert_eq!(state.cursor.last_seen_id.as_deref(), Some("500"));
        assert_eq!(state.mode, PollMode::Incremental);
        assert_eq!(state.tweets.len(), 1);
        assert_eq!(state.users.len(), 1);
        assert!(state.users.contains("20"));
        assert_eq!(*h.generator.inputs.lock().unwrap(), vec!["@tracked make a coin".to_string()]);
        assert_eq!(
            report,
            CycleReport {
                fetched: 1,
                processed: 1,
                parents_fetched: 0,
                persisted: true
            }
        );

        let saved: AgentState = StateStore::new(h.poller.store.path()).load().await.into();
        assert_eq!(saved.cursor.last_seen_id.as_deref(), Some("500"));
        assert_eq!(saved.tweets.len(), 1);
    }

    #[tokio::test]
    async fn test_incremental_run_with_cached_parent() {
        let h = harness();
        let mut state = incremental_state("400");
        state.tweets.insert(tweet_by("100", "30", "the original idea"));
        state.users.insert(user("30", "carol"));
        h.source.push_page(SearchPage {
            tweets: vec![reply("501", "20", "@tracked launch this", "100")],
            users: vec![user("20", "alice")],
            included_tweets: vec![],
        });

        let report = h.poller.run_cycle(&mut state).await.unwrap();

        assert_eq!(h.source.queries.lock().unwrap()[0].since_id.as_deref(), Some("400"));
        assert_eq!(h.source.fetch_count(), 0);
        assert_eq!(report.parents_fetched, 0);
        assert_eq!(*h.generator.inputs.lock().unwrap(), vec!["the original idea".to_string()]);
        assert_eq!(state.cursor.last_seen_id.as_deref(), Some("501"));
    }

    #[tokio::test]
    async fn test_parent_from_expansions_is_not_fetched() {
        let h = harness();
        let mut state = incremental_state("400");
        h.source.push_page(SearchPage {
            tweets: vec![reply("501", "20", "@tracked launch this", "100")],
            users: vec![user("20", "alice"), user("30", "carol")],
            included_tweets: vec![tweet_by("100", "30", "expanded parent")],
        });

        h.poller.run_cycle(&mut state).await.unwrap();

        assert_eq!(h.source.fetch_count(), 0);
        assert_eq!(*h.generator.inputs.lock().unwrap(), vec!["expanded parent".to_string()]);
    }

    #[tokio::test]
    async fn test_processes_oldest_first_and_cursor_takes_newest() {
        let h = harness();
        let mut state = AgentState::default();
        h.source.push_page(SearchPage {
            tweets: vec![
                tweet_by("503", "20", "third"),
                tweet_by("502", "20", "second"),
                tweet_by("501", "20", "first"),
            ],
            users: vec![user("20", "alice")],
            included_tweets: vec![],
        });

        h.poller.run_cycle(&mut state).await.unwrap();

        assert_eq!(
            *h.generator.inputs.lock().unwrap(),
            vec!["first".to_string(), "second".to_string(), "third".to_string()]
        );
        let replied: Vec<String> = h.responder.replies.lock().unwrap().iter().map(|r| r.0.clone()).collect();
        assert_eq!(replied, vec!["501", "502", "503"]);
        assert_eq!(state.cursor.last_seen_id.as_deref(), Some("503"));
    }

    #[tokio::test]
    async fn test_already_cached_mentions_are_skipped() {
        let h = harness();
        let mut state = incremental_state("400");
        state.tweets.insert(tweet_by("501", "20", "seen before"));
        h.source.push_page(SearchPage {
            tweets: vec![tweet_by("502", "20", "new"), tweet_by("501", "20", "seen before")],
            users: vec![],
            included_tweets: vec![],
        });

        let report = h.poller.run_cycle(&mut state).await.unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(*h.generator.inputs.lock().unwrap(), vec!["new".to_string()]);
        assert_eq!(state.tweets.len(), 2);
    }

    #[tokio::test]
    async fn test_mention_replying_to_mention_in_same_batch() {
        let h = harness();
        let mut state = incremental_state("400");
        h.source.push_page(SearchPage {
            tweets: vec![
                reply("502", "21", "@tracked agreed", "501"),
                tweet_by("501", "20", "@tracked first idea"),
            ],
            users: vec![user("20", "alice"), user("21", "bob")],
            included_tweets: vec![tweet_by("501", "20", "@tracked first idea")],
        });

        let report = h.poller.run_cycle(&mut state).await.unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(h.source.fetch_count(), 0);
        assert_eq!(
            *h.generator.inputs.lock().unwrap(),
            vec!["@tracked first idea".to_string(), "@tracked first idea".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_first_run_flips_mode_without_saving() {
        let h = harness();
        let mut state = AgentState::default();

        let report = h.poller.run_cycle(&mut state).await.unwrap();

        assert_eq!(report, CycleReport::default());
        assert_eq!(state.mode, PollMode::Incremental);
        assert_eq!(state.cursor.last_seen_id, None);
        assert!(!h.poller.store.path().exists());

        // With no cursor there is still no since_id to send.
        h.poller.run_cycle(&mut state).await.unwrap();
        assert_eq!(h.source.queries.lock().unwrap()[1].since_id, None);
    }

    #[tokio::test]
    async fn test_empty_incremental_run_keeps_cursor() {
        let h = harness();
        let mut state = incremental_state("400");

        let report = h.poller.run_cycle(&mut state).await.unwrap();

        assert!(!report.persisted);
        assert_eq!(state.cursor.last_seen_id.as_deref(), Some("400"));
    }

    #[tokio::test]
    async fn test_failed_parent_fetch_falls_back_to_mention_text() {
        let h = harness();
        let mut state = incremental_state("400");
        h.source.push_page(SearchPage {
            tweets: vec![reply("501", "20", "@tracked this one", "999")],
            users: vec![user("20", "alice")],
            included_tweets: vec![],
        });

        let report = h.poller.run_cycle(&mut state).await.unwrap();

        assert_eq!(report.parents_fetched, 1);
        assert!(report.persisted);
        assert_eq!(*h.generator.inputs.lock().unwrap(), vec!["@tracked this one".to_string()]);
    }

    #[tokio::test]
    async fn test_search_failure_leaves_state_untouched() {
        let h = harness();
        let mut state = incremental_state("400");
        h.source.push_error(Error::Fetch("unauthorized".to_string()));

        let result = h.poller.run_cycle(&mut state).await;

        assert!(matches!(result, Err(Error::Fetch(_))));
        assert_eq!(state.cursor.last_seen_id.as_deref(), Some("400"));
        assert!(state.tweets.is_empty());
    }

    #[tokio::test]
    async fn test_caches_are_trimmed() {
        let mut config = PollConfig::new("tracked");
        config.cache_limit = 3;
        let h = harness_with(config);
        let mut state = AgentState::default();
        for i in 0..3 {
            state.tweets.insert(tweet(&format!("old{}", i), "old"));
        }
        h.source.push_page(SearchPage {
            tweets: vec![tweet_by("502", "20", "b"), tweet_by("501", "20", "a")],
            users: vec![user("20", "alice")],
            included_tweets: vec![],
        });

        h.poller.run_cycle(&mut state).await.unwrap();

        let ids: Vec<&str> = state.tweets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["old2", "501", "502"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_search_is_retried() {
        let h = harness();
        let mut state = AgentState::default();
        h.source.push_error(Error::RateLimited { reset_at: None });
        h.source.push_page(SearchPage {
            tweets: vec![tweet_by("500", "20", "gm")],
            users: vec![],
            included_tweets: vec![],
        });

        let report = h.poller.run_cycle(&mut state).await.unwrap();

        assert_eq!(h.source.search_count(), 2);
        assert_eq!(report.processed, 1);
    }

    #[tokio::test]
    async fn test_save_failure_keeps_in_memory_state() {
        let mut blocker = None;
        let h = harness_at(PollConfig::new("tracked"), |dir| {
            let file = dir.join("blocker");
            std::fs::write(&file, "not a directory").unwrap();
            blocker = Some(file.clone());
            file.join("tweets.json")
        });
        let blocker = blocker.unwrap();
        h.source.push_page(SearchPage {
            tweets: vec![tweet("500", "@tracked first")],
            users: vec![],
            included_tweets: vec![],
        });
        let mut state = AgentState::default();

        let report = h.poller.run_cycle(&mut state).await.unwrap();
        assert_eq!(report.processed, 1);
        assert!(!report.persisted);
        assert_eq!(state.cursor.last_seen_id.as_deref(), Some("500"));
        assert_eq!(state.mode, PollMode::Incremental);
        assert!(state.tweets.contains("500"));

        std::fs::remove_file(&blocker).unwrap();
        h.source.push_page(SearchPage {
            tweets: vec![tweet("600", "@tracked second")],
            users: vec![],
            included_tweets: vec![],
        });

        let report = h.poller.run_cycle(&mut state).await.unwrap();
        assert!(report.persisted);
        assert_eq!(h.source.queries.lock().unwrap()[1].since_id.as_deref(), Some("500"));
        let saved = StateStore::new(blocker.join("tweets.json")).load().await;
        assert_eq!(saved.cursor.last_seen_id.as_deref(), Some("600"));
        assert_eq!(saved.tweets.len(), 2);
    }
}
