// Durable agent state: the cursor plus bounded caches of tweets and users.
// The state file is the only record of what has already been processed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::{Identified, Tweet, User};

pub const CACHE_LIMIT: usize = 1000;

// MARK: Cursor

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub last_seen_id: Option<String>,
}

impl Cursor {
    /// Move the cursor to `id`. Returns false if `id` is a numeric id older than the current one,
    /// in which case the cursor is left alone.
    pub fn advance(&mut self, id: &str) -> bool {
        if let Some(current) = &self.last_seen_id {
            if let (Ok(current), Ok(new)) = (current.parse::<u64>(), id.parse::<u64>()) {
                if new < current {
                    return false;
                }
            }
        }
        self.last_seen_id = Some(id.to_string());
        true
    }
}

// MARK: Cache

/// Insertion-ordered list of entities, unique by id.
#[derive(Debug, Clone)]
pub struct EntityCache<T> {
    items: Vec<T>,
    ids: HashSet<String>,
}

impl<T> Default for EntityCache<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            ids: HashSet::new(),
        }
    }
}

impl<T: Identified + Clone> EntityCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a stored list. Later duplicates of an id are dropped.
    pub fn from_vec(items: Vec<T>) -> Self {
        let mut cache = Self::new();
        for item in items {
            cache.insert(item);
        }
        cache
    }

    /// Append `item` unless its id is already present. Returns true if it was added.
    pub fn insert(&mut self, item: T) -> bool {
        if self.ids.contains(item.id()) {
            return false;
        }
        self.ids.insert(item.id().to_string());
        self.items.push(item);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        if !self.contains(id) {
            return None;
        }
        self.items.iter().find(|item| item.id() == id)
    }

    /// Keep only the `limit` most recently inserted entries.
    pub fn trim(&mut self, limit: usize) {
        if self.items.len() <= limit {
            return;
        }
        let excess = self.items.len() - limit;
        for item in self.items.drain(..excess) {
            self.ids.remove(item.id());
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }
}

// MARK: State

/// On-disk shape of the state file.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub cursor: Cursor,
    #[serde(default)]
    pub tweets: Vec<Tweet>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            cursor: Cursor::default(),
            tweets: Vec::new(),
            users: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// No cursor yet: search without `since_id`.
    FirstRun,
    Incremental,
}

/// In-memory state owned by the polling job and handed to each cycle.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub cursor: Cursor,
    pub tweets: EntityCache<Tweet>,
    pub users: EntityCache<User>,
    pub mode: PollMode,
    pub last_updated: DateTime<Utc>,
}

impl Default for AgentState {
    fn default() -> Self {
        PersistedState::default().into()
    }
}

impl From<PersistedState> for AgentState {
    fn from(state: PersistedState) -> Self {
        let mode = match state.cursor.last_seen_id {
            Some(_) => PollMode::Incremental,
            None => PollMode::FirstRun,
        };
        Self {
            cursor: state.cursor,
            tweets: EntityCache::from_vec(state.tweets),
            users: EntityCache::from_vec(state.users),
            mode,
            last_updated: state.last_updated,
        }
    }
}

impl AgentState {
    /// Username for `author_id`, or "unknown" when the author isn't cached.
    pub fn handle_for(&self, author_id: Option<&str>) -> String {
        author_id
            .and_then(|id| self.users.get(id))
            .map(|user| user.username.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn trim(&mut self, limit: usize) {
        self.tweets.trim(limit);
        self.users.trim(limit);
    }

    /// Snapshot for writing, stamped with the current time.
    pub fn to_persisted(&mut self) -> PersistedState {
        self.last_updated = Utc::now();
        PersistedState {
            cursor: self.cursor.clone(),
            tweets: self.tweets.to_vec(),
            users: self.users.to_vec(),
            last_updated: self.last_updated,
        }
    }
}

// MARK: Store

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved state. A missing or unreadable file yields an empty state.
    pub async fn load(&self) -> PersistedState {
        match self.read().await {
            Ok(Some(state)) => {
                tracing::info!(
                    "Loaded state with last seen id {:?}, last updated {}, {} tweets stored",
                    state.cursor.last_seen_id,
                    state.last_updated.to_rfc3339(),
                    state.tweets.len()
                );
                state
            }
            Ok(None) => {
                tracing::info!("No saved state found at {}, starting fresh", self.path.display());
                PersistedState::default()
            }
            Err(e) => {
                tracing::error!("Error loading state from {}: {}", self.path.display(), e);
                PersistedState::default()
            }
        }
    }

    async fn read(&self) -> Result<Option<PersistedState>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write the state, creating the parent directory if needed.
    pub async fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(state)?;
        // Write then rename so a crash never leaves a half-written file behind.
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &self.path).await?;
        tracing::info!(
            "Saved {} tweets to {} with last seen id {:?}",
            state.tweets.len(),
            self.path.display(),
            state.cursor.last_seen_id
        );
        Ok(())
    }
}
