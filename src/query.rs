use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::QueryError;
use crate::store::StoryStore;
use crate::story::Story;

/// Read-only view over the story store.
#[derive(Clone)]
pub struct StoryQuery {
    store: Arc<StoryStore>,
}

impl StoryQuery {
    pub fn new(store: Arc<StoryStore>) -> Self {
        Self { store }
    }

    /// Newest stories first, capped at `limit` when given.
    pub async fn list_all(&self, limit: Option<usize>) -> Vec<Story> {
        self.store.recent(limit).await
    }

    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.store.last_updated().await
    }

    /// Stories whose title contains `query`, ignoring case, oldest first.
    pub async fn search(&self, query: &str) -> Result<Vec<Story>, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let needle = query.to_lowercase();
        Ok(self
            .store
            .filter(|story| story.title.to_lowercase().contains(&needle))
            .await)
    }
}
