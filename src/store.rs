//! In-memory story store and its single writer.
//!
//! The store is an append-only `Vec<Story>` behind a `tokio::sync::RwLock`.
//! Each append holds the write lock for exactly one `push`, and readers copy
//! out what they need under the read lock, so a reader always sees a whole
//! prefix of the append order and never a half-written story.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::debug;

use crate::story::{Source, Story};

#[derive(Default)]
struct Inner {
    stories: Vec<Story>,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct StoryStore {
    inner: RwLock<Inner>,
    // Held by a StoreWriter for the whole of its drain.
    writer: Mutex<()>,
}

impl StoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store already holding `stories`, in the given order.
    pub fn with_stories(stories: Vec<Story>) -> Self {
        let last_updated = if stories.is_empty() {
            None
        } else {
            Some(Utc::now())
        };
        Self {
            inner: RwLock::new(Inner {
                stories,
                last_updated,
            }),
            writer: Mutex::new(()),
        }
    }

    async fn append(&self, story: Story) {
        let mut inner = self.inner.write().await;
        inner.stories.push(story);
        inner.last_updated = Some(Utc::now());
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.stories.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy of the whole sequence in append order.
    pub async fn snapshot(&self) -> Vec<Story> {
        self.inner.read().await.stories.clone()
    }

    /// Most recently appended stories first, optionally capped.
    pub async fn recent(&self, limit: Option<usize>) -> Vec<Story> {
        let inner = self.inner.read().await;
        let take = limit.unwrap_or(inner.stories.len());
        inner.stories.iter().rev().take(take).cloned().collect()
    }

    /// Stories matching `predicate`, in append order.
    pub async fn filter<F>(&self, predicate: F) -> Vec<Story>
    where
        F: Fn(&Story) -> bool,
    {
        self.inner
            .read()
            .await
            .stories
            .iter()
            .filter(|story| predicate(story))
            .cloned()
            .collect()
    }

    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_updated
    }
}

/// Outcome of draining one merged stream into the store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub appended: usize,
    pub by_source: BTreeMap<Source, usize>,
}

/// The only code path that mutates a [`StoryStore`].
#[derive(Clone)]
pub struct StoreWriter {
    store: Arc<StoryStore>,
}

impl StoreWriter {
    pub fn new(store: Arc<StoryStore>) -> Self {
        Self { store }
    }

    /// Append every story received on `rx` until the channel closes.
    ///
    /// Concurrent calls against the same store are serialized: a second
    /// writer waits until the first has drained its stream.
    pub async fn run(&self, mut rx: mpsc::Receiver<Story>) -> WriteReport {
        let _guard = self.store.writer.lock().await;
        let mut report = WriteReport::default();

        while let Some(story) = rx.recv().await {
            *report.by_source.entry(story.source).or_default() += 1;
            self.store.append(story).await;
            report.appended += 1;
        }

        debug!("Store writer drained {} stories", report.appended);
        report
    }
}
