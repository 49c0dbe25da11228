//! Source collectors: turn one feed client into a closed-on-completion
//! stream of [`Story`] values.
//!
//! Two fetch shapes are supported. [`FanOutCollector`] drives an API that
//! lists changed ids and then serves items one by one, and
//! [`ListingCollector`] drives an API that returns a whole listing in one
//! call. Both implement [`Collector`], which is all the scheduler sees.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::SourceError;
use crate::reddit::{ListingOptions, SortMode};
use crate::story::{RawItem, Source, Story};

/// A feed that lists changed ids, then serves each item by id.
#[async_trait]
pub trait ChangedItemsApi: Send + Sync {
    async fn changed_ids(&self) -> Result<Vec<u64>, SourceError>;

    async fn item(&self, id: u64) -> Result<RawItem, SourceError>;
}

/// A feed that returns a page of submissions in one call.
#[async_trait]
pub trait ListingApi: Send + Sync {
    async fn submissions(
        &self,
        subject: &str,
        sort: SortMode,
        options: ListingOptions,
    ) -> Result<Vec<RawItem>, SourceError>;
}

/// Anything that can produce one refresh cycle's worth of stories.
///
/// `collect` sends every story it gathers on `tx` and returns once the
/// source is exhausted or has failed. Dropping `tx` on return is what closes
/// the stream, so implementations never need an explicit end marker.
#[async_trait]
pub trait Collector: Send + Sync {
    fn source(&self) -> Source;

    async fn collect(&self, tx: mpsc::Sender<Story>);
}

async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or(Err(SourceError::Timeout))
}

pub struct FanOutCollector<C> {
    client: Arc<C>,
    source: Source,
    fetch_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl<C: ChangedItemsApi> FanOutCollector<C> {
    pub fn new(
        client: Arc<C>,
        source: Source,
        fetch_timeout: Duration,
        max_concurrent_items: usize,
    ) -> Self {
        Self {
            client,
            source,
            fetch_timeout,
            permits: Arc::new(Semaphore::new(max_concurrent_items.max(1))),
        }
    }
}

#[async_trait]
impl<C: ChangedItemsApi + 'static> Collector for FanOutCollector<C> {
    fn source(&self) -> Source {
        self.source
    }

    async fn collect(&self, tx: mpsc::Sender<Story>) {
        let ids = match with_timeout(self.fetch_timeout, self.client.changed_ids()).await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Failed to list changed items from {}: {}", self.source, e);
                return;
            }
        };
        info!("Fetching {} changed items from {}", ids.len(), self.source);

        let mut tasks = JoinSet::new();
        for id in ids {
            let client = self.client.clone();
            let permits = self.permits.clone();
            let tx = tx.clone();
            let source = self.source;
            let fetch_timeout = self.fetch_timeout;

            tasks.spawn(async move {
                let Ok(permit) = permits.acquire_owned().await else {
                    return;
                };
                let result = with_timeout(fetch_timeout, client.item(id)).await;
                drop(permit);

                match result {
                    Ok(item) => {
                        // The receiver only goes away when the cycle is torn down.
                        let _ = tx.send(Story::from_item(item, source)).await;
                    }
                    Err(e) => debug!("Dropping {} item {}: {}", source, id, e),
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Item task for {} ended abnormally: {}", self.source, e);
            }
        }
    }
}

pub struct ListingCollector<C> {
    client: C,
    source: Source,
    subject: String,
    sort: SortMode,
    options: ListingOptions,
    fetch_timeout: Duration,
}

impl<C: ListingApi> ListingCollector<C> {
    pub fn new(
        client: C,
        source: Source,
        subject: impl Into<String>,
        sort: SortMode,
        options: ListingOptions,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            client,
            source,
            subject: subject.into(),
            sort,
            options,
            fetch_timeout,
        }
    }
}

#[async_trait]
impl<C: ListingApi> Collector for ListingCollector<C> {
    fn source(&self) -> Source {
        self.source
    }

    async fn collect(&self, tx: mpsc::Sender<Story>) {
        let fetch = self
            .client
            .submissions(&self.subject, self.sort, self.options);
        let items = match with_timeout(self.fetch_timeout, fetch).await {
            Ok(items) => items,
            Err(e) => {
                error!(
                    "Failed to list {} submissions for '{}': {}",
                    self.source, self.subject, e
                );
                return;
            }
        };
        info!(
            "Fetched {} submissions from {} '{}'",
            items.len(),
            self.source,
            self.subject
        );

        for item in items {
            if tx.send(Story::from_item(item, self.source)).await.is_err() {
                return;
            }
        }
    }
}

/// Run `collector` on its own task and hand back the receiving end.
///
/// The stream closes when the collector finishes or when `cancel` fires,
/// whichever comes first; cancelling also aborts any in-flight item fetches.
pub fn spawn_collector(
    collector: Arc<dyn Collector>,
    capacity: usize,
    cancel: CancellationToken,
) -> mpsc::Receiver<Story> {
    let (tx, rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        let source = collector.source();
        tokio::select! {
            _ = cancel.cancelled() => warn!("Collection from {} cancelled", source),
            _ = collector.collect(tx) => debug!("Collection from {} finished", source),
        }
    });

    rx
}
