use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::collector::{spawn_collector, Collector, FanOutCollector, ListingCollector};
use crate::config::Config;
use crate::hacker_news::HackerNewsClient;
use crate::merge::merge;
use crate::reddit::{ListingOptions, RedditClient};
use crate::store::{StoreWriter, StoryStore};
use crate::story::Source;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Fetching,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub refresh_interval: Duration,
    pub cycle_timeout: Duration,
    pub channel_capacity: usize,
}

impl From<&Config> for SchedulerSettings {
    fn from(config: &Config) -> Self {
        Self {
            refresh_interval: config.refresh_interval(),
            cycle_timeout: config.cycle_timeout(),
            channel_capacity: config.channel_capacity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub appended: usize,
    pub by_source: BTreeMap<Source, usize>,
    /// The cycle deadline or a shutdown cut the fetches short.
    pub interrupted: bool,
}

/// Drives refresh cycles: every collector in parallel, merged into the
/// single store writer, then an idle pause.
pub struct Scheduler {
    collectors: Vec<Arc<dyn Collector>>,
    writer: StoreWriter,
    settings: SchedulerSettings,
    fetching: AtomicBool,
}

impl Scheduler {
    pub fn new(
        collectors: Vec<Arc<dyn Collector>>,
        store: Arc<StoryStore>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            collectors,
            writer: StoreWriter::new(store),
            settings,
            fetching: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.fetching.load(Ordering::Acquire) {
            SchedulerState::Fetching
        } else {
            SchedulerState::Idle
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.state() == SchedulerState::Fetching
    }

    /// Run one full cycle. Returns `None` if a cycle is already running.
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> Option<CycleReport> {
        // Check if already refreshing
        if self
            .fetching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("Refresh already in progress, skipping");
            return None;
        }
        // Back to Idle however this future ends, including being dropped.
        let _idle = IdleOnDrop(&self.fetching);

        Some(self.do_cycle(shutdown).await)
    }

    async fn do_cycle(&self, shutdown: &CancellationToken) -> CycleReport {
        let started_at = Utc::now();
        let cycle = shutdown.child_token();
        // Abandoning the cycle stops its collectors too.
        let _cancel_on_drop = cycle.clone().drop_guard();
        let capacity = self.settings.channel_capacity;
        info!("Refreshing {} sources", self.collectors.len());

        let inputs = self
            .collectors
            .iter()
            .map(|collector| spawn_collector(collector.clone(), capacity, cycle.clone()))
            .collect();
        let merged = merge(inputs, capacity);

        let write = self.writer.run(merged);
        tokio::pin!(write);

        let mut interrupted = false;
        let write_report = tokio::select! {
            report = &mut write => report,
            _ = tokio::time::sleep(self.settings.cycle_timeout) => {
                warn!(
                    "Refresh cycle exceeded {:?}, cancelling outstanding fetches",
                    self.settings.cycle_timeout
                );
                interrupted = true;
                cycle.cancel();
                write.await
            }
        };
        interrupted |= shutdown.is_cancelled();

        for (source, count) in &write_report.by_source {
            info!("Stored {} stories from {}", count, source);
        }
        info!("Refresh complete, {} new stories", write_report.appended);

        CycleReport {
            started_at,
            finished_at: Utc::now(),
            appended: write_report.appended,
            by_source: write_report.by_source,
            interrupted,
        }
    }

    /// Refresh now, then every `refresh_interval`, until `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("Starting initial story fetch");
        self.run_cycle(&shutdown).await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Refresh loop stopped");
                    return;
                }
                _ = tokio::time::sleep(self.settings.refresh_interval) => {}
            }

            info!("Starting scheduled story refresh");
            self.run_cycle(&shutdown).await;
        }
    }
}

struct IdleOnDrop<'a>(&'a AtomicBool);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The registered providers, built from whichever sources are enabled.
pub fn build_collectors(config: &Config) -> Vec<Arc<dyn Collector>> {
    let mut collectors: Vec<Arc<dyn Collector>> = Vec::new();

    if config.hacker_news.enabled {
        let client = HackerNewsClient::new(
            &config.hacker_news.base_url,
            &config.user_agent,
            config.fetch_timeout(),
        );
        collectors.push(Arc::new(FanOutCollector::new(
            Arc::new(client),
            Source::HackerNews,
            config.fetch_timeout(),
            config.max_concurrent_items,
        )));
    }

    if config.reddit.enabled {
        let client = RedditClient::new(
            &config.reddit.base_url,
            &config.user_agent,
            config.fetch_timeout(),
        );
        collectors.push(Arc::new(ListingCollector::new(
            client,
            Source::Reddit,
            config.reddit.subreddit.clone(),
            config.reddit.sort,
            ListingOptions {
                limit: config.reddit.limit,
            },
            config.fetch_timeout(),
        )));
    }

    collectors
}
