use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::reddit::SortMode;

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Pause between refresh cycles, in seconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    /// Timeout applied to every individual external call, in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,
    /// Deadline for a whole refresh cycle, in seconds
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_max_concurrent_items")]
    pub max_concurrent_items: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub hacker_news: HackerNewsConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
}

fn default_refresh_interval() -> u64 {
    20
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_cycle_timeout() -> u64 {
    120
}

fn default_channel_capacity() -> usize {
    8
}

fn default_max_concurrent_items() -> usize {
    32
}

fn default_user_agent() -> String {
    "StoryHub/0.1 (story aggregator)".to_string()
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct HackerNewsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_hacker_news_url")]
    pub base_url: String,
}

fn default_hacker_news_url() -> String {
    "https://hacker-news.firebaseio.com".to_string()
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_hacker_news_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RedditConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_reddit_url")]
    pub base_url: String,
    #[serde(default = "default_subreddit")]
    pub subreddit: String,
    #[serde(default)]
    pub sort: SortMode,
    #[serde(default = "default_listing_limit")]
    pub limit: u32,
}

fn default_reddit_url() -> String {
    "https://www.reddit.com".to_string()
}

fn default_subreddit() -> String {
    "programming".to_string()
}

fn default_listing_limit() -> u32 {
    100
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_reddit_url(),
            subreddit: default_subreddit(),
            sort: SortMode::default(),
            limit: default_listing_limit(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            fetch_timeout: default_fetch_timeout(),
            cycle_timeout: default_cycle_timeout(),
            channel_capacity: default_channel_capacity(),
            max_concurrent_items: default_max_concurrent_items(),
            user_agent: default_user_agent(),
            hacker_news: HackerNewsConfig::default(),
            reddit: RedditConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be at least 1");
        }
        if config.max_concurrent_items == 0 {
            anyhow::bail!("max_concurrent_items must be at least 1");
        }
        Ok(config)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout)
    }
}
