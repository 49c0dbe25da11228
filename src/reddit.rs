use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use serde::Deserialize;

use crate::collector::ListingApi;
use crate::error::SourceError;
use crate::story::RawItem;

/// Listing order for subreddit submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    New,
    Hot,
    Top,
    Rising,
    Controversial,
}

impl SortMode {
    pub fn as_path(&self) -> &'static str {
        match self {
            SortMode::New => "new",
            SortMode::Hot => "hot",
            SortMode::Top => "top",
            SortMode::Rising => "rising",
            SortMode::Controversial => "controversial",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingOptions {
    pub limit: u32,
}

/// Client for public subreddit listings, read as Atom feeds.
pub struct RedditClient {
    client: Client,
    base_url: String,
}

impl RedditClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Convert a parsed listing into raw items, in listing order.
    pub fn items_from_feed(feed: feed_rs::model::Feed) -> Vec<RawItem> {
        feed.entries
            .into_iter()
            .map(|entry| {
                let article = entry
                    .content
                    .as_ref()
                    .and_then(|c| c.body.as_deref())
                    .and_then(Self::extract_article_link)
                    .or_else(|| {
                        entry
                            .summary
                            .as_ref()
                            .and_then(|t| Self::extract_article_link(&t.content))
                    });
                // Self-posts have no external article, so keep the comments page.
                let url = article.or_else(|| entry.links.into_iter().next().map(|l| l.href));

                RawItem {
                    title: entry.title.map(|t| t.content),
                    url,
                    author: entry
                        .authors
                        .into_iter()
                        .next()
                        .map(|p| Self::strip_user_prefix(&p.name).to_string()),
                }
            })
            .collect()
    }

    /// Reddit's entry HTML points at the submitted article through a
    /// `<a href="...">[link]</a>` anchor.
    pub fn extract_article_link(html: &str) -> Option<String> {
        let marker = html.find(">[link]</a>")?;
        let before = &html[..marker];
        let start = before.rfind("href=\"")? + "href=\"".len();
        let end = before[start..].find('"')? + start;

        let href = before[start..end].trim().replace("&amp;", "&");
        if href.is_empty() {
            None
        } else {
            Some(href)
        }
    }

    /// Reddit renders authors as `/u/name`.
    pub fn strip_user_prefix(name: &str) -> &str {
        name.trim()
            .strip_prefix("/u/")
            .or_else(|| name.trim().strip_prefix("u/"))
            .unwrap_or_else(|| name.trim())
    }
}

#[async_trait]
impl ListingApi for RedditClient {
    async fn submissions(
        &self,
        subject: &str,
        sort: SortMode,
        options: ListingOptions,
    ) -> Result<Vec<RawItem>, SourceError> {
        let bytes = self
            .client
            .get(format!("{}/r/{}/{}/.rss", self.base_url, subject, sort))
            .query(&[("limit", options.limit)])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let feed = parser::parse(&bytes[..])
            .map_err(|e| SourceError::Unavailable(format!("invalid listing feed: {}", e)))?;

        Ok(Self::items_from_feed(feed))
    }
}
