use std::fmt;

/// Feed provider a story was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    HackerNews,
    Reddit,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::HackerNews => "HackerNews",
            Source::Reddit => "Reddit",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized feed item. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub title: String,
    pub author: String,
    pub url: String,
    pub source: Source,
}

impl Story {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        url: impl Into<String>,
        source: Source,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            url: url.into(),
            source,
        }
    }

    /// Normalize an external item; absent fields become empty strings.
    pub fn from_item(item: RawItem, source: Source) -> Self {
        Self {
            title: item.title.unwrap_or_default(),
            author: item.author.unwrap_or_default(),
            url: item.url.unwrap_or_default(),
            source,
        }
    }
}

/// Item shape exposed by the external feed clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub url: Option<String>,
    pub author: Option<String>,
}
