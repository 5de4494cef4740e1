use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::entities::Entity;

/// Link used when a record has none
pub const PLACEHOLDER_URL: &str = "#";

/// Parse a post timestamp. Accepts RFC 3339, naive ISO date-times (taken as
/// UTC) and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A headline scraped from a news site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub headline: String,
    pub description: String,
    pub url: String,
    pub source: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetrics {
    pub like_count: u64,
    pub retweet_count: u64,
    pub reply_count: u64,
}

/// A social post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub username: String,
    pub display_name: String,
    pub text: String,
    /// As supplied by the source; may be missing or malformed
    pub created_at: Option<String>,
    pub url: String,
    #[serde(default)]
    pub metrics: PostMetrics,
}

impl Post {
    /// Parsed creation time; `None` when absent or unparseable
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// A run of at least two posts by one author, earliest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub username: String,
    pub posts: Vec<Post>,
}

impl Thread {
    pub fn first(&self) -> Option<&Post> {
        self.posts.first()
    }

    /// Metrics summed across every post in the thread
    pub fn total_metrics(&self) -> PostMetrics {
        self.posts.iter().fold(PostMetrics::default(), |acc, post| PostMetrics {
            like_count: acc.like_count + post.metrics.like_count,
            retweet_count: acc.retweet_count + post.metrics.retweet_count,
            reply_count: acc.reply_count + post.metrics.reply_count,
        })
    }
}

/// Any record the normalizer accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum SourceRecord {
    Article(Article),
    Post(Post),
    Thread(Thread),
}

impl From<Article> for SourceRecord {
    fn from(article: Article) -> Self {
        SourceRecord::Article(article)
    }
}

impl From<Post> for SourceRecord {
    fn from(post: Post) -> Self {
        SourceRecord::Post(post)
    }
}

impl From<Thread> for SourceRecord {
    fn from(thread: Thread) -> Self {
        SourceRecord::Thread(thread)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Article,
    Post,
    Thread,
}

/// The uniform unit the clusterer works on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub title: String,
    pub text: String,
    pub url: String,
    pub source_label: String,
    pub entities: BTreeSet<Entity>,
    pub original: SourceRecord,
}

impl NormalizedItem {
    pub fn kind(&self) -> ItemKind {
        match self.original {
            SourceRecord::Article(_) => ItemKind::Article,
            SourceRecord::Post(_) => ItemKind::Post,
            SourceRecord::Thread(_) => ItemKind::Thread,
        }
    }
}

/// A group of items displayed under one heading.
///
/// Multi-item clusters carry a topic and the entities every member shares;
/// singletons have no topic and carry their one item's entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub topic: Option<Entity>,
    pub shared_entities: BTreeSet<Entity>,
    pub items: Vec<NormalizedItem>,
}

impl Cluster {
    pub fn is_singleton(&self) -> bool {
        self.items.len() == 1
    }
}

/// How many records each source contributed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub techmeme: usize,
    pub techcrunch: usize,
    pub posts: usize,
}

impl SourceCounts {
    pub fn total(&self) -> usize {
        self.techmeme + self.techcrunch + self.posts
    }
}

/// Complete digest data for serialization
#[derive(Debug, Serialize, Deserialize)]
pub struct DigestData {
    pub version: String,
    pub created_at: String,
    pub counts: SourceCounts,
    pub clusters: Vec<Cluster>,
}

impl DigestData {
    pub fn new(counts: SourceCounts, clusters: Vec<Cluster>) -> Self {
        Self {
            version: "1.0".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            counts,
            clusters,
        }
    }
}
