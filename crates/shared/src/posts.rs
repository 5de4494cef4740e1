use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::dictionary::EntityDictionary;
use crate::models::{Post, PostMetrics};

/// A post as exported by the fetch tooling. Field names vary between
/// exporters, so every known spelling is accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPost {
    username: Option<String>,
    #[serde(rename = "authorUsername")]
    author_username: Option<String>,
    display_name: Option<String>,
    #[serde(rename = "authorName")]
    author_name: Option<String>,
    text: Option<String>,
    created_at: Option<String>,
    #[serde(rename = "createdAt")]
    created_at_camel: Option<String>,
    #[serde(rename = "createdAtDate")]
    created_at_date: Option<String>,
    url: Option<String>,
    id: Option<Value>,
    metrics: Option<RawMetrics>,
    #[serde(rename = "likeCount")]
    like_count: Option<u64>,
    #[serde(rename = "retweetCount")]
    retweet_count: Option<u64>,
    #[serde(rename = "replyCount")]
    reply_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMetrics {
    like_count: u64,
    retweet_count: u64,
    reply_count: u64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl RawPost {
    fn into_post(self, dictionary: &EntityDictionary) -> Post {
        let author_username = self.author_username.clone().unwrap_or_default();
        let username = non_empty(self.username)
            .or_else(|| non_empty(self.author_username))
            .unwrap_or_default();

        let display_name = dictionary
            .display_name(&username)
            .map(str::to_string)
            .or_else(|| non_empty(self.display_name))
            .or_else(|| non_empty(self.author_name))
            .unwrap_or_else(|| username.clone());

        let created_at = non_empty(self.created_at)
            .or_else(|| non_empty(self.created_at_camel))
            .or_else(|| non_empty(self.created_at_date));

        let url = non_empty(self.url).unwrap_or_else(|| {
            let id = match self.id {
                Some(Value::String(s)) => s,
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            format!("https://x.com/{}/status/{}", author_username, id)
        });

        let metrics = match self.metrics {
            Some(m) => PostMetrics {
                like_count: m.like_count,
                retweet_count: m.retweet_count,
                reply_count: m.reply_count,
            },
            None => PostMetrics {
                like_count: self.like_count.unwrap_or(0),
                retweet_count: self.retweet_count.unwrap_or(0),
                reply_count: self.reply_count.unwrap_or(0),
            },
        };

        Post {
            username,
            display_name,
            text: self.text.unwrap_or_default(),
            created_at,
            url,
            metrics,
        }
    }
}

/// Load posts from a JSON file holding either an array of posts or an object
/// with a `posts` array.
pub fn load_posts(path: &Path, dictionary: &EntityDictionary) -> Result<Vec<Post>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read posts file: {}", path.display()))?;
    parse_posts(&content, dictionary)
        .with_context(|| format!("Failed to parse posts JSON from {}", path.display()))
}

pub fn parse_posts(content: &str, dictionary: &EntityDictionary) -> Result<Vec<Post>> {
    let data: Value = serde_json::from_str(content).context("Invalid JSON")?;

    let entries = match data {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("posts") {
            Some(Value::Array(entries)) => entries,
            _ => {
                warn!("Unexpected JSON structure in posts file: object without a posts array");
                return Ok(Vec::new());
            }
        },
        _ => {
            warn!("Unexpected JSON structure in posts file");
            return Ok(Vec::new());
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let raw: RawPost = serde_json::from_value(entry)
                .with_context(|| format!("Post #{} has an unexpected shape", i))?;
            Ok(raw.into_post(dictionary))
        })
        .collect()
}
