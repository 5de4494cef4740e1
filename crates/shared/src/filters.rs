use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::entities::PhraseMatcher;
use crate::models::{Article, Post};

/// Matches headlines against the AI keyword list
pub struct AiKeywordFilter {
    matcher: PhraseMatcher<()>,
}

impl AiKeywordFilter {
    pub fn new(keywords: &[String]) -> Result<Self> {
        let matcher = PhraseMatcher::new(keywords.iter().map(|k| (k.as_str(), ())))
            .context("Failed to build AI keyword matcher")?;
        Ok(Self { matcher })
    }

    pub fn contains_ai_keyword(&self, text: &str) -> bool {
        !text.is_empty() && self.matcher.is_match(text)
    }

    /// Keep articles whose headline or description mentions AI
    pub fn filter_articles(&self, articles: Vec<Article>) -> Vec<Article> {
        articles
            .into_iter()
            .filter(|a| self.contains_ai_keyword(&format!("{} {}", a.headline, a.description)))
            .collect()
    }
}

/// Drop posts older than `max_age`. Posts without a readable timestamp are kept,
/// and so is everything when the cutoff falls outside the representable range.
/// Returns the kept posts and how many were dropped.
pub fn filter_posts_by_recency(
    posts: Vec<Post>,
    max_age: Duration,
    now: DateTime<Utc>,
) -> (Vec<Post>, usize) {
    let Some(cutoff) = now.checked_sub_signed(max_age) else {
        return (posts, 0);
    };
    let before = posts.len();

    let recent: Vec<Post> = posts
        .into_iter()
        .filter(|post| post.timestamp().map_or(true, |ts| ts >= cutoff))
        .collect();

    let dropped = before - recent.len();
    (recent, dropped)
}

#[derive(Debug, Default)]
pub struct AccountFilter {
    pub posts: Vec<Post>,
    /// Lower-case accounts that had at least one post
    pub found: BTreeSet<String>,
    /// Lower-case accounts that had none
    pub missing: BTreeSet<String>,
}

/// Keep only posts whose author is in `accounts` (case-insensitive).
/// An empty account list keeps everything.
pub fn filter_posts_by_accounts(posts: Vec<Post>, accounts: &[String]) -> AccountFilter {
    if accounts.is_empty() {
        return AccountFilter {
            posts,
            ..AccountFilter::default()
        };
    }

    let wanted: BTreeSet<String> = accounts.iter().map(|a| a.to_lowercase()).collect();
    let mut found = BTreeSet::new();

    let posts: Vec<Post> = posts
        .into_iter()
        .filter(|post| {
            let username = post.username.to_lowercase();
            if wanted.contains(&username) {
                found.insert(username);
                true
            } else {
                false
            }
        })
        .collect();

    let missing = wanted.difference(&found).cloned().collect();

    AccountFilter {
        posts,
        found,
        missing,
    }
}

/// Read account names, one per line. Leading `@` is stripped; blank lines and
/// `#` comments are skipped.
pub fn read_accounts(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read accounts file: {}", path.display()))?;
    Ok(parse_accounts(&content))
}

fn parse_accounts(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim().trim_start_matches('@'))
        .filter(|account| !account.is_empty() && !account.starts_with('#'))
        .map(str::to_string)
        .collect()
}
