use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::models::{Post, SourceRecord, Thread};

pub const DEFAULT_THREAD_MINUTES: i64 = 10;

/// Output of thread detection: a lone post or a collapsed thread
#[derive(Debug, Clone, PartialEq)]
pub enum DetectedItem {
    Post(Post),
    Thread(Thread),
}

impl From<DetectedItem> for SourceRecord {
    fn from(item: DetectedItem) -> Self {
        match item {
            DetectedItem::Post(post) => SourceRecord::Post(post),
            DetectedItem::Thread(thread) => SourceRecord::Thread(thread),
        }
    }
}

/// Groups each author's posts into threads by time proximity.
///
/// A post joins the open run when it is within `threshold` of the previous
/// post in that run (inclusive). Runs chain: a thread may span far more than
/// the threshold as long as every consecutive gap fits.
#[derive(Debug, Clone, Copy)]
pub struct ThreadDetector {
    threshold: Duration,
}

impl Default for ThreadDetector {
    fn default() -> Self {
        Self::with_threshold(Duration::minutes(DEFAULT_THREAD_MINUTES))
    }
}

impl ThreadDetector {
    /// Fails on a negative threshold or one too large to represent
    pub fn new(threshold_minutes: i64) -> Result<Self> {
        if threshold_minutes < 0 {
            anyhow::bail!(
                "Thread threshold must not be negative, got {} minutes",
                threshold_minutes
            );
        }
        let threshold = Duration::try_minutes(threshold_minutes).with_context(|| {
            format!("Thread threshold of {} minutes is out of range", threshold_minutes)
        })?;
        Ok(Self::with_threshold(threshold))
    }

    pub fn with_threshold(threshold: Duration) -> Self {
        Self { threshold }
    }

    /// Detect threads across all authors. Results are ordered by the start
    /// time of each post/thread, most recent first; posts without a usable
    /// timestamp sort last.
    pub fn detect(&self, posts: Vec<Post>) -> Vec<DetectedItem> {
        if posts.is_empty() {
            return Vec::new();
        }

        // Authors are kept in first-appearance order
        let mut author_index: HashMap<String, usize> = HashMap::new();
        let mut by_author: Vec<Vec<(Option<DateTime<Utc>>, Post)>> = Vec::new();
        for post in posts {
            let slot = *author_index
                .entry(post.username.clone())
                .or_insert_with(|| {
                    by_author.push(Vec::new());
                    by_author.len() - 1
                });
            by_author[slot].push((post.timestamp(), post));
        }

        let mut results: Vec<(Option<DateTime<Utc>>, DetectedItem)> = Vec::new();
        for mut author_posts in by_author {
            // None sorts first, standing in for "earliest possible"
            author_posts.sort_by_key(|(ts, _)| *ts);
            self.split_runs(author_posts, &mut results);
        }

        results.sort_by(|a, b| b.0.cmp(&a.0));

        debug!(
            "Thread detection - items={}, threads={}",
            results.len(),
            results
                .iter()
                .filter(|(_, item)| matches!(item, DetectedItem::Thread(_)))
                .count()
        );

        results.into_iter().map(|(_, item)| item).collect()
    }

    fn split_runs(
        &self,
        author_posts: Vec<(Option<DateTime<Utc>>, Post)>,
        results: &mut Vec<(Option<DateTime<Utc>>, DetectedItem)>,
    ) {
        let mut run: Vec<(Option<DateTime<Utc>>, Post)> = Vec::new();

        for (ts, post) in author_posts {
            let joins = match (run.last().and_then(|(prev, _)| *prev), ts) {
                (Some(prev), Some(current)) => self.within_threshold(prev, current),
                _ => false,
            };

            if !joins && !run.is_empty() {
                results.push(Self::close_run(std::mem::take(&mut run)));
            }
            run.push((ts, post));
        }

        if !run.is_empty() {
            results.push(Self::close_run(run));
        }
    }

    fn within_threshold(&self, prev: DateTime<Utc>, current: DateTime<Utc>) -> bool {
        let gap = if current >= prev {
            current - prev
        } else {
            prev - current
        };
        gap <= self.threshold
    }

    fn close_run(
        mut run: Vec<(Option<DateTime<Utc>>, Post)>,
    ) -> (Option<DateTime<Utc>>, DetectedItem) {
        let started = run[0].0;
        if run.len() == 1 {
            let (_, post) = run.remove(0);
            return (started, DetectedItem::Post(post));
        }

        let username = run[0].1.username.clone();
        let posts = run.into_iter().map(|(_, post)| post).collect();
        (started, DetectedItem::Thread(Thread { username, posts }))
    }
}
