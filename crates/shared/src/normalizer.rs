use crate::entities::EntityExtractor;
use crate::models::{NormalizedItem, SourceRecord, PLACEHOLDER_URL};

/// Post text longer than this is truncated for display
const TITLE_MAX_CHARS: usize = 100;

/// Converts articles, posts and threads into [`NormalizedItem`]s
pub struct ItemNormalizer<'a> {
    extractor: &'a EntityExtractor,
}

impl<'a> ItemNormalizer<'a> {
    pub fn new(extractor: &'a EntityExtractor) -> Self {
        Self { extractor }
    }

    pub fn normalize(&self, record: impl Into<SourceRecord>) -> NormalizedItem {
        let record = record.into();

        let (title, text, url, source_label) = match &record {
            SourceRecord::Article(article) => (
                article.headline.clone(),
                format!("{} {}", article.headline, article.description),
                article.url.clone(),
                article.source.clone(),
            ),
            SourceRecord::Post(post) => (
                Self::short_title(&post.text),
                post.text.clone(),
                post.url.clone(),
                format!("@{}", post.username),
            ),
            SourceRecord::Thread(thread) => {
                let first = thread.first();
                let text = thread
                    .posts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                (
                    Self::short_title(first.map(|p| p.text.as_str()).unwrap_or("")),
                    text,
                    first.map(|p| p.url.clone()).unwrap_or_default(),
                    format!("@{}", thread.username),
                )
            }
        };

        let url = if url.trim().is_empty() {
            PLACEHOLDER_URL.to_string()
        } else {
            url
        };

        NormalizedItem {
            entities: self.extractor.extract(&text),
            title,
            text,
            url,
            source_label,
            original: record,
        }
    }

    fn short_title(text: &str) -> String {
        if text.chars().count() > TITLE_MAX_CHARS {
            let truncated: String = text.chars().take(TITLE_MAX_CHARS).collect();
            format!("{}...", truncated)
        } else {
            text.to_string()
        }
    }
}
