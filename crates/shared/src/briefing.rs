use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::models::{
    parse_timestamp, Article, Cluster, NormalizedItem, Post, SourceCounts, SourceRecord, Thread,
    PLACEHOLDER_URL,
};

static URL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"https?://[^\s<]+").ok());

/// Number of shared entities shown as tags on a cluster header
const MAX_ENTITY_TAGS: usize = 5;

const STYLE: &str = r#"    body { font-family: -apple-system, BlinkMacSystemFont, Arial, sans-serif; max-width: 900px; margin: 40px auto; padding: 0 20px; line-height: 1.6; background: #f5f5f5; color: #222; }
    h1 { color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 10px; text-align: center; }
    .subtitle { text-align: center; color: #7f8c8d; margin-top: -10px; }
    .content-summary p { color: #555; font-size: 0.95em; }
    .topic-cluster { background: #fff; border-left: 4px solid #3498db; border-radius: 6px; margin: 25px 0; padding: 15px 20px; }
    .cluster-header { display: flex; justify-content: space-between; align-items: baseline; }
    .cluster-topic { margin: 0; color: #2c3e50; }
    .cluster-count { color: #7f8c8d; font-size: 0.9em; }
    .entity-tag { display: inline-block; background: #ecf0f1; border-radius: 10px; padding: 2px 10px; margin: 4px 4px 0 0; font-size: 0.8em; color: #34495e; }
    .cluster-item { border-top: 1px solid #eee; padding: 10px 0; }
    .article, .x-post, .x-thread { background: #fff; border-radius: 6px; margin: 15px 0; padding: 12px 16px; }
    .cluster-item .article, .cluster-item .x-post, .cluster-item .x-thread { margin: 0; padding: 0; }
    .headline { color: #2c3e50; font-weight: bold; text-decoration: none; }
    .headline:hover { text-decoration: underline; }
    .source, .item-source, .x-time, .x-username { color: #7f8c8d; font-size: 0.85em; margin-left: 8px; }
    .description { color: #444; margin: 6px 0 0 0; }
    .x-user { text-decoration: none; color: #222; }
    .x-display-name { font-weight: bold; }
    .x-text { white-space: pre-wrap; word-wrap: break-word; margin: 8px 0; }
    .x-metrics, .x-metrics-compact { color: #7f8c8d; font-size: 0.85em; display: flex; gap: 15px; }
    .x-link { color: #1d9bf0; text-decoration: none; }
    .thread-indicator { background: #1d9bf0; color: #fff; border-radius: 10px; padding: 1px 8px; font-size: 0.75em; margin-left: 8px; }
    .thread-post { border-left: 2px solid #cfd9de; padding-left: 12px; margin: 8px 0; }
    .no-articles { text-align: center; color: #7f8c8d; }
    .footer { margin-top: 40px; text-align: center; color: #7f8c8d; font-size: 0.85em; }
"#;

/// Renders the ordered cluster list as a standalone HTML page
pub struct DigestRenderer;

impl DigestRenderer {
    pub fn generate(clusters: &[Cluster], counts: &SourceCounts, generated_at: DateTime<Local>) -> String {
        let mut html = String::new();
        let today = generated_at.format("%B %d, %Y").to_string();

        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("  <meta charset=\"UTF-8\">\n");
        html.push_str(
            "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        html.push_str(&format!("  <title>AI News Summary - {}</title>\n", today));
        html.push_str("  <style>\n");
        html.push_str(STYLE);
        html.push_str("  </style>\n");
        html.push_str("</head>\n<body>\n");
        html.push_str(&format!("<h1>AI News Summary - {}</h1>\n", today));
        html.push_str("<p class=\"subtitle\">Clustered by Topic</p>\n");

        if clusters.is_empty() {
            html.push_str("<p class=\"no-articles\">No content found.</p>\n");
        } else {
            let multi = clusters.iter().filter(|c| !c.is_singleton()).count();
            let standalone = clusters.len() - multi;
            html.push_str("<div class=\"content-summary\">\n");
            html.push_str(&format!(
                "  <p>{} items total: {} topic clusters, {} standalone items</p>\n",
                counts.total(),
                multi,
                standalone
            ));
            html.push_str("</div>\n");

            for cluster in clusters {
                html.push_str(&Self::format_cluster(cluster));
            }
        }

        html.push_str("<div class=\"footer\">\n");
        html.push_str(&format!(
            "  <div class=\"stats\">Total: {} items ({} Techmeme, {} TechCrunch, {} X posts)</div>\n",
            counts.total(),
            counts.techmeme,
            counts.techcrunch,
            counts.posts
        ));
        html.push_str(&format!(
            "  <div class=\"timestamp\">Generated: {}</div>\n",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        html.push_str("</div>\n");
        html.push_str("</body>\n</html>");
        html
    }

    fn format_cluster(cluster: &Cluster) -> String {
        let items_html: String = cluster.items.iter().map(Self::format_cluster_item).collect();

        let topic = match &cluster.topic {
            Some(topic) if !cluster.is_singleton() => topic,
            // Standalone items render without a cluster wrapper
            _ => return items_html,
        };

        let tags = cluster
            .shared_entities
            .iter()
            .take(MAX_ENTITY_TAGS)
            .map(|e| format!("<span class=\"entity-tag\">{}</span>", Self::escape_html(e)))
            .collect::<Vec<_>>()
            .join(" ");

        let mut html = String::new();
        html.push_str("<div class=\"topic-cluster\">\n");
        html.push_str("  <div class=\"cluster-header\">\n");
        html.push_str(&format!(
            "    <h3 class=\"cluster-topic\">{}</h3>\n",
            Self::escape_html(topic)
        ));
        html.push_str(&format!(
            "    <span class=\"cluster-count\">{} items</span>\n",
            cluster.items.len()
        ));
        html.push_str("  </div>\n");
        html.push_str(&format!("  <div class=\"cluster-entities\">{}</div>\n", tags));
        html.push_str("  <div class=\"cluster-items\">\n");
        html.push_str(&items_html);
        html.push_str("  </div>\n");
        html.push_str("</div>\n");
        html
    }

    fn format_cluster_item(item: &NormalizedItem) -> String {
        let body = match &item.original {
            SourceRecord::Article(article) => Self::format_article(article),
            SourceRecord::Post(post) => Self::format_post(post),
            SourceRecord::Thread(thread) => Self::format_thread(thread),
        };
        format!("<div class=\"cluster-item\">\n{}</div>\n", body)
    }

    fn format_article(article: &Article) -> String {
        let mut html = String::new();
        html.push_str("<div class=\"article\">\n");
        html.push_str(&format!(
            "  <a href=\"{}\" target=\"_blank\" class=\"headline\">{}</a>\n",
            Self::escape_html(Self::link_or_placeholder(&article.url)),
            Self::escape_html(&article.headline)
        ));
        html.push_str(&format!(
            "  <span class=\"source\">{}</span>\n",
            Self::escape_html(&article.source)
        ));
        let description = article.description.trim();
        if !description.is_empty() {
            html.push_str(&format!(
                "  <p class=\"description\">{}</p>\n",
                Self::escape_html(description)
            ));
        }
        html.push_str("</div>\n");
        html
    }

    fn format_user_header(username: &str, display_name: &str) -> String {
        format!(
            "    <a href=\"https://x.com/{}\" target=\"_blank\" class=\"x-user\">\n      <span class=\"x-display-name\">{}</span>\n      <span class=\"x-username\">@{}</span>\n    </a>\n",
            Self::escape_html(username),
            Self::escape_html(display_name),
            Self::escape_html(username)
        )
    }

    fn format_post(post: &Post) -> String {
        let mut html = String::new();
        html.push_str("<div class=\"x-post\">\n");
        html.push_str("  <div class=\"x-header\">\n");
        html.push_str(&Self::format_user_header(&post.username, &post.display_name));
        html.push_str(&format!(
            "    <span class=\"x-time\">{}</span>\n",
            Self::format_time(post.created_at.as_deref())
        ));
        html.push_str("  </div>\n");
        html.push_str(&format!("  <p class=\"x-text\">{}</p>\n", Self::linkify(&post.text)));
        html.push_str("  <div class=\"x-metrics\">\n");
        html.push_str(&format!(
            "    <span title=\"Replies\">{} replies</span>\n",
            post.metrics.reply_count
        ));
        html.push_str(&format!(
            "    <span title=\"Retweets\">{} retweets</span>\n",
            post.metrics.retweet_count
        ));
        html.push_str(&format!(
            "    <span title=\"Likes\">{} likes</span>\n",
            post.metrics.like_count
        ));
        html.push_str(&format!(
            "    <a href=\"{}\" target=\"_blank\" class=\"x-link\">View on X</a>\n",
            Self::escape_html(Self::link_or_placeholder(&post.url))
        ));
        html.push_str("  </div>\n");
        html.push_str("</div>\n");
        html
    }

    fn format_thread(thread: &Thread) -> String {
        let first = thread.first();
        let display_name = first
            .map(|p| p.display_name.as_str())
            .unwrap_or(thread.username.as_str());
        let totals = thread.total_metrics();

        let mut html = String::new();
        html.push_str("<div class=\"x-thread\">\n");
        html.push_str("  <div class=\"x-header\">\n");
        html.push_str(&Self::format_user_header(&thread.username, display_name));
        html.push_str(&format!(
            "    <span class=\"thread-indicator\">Thread ({} posts)</span>\n",
            thread.posts.len()
        ));
        html.push_str(&format!(
            "    <span class=\"x-time\">{}</span>\n",
            Self::format_time(first.and_then(|p| p.created_at.as_deref()))
        ));
        html.push_str("  </div>\n");
        html.push_str("  <div class=\"thread-content\">\n");
        for post in &thread.posts {
            html.push_str("    <div class=\"thread-post\">\n");
            html.push_str(&format!(
                "      <p class=\"x-text\">{}</p>\n",
                Self::linkify(&post.text)
            ));
            html.push_str(&format!(
                "      <div class=\"x-metrics-compact\"><span>{} likes</span> <a href=\"{}\" target=\"_blank\" class=\"x-link\">View</a></div>\n",
                post.metrics.like_count,
                Self::escape_html(Self::link_or_placeholder(&post.url))
            ));
            html.push_str("    </div>\n");
        }
        html.push_str("  </div>\n");
        html.push_str("  <div class=\"x-metrics thread-metrics\">\n");
        html.push_str(&format!(
            "    <span title=\"Replies\">{} replies</span>\n",
            totals.reply_count
        ));
        html.push_str(&format!(
            "    <span title=\"Retweets\">{} retweets</span>\n",
            totals.retweet_count
        ));
        html.push_str(&format!(
            "    <span title=\"Likes\">{} likes</span>\n",
            totals.like_count
        ));
        html.push_str("  </div>\n");
        html.push_str("</div>\n");
        html
    }

    fn format_time(created_at: Option<&str>) -> String {
        match created_at {
            Some(raw) => match parse_timestamp(raw) {
                Some(dt) => dt.format("%b %d, %H:%M").to_string(),
                None => Self::escape_html(raw),
            },
            None => String::new(),
        }
    }

    fn link_or_placeholder(url: &str) -> &str {
        if url.trim().is_empty() {
            PLACEHOLDER_URL
        } else {
            url
        }
    }

    /// Escape text and turn bare URLs into links
    fn linkify(text: &str) -> String {
        let escaped = Self::escape_html(text);
        match URL_RE.as_ref() {
            Some(re) => re
                .replace_all(&escaped, "<a href=\"$0\" target=\"_blank\">$0</a>")
                .into_owned(),
            None => escaped,
        }
    }

    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    pub fn save(content: &str, path: &Path) -> Result<()> {
        fs::write(path, content)
            .with_context(|| format!("Failed to write digest HTML to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostMetrics;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn article_item(headline: &str, entities: &[&str]) -> NormalizedItem {
        NormalizedItem {
            title: headline.to_string(),
            text: headline.to_string(),
            url: "https://example.com".to_string(),
            source_label: "Example".to_string(),
            entities: entities.iter().map(|e| e.to_string()).collect(),
            original: SourceRecord::Article(Article {
                headline: headline.to_string(),
                description: "A description".to_string(),
                url: "https://example.com".to_string(),
                source: "Example".to_string(),
            }),
        }
    }

    fn post(text: &str, likes: u64) -> Post {
        Post {
            username: "sama".to_string(),
            display_name: "Sam Altman".to_string(),
            text: text.to_string(),
            created_at: Some("2024-01-15T10:30:00Z".to_string()),
            url: "https://x.com/sama/status/1".to_string(),
            metrics: PostMetrics {
                like_count: likes,
                retweet_count: 1,
                reply_count: 1,
            },
        }
    }

    fn generated() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    // ==================== HTML Escaping Tests ====================

    #[test]
    fn test_escape_html_combined() {
        assert_eq!(
            DigestRenderer::escape_html("<a href=\"test\">Click & Go</a>"),
            "&lt;a href=&quot;test&quot;&gt;Click &amp; Go&lt;/a&gt;"
        );
    }

    #[test]
    fn test_linkify_wraps_urls() {
        let html = DigestRenderer::linkify("see https://openai.com/blog now & <then>");
        assert!(html.contains(
            "<a href=\"https://openai.com/blog\" target=\"_blank\">https://openai.com/blog</a>"
        ));
        assert!(html.contains("&amp; &lt;then&gt;"));
    }

    #[test]
    fn test_format_time() {
        assert_eq!(
            DigestRenderer::format_time(Some("2024-01-15T10:30:00Z")),
            "Jan 15, 10:30"
        );
        assert_eq!(DigestRenderer::format_time(Some("sometime")), "sometime");
        assert_eq!(DigestRenderer::format_time(None), "");
    }

    // ==================== Page Generation Tests ====================

    #[test]
    fn test_generate_multi_item_cluster() {
        let clusters = vec![Cluster {
            topic: Some("OpenAI & Friends".to_string()),
            shared_entities: ["OpenAI & Friends".to_string()].into_iter().collect(),
            items: vec![
                article_item("First <story>", &["OpenAI & Friends"]),
                article_item("Second story", &["OpenAI & Friends"]),
            ],
        }];
        let counts = SourceCounts {
            techmeme: 2,
            techcrunch: 0,
            posts: 0,
        };

        let html = DigestRenderer::generate(&clusters, &counts, generated());
        assert!(html.contains("AI News Summary - January 15, 2024"));
        assert!(html.contains("2 items total: 1 topic clusters, 0 standalone items"));
        assert!(html.contains("<h3 class=\"cluster-topic\">OpenAI &amp; Friends</h3>"));
        assert!(html.contains("<span class=\"cluster-count\">2 items</span>"));
        assert!(html.contains("First &lt;story&gt;"));
        assert!(html.contains("Total: 2 items (2 Techmeme, 0 TechCrunch, 0 X posts)"));
    }

    #[test]
    fn test_generate_singleton_has_no_cluster_wrapper() {
        let clusters = vec![Cluster {
            topic: None,
            shared_entities: BTreeSet::new(),
            items: vec![article_item("Lonely story", &[])],
        }];
        let html = DigestRenderer::generate(&clusters, &SourceCounts::default(), generated());
        assert!(!html.contains("class=\"topic-cluster\""));
        assert!(html.contains("Lonely story"));
        assert!(html.contains("0 topic clusters, 1 standalone items"));
    }

    #[test]
    fn test_generate_empty() {
        let html = DigestRenderer::generate(&[], &SourceCounts::default(), generated());
        assert!(html.contains("No content found."));
    }

    #[test]
    fn test_entity_tags_limited_to_five() {
        let entities: Vec<String> = (0..8).map(|i| format!("E{}", i)).collect();
        let refs: Vec<&str> = entities.iter().map(String::as_str).collect();
        let clusters = vec![Cluster {
            topic: Some("E0".to_string()),
            shared_entities: entities.iter().cloned().collect(),
            items: vec![article_item("a", &refs), article_item("b", &refs)],
        }];
        let html = DigestRenderer::generate(&clusters, &SourceCounts::default(), generated());
        assert_eq!(html.matches("class=\"entity-tag\"").count(), 5);
    }

    #[test]
    fn test_generate_post_and_thread() {
        let thread = Thread {
            username: "sama".to_string(),
            posts: vec![post("one https://a.com", 2), post("two", 3)],
        };
        let clusters = vec![
            Cluster {
                topic: None,
                shared_entities: BTreeSet::new(),
                items: vec![NormalizedItem {
                    title: "one".to_string(),
                    text: "one two".to_string(),
                    url: PLACEHOLDER_URL.to_string(),
                    source_label: "@sama".to_string(),
                    entities: BTreeSet::new(),
                    original: SourceRecord::Thread(thread),
                }],
            },
            Cluster {
                topic: None,
                shared_entities: BTreeSet::new(),
                items: vec![NormalizedItem {
                    title: "solo".to_string(),
                    text: "solo".to_string(),
                    url: PLACEHOLDER_URL.to_string(),
                    source_label: "@sama".to_string(),
                    entities: BTreeSet::new(),
                    original: SourceRecord::Post(post("solo", 9)),
                }],
            },
        ];

        let html = DigestRenderer::generate(&clusters, &SourceCounts::default(), generated());
        assert!(html.contains("Thread (2 posts)"));
        assert!(html.contains("<span title=\"Likes\">5 likes</span>"));
        assert!(html.contains("<span title=\"Retweets\">2 retweets</span>"));
        assert!(html.contains("<span title=\"Likes\">9 likes</span>"));
        assert!(html.contains("<span class=\"x-display-name\">Sam Altman</span>"));
        assert!(html.contains("Jan 15, 10:30"));
        assert!(html.contains("View on X"));
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Output.html");
        DigestRenderer::save("<html></html>", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<html></html>");
    }
}
