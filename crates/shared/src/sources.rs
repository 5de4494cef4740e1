use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{info, warn};
use url::Url;

use crate::models::Article;

pub const TECHMEME_URL: &str = "https://www.techmeme.com/";
pub const TECHCRUNCH_AI_URL: &str = "https://techcrunch.com/category/artificial-intelligence/";

const TECHMEME_LIMIT: usize = 30;
const TECHCRUNCH_LIMIT: usize = 20;
const DESCRIPTION_MAX_CHARS: usize = 200;

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector '{}': {:?}", css, e))
}

/// Text of an element with each text node trimmed and joined
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Resolve a possibly relative link against the page it came from
fn absolute_url(base: &str, href: &str) -> String {
    if href.trim().is_empty() {
        return String::new();
    }
    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Parse the Techmeme front page: one article per story cluster
pub fn parse_techmeme(html: &str) -> Result<Vec<Article>> {
    let document = Html::parse_document(html);
    let cluster_sel = selector("div.clus")?;
    let headline_sel = selector("a.ourh")?;
    let cite_sel = selector("cite")?;
    let desc_sel = selector("div.st")?;

    let mut articles = Vec::new();
    for cluster in document.select(&cluster_sel).take(TECHMEME_LIMIT) {
        let Some(link) = cluster.select(&headline_sel).next() else {
            continue;
        };

        let source = cluster
            .select(&cite_sel)
            .next()
            .map(|c| element_text(&c))
            .unwrap_or_else(|| "Unknown".to_string());

        let description = cluster
            .select(&desc_sel)
            .next()
            .map(|d| truncate_chars(&element_text(&d), DESCRIPTION_MAX_CHARS))
            .unwrap_or_default();

        articles.push(Article {
            headline: element_text(&link),
            description,
            url: absolute_url(TECHMEME_URL, link.value().attr("href").unwrap_or("")),
            source,
        });
    }

    Ok(articles)
}

/// Parse the TechCrunch AI category page
pub fn parse_techcrunch(html: &str) -> Result<Vec<Article>> {
    let document = Html::parse_document(html);
    let heading_sel = selector("h2, h3")?;
    let link_sel = selector("a")?;
    let para_sel = selector("p")?;
    let author_sel = selector(r#"a[rel="author"]"#)?;
    let author_href_sel = selector(r#"a[href*="/author/"]"#)?;

    let mut articles = Vec::new();
    let mut seen_urls = HashSet::new();

    for heading in document.select(&heading_sel) {
        let Some(link) = heading.select(&link_sel).next() else {
            continue;
        };

        let headline = element_text(&link);
        let url = absolute_url(TECHCRUNCH_AI_URL, link.value().attr("href").unwrap_or(""));
        if headline.is_empty() || !seen_urls.insert(url.clone()) {
            continue;
        }

        let container = heading
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| matches!(el.value().name(), "div" | "article"));

        let mut description = String::new();
        let mut author = String::new();
        if let Some(container) = container {
            if let Some(p) = container.select(&para_sel).next() {
                description = truncate_chars(&element_text(&p), DESCRIPTION_MAX_CHARS);
            }
            if let Some(a) = container
                .select(&author_sel)
                .next()
                .or_else(|| container.select(&author_href_sel).next())
            {
                author = element_text(&a);
            }
        }

        let source = if author.is_empty() {
            "TechCrunch".to_string()
        } else {
            format!("TechCrunch - {}", author)
        };

        articles.push(Article {
            headline,
            description,
            url,
            source,
        });

        if articles.len() >= TECHCRUNCH_LIMIT {
            break;
        }
    }

    Ok(articles)
}

/// Fetches the headline sources over HTTP
pub struct SourceFetcher {
    client: Client,
}

impl SourceFetcher {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        for attempt in 0..3 {
            match self.try_fetch_page(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if attempt == 2 {
                        return Err(e.context(format!("Failed to fetch {}", url)));
                    }
                    warn!("Fetch attempt {} for {} failed: {}", attempt + 1, url, e);
                    let backoff = std::time::Duration::from_millis(500 * (2_u64.pow(attempt)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        anyhow::bail!("Failed to fetch {}", url)
    }

    async fn try_fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send HTTP request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status);
        }

        response.text().await.context("Failed to read response body")
    }

    pub async fn fetch_techmeme(&self) -> Result<Vec<Article>> {
        let html = self.fetch_page(TECHMEME_URL).await?;
        let articles = parse_techmeme(&html)?;
        info!("Fetched {} articles from Techmeme", articles.len());
        Ok(articles)
    }

    pub async fn fetch_techcrunch(&self) -> Result<Vec<Article>> {
        let html = self.fetch_page(TECHCRUNCH_AI_URL).await?;
        let articles = parse_techcrunch(&html)?;
        info!("Fetched {} articles from TechCrunch AI category", articles.len());
        Ok(articles)
    }

    /// Fetch both sources concurrently. A source that fails contributes no
    /// articles instead of failing the run.
    pub async fn fetch_all(&self) -> (Vec<Article>, Vec<Article>) {
        let (techmeme, techcrunch) =
            futures::join!(self.fetch_techmeme(), self.fetch_techcrunch());

        let techmeme = techmeme.unwrap_or_else(|e| {
            warn!("Error fetching Techmeme: {:#}", e);
            Vec::new()
        });
        let techcrunch = techcrunch.unwrap_or_else(|e| {
            warn!("Error fetching TechCrunch: {:#}", e);
            Vec::new()
        });

        (techmeme, techcrunch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TECHMEME_FIXTURE: &str = r#"
        <html><body>
          <div class="clus">
            <cite>The Verge:</cite>
            <a class="ourh" href="https://example.com/openai">OpenAI launches a <b>new</b> model</a>
            <div class="st">OpenAI said on Monday that its newest model is faster.</div>
          </div>
          <div class="clus">
            <a class="ourh" href="/story/relative">Relative link story</a>
          </div>
          <div class="clus">
            <span>No headline here</span>
          </div>
        </body></html>
    "#;

    const TECHCRUNCH_FIXTURE: &str = r#"
        <html><body>
          <article>
            <h2><a href="https://techcrunch.com/2024/01/15/anthropic/">Anthropic raises money</a></h2>
            <p>The company behind Claude closed a new round.</p>
            <a rel="author" href="https://techcrunch.com/author/jane/">Jane Doe</a>
          </article>
          <div>
            <h3><a href="https://techcrunch.com/2024/01/15/anthropic/">Anthropic raises money</a></h3>
          </div>
          <div>
            <h3><a href="https://techcrunch.com/2024/01/15/mistral/">Mistral ships</a></h3>
            <a href="https://techcrunch.com/author/john/">John Roe</a>
          </div>
          <div>
            <h2><a href="https://techcrunch.com/empty/"> </a></h2>
          </div>
          <h2>Heading without link</h2>
        </body></html>
    "#;

    #[test]
    fn test_parse_techmeme() {
        let articles = parse_techmeme(TECHMEME_FIXTURE).unwrap();
        assert_eq!(articles.len(), 2);

        assert_eq!(articles[0].headline, "OpenAI launches a new model");
        assert_eq!(articles[0].source, "The Verge:");
        assert_eq!(articles[0].url, "https://example.com/openai");
        assert!(articles[0].description.starts_with("OpenAI said on Monday"));

        assert_eq!(articles[1].source, "Unknown");
        assert_eq!(articles[1].url, "https://www.techmeme.com/story/relative");
        assert_eq!(articles[1].description, "");
    }

    #[test]
    fn test_parse_techmeme_truncates_description() {
        let html = format!(
            r#"<div class="clus"><a class="ourh" href="/x">H</a><div class="st">{}</div></div>"#,
            "d".repeat(500)
        );
        let articles = parse_techmeme(&html).unwrap();
        assert_eq!(articles[0].description.chars().count(), 200);
    }

    #[test]
    fn test_parse_techcrunch() {
        let articles = parse_techcrunch(TECHCRUNCH_FIXTURE).unwrap();
        assert_eq!(articles.len(), 2);

        assert_eq!(articles[0].headline, "Anthropic raises money");
        assert_eq!(articles[0].source, "TechCrunch - Jane Doe");
        assert_eq!(
            articles[0].description,
            "The company behind Claude closed a new round."
        );

        assert_eq!(articles[1].headline, "Mistral ships");
        assert_eq!(articles[1].source, "TechCrunch - John Roe");
        assert_eq!(articles[1].description, "");
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url(TECHMEME_URL, "/a/b"),
            "https://www.techmeme.com/a/b"
        );
        assert_eq!(
            absolute_url(TECHMEME_URL, "https://other.com/x"),
            "https://other.com/x"
        );
        assert_eq!(absolute_url(TECHMEME_URL, ""), "");
    }
}
