use anyhow::{Context, Result};
use chrono::{Duration, Local, Utc};
use clap::Parser;
use shared::{
    filter_posts_by_accounts, filter_posts_by_recency, load_posts, read_accounts,
    AiKeywordFilter, Article, Config, DigestBuilder, DigestData, DigestRenderer,
    EntityDictionary, Post, SourceCounts, SourceFetcher,
};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(name = "collect-news")]
#[command(about = "Collect AI news headlines and X posts into a topic-clustered HTML digest")]
struct Args {
    /// JSON file of X posts
    #[arg(short = 'x', long = "x-posts")]
    x_posts: Option<PathBuf>,

    /// File with one X account per line
    #[arg(short, long)]
    accounts: Option<PathBuf>,

    /// Print the accounts to fetch and exit
    #[arg(long)]
    list_accounts: bool,

    /// Output HTML file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON dictionary overriding the built-in entities
    #[arg(long)]
    dictionary: Option<PathBuf>,

    /// Drop posts older than this many hours
    #[arg(long)]
    max_age_hours: Option<i64>,

    /// Maximum gap between posts of one thread, in minutes
    #[arg(long)]
    thread_minutes: Option<i64>,

    /// Minimum items for a topic cluster
    #[arg(long)]
    min_cluster_size: Option<usize>,

    /// Skip fetching Techmeme and TechCrunch
    #[arg(long)]
    offline: bool,
}

impl Args {
    /// Apply command-line overrides on top of `config` and re-check ranges
    fn apply(self, mut config: Config) -> Result<(Config, bool, bool)> {
        if let Some(path) = self.x_posts {
            config.posts_file = path;
        }
        if let Some(path) = self.accounts {
            config.accounts_file = path;
        }
        if let Some(path) = self.output {
            config.output = path;
        }
        if self.dictionary.is_some() {
            config.dictionary = self.dictionary;
        }
        if let Some(hours) = self.max_age_hours {
            config.max_age_hours = hours;
        }
        if let Some(minutes) = self.thread_minutes {
            config.thread_minutes = minutes;
        }
        if let Some(size) = self.min_cluster_size {
            config.min_cluster_size = size;
        }
        config.validate().context("Invalid command-line option")?;
        Ok((config, self.list_accounts, self.offline))
    }
}

fn load_dictionary(path: Option<&Path>) -> Result<EntityDictionary> {
    match path {
        Some(path) => EntityDictionary::from_path(path),
        None => Ok(EntityDictionary::default()),
    }
}

fn load_accounts(path: &Path) -> Vec<String> {
    if !path.exists() {
        println!("⚠ Accounts file {} not found; keeping posts from every account", path.display());
        return Vec::new();
    }
    match read_accounts(path) {
        Ok(accounts) => accounts,
        Err(e) => {
            println!("⚠ {:#}", e);
            Vec::new()
        }
    }
}

async fn fetch_articles(dictionary: &EntityDictionary) -> Result<(Vec<Article>, Vec<Article>)> {
    println!("\n📰 Fetching headlines from Techmeme and TechCrunch...");
    let fetcher = SourceFetcher::new()?;
    let (techmeme, techcrunch) = fetcher.fetch_all().await;

    let ai_filter = AiKeywordFilter::new(&dictionary.ai_keywords)?;
    let techmeme_total = techmeme.len();
    let techmeme = ai_filter.filter_articles(techmeme);

    println!(
        "✓ Techmeme: {} AI articles (of {} headlines)",
        techmeme.len(),
        techmeme_total
    );
    println!("✓ TechCrunch AI: {} articles", techcrunch.len());

    Ok((techmeme, techcrunch))
}

fn collect_posts(config: &Config, dictionary: &EntityDictionary) -> Result<Vec<Post>> {
    println!("\n🐦 Loading X posts from {}...", config.posts_file.display());
    if !config.posts_file.exists() {
        println!("⚠ Posts file not found; continuing without X posts");
        return Ok(Vec::new());
    }

    let posts = load_posts(&config.posts_file, dictionary)?;
    println!("✓ Loaded {} posts", posts.len());

    let max_age = Duration::try_hours(config.max_age_hours).with_context(|| {
        format!("Max age of {} hours is out of range", config.max_age_hours)
    })?;
    let (posts, dropped) = filter_posts_by_recency(posts, max_age, Utc::now());
    if dropped > 0 {
        println!(
            "✓ Dropped {} posts older than {} hours",
            dropped, config.max_age_hours
        );
    }

    let accounts = load_accounts(&config.accounts_file);
    let filtered = filter_posts_by_accounts(posts, &accounts);
    if !accounts.is_empty() {
        println!(
            "✓ {} posts from {}/{} accounts",
            filtered.posts.len(),
            filtered.found.len(),
            accounts.len()
        );
        if !filtered.missing.is_empty() {
            println!("\n⚠ No recent posts from {} accounts:", filtered.missing.len());
            for account in &filtered.missing {
                println!("  ✗ @{}", account);
            }
        }
    }

    Ok(filtered.posts)
}

#[tokio::main]
async fn main() -> Result<()> {
    shared::logging::init_logging();

    let args = Args::parse();
    let (config, list_accounts, offline) = args.apply(Config::from_env()?)?;
    debug!("Configuration: {:?}", config);

    if list_accounts {
        let accounts = read_accounts(&config.accounts_file)?;
        println!("Accounts in {}:", config.accounts_file.display());
        for account in &accounts {
            println!("  @{}", account);
        }
        println!("\n{} accounts", accounts.len());
        return Ok(());
    }

    let dictionary = load_dictionary(config.dictionary.as_deref())
        .context("Failed to load entity dictionary")?;

    let (techmeme, techcrunch) = if offline {
        println!("\n📴 Offline: skipping headline sources");
        (Vec::new(), Vec::new())
    } else {
        fetch_articles(&dictionary).await?
    };

    let posts = collect_posts(&config, &dictionary)?;

    let counts = SourceCounts {
        techmeme: techmeme.len(),
        techcrunch: techcrunch.len(),
        posts: posts.len(),
    };

    println!("\n🔗 Clustering {} items by topic...", counts.total());
    let builder = DigestBuilder::new(&dictionary)?
        .with_thread_minutes(config.thread_minutes)?
        .with_min_cluster_size(config.min_cluster_size);

    let mut articles = techmeme;
    articles.extend(techcrunch);
    let clusters = builder.build(articles, posts);

    let multi = clusters.iter().filter(|c| !c.is_singleton()).count();
    println!(
        "✓ Organized into {} topic clusters and {} standalone items",
        multi,
        clusters.len() - multi
    );

    println!("\n📝 Generating HTML digest...");
    let html = DigestRenderer::generate(&clusters, &counts, Local::now());
    DigestRenderer::save(&html, &config.output).context("Failed to save HTML digest")?;
    println!("✓ HTML saved to: {}", config.output.display());

    let data = DigestData::new(counts, clusters);
    let digest_path = shared::save_digest(&data).context("Failed to save digest data")?;
    println!("✓ Digest data saved to: {}", digest_path.display());

    println!(
        "\n✅ Done! {} items ({} Techmeme, {} TechCrunch, {} X posts)",
        counts.total(),
        counts.techmeme,
        counts.techcrunch,
        counts.posts
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(args: &[&str]) -> Result<(Config, bool, bool)> {
        Args::try_parse_from(args)?.apply(Config::default())
    }

    #[test]
    fn test_apply_overrides() {
        let (config, list_accounts, offline) = apply(&[
            "collect-news",
            "-x",
            "posts.json",
            "--thread-minutes",
            "5",
            "--max-age-hours",
            "48",
            "--offline",
        ])
        .unwrap();
        assert_eq!(config.posts_file, PathBuf::from("posts.json"));
        assert_eq!(config.thread_minutes, 5);
        assert_eq!(config.max_age_hours, 48);
        assert!(!list_accounts);
        assert!(offline);
    }

    #[test]
    fn test_apply_rejects_out_of_range_numbers() {
        assert!(apply(&["collect-news", "--thread-minutes", "9223372036854775807"]).is_err());
        assert!(apply(&["collect-news", "--max-age-hours", "3000000000"]).is_err());
        assert!(apply(&["collect-news", "--max-age-hours=-1"]).is_err());
    }
}
