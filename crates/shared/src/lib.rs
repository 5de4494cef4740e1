// Public modules
pub mod briefing;
pub mod clustering;
pub mod config;
pub mod dictionary;
pub mod entities;
pub mod filters;
pub mod io;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod posts;
pub mod sources;
pub mod threads;

// Re-export commonly used types
pub use briefing::DigestRenderer;
pub use clustering::TopicClusterer;
pub use config::Config;
pub use dictionary::EntityDictionary;
pub use entities::{Entity, EntityExtractor};
pub use filters::{filter_posts_by_accounts, filter_posts_by_recency, read_accounts, AiKeywordFilter};
pub use io::{get_default_digest_dir, list_digest_files, load_digest, save_digest};
pub use models::{
    Article, Cluster, DigestData, ItemKind, NormalizedItem, Post, PostMetrics, SourceCounts,
    SourceRecord, Thread,
};
pub use normalizer::ItemNormalizer;
pub use pipeline::DigestBuilder;
pub use posts::load_posts;
pub use sources::SourceFetcher;
pub use threads::{DetectedItem, ThreadDetector};
