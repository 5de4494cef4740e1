use anyhow::Result;
use tracing::info;

use crate::clustering::TopicClusterer;
use crate::dictionary::EntityDictionary;
use crate::entities::EntityExtractor;
use crate::models::{Article, Cluster, NormalizedItem, Post};
use crate::normalizer::ItemNormalizer;
use crate::threads::ThreadDetector;

/// Turns fully collected articles and posts into the ordered cluster list
pub struct DigestBuilder {
    extractor: EntityExtractor,
    detector: ThreadDetector,
    clusterer: TopicClusterer,
}

impl DigestBuilder {
    pub fn new(dictionary: &EntityDictionary) -> Result<Self> {
        Ok(Self {
            extractor: EntityExtractor::new(dictionary)?,
            detector: ThreadDetector::default(),
            clusterer: TopicClusterer::new(dictionary),
        })
    }

    pub fn with_thread_minutes(mut self, minutes: i64) -> Result<Self> {
        self.detector = ThreadDetector::new(minutes)?;
        Ok(self)
    }

    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.clusterer = self.clusterer.with_min_cluster_size(min_cluster_size);
        self
    }

    /// Articles are normalized first, then posts after thread detection.
    /// The order is fixed so repeated runs cluster identically.
    pub fn build(&self, articles: Vec<Article>, posts: Vec<Post>) -> Vec<Cluster> {
        let normalizer = ItemNormalizer::new(&self.extractor);

        let article_count = articles.len();
        let mut items: Vec<NormalizedItem> = articles
            .into_iter()
            .map(|article| normalizer.normalize(article))
            .collect();

        let detected = self.detector.detect(posts);
        info!(
            "Normalizing {} articles and {} posts/threads",
            article_count,
            detected.len()
        );
        items.extend(detected.into_iter().map(|item| normalizer.normalize(item)));

        let clusters = self.clusterer.cluster(items);
        info!(
            "Built {} clusters ({} multi-item)",
            clusters.len(),
            clusters.iter().filter(|c| !c.is_singleton()).count()
        );
        clusters
    }
}
