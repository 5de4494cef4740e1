use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::dictionary::EntityDictionary;
use crate::entities::Entity;
use crate::models::{Cluster, NormalizedItem};

pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 2;

/// Groups normalized items into topic clusters by shared entities.
///
/// Entities are visited from most to least shared. Each one claims the items
/// containing it that no earlier entity claimed, provided at least
/// `min_cluster_size` remain. Whatever is never claimed becomes a singleton.
pub struct TopicClusterer {
    min_cluster_size: usize,
    generic_topics: BTreeSet<Entity>,
}

impl TopicClusterer {
    pub fn new(dictionary: &EntityDictionary) -> Self {
        Self {
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            generic_topics: dictionary.generic_topics.clone(),
        }
    }

    /// Set the smallest number of items a topic cluster may hold.
    ///
    /// Values below 2 are raised to 2: a topic cluster of one item would be
    /// indistinguishable from a singleton, and every item would form its own.
    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.min_cluster_size = min_cluster_size.max(2);
        self
    }

    pub fn cluster(&self, items: Vec<NormalizedItem>) -> Vec<Cluster> {
        if items.is_empty() {
            return Vec::new();
        }

        let index = Self::build_index(&items);
        debug!(
            "Clustering started - items={}, entities={}",
            items.len(),
            index.len()
        );

        let mut claimed = vec![false; items.len()];
        // (topic, shared entities, member indices)
        let mut groups: Vec<(Entity, BTreeSet<Entity>, Vec<usize>)> = Vec::new();

        for (entity, indices) in &index {
            let available: Vec<usize> = indices.iter().copied().filter(|&i| !claimed[i]).collect();
            if available.len() < self.min_cluster_size {
                continue;
            }

            let mut shared = Self::intersect(available.iter().map(|&i| &items[i].entities));
            if shared.is_empty() {
                shared.insert(entity.clone());
            }

            let topic = self.pick_topic(entity, &shared);

            for &i in &available {
                claimed[i] = true;
            }
            groups.push((topic, shared, available));
        }

        debug!(
            "Clustering finished - clusters={}, claimed={}/{}",
            groups.len(),
            claimed.iter().filter(|&&c| c).count(),
            items.len()
        );

        // Move items out of the input exactly once
        let mut slots: Vec<Option<NormalizedItem>> = items.into_iter().map(Some).collect();

        let mut clusters: Vec<Cluster> = groups
            .into_iter()
            .map(|(topic, shared_entities, members)| Cluster {
                topic: Some(topic),
                shared_entities,
                items: members.into_iter().filter_map(|i| slots[i].take()).collect(),
            })
            .collect();

        clusters.sort_by(|a, b| {
            b.items
                .len()
                .cmp(&a.items.len())
                .then_with(|| a.topic.cmp(&b.topic))
        });

        // Singletons always trail every multi-item cluster, in input order
        clusters.extend(slots.into_iter().flatten().map(|item| Cluster {
            topic: None,
            shared_entities: item.entities.clone(),
            items: vec![item],
        }));

        clusters
    }

    /// Entity -> indices of items containing it, most shared entity first.
    /// Equal counts keep the order in which entities were first seen.
    fn build_index(items: &[NormalizedItem]) -> Vec<(Entity, Vec<usize>)> {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut index: Vec<(Entity, Vec<usize>)> = Vec::new();

        for (i, item) in items.iter().enumerate() {
            for entity in &item.entities {
                let slot = *positions.entry(entity.as_str()).or_insert_with(|| {
                    index.push((entity.clone(), Vec::new()));
                    index.len() - 1
                });
                index[slot].1.push(i);
            }
        }

        index.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        index
    }

    fn intersect<'a>(mut sets: impl Iterator<Item = &'a BTreeSet<Entity>>) -> BTreeSet<Entity> {
        let Some(first) = sets.next() else {
            return BTreeSet::new();
        };
        sets.fold(first.clone(), |acc, set| {
            acc.intersection(set).cloned().collect()
        })
    }

    /// Prefer a specific name (company, product, person) over a broad theme
    fn pick_topic(&self, seed: &Entity, shared: &BTreeSet<Entity>) -> Entity {
        shared
            .iter()
            .find(|e| !self.generic_topics.contains(e.as_str()))
            .unwrap_or(seed)
            .clone()
    }
}
