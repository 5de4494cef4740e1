use anyhow::{Context, Result};
use chrono::DateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::DigestData;

pub const DIGEST_VERSION: &str = "1.0";

/// Get the default directory for storing digest files
pub fn get_default_digest_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .context("Could not determine local data directory")?
        .join("ai-news-digest")
        .join("digests");

    fs::create_dir_all(&data_dir).context("Failed to create digests directory")?;

    Ok(data_dir)
}

/// File name for a digest created now, e.g. `digest-2024-01-15-093000.json`
pub fn digest_filename() -> String {
    format!("digest-{}.json", chrono::Local::now().format("%Y-%m-%d-%H%M%S"))
}

/// Save digest data to the default directory
pub fn save_digest(data: &DigestData) -> Result<PathBuf> {
    let dir = get_default_digest_dir()?;
    save_digest_to(&dir, data, &digest_filename())
}

pub fn save_digest_to(dir: &Path, data: &DigestData, filename: &str) -> Result<PathBuf> {
    let filepath = dir.join(filename);

    let json = serde_json::to_string_pretty(data).context("Failed to serialize digest data")?;

    fs::write(&filepath, json).context("Failed to write digest file")?;

    Ok(filepath)
}

/// Load digest data from a JSON file
pub fn load_digest(filepath: &Path) -> Result<DigestData> {
    if !filepath.exists() {
        anyhow::bail!("Digest file not found: {}", filepath.display());
    }

    let content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read digest file: {}", filepath.display()))?;

    let data: DigestData = serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse digest JSON from {}. The file may be corrupted or not a valid digest file.",
            filepath.display()
        )
    })?;

    if data.version != DIGEST_VERSION {
        anyhow::bail!(
            "Unsupported digest file version: {}. Expected {}. Please regenerate the digest with collect-news.",
            data.version,
            DIGEST_VERSION
        );
    }

    Ok(data)
}

/// List digest files in the default directory, newest first
pub fn list_digest_files() -> Result<Vec<(PathBuf, DigestData)>> {
    let dir = get_default_digest_dir()?;
    list_digest_files_in(&dir)
}

pub fn list_digest_files_in(dir: &Path) -> Result<Vec<(PathBuf, DigestData)>> {
    let mut files = Vec::new();

    if dir.exists() {
        for entry in fs::read_dir(dir).context("Failed to read digests directory")? {
            let path = entry?.path();

            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                match load_digest(&path) {
                    Ok(data) => files.push((path, data)),
                    Err(e) => warn!("Could not load {}: {:#}", path.display(), e),
                }
            }
        }
    }

    files.sort_by(|a, b| {
        let time_a = DateTime::parse_from_rfc3339(&a.1.created_at).ok();
        let time_b = DateTime::parse_from_rfc3339(&b.1.created_at).ok();
        time_b.cmp(&time_a)
    });

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, Cluster, NormalizedItem, SourceCounts, SourceRecord};
    use std::collections::BTreeSet;

    fn sample_digest(created_at: &str) -> DigestData {
        let article = Article {
            headline: "OpenAI ships".to_string(),
            description: String::new(),
            url: "https://example.com".to_string(),
            source: "Example".to_string(),
        };
        let item = NormalizedItem {
            title: article.headline.clone(),
            text: article.headline.clone(),
            url: article.url.clone(),
            source_label: article.source.clone(),
            entities: ["OpenAI".to_string()].into_iter().collect(),
            original: SourceRecord::Article(article),
        };
        let mut data = DigestData::new(
            SourceCounts {
                techmeme: 1,
                techcrunch: 0,
                posts: 0,
            },
            vec![Cluster {
                topic: None,
                shared_entities: BTreeSet::new(),
                items: vec![item],
            }],
        );
        data.created_at = created_at.to_string();
        data
    }

    #[test]
    fn test_save_and_load_digest() {
        let dir = tempfile::tempdir().unwrap();
        let data = sample_digest("2024-01-15T10:00:00+00:00");

        let path = save_digest_to(dir.path(), &data, "digest-test.json").unwrap();
        let loaded = load_digest(&path).unwrap();

        assert_eq!(loaded.version, "1.0");
        assert_eq!(loaded.counts, data.counts);
        assert_eq!(loaded.clusters, data.clusters);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_digest(Path::new("/no/such/digest.json")).unwrap_err();
        assert!(err.to_string().contains("Digest file not found"));
    }

    #[test]
    fn test_load_rejects_bad_json_and_version() {
        let dir = tempfile::tempdir().unwrap();

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        assert!(load_digest(&bad).is_err());

        let mut data = sample_digest("2024-01-15T10:00:00+00:00");
        data.version = "0.9".to_string();
        let old = save_digest_to(dir.path(), &data, "old.json").unwrap();
        let err = load_digest(&old).unwrap_err();
        assert!(err.to_string().contains("Unsupported digest file version"));
    }

    #[test]
    fn test_list_newest_first_skips_invalid() {
        let dir = tempfile::tempdir().unwrap();
        save_digest_to(dir.path(), &sample_digest("2024-01-14T10:00:00+00:00"), "a.json").unwrap();
        save_digest_to(dir.path(), &sample_digest("2024-01-16T10:00:00+00:00"), "b.json").unwrap();
        fs::write(dir.path().join("broken.json"), "[]").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = list_digest_files_in(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].0.ends_with("b.json"));
        assert!(files[1].0.ends_with("a.json"));
    }

    #[test]
    fn test_digest_filename_shape() {
        let name = digest_filename();
        assert!(name.starts_with("digest-"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "digest-2024-01-15-093000.json".len());
    }
}
