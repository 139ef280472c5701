//! On-disk cache of generated insights.
//!
//! Entries live under `<cache_dir>/insights/` as small TOML files named by a
//! hash of everything that shapes the result: provider, model, prompt
//! template and the input text. Cache failures never block analysis.

use crate::config::AnalysisProvider;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(serde::Serialize, serde::Deserialize)]
struct CacheEntry {
    provider: String,
    model: String,
    insight: String,
}

/// Identifies one analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightKey {
    pub provider: AnalysisProvider,
    pub model: String,
    hash: String,
}

impl InsightKey {
    pub fn new(provider: AnalysisProvider, model: &str, template: &str, text: &str) -> Self {
        let provider_label = provider.to_string();
        let mut hasher = Sha256::new();
        for part in [provider_label.as_str(), model, template, text] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self {
            provider,
            model: model.to_string(),
            hash: format!("{:x}", hasher.finalize()),
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

pub fn insights_dir(cache_dir: &Path) -> PathBuf {
    cache_dir.join("insights")
}

fn entry_path(cache_dir: &Path, key: &InsightKey) -> PathBuf {
    insights_dir(cache_dir).join(format!("{}.toml", key.hash))
}

/// Load a cached insight, if present and readable.
pub fn load_insight(cache_dir: &Path, key: &InsightKey) -> Option<String> {
    let path = entry_path(cache_dir, key);
    let data = fs::read_to_string(&path).ok()?;
    let entry: CacheEntry = match toml::from_str(&data) {
        Ok(entry) => entry,
        Err(err) => {
            warn!(path = %path.display(), "Ignoring unreadable insight cache entry: {err}");
            return None;
        }
    };
    if entry.insight.trim().is_empty() {
        return None;
    }
    debug!(path = %path.display(), "Insight cache hit");
    Some(entry.insight)
}

/// Persist an insight. Errors are logged and otherwise ignored.
pub fn save_insight(cache_dir: &Path, key: &InsightKey, insight: &str) {
    let path = entry_path(cache_dir, key);
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            warn!("Failed to create insight cache dir: {err}");
            return;
        }
    }
    let entry = CacheEntry {
        provider: key.provider.to_string(),
        model: key.model.clone(),
        insight: insight.to_string(),
    };
    match toml::to_string(&entry) {
        Ok(contents) => match fs::File::create(&path) {
            Ok(mut file) => {
                if let Err(err) = file.write_all(contents.as_bytes()) {
                    warn!(path = %path.display(), "Failed to write insight cache: {err}");
                } else {
                    debug!(path = %path.display(), "Cached insight");
                }
            }
            Err(err) => warn!(path = %path.display(), "Failed to create insight cache file: {err}"),
        },
        Err(err) => warn!("Failed to serialize insight cache entry: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str) -> InsightKey {
        InsightKey::new(AnalysisProvider::Gemini, "model-a", "Explain {text}", text)
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let key = key("some article text");

        assert_eq!(load_insight(dir.path(), &key), None);
        save_insight(dir.path(), &key, "## Summary\nMultiline \"quoted\" insight.");

        assert_eq!(
            load_insight(dir.path(), &key).as_deref(),
            Some("## Summary\nMultiline \"quoted\" insight.")
        );
        assert!(insights_dir(dir.path()).join(format!("{}.toml", key.hash())).exists());
    }

    #[test]
    fn key_changes_with_every_input() {
        let base = key("text");
        assert_eq!(base, key("text"));
        assert_ne!(base.hash(), key("text!").hash());
        assert_ne!(
            base.hash(),
            InsightKey::new(AnalysisProvider::OpenAi, "model-a", "Explain {text}", "text").hash()
        );
        assert_ne!(
            base.hash(),
            InsightKey::new(AnalysisProvider::Gemini, "model-b", "Explain {text}", "text").hash()
        );
        assert_ne!(
            base.hash(),
            InsightKey::new(AnalysisProvider::Gemini, "model-a", "Other {text}", "text").hash()
        );
    }

    #[test]
    fn corrupt_entries_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let key = key("text");
        fs::create_dir_all(insights_dir(dir.path())).expect("mkdir");
        fs::write(entry_path(dir.path(), &key), "not = [valid").expect("write");

        assert_eq!(load_insight(dir.path(), &key), None);
    }

    #[test]
    fn unwritable_cache_dir_is_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").expect("write");

        save_insight(&blocker, &key("text"), "insight");

        assert_eq!(load_insight(&blocker, &key("text")), None);
    }
}
