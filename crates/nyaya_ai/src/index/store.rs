use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use nyaya_core::domain::{now_rfc3339_utc, Passage, ScoredPassage};
use nyaya_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::similarity::{l2_norm, relevance};
use super::{DocumentIndex, MetadataFilter};
use crate::embeddings::Embedder;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexStatus {
    pub ready: bool,
    pub model: Option<String>,
    pub dims: Option<u32>,
    pub passage_count: u32,
    pub updated_at: Option<String>,
}

impl IndexStatus {
    fn not_ready() -> Self {
        Self {
            ready: false,
            model: None,
            dims: None,
            passage_count: 0,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestSummary {
    pub added: u32,
    pub reused: u32,
    pub removed: u32,
    pub status: IndexStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPassage {
    passage: Passage,
    vector: Vec<f32>,
}

#[derive(Debug, Clone)]
struct Entry {
    passage: Passage,
    vector: Vec<f32>,
    norm: f32,
}

#[derive(Debug)]
struct Snapshot {
    status: IndexStatus,
    entries: Vec<Entry>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            status: IndexStatus::not_ready(),
            entries: Vec::new(),
        }
    }
}

/// On-disk vector index over passages.
///
/// Queries read an immutable snapshot. `ingest` builds a complete replacement,
/// persists it, and only then swaps it in, so concurrent readers see either the
/// old index or the new one.
pub struct VectorIndex {
    root: PathBuf,
    embedder: Arc<dyn Embedder>,
    model: String,
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

impl VectorIndex {
    pub fn open(root: PathBuf, embedder: Arc<dyn Embedder>, model: &str) -> Result<Self, AppError> {
        let snapshot = load_snapshot(&root, model)?;
        tracing::debug!(
            root = %root.display(),
            ready = snapshot.status.ready,
            passages = snapshot.entries.len(),
            "opened vector index"
        );
        Ok(Self {
            root,
            embedder,
            model: model.to_string(),
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        })
    }

    pub fn status(&self) -> Result<IndexStatus, AppError> {
        Ok(self.snapshot()?.status.clone())
    }

    fn snapshot(&self) -> Result<Arc<Snapshot>, AppError> {
        self.current
            .read()
            .map(|s| Arc::clone(&*s))
            .map_err(|_| AppError::new("INDEX_UNAVAILABLE", "Index lock was poisoned"))
    }

    /// Adds passages to the index. Passages already indexed keep their vectors;
    /// any earlier passages from a source present in `passages` that are no
    /// longer part of it are dropped.
    pub fn ingest(&self, passages: &[Passage]) -> Result<IngestSummary, AppError> {
        let _guard = self
            .writer
            .lock()
            .map_err(|_| AppError::new("INDEX_BUILD_FAILED", "Index writer lock was poisoned"))?;

        let base = self.snapshot()?;
        let batch_ids: HashSet<&str> = passages.iter().map(|p| p.id.as_str()).collect();
        let batch_sources: HashSet<&str> = passages.iter().map(|p| p.source.as_str()).collect();

        let mut entries: Vec<Entry> = Vec::new();
        let mut removed = 0u32;
        if base.status.ready {
            for e in base.entries.iter() {
                if batch_sources.contains(e.passage.source.as_str())
                    && !batch_ids.contains(e.passage.id.as_str())
                {
                    removed += 1;
                } else {
                    entries.push(e.clone());
                }
            }
        }
        let mut known: HashSet<String> = entries.iter().map(|e| e.passage.id.clone()).collect();
        let mut dims: Option<u32> = if base.status.ready { base.status.dims } else { None };

        let mut added = 0u32;
        let mut reused = 0u32;
        for p in passages {
            if known.contains(&p.id) {
                reused += 1;
                continue;
            }
            let vector = self.embedder.embed(&self.model, &p.content).map_err(|e| {
                AppError::new("INDEX_BUILD_FAILED", "Failed to compute embeddings")
                    .with_details(format!("passage_id={}; err={}", p.id, e))
                    .with_retryable(e.retryable)
            })?;
            let this_dims = vector.len() as u32;
            match dims {
                Some(d) if d != this_dims => {
                    return Err(AppError::new(
                        "INDEX_BUILD_FAILED",
                        "Embedding dimension mismatch across passages",
                    )
                    .with_details(format!(
                        "expected={d}; got={this_dims}; passage_id={}",
                        p.id
                    )));
                }
                Some(_) => {}
                None => dims = Some(this_dims),
            }
            let norm = l2_norm(&vector);
            if norm == 0.0 {
                tracing::warn!(
                    passage_id = %p.id,
                    source = %p.source,
                    "skipping passage with zero embedding"
                );
                continue;
            }
            known.insert(p.id.clone());
            entries.push(Entry {
                passage: p.clone(),
                vector,
                norm,
            });
            added += 1;
        }

        if entries.is_empty() {
            return Err(AppError::new("INDEX_BUILD_FAILED", "No passages to index"));
        }

        let status = IndexStatus {
            ready: true,
            model: Some(self.model.clone()),
            dims,
            passage_count: entries.len() as u32,
            updated_at: Some(now_rfc3339_utc()?),
        };

        let stored: Vec<StoredPassage> = entries
            .iter()
            .map(|e| StoredPassage {
                passage: e.passage.clone(),
                vector: e.vector.clone(),
            })
            .collect();
        fs::create_dir_all(&self.root).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to create index directory")
                .with_details(format!("path={}; err={}", self.root.display(), e))
        })?;
        // Passages first: a status file always describes a complete passage file.
        write_json_atomic(&passages_path(&self.root), &stored, "index passages")?;
        write_json_atomic(&status_path(&self.root), &status, "index status")?;

        let mut current = self
            .current
            .write()
            .map_err(|_| AppError::new("INDEX_BUILD_FAILED", "Index lock was poisoned"))?;
        *current = Arc::new(Snapshot {
            status: status.clone(),
            entries,
        });
        drop(current);

        tracing::info!(added, reused, removed, passages = status.passage_count, "index updated");
        Ok(IngestSummary {
            added,
            reused,
            removed,
            status,
        })
    }
}

impl DocumentIndex for VectorIndex {
    fn similarity_search(
        &self,
        query_text: &str,
        k: usize,
        restrict_to: Option<&HashSet<String>>,
    ) -> Result<Vec<ScoredPassage>, AppError> {
        let snap = self.snapshot()?;
        if !snap.status.ready || snap.entries.is_empty() {
            return Err(AppError::new(
                "INDEX_UNAVAILABLE",
                "Index not ready; ingest documents before querying",
            ));
        }
        let model = snap.status.model.as_deref().unwrap_or(self.model.as_str());

        let qv = self.embedder.embed(model, query_text)?;
        if let Some(dims) = snap.status.dims {
            if qv.len() as u32 != dims {
                return Err(AppError::new(
                    "INDEX_UNAVAILABLE",
                    "Query embedding dims do not match index dims",
                )
                .with_details(format!("index_dims={dims}; query_dims={}", qv.len())));
            }
        }
        let qnorm = l2_norm(&qv);
        if qnorm == 0.0 {
            return Err(AppError::new("INDEX_UNAVAILABLE", "Query embedding norm is zero"));
        }

        let mut scored: Vec<(usize, f32)> = snap
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| restrict_to.map_or(true, |ids| ids.contains(&e.passage.id)))
            .map(|(i, e)| (i, relevance(&qv, &e.vector, qnorm, e.norm)))
            .collect();
        // Stable: equal scores keep storage order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredPassage {
                passage: snap.entries[i].passage.clone(),
                score,
            })
            .collect())
    }

    fn ids_by_metadata(&self, filter: &MetadataFilter) -> Result<Vec<String>, AppError> {
        let snap = self.snapshot()?;
        if !snap.status.ready {
            return Err(AppError::new(
                "INDEX_UNAVAILABLE",
                "Index not ready; ingest documents before querying",
            ));
        }
        Ok(snap
            .entries
            .iter()
            .filter(|e| filter.matches(&e.passage))
            .map(|e| e.passage.id.clone())
            .collect())
    }
}

fn status_path(root: &Path) -> PathBuf {
    root.join("index_status.json")
}

fn passages_path(root: &Path) -> PathBuf {
    root.join("index_passages.json")
}

fn load_snapshot(root: &Path, model: &str) -> Result<Snapshot, AppError> {
    let status_file = status_path(root);
    if !status_file.exists() {
        return Ok(Snapshot::empty());
    }
    let status: IndexStatus = read_json(&status_file, "index status")?;
    if !status.ready {
        return Ok(Snapshot::empty());
    }
    if status.model.as_deref() != Some(model) {
        tracing::warn!(
            indexed_model = ?status.model,
            configured_model = model,
            "index was built with a different embedding model; re-ingest required"
        );
        return Ok(Snapshot::empty());
    }

    let stored: Vec<StoredPassage> = read_json(&passages_path(root), "index passages")?;
    if stored.len() as u32 != status.passage_count {
        tracing::warn!(
            expected = status.passage_count,
            found = stored.len(),
            "index passage file does not match status; re-ingest required"
        );
        return Ok(Snapshot::empty());
    }

    let entries = stored
        .into_iter()
        .map(|s| Entry {
            norm: l2_norm(&s.vector),
            passage: s.passage,
            vector: s.vector,
        })
        .collect();
    Ok(Snapshot { status, entries })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T, AppError> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::new("INDEX_UNAVAILABLE", format!("Failed to read {what}"))
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::new("INDEX_UNAVAILABLE", format!("Failed to decode {what}"))
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<(), AppError> {
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_vec(value).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", format!("Failed to encode {what}"))
            .with_details(e.to_string())
    })?;
    fs::write(&tmp, json).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", format!("Failed to write {what}"))
            .with_details(format!("path={}; err={}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", format!("Failed to finalize {what} write"))
            .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
    })?;
    Ok(())
}
