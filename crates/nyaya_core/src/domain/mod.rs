//! Records exchanged between ingestion, the index, the orchestrator and the
//! presentation surface.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::AppError;

/// Source marker used in `AnswerRecord::sources` when evidence came from the web.
pub const WEB_SOURCE_MARKER: &str = "web";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Kannada,
}

impl Language {
    /// ISO 639-1 code, as stored in passage metadata.
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Kannada => "kn",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Kannada => "Kannada",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "kn" | "kannada" => Ok(Language::Kannada),
            other => Err(AppError::new(
                "LANGUAGE_UNSUPPORTED",
                "Language must be English or Kannada",
            )
            .with_details(format!("language={other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegionMetadata {
    pub taluk: String,
    pub pincode: String,
}

impl Default for RegionMetadata {
    fn default() -> Self {
        Self {
            taluk: "unknown".to_string(),
            pincode: "unknown".to_string(),
        }
    }
}

/// An indexed chunk of a legal document. Immutable after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passage {
    pub id: String,
    pub content: String,
    pub source: String,
    pub language: Language,
    pub region: RegionMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

/// Candidates returned by the retrieval gate, best first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    hits: Vec<ScoredPassage>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Orders hits by descending score. The sort is stable, so equal scores
    /// keep the order the index returned them in.
    pub fn from_hits(mut hits: Vec<ScoredPassage>) -> Self {
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        Self { hits }
    }

    pub fn hits(&self) -> &[ScoredPassage] {
        &self.hits
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn scores(&self) -> Vec<f32> {
        self.hits.iter().map(|h| h.score).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegionFilter {
    pub taluk: String,
}

/// A question as issued by a caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    id: String,
    text: String,
    language: Language,
    region_filter: Option<RegionFilter>,
}

impl Query {
    pub fn new(text: &str, language: Language, taluk: Option<&str>) -> Result<Self, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::new("QUERY_INVALID", "Query must not be empty"));
        }
        let region_filter = taluk
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| RegionFilter { taluk: t.to_string() });

        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let payload = format!(
            "text={text}\nlanguage={}\ntaluk={}\nnanos={nanos}",
            language.code(),
            region_filter.as_ref().map(|r| r.taluk.as_str()).unwrap_or("")
        );
        let digest = hex::encode(Sha256::digest(payload.as_bytes()));

        Ok(Self {
            id: digest[..16].to_string(),
            text: text.to_string(),
            language,
            region_filter,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn region_filter(&self) -> Option<&RegionFilter> {
        self.region_filter.as_ref()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Index,
    Web,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Index => "index",
            Provenance::Web => "web",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one answered query. Never persisted by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerRecord {
    pub query_id: String,
    pub answer_text: String,
    pub sources: Vec<String>,
    pub provenance: Provenance,
    pub language: Language,
    /// Set when the answer could not be confirmed to be in `language`.
    pub language_caveat: bool,
}

pub fn now_rfc3339_utc() -> Result<String, AppError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| {
            AppError::new("TIME_FORMAT_FAILED", "Failed to format time").with_details(e.to_string())
        })
}
