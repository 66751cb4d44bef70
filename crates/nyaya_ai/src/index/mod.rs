//! Semantic passage index: the contract the retrieval gate consumes, and the
//! persistent implementation used in production.

use std::collections::HashSet;

use nyaya_core::domain::{Language, Passage, ScoredPassage};
use nyaya_core::error::AppError;

mod similarity;
pub mod store;

pub use store::{IndexStatus, VectorIndex};

/// Equality filter over passage metadata. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    pub taluk: Option<String>,
    pub pincode: Option<String>,
    pub language: Option<Language>,
}

impl MetadataFilter {
    pub fn taluk(taluk: impl Into<String>) -> Self {
        Self {
            taluk: Some(taluk.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, passage: &Passage) -> bool {
        self.taluk.as_deref().map_or(true, |t| passage.region.taluk == t)
            && self.pincode.as_deref().map_or(true, |p| passage.region.pincode == p)
            && self.language.map_or(true, |l| passage.language == l)
    }
}

/// A nearest-neighbour store over passages.
///
/// Implementations return scores in `[0, 1]`, best first, and keep their
/// storage order among equal scores. An index that is unreachable or has never
/// been built must return an error, not an empty result.
pub trait DocumentIndex: Send + Sync {
    fn similarity_search(
        &self,
        query_text: &str,
        k: usize,
        restrict_to: Option<&HashSet<String>>,
    ) -> Result<Vec<ScoredPassage>, AppError>;

    fn ids_by_metadata(&self, filter: &MetadataFilter) -> Result<Vec<String>, AppError>;
}
