//! Review records extracted from a professor page, and their index form.

use indexmap::IndexMap;
use serde::Serialize;

/// Shown in place of a quality or difficulty score the page did not carry.
pub const MISSING_SCORE: &str = "N/A";

/// Shown in place of a comment the page did not carry.
pub const MISSING_COMMENT: &str = "No comment";

/// A single review block as found on a professor page.
///
/// Absent sub-fields stay `None` here; the `N/A` / `No comment` sentinels only
/// appear once a review is rendered for the index or the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub name: String,
    pub subject: String,
    pub quality: Option<String>,
    pub difficulty: Option<String>,
    pub comment: Option<String>,
}

impl Review {
    pub fn quality_display(&self) -> &str {
        self.quality.as_deref().unwrap_or(MISSING_SCORE)
    }

    pub fn difficulty_display(&self) -> &str {
        self.difficulty.as_deref().unwrap_or(MISSING_SCORE)
    }

    /// The text that gets embedded for this review.
    pub fn comment_display(&self) -> &str {
        self.comment.as_deref().unwrap_or(MISSING_COMMENT)
    }

    /// Flattened string metadata stored next to the vector.
    ///
    /// Key order is stable so the upsert payload is deterministic.
    pub fn metadata(&self) -> IndexMap<String, String> {
        let mut map = IndexMap::with_capacity(5);
        map.insert("name".to_owned(), self.name.clone());
        map.insert("subject".to_owned(), self.subject.clone());
        map.insert("quality".to_owned(), self.quality_display().to_owned());
        map.insert("difficulty".to_owned(), self.difficulty_display().to_owned());
        map.insert("comment".to_owned(), self.comment_display().to_owned());
        map
    }
}

/// Everything the extractor pulls off one professor page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfessorPage {
    pub name: String,
    pub subject: String,
    pub reviews: Vec<Review>,
}

/// Identifier for the `ordinal`-th review of a scrape batch.
///
/// Unique within one batch only: a second run for the same professor (or a
/// different professor with the same display name) produces the same ids.
pub fn record_id(name: &str, ordinal: usize) -> String {
    format!("{name}_review-{ordinal}")
}

/// A vector plus metadata, shaped for a batch upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: IndexMap<String, String>,
}

impl IndexRecord {
    pub fn from_review(review: &Review, ordinal: usize, values: Vec<f32>) -> Self {
        Self {
            id: record_id(&review.name, ordinal),
            values,
            metadata: review.metadata(),
        }
    }
}
