//! Review extraction from rendered professor pages.
//!
//! Page markup is inconsistent: a review may show two ratings, one, or none,
//! and may lack a comment entirely. Only the page-level name and subject are
//! mandatory; every review block produces a [`Review`] with whatever it has.
//! A field is absent only when its selector matches nothing; a matched element
//! contributes its text even when that text is empty.

use html_scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::config::{ConfigError, Selectors};
use crate::render::RenderedPage;
use crate::review::{ProfessorPage, Review};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("required page field `{field}` not found (selector {selector:?})")]
    NotFound {
        field: &'static str,
        selector: String,
    },
}

/// Selectors compiled once and reused for every page.
#[derive(Debug)]
pub struct ReviewExtractor {
    name: Selector,
    subject: Selector,
    review: Selector,
    ratings: Selector,
    rating_value: Selector,
    comment: Selector,
    raw: Selectors,
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        field,
        selector: selector.to_owned(),
        message: e.to_string(),
    })
}

/// Text content of an element with whitespace runs collapsed.
///
/// Text nodes are joined with a space so adjacent inline elements
/// (`<span>Jane</span><span>Doe</span>`) don't run together.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

impl ReviewExtractor {
    pub fn new(selectors: &Selectors) -> Result<Self, ConfigError> {
        Ok(Self {
            name: compile("name", &selectors.name)?,
            subject: compile("subject", &selectors.subject)?,
            review: compile("review", &selectors.review)?,
            ratings: compile("ratings", &selectors.ratings)?,
            rating_value: compile("rating_value", &selectors.rating_value)?,
            comment: compile("comment", &selectors.comment)?,
            raw: selectors.clone(),
        })
    }

    pub fn extract(&self, page: &RenderedPage) -> Result<ProfessorPage, ExtractError> {
        let document = Html::parse_document(&page.html);
        let extracted = self.extract_document(&document)?;
        info!(
            url = %page.url,
            name = extracted.name.as_str(),
            subject = extracted.subject.as_str(),
            reviews = extracted.reviews.len(),
            "extracted professor page"
        );
        Ok(extracted)
    }

    pub fn extract_document(&self, document: &Html) -> Result<ProfessorPage, ExtractError> {
        let name = self.required_field(document, "name", &self.name, &self.raw.name)?;
        let subject = self.required_field(document, "subject", &self.subject, &self.raw.subject)?;

        let reviews = document
            .select(&self.review)
            .map(|block| {
                let (quality, difficulty) = self.ratings(block);
                let comment = block.select(&self.comment).next().map(element_text);
                Review {
                    name: name.clone(),
                    subject: subject.clone(),
                    quality,
                    difficulty,
                    comment,
                }
            })
            .collect::<Vec<_>>();

        debug!(count = reviews.len(), "review blocks found");
        Ok(ProfessorPage {
            name,
            subject,
            reviews,
        })
    }

    fn required_field(
        &self,
        document: &Html,
        field: &'static str,
        selector: &Selector,
        raw: &str,
    ) -> Result<String, ExtractError> {
        document
            .select(selector)
            .next()
            .map(element_text)
            .ok_or_else(|| ExtractError::NotFound {
                field,
                selector: raw.to_owned(),
            })
    }

    /// `(quality, difficulty)` by position within the first ratings container.
    ///
    /// Labels are ignored: with two or more values the first is quality and
    /// the second difficulty, with one value only quality is set.
    fn ratings(&self, block: ElementRef<'_>) -> (Option<String>, Option<String>) {
        let Some(container) = block.select(&self.ratings).next() else {
            return (None, None);
        };

        let mut values = container.select(&self.rating_value).map(element_text);
        let quality = values.next();
        let difficulty = values.next();
        (quality, difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ReviewExtractor {
        ReviewExtractor::new(&test_selectors()).unwrap()
    }

    fn test_selectors() -> Selectors {
        Selectors {
            revision: "test".to_owned(),
            name: "h1.name".to_owned(),
            subject: "a.dept".to_owned(),
            review: "div.review".to_owned(),
            ratings: "div.ratings".to_owned(),
            rating_value: "span.num".to_owned(),
            comment: "p.comment".to_owned(),
        }
    }

    fn page(reviews: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><body>
                <h1 class="name"><span>Jane</span><span>Doe</span></h1>
                <a class="dept">Computer   Science</a>
                {reviews}
            </body></html>"#
        ))
    }

    #[test]
    fn test_two_ratings_map_by_position() {
        let html = page(
            r#"<div class="review">
                <div class="ratings"><span class="num">4.5</span><span class="num">2.0</span></div>
                <p class="comment">Great class</p>
            </div>"#,
        );
        let result = extractor().extract_document(&html).unwrap();
        assert_eq!(result.reviews.len(), 1);
        let r = &result.reviews[0];
        assert_eq!(r.quality.as_deref(), Some("4.5"));
        assert_eq!(r.difficulty.as_deref(), Some("2.0"));
        assert_eq!(r.comment.as_deref(), Some("Great class"));
    }

    #[test]
    fn test_extra_ratings_ignored() {
        let html = page(
            r#"<div class="review"><div class="ratings">
                <span class="num">1.0</span><span class="num">5.0</span><span class="num">3.0</span>
            </div></div>"#,
        );
        let r = &extractor().extract_document(&html).unwrap().reviews[0];
        assert_eq!(r.quality.as_deref(), Some("1.0"));
        assert_eq!(r.difficulty.as_deref(), Some("5.0"));
    }

    #[test]
    fn test_single_rating_is_quality() {
        let html = page(
            r#"<div class="review"><div class="ratings"><span class="num">3.0</span></div></div>"#,
        );
        let r = &extractor().extract_document(&html).unwrap().reviews[0];
        assert_eq!(r.quality.as_deref(), Some("3.0"));
        assert_eq!(r.difficulty, None);
        assert_eq!(r.difficulty_display(), "N/A");
    }

    #[test]
    fn test_missing_ratings_container() {
        let html = page(r#"<div class="review"><p class="comment">Hard exam</p></div>"#);
        let r = &extractor().extract_document(&html).unwrap().reviews[0];
        assert_eq!(r.quality, None);
        assert_eq!(r.difficulty, None);
        assert_eq!(r.comment.as_deref(), Some("Hard exam"));
    }

    #[test]
    fn test_empty_ratings_container() {
        let html = page(r#"<div class="review"><div class="ratings"></div></div>"#);
        let r = &extractor().extract_document(&html).unwrap().reviews[0];
        assert_eq!((r.quality.as_deref(), r.difficulty.as_deref()), (None, None));
    }

    #[test]
    fn test_missing_comment() {
        let html = page(
            r#"<div class="review"><div class="ratings"><span class="num">5.0</span></div></div>"#,
        );
        let r = &extractor().extract_document(&html).unwrap().reviews[0];
        assert_eq!(r.comment, None);
        assert_eq!(r.comment_display(), "No comment");
    }

    #[test]
    fn test_empty_comment_element_kept_as_empty_text() {
        let html = page(r#"<div class="review"><p class="comment"></p></div>"#);
        let r = &extractor().extract_document(&html).unwrap().reviews[0];
        assert_eq!(r.comment.as_deref(), Some(""));
        assert_eq!(r.comment_display(), "");

        let html = page(r#"<div class="review"><p class="comment">   </p></div>"#);
        let r = &extractor().extract_document(&html).unwrap().reviews[0];
        assert_eq!(r.comment.as_deref(), Some(""));
    }

    #[test]
    fn test_blank_rating_keeps_its_position() {
        let html = page(
            r#"<div class="review">
                <div class="ratings"><span class="num"></span><span class="num">2.0</span></div>
            </div>"#,
        );
        let r = &extractor().extract_document(&html).unwrap().reviews[0];
        assert_eq!(r.quality.as_deref(), Some(""));
        assert_eq!(r.difficulty.as_deref(), Some("2.0"));
        assert_eq!(r.quality_display(), "");
    }

    #[test]
    fn test_comment_whitespace_collapsed() {
        let html = page(
            "<div class=\"review\"><p class=\"comment\">\n  Lectures were <b>very</b>\n   clear.  </p></div>",
        );
        let r = &extractor().extract_document(&html).unwrap().reviews[0];
        assert_eq!(r.comment.as_deref(), Some("Lectures were very clear."));
    }

    #[test]
    fn test_page_fields_copied_to_every_review() {
        let html = page(r#"<div class="review"></div><div class="review"></div>"#);
        let result = extractor().extract_document(&html).unwrap();
        assert_eq!(result.name, "Jane Doe");
        assert_eq!(result.subject, "Computer Science");
        assert_eq!(result.reviews.len(), 2);
        assert!(
            result
                .reviews
                .iter()
                .all(|r| r.name == "Jane Doe" && r.subject == "Computer Science")
        );
    }

    #[test]
    fn test_no_reviews_is_not_an_error() {
        let result = extractor().extract_document(&page("")).unwrap();
        assert!(result.reviews.is_empty());
        assert_eq!(result.name, "Jane Doe");
    }

    #[test]
    fn test_review_count_matches_blocks() {
        for count in [0, 1, 7] {
            let blocks = r#"<div class="review"></div>"#.repeat(count);
            let result = extractor().extract_document(&page(&blocks)).unwrap();
            assert_eq!(result.reviews.len(), count);
        }
    }

    #[test]
    fn test_missing_name_is_fatal() {
        let html = Html::parse_document(
            r#"<html><body><a class="dept">Math</a><div class="review"></div></body></html>"#,
        );
        let err = extractor().extract_document(&html).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound { field: "name", .. }));
    }

    #[test]
    fn test_missing_subject_is_fatal() {
        let html = Html::parse_document(r#"<html><body><h1 class="name">Jane</h1></body></html>"#);
        let err = extractor().extract_document(&html).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound { field: "subject", .. }));
    }

    #[test]
    fn test_blank_name_element_is_not_missing() {
        let html = Html::parse_document(
            r#"<html><body><h1 class="name">  </h1><a class="dept">Math</a><div class="review"></div></body></html>"#,
        );
        let result = extractor().extract_document(&html).unwrap();
        assert_eq!(result.name, "");
        assert_eq!(result.subject, "Math");
        assert_eq!(result.reviews.len(), 1);
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let selectors = Selectors {
            review: "div[[".to_owned(),
            ..test_selectors()
        };
        let err = ReviewExtractor::new(&selectors).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidSelector { field: "review", .. }
        ));
    }

    #[test]
    fn test_default_selectors_compile() {
        assert!(ReviewExtractor::new(&Selectors::default()).is_ok());
    }
}
