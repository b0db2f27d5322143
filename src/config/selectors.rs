//! CSS selectors for the professor page markup.
//!
//! The review site ships generated class names that change whenever its
//! frontend is rebuilt, so these are data, not code. Defaults match the last
//! known markup; a TOML file overrides any subset of them.

use super::ConfigError;
use figment::Figment;
use figment::providers::{Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selectors {
    /// Free-form marker for the markup snapshot these selectors target.
    pub revision: String,
    /// Professor display name (page-level, required).
    pub name: String,
    /// Department / subject link (page-level, required).
    pub subject: String,
    /// One element per review.
    pub review: String,
    /// Ratings container inside a review.
    pub ratings: String,
    /// Numeric rating inside the ratings container; quality first, difficulty second.
    pub rating_value: String,
    /// Comment body inside a review.
    pub comment: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            revision: "builtin".to_owned(),
            name: ".NameTitle__Name-dowf0z-0".to_owned(),
            subject: ".TeacherDepartment__StyledDepartmentLink-fl79e8-0".to_owned(),
            review: ".Rating__RatingBody-sc-1rhvpxz-0".to_owned(),
            ratings: ".RatingValues__StyledRatingValues-sc-6dc747-0".to_owned(),
            rating_value: ".CardNumRating__CardNumRatingNumber-sc-17t4b9u-2".to_owned(),
            comment: ".Comments__StyledComments-dzzyvm-0".to_owned(),
        }
    }
}

impl Selectors {
    /// Built-in defaults overlaid with whatever keys `path` provides.
    ///
    /// A missing file is not an error; the defaults are used as-is.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Ok(Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .extract()?)
    }
}
