//! Grading, consecutive-run merging, faceted filtering and export of
//! sentence-level privacy-policy annotations.

mod error;
pub use error::ValidationError;

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod grade;
pub mod merge;
pub mod normalize;
pub mod record;
pub mod schema;

pub use aggregate::{Analysis, AnalysisOptions, CategoryGroup, analyze, flatten, group_by_category};
pub use export::to_csv;
pub use filter::{FilterCriteria, Facets, Selection, apply_filters, facets};
pub use grade::{Grade, GradingPolicy, RatingCounts, grade, grade_with};
pub use merge::{DEFAULT_TOP_K_LIMIT, merge_consecutive};
pub use normalize::{Rating, normalize, rating_key};
pub use record::{AnnotationResponse, MergedRecord, SentenceRecord, TopK, parse_records};
