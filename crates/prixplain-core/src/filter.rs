//! Faceted filtering and search over sentence records.
//!
//! Criteria are plain values owned by the caller; every function here is a
//! pure function of the records and the criteria. Filtered output is always
//! returned in `id` order, whatever order the input arrived in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grade::RatingCounts;
use crate::normalize::{
    Rating, contains_ci, display_category, display_fine_grained, normalize, rating_key,
};
use crate::record::SentenceRecord;

/// Confidence threshold applied unless the caller picks another.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.70;

/// A dropdown selection: everything, or one normalised value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// `"All"` (any case) selects everything; any other value is trimmed.
    pub fn parse(s: &str) -> Self {
        let s = normalize(s);
        if s.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(s.to_string())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Compare against a raw field value, normalising it first.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(v) => normalize(value) == v.as_str(),
        }
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(v) => f.write_str(v),
        }
    }
}

/// Active filters. All criteria are ANDed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub category: Selection,
    /// Only meaningful among the fine-grained values under `category`.
    pub fine_grained: Selection,
    /// `None` is "All".
    pub rating: Option<Rating>,
    /// Restrict to bad and blocker, intersected with `rating`.
    pub only_bad_or_blocker: bool,
    pub min_confidence: f64,
    pub search: String,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            category: Selection::All,
            fine_grained: Selection::All,
            rating: None,
            only_bad_or_blocker: false,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            search: String::new(),
        }
    }
}

impl FilterCriteria {
    /// Criteria that let every record through.
    pub fn unfiltered() -> Self {
        Self {
            min_confidence: 0.0,
            ..Self::default()
        }
    }

    /// Threshold clamped to [0, 1]; NaN counts as 0.
    pub fn threshold(&self) -> f64 {
        if self.min_confidence.is_nan() {
            0.0
        } else {
            self.min_confidence.clamp(0.0, 1.0)
        }
    }

    pub fn matches(&self, r: &SentenceRecord) -> bool {
        let rating = rating_key(&r.rating);

        self.category.matches(&r.category)
            && self.fine_grained.matches(&r.fine_grained)
            && self.rating.is_none_or(|want| want == rating)
            && (!self.only_bad_or_blocker || rating.is_adverse())
            && r.confidence >= self.threshold()
            && self.matches_search(r)
    }

    fn matches_search(&self, r: &SentenceRecord) -> bool {
        let s = normalize(&self.search);
        s.is_empty()
            || [
                &r.text,
                &r.label,
                &r.action,
                &r.sub_category,
                &r.fine_grained,
                &r.category,
            ]
            .into_iter()
            .any(|field| contains_ci(field, s))
    }

    /// Switch category, dropping a fine-grained selection that does not
    /// exist under the new category.
    pub fn select_category(&mut self, category: Selection, records: &[SentenceRecord]) {
        self.category = category;
        if let Selection::Only(fine) = &self.fine_grained {
            let still_valid = records
                .iter()
                .filter(|r| self.category.matches(&r.category))
                .any(|r| normalize(&r.fine_grained) == fine.as_str());
            if !still_valid {
                self.fine_grained = Selection::All;
            }
        }
    }

    /// Select `rating`, or go back to All if it is already selected.
    pub fn toggle_rating(&mut self, rating: Rating) {
        self.rating = if self.rating == Some(rating) {
            None
        } else {
            Some(rating)
        };
    }

    /// Reset every criterion except the confidence threshold.
    pub fn clear(&mut self) {
        *self = Self {
            min_confidence: self.min_confidence,
            ..Self::default()
        };
    }
}

/// Records passing `criteria`, sorted by `id`.
pub fn apply_filters<'a>(
    records: &'a [SentenceRecord],
    criteria: &FilterCriteria,
) -> Vec<&'a SentenceRecord> {
    let mut out: Vec<&SentenceRecord> = records.iter().filter(|r| criteria.matches(r)).collect();
    out.sort_by_key(|r| r.id);
    out
}

/// One entry of a dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetOption {
    /// Normalised value to put in a [`Selection`]; may be empty.
    pub value: String,
    /// What to show the user ("Other" / "Unmapped" for blanks).
    pub display: String,
    pub count: usize,
}

/// "Good 3/12" style badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingFacet {
    pub rating: Rating,
    /// Under the full current criteria.
    pub filtered: usize,
    /// Under no criteria at all.
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Facets {
    pub ratings: Vec<RatingFacet>,
    /// Counted over the unfiltered population.
    pub categories: Vec<FacetOption>,
    /// Counted over the records under the selected category.
    pub fine_grained: Vec<FacetOption>,
}

/// Compute all facet counts for the current criteria.
pub fn facets(records: &[SentenceRecord], criteria: &FilterCriteria) -> Facets {
    let total = RatingCounts::tally(records);
    let filtered = RatingCounts::tally(apply_filters(records, criteria));

    let ratings = Rating::ALL
        .iter()
        .map(|&rating| RatingFacet {
            rating,
            filtered: filtered.get(rating),
            total: total.get(rating),
        })
        .collect();

    Facets {
        ratings,
        categories: category_options(records),
        fine_grained: fine_grained_options(records, &criteria.category),
    }
}

/// Category dropdown options with counts over all records.
pub fn category_options(records: &[SentenceRecord]) -> Vec<FacetOption> {
    options(records.iter().map(|r| r.category.as_str()), display_category)
}

/// Fine-grained dropdown options under `category`.
pub fn fine_grained_options(records: &[SentenceRecord], category: &Selection) -> Vec<FacetOption> {
    options(
        records
            .iter()
            .filter(|r| category.matches(&r.category))
            .map(|r| r.fine_grained.as_str()),
        display_fine_grained,
    )
}

fn options<'a>(
    values: impl Iterator<Item = &'a str>,
    display: fn(&str) -> &str,
) -> Vec<FacetOption> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(normalize(v)).or_default() += 1;
    }

    let mut out: Vec<FacetOption> = counts
        .into_iter()
        .map(|(value, count)| FacetOption {
            value: value.to_string(),
            display: display(value).to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| a.display.cmp(&b.display).then_with(|| a.value.cmp(&b.value)));
    out
}
