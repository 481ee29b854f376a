//! Category grouping and the end-to-end analysis pipeline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::filter::{FilterCriteria, Facets, apply_filters, facets};
use crate::grade::{Grade, GradingPolicy, RatingCounts};
use crate::merge::{DEFAULT_TOP_K_LIMIT, merge_consecutive};
use crate::normalize::{display_category, normalize};
use crate::record::{MergedRecord, SentenceRecord};

/// One category section of the results view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    /// Normalised category; empty for unclassified records.
    pub category: String,
    /// Records in the group before merging.
    pub record_count: usize,
    /// Merged rows in document order.
    pub items: Vec<MergedRecord>,
}

/// Partition records by normalised category and merge runs within each group.
///
/// Groups are ordered by descending record count (before merging), ties by
/// displayed category name, so a blank category sorts as "Other". Within a
/// group, items keep document order.
pub fn group_by_category<'a, I>(records: I, top_k_limit: usize) -> Vec<CategoryGroup>
where
    I: IntoIterator<Item = &'a SentenceRecord>,
{
    let mut ordered: Vec<&SentenceRecord> = records.into_iter().collect();
    ordered.sort_by_key(|r| r.id);

    let mut buckets: HashMap<&str, Vec<&SentenceRecord>> = HashMap::new();
    for r in ordered {
        buckets.entry(normalize(&r.category)).or_default().push(r);
    }

    let mut buckets: Vec<(&str, Vec<&SentenceRecord>)> = buckets.into_iter().collect();
    buckets.sort_by(|a, b| {
        b.1.len()
            .cmp(&a.1.len())
            .then_with(|| display_category(a.0).cmp(display_category(b.0)))
            .then_with(|| a.0.cmp(b.0))
    });

    buckets
        .into_iter()
        .map(|(category, members)| CategoryGroup {
            category: category.to_string(),
            record_count: members.len(),
            items: merge_consecutive(members, top_k_limit),
        })
        .collect()
}

/// Concatenate group items into the canonical merged-row population.
pub fn flatten(groups: &[CategoryGroup]) -> Vec<MergedRecord> {
    groups.iter().flat_map(|g| g.items.iter().cloned()).collect()
}

/// Knobs of the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Alternative labels kept per merged row.
    pub top_k_limit: usize,
    pub grading: GradingPolicy,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            top_k_limit: DEFAULT_TOP_K_LIMIT,
            grading: GradingPolicy::default(),
        }
    }
}

/// Everything the results view needs for one set of criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub groups: Vec<CategoryGroup>,
    /// Flattened `groups`; what gets graded, tabulated and exported.
    pub merged_rows: Vec<MergedRecord>,
    /// Grade of `merged_rows`.
    pub grade: Grade,
    pub rating_counts: RatingCounts,
    pub facets: Facets,
    /// Records passing the criteria, before merging.
    pub filtered_count: usize,
    pub total_count: usize,
}

/// Filter, group, merge, grade and count in one pass.
///
/// The grade reflects what the user currently sees: the merged rows under
/// the active criteria.
pub fn analyze(
    records: &[SentenceRecord],
    criteria: &FilterCriteria,
    options: &AnalysisOptions,
) -> Analysis {
    let filtered = apply_filters(records, criteria);
    let filtered_count = filtered.len();

    let groups = group_by_category(filtered, options.top_k_limit);
    let merged_rows = flatten(&groups);
    let rating_counts = RatingCounts::tally(&merged_rows);
    let grade = options.grading.grade_counts(&rating_counts);

    debug!(
        total = records.len(),
        filtered = filtered_count,
        groups = groups.len(),
        merged = merged_rows.len(),
        grade = %grade,
        "analysis complete"
    );

    Analysis {
        groups,
        merged_rows,
        grade,
        rating_counts,
        facets: facets(records, criteria),
        filtered_count,
        total_count: records.len(),
    }
}
